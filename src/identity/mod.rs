/// Identity verification against a third-party provider
///
/// The engine only sees the narrow `IdentityVerifier` seam; the production
/// implementation introspects Google-issued ID tokens.
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::Deserialize;

/// Claims extracted from a verified identity token
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub photo_url: Option<String>,
    pub locale: Option<String>,
    pub provider: String,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Validate an externally-issued identity token and extract its claims.
    /// An untrusted or rejected token surfaces as `InvalidArgument`.
    async fn verify(&self, token: &str) -> AuthResult<VerifiedIdentity>;
}

/// Verifies Google-issued ID tokens via the tokeninfo endpoint
pub struct GoogleVerifier {
    client: reqwest::Client,
    client_id: String,
    tokeninfo_url: String,
}

/// Relevant subset of the tokeninfo response
#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    aud: String,
    email: Option<String>,
    /// The endpoint reports this as the string "true"/"false"
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    locale: Option<String>,
}

impl GoogleVerifier {
    pub fn new(client_id: String, tokeninfo_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            tokeninfo_url,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, token: &str) -> AuthResult<VerifiedIdentity> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("tokeninfo request failed: {e}")))?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "identity token rejected by provider");
            return Err(AuthError::InvalidArgument(
                "Identity token rejected by provider".to_string(),
            ));
        }

        let info: TokenInfoResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Internal(format!("tokeninfo response malformed: {e}")))?;

        if info.aud != self.client_id {
            return Err(AuthError::InvalidArgument(
                "Identity token audience mismatch".to_string(),
            ));
        }

        Ok(VerifiedIdentity {
            name: info.name,
            email: info.email,
            email_verified: info.email_verified.as_deref() == Some("true"),
            photo_url: info.picture,
            locale: info.locale,
            provider: "GOOGLE".to_string(),
        })
    }
}

/// Fixed-response verifier backing the engine and handler tests
#[cfg(test)]
pub struct StaticVerifier {
    pub identity: VerifiedIdentity,
}

#[cfg(test)]
impl StaticVerifier {
    pub fn for_user(name: &str, email: &str) -> Self {
        Self {
            identity: VerifiedIdentity {
                name: Some(name.to_string()),
                email: Some(email.to_string()),
                email_verified: true,
                photo_url: Some(format!("https://photos.example/{name}.png")),
                locale: Some("en".to_string()),
                provider: "GOOGLE".to_string(),
            },
        }
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> AuthResult<VerifiedIdentity> {
        if token == "bad-token" {
            return Err(AuthError::InvalidArgument(
                "Identity token rejected by provider".to_string(),
            ));
        }
        Ok(self.identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokeninfo_payload_parses() {
        let raw = r#"{
            "aud": "client-1",
            "email": "a@x.com",
            "email_verified": "true",
            "name": "A",
            "picture": "https://photos.example/a.png",
            "locale": "en",
            "iss": "https://accounts.google.com"
        }"#;

        let info: TokenInfoResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(info.aud, "client-1");
        assert_eq!(info.email.as_deref(), Some("a@x.com"));
        assert_eq!(info.email_verified.as_deref(), Some("true"));
    }

    #[test]
    fn tokeninfo_tolerates_missing_profile_fields() {
        let info: TokenInfoResponse =
            serde_json::from_str(r#"{"aud": "client-1"}"#).unwrap();
        assert!(info.email.is_none());
        assert!(info.name.is_none());
        assert!(info.locale.is_none());
    }
}
