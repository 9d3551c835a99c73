/// Session token issuance and verification
///
/// Tokens are HS256 JWTs carrying `{userId, loginId, type}` plus the usual
/// iat/exp pair, signed with the server-held secret. Expiry is embedded in
/// the token and enforced at verification time.
use crate::error::{AuthError, AuthResult};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Initial token lifetime: 30 days
const INITIAL_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;
/// Refresh token lifetime: 90 days
const REFRESH_TOKEN_TTL_SECS: i64 = 90 * 24 * 3600;

/// Which stage of the session lifecycle a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "INITIAL")]
    Initial,
    #[serde(rename = "REFRESH")]
    Refresh,
}

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "loginId")]
    pub login_id: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a session token for the given user/login pair
pub fn issue(
    user_id: &str,
    login_id: &str,
    token_type: TokenType,
    secret: &str,
) -> AuthResult<String> {
    let now = Utc::now().timestamp();
    let ttl = match token_type {
        TokenType::Initial => INITIAL_TOKEN_TTL_SECS,
        TokenType::Refresh => REFRESH_TOKEN_TTL_SECS,
    };

    let claims = TokenClaims {
        user_id: user_id.to_string(),
        login_id: login_id.to_string(),
        token_type,
        iat: now,
        exp: now + ttl,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Jwt(format!("Failed to sign token: {e}")))
}

/// Verify a session token with full validation
///
/// This performs signature verification, expiration checking, and claims
/// decoding, with a small leeway for clock skew.
pub fn verify(token: &str, secret: &str) -> AuthResult<TokenClaims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 300;

    decode::<TokenClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AuthError::Unauthenticated("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                AuthError::Unauthenticated("Invalid token signature".to_string())
            }
            _ => AuthError::Unauthenticated(format!("Invalid token: {e}")),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-only-0123";

    #[test]
    fn issue_and_verify_initial_token() {
        let token = issue("user-1", "login-1", TokenType::Initial, SECRET).unwrap();
        let claims = verify(&token, SECRET).unwrap();

        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.login_id, "login-1");
        assert_eq!(claims.token_type, TokenType::Initial);
        assert_eq!(claims.exp - claims.iat, INITIAL_TOKEN_TTL_SECS);
    }

    #[test]
    fn refresh_token_carries_longer_expiry() {
        let token = issue("user-1", "login-1", TokenType::Refresh, SECRET).unwrap();
        let claims = verify(&token, SECRET).unwrap();

        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.exp - claims.iat, REFRESH_TOKEN_TTL_SECS);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue("user-1", "login-1", TokenType::Initial, SECRET).unwrap();
        let result = verify(&token, "another-secret-key-of-sufficient-len");

        assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify("not.a.token", SECRET).is_err());
    }

    #[test]
    fn token_type_uses_wire_names() {
        let json = serde_json::to_string(&TokenType::Initial).unwrap();
        assert_eq!(json, r#""INITIAL""#);
        let json = serde_json::to_string(&TokenType::Refresh).unwrap();
        assert_eq!(json, r#""REFRESH""#);
    }
}
