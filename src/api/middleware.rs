/// Bearer-token helpers for authenticated endpoints
use crate::{
    config::ServerConfig,
    crypto::token::{self, TokenClaims},
    error::{AuthError, AuthResult},
};
use axum::http::HeaderMap;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            if s.starts_with("Bearer ") {
                Some(s[7..].to_string())
            } else {
                None
            }
        })
}

/// Require a verified bearer token - returns its claims or 401
///
/// The engine itself is agnostic to the verification call site; this is the
/// boundary where session tokens are checked.
pub fn require_auth(headers: &HeaderMap, config: &ServerConfig) -> AuthResult<TokenClaims> {
    let bearer = extract_bearer_token(headers)
        .ok_or_else(|| AuthError::Unauthenticated("Missing authorization header".to_string()))?;

    token::verify(&bearer, &config.secrets.jwt_secret)
}
