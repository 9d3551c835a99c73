/// Session lifecycle engine
///
/// Turns a verified third-party identity into a durable account plus
/// login-history pair, issues bearer tokens, and handles refresh and
/// sign-out state transitions.

mod engine;

pub use engine::SessionEngine;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How an Authenticate call resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    #[serde(rename = "LOGIN")]
    Login,
    #[serde(rename = "SIGNUP")]
    Signup,
}

/// Authenticate request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    /// Identity-provider token
    pub token: String,
    pub public_key: String,
    pub fcm_token: String,
    pub client_meta_data: Option<Value>,
}

/// Authenticate response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateData {
    pub method: AuthMethod,
    pub user: AuthenticatedUser,
    pub login_info: LoginInfo,
}

/// Profile slice returned from Authenticate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub token: String,
    /// Echoed only on the LOGIN branch; the signup caller already holds it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub user_id: String,
}

/// Login-history slice returned from Authenticate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInfo {
    pub login_id: String,
    /// Original plaintext client metadata, never the sealed blob
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_meta_data: Option<Value>,
    pub user_id: String,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
}

/// RefreshToken request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub login_id: String,
    pub user_id: String,
    pub client_meta_data: Option<Value>,
}

/// Signout request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignoutRequest {
    pub login_id: String,
    pub user_id: String,
}

/// GetUserLoginInfo request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginInfoRequest {
    pub login_id: String,
    pub user_id: String,
}

/// Decrypted login-info projection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginInfo {
    pub login_meta_data: Value,
    pub user_id: String,
    pub login_id: String,
    pub created_at: DateTime<Utc>,
    pub is_valid: bool,
}

/// UpdateFcmToken request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFcmTokenRequest {
    pub user_id: String,
    pub fcm_token: String,
}

/// GetUserDetails request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailsRequest {
    pub user_id: String,
}

/// GetAllUsers request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllUsersRequest {
    pub except_user_id: Option<String>,
}

/// GetUserLoginHistory request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistoryRequest {
    pub user_id: String,
    pub limit: Option<u32>,
    /// Keyset cursor: the `createdAt` of the last entry from the prior page
    pub cursor: Option<String>,
}

/// Public profile projection of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// One page of a user's login history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginHistoryPage {
    pub logins: Vec<LoginSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Login-history entry without its metadata blob
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSummary {
    pub login_id: String,
    pub user_id: String,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
}
