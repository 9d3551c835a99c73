/// Storage records for accounts, login history, and refresh audit
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in the database
///
/// One row per human user, looked up by `email_hash` so the engine never
/// stores or searches by raw email.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    /// Keyed digest of the lowercased verified email; unique index
    pub email_hash: String,
    pub name: String,
    pub photo_url: Option<String>,
    pub description: Option<String>,
    /// Client-held key reference, set at signup and never rewritten
    pub public_key: String,
    /// Current push-notification token, overwritten on every login
    pub fcm_token: String,
    pub email_verified: bool,
    pub auth_provider: String,
    pub locale: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Login-history record, one per session start
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LoginHistoryEntry {
    pub id: String,
    pub user_id: String,
    /// Sealed metadata envelope; absent when the client sent none
    pub login_meta_data: Option<String>,
    /// True at creation, flips to false exactly once on sign-out
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
}

/// Refresh-audit record, appended on every refresh-token issuance
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RefreshAuditEntry {
    pub id: String,
    pub login_id: String,
    pub login_meta_data: Option<String>,
    pub created_at: DateTime<Utc>,
}
