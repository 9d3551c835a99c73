/// Session lifecycle engine backed by sqlx transactions
///
/// The authenticate write path (account upsert + login-history insert) runs
/// inside one transaction; refresh and sign-out are single-statement updates
/// whose compound filters double as the concurrency guard.
use crate::{
    config::ServerConfig,
    crypto::{
        self,
        token::{self, TokenType},
        MetadataCipher,
    },
    db::models::{Account, LoginHistoryEntry, RefreshAuditEntry},
    error::{AuthError, AuthResult},
    identity::{IdentityVerifier, VerifiedIdentity},
    session::{
        AllUsersRequest, AuthMethod, AuthenticateData, AuthenticateRequest, AuthenticatedUser,
        LoginHistoryPage, LoginHistoryRequest, LoginInfo, LoginSummary, RefreshTokenRequest,
        SignoutRequest, UpdateFcmTokenRequest, UserDetailsRequest, UserLoginInfo,
        UserLoginInfoRequest, UserProfile,
    },
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, email_hash, name, photo_url, description, public_key, \
     fcm_token, email_verified, auth_provider, locale, created_at, updated_at";

/// Tagged result of the login-vs-signup unit of work
struct BranchOutcome {
    method: AuthMethod,
    account: Account,
    login: LoginHistoryEntry,
}

/// Session lifecycle engine
pub struct SessionEngine {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    verifier: Arc<dyn IdentityVerifier>,
    cipher: MetadataCipher,
}

impl SessionEngine {
    /// Create a new engine over the given pool and verifier
    pub fn new(
        db: SqlitePool,
        config: Arc<ServerConfig>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> AuthResult<Self> {
        let cipher = MetadataCipher::from_hex(&config.secrets.encrypt_key)?;
        Ok(Self {
            db,
            config,
            verifier,
            cipher,
        })
    }

    /// Authenticate via a third-party identity token
    ///
    /// Establishes or updates the account, appends a login-history entry,
    /// and issues an INITIAL session token. The branch read happens outside
    /// the transaction; uniqueness is re-checked atomically by the unique
    /// index on `email_hash`.
    pub async fn authenticate(&self, req: AuthenticateRequest) -> AuthResult<AuthenticateData> {
        if req.token.is_empty() || req.public_key.is_empty() || req.fcm_token.is_empty() {
            return Err(AuthError::InvalidArgument(
                "token, publicKey and fcmToken are required".to_string(),
            ));
        }

        let identity = self.verifier.verify(&req.token).await?;
        let (name, email) = match (&identity.name, &identity.email) {
            (Some(name), Some(email)) => (name.clone(), email.clone()),
            _ => {
                return Err(AuthError::InvalidArgument(
                    "Identity token carried no name or email".to_string(),
                ))
            }
        };

        let email_hash = crypto::hash_email(&email, &self.config.secrets.hash_key)?;
        let existing = self.find_account_by_email_hash(&email_hash).await?;
        let sealed_meta = self.seal_metadata(req.client_meta_data.as_ref())?;

        let mut tx = self.db.begin().await?;
        let outcome = self
            .upsert_session(&mut tx, existing, &identity, &name, &email, &email_hash, &req, sealed_meta)
            .await?;
        tx.commit().await.map_err(map_unique_violation)?;

        // Should not occur once the commit succeeded; kept as a guard against
        // a torn projection.
        let persisted = self.fetch_login(&outcome.login.id).await?;
        if persisted.is_none() {
            return Err(AuthError::NotFound("No data found".to_string()));
        }

        let session_token = token::issue(
            &outcome.account.id,
            &outcome.login.id,
            TokenType::Initial,
            &self.config.secrets.jwt_secret,
        )?;

        tracing::info!(
            user_id = %outcome.account.id,
            login_id = %outcome.login.id,
            method = ?outcome.method,
            "session established"
        );

        let public_key = match outcome.method {
            AuthMethod::Login => Some(outcome.account.public_key.clone()),
            AuthMethod::Signup => None,
        };

        Ok(AuthenticateData {
            method: outcome.method,
            user: AuthenticatedUser {
                token: session_token,
                public_key,
                name: outcome.account.name.clone(),
                email: outcome.account.email.clone(),
                photo_url: outcome.account.photo_url.clone(),
                user_id: outcome.account.id.clone(),
            },
            login_info: LoginInfo {
                login_id: outcome.login.id.clone(),
                login_meta_data: req.client_meta_data,
                user_id: outcome.login.user_id.clone(),
                is_valid: true,
                created_at: outcome.login.created_at,
            },
        })
    }

    /// Issue a REFRESH token for a still-valid session
    ///
    /// Not transactional: the audit write and the token issuance are
    /// independent, which trades audit completeness for simplicity.
    pub async fn refresh_token(&self, req: RefreshTokenRequest) -> AuthResult<String> {
        let login_id = parse_entity_id(&req.login_id, "loginId")?;
        let user_id = parse_entity_id(&req.user_id, "userId")?;

        let sealed_meta = self.seal_metadata(req.client_meta_data.as_ref())?;

        // An invalid session is a bad request, not a missing resource.
        let entry = sqlx::query_as::<_, LoginHistoryEntry>(
            "SELECT id, user_id, login_meta_data, is_valid, created_at
             FROM login_history WHERE id = ?1 AND is_valid = 1",
        )
        .bind(&login_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AuthError::InvalidArgument("Invalid loginId".to_string()))?;

        let session_token = token::issue(
            &user_id,
            &login_id,
            TokenType::Refresh,
            &self.config.secrets.jwt_secret,
        )?;

        let audit = RefreshAuditEntry {
            id: Uuid::new_v4().to_string(),
            login_id: entry.id,
            login_meta_data: sealed_meta,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO refresh_audit (id, login_id, login_meta_data, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&audit.id)
        .bind(&audit.login_id)
        .bind(&audit.login_meta_data)
        .bind(audit.created_at)
        .execute(&self.db)
        .await?;

        tracing::debug!(login_id = %audit.login_id, "refresh token issued");

        Ok(session_token)
    }

    /// Invalidate a session
    ///
    /// The compound filter (id + owner + validity) is the concurrency guard:
    /// a racing duplicate request matches zero rows and fails cleanly.
    pub async fn signout(&self, req: SignoutRequest) -> AuthResult<()> {
        let login_id = parse_entity_id(&req.login_id, "loginId")?;
        let user_id = parse_entity_id(&req.user_id, "userId")?;

        let result = sqlx::query(
            "UPDATE login_history SET is_valid = 0
             WHERE id = ?1 AND user_id = ?2 AND is_valid = 1",
        )
        .bind(&login_id)
        .bind(&user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("No valid session to sign out".to_string()));
        }

        tracing::info!(user_id = %user_id, login_id = %login_id, "signed out");

        Ok(())
    }

    /// Fetch one login-history entry with its metadata decrypted
    pub async fn get_user_login_info(
        &self,
        req: UserLoginInfoRequest,
    ) -> AuthResult<UserLoginInfo> {
        let login_id = parse_entity_id(&req.login_id, "loginId")?;
        let user_id = parse_entity_id(&req.user_id, "userId")?;

        let entry = sqlx::query_as::<_, LoginHistoryEntry>(
            "SELECT id, user_id, login_meta_data, is_valid, created_at
             FROM login_history WHERE id = ?1 AND user_id = ?2 AND is_valid = 1",
        )
        .bind(&login_id)
        .bind(&user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AuthError::NotFound("User login info not found".to_string()))?;

        let login_meta_data = match &entry.login_meta_data {
            Some(sealed) => {
                let plaintext = self.cipher.decrypt(sealed)?;
                serde_json::from_str(&plaintext).map_err(|e| {
                    AuthError::Internal(format!("stored metadata is not valid JSON: {e}"))
                })?
            }
            None => Value::Object(Default::default()),
        };

        Ok(UserLoginInfo {
            login_meta_data,
            user_id: entry.user_id,
            login_id: entry.id,
            created_at: entry.created_at,
            is_valid: entry.is_valid,
        })
    }

    /// Overwrite the push-notification token for an account
    pub async fn update_fcm_token(&self, req: UpdateFcmTokenRequest) -> AuthResult<()> {
        let user_id = parse_entity_id(&req.user_id, "userId")?;
        if req.fcm_token.is_empty() {
            return Err(AuthError::InvalidArgument("fcmToken is required".to_string()));
        }

        let result = sqlx::query("UPDATE account SET fcm_token = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&req.fcm_token)
            .bind(Utc::now())
            .bind(&user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("User not found".to_string()));
        }

        Ok(())
    }

    /// Public profile projection of one account
    pub async fn get_user_details(&self, req: UserDetailsRequest) -> AuthResult<UserProfile> {
        let user_id = parse_entity_id(&req.user_id, "userId")?;

        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1"
        ))
        .bind(&user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        Ok(profile_of(account))
    }

    /// List public profiles, optionally excluding the caller, newest first
    pub async fn get_all_users(&self, req: AllUsersRequest) -> AuthResult<Vec<UserProfile>> {
        let accounts = if let Some(except) = req.except_user_id.as_deref() {
            let except = parse_entity_id(except, "exceptUserId")?;
            sqlx::query_as::<_, Account>(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id != ?1 ORDER BY created_at DESC"
            ))
            .bind(except)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, Account>(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM account ORDER BY created_at DESC"
            ))
            .fetch_all(&self.db)
            .await?
        };

        Ok(accounts.into_iter().map(profile_of).collect())
    }

    /// Page through a user's login history, newest first
    ///
    /// Uses the `createdAt` of the last returned entry as a keyset cursor.
    pub async fn get_user_login_history(
        &self,
        req: LoginHistoryRequest,
    ) -> AuthResult<LoginHistoryPage> {
        let user_id = parse_entity_id(&req.user_id, "userId")?;
        let limit = i64::from(req.limit.unwrap_or(50).clamp(1, 100));

        let entries = if let Some(cursor) = req.cursor.as_deref() {
            let before: DateTime<Utc> = DateTime::parse_from_rfc3339(cursor)
                .map_err(|_| AuthError::InvalidArgument("cursor is not a valid timestamp".to_string()))?
                .with_timezone(&Utc);
            sqlx::query_as::<_, LoginHistoryEntry>(
                "SELECT id, user_id, login_meta_data, is_valid, created_at
                 FROM login_history WHERE user_id = ?1 AND created_at < ?2
                 ORDER BY created_at DESC LIMIT ?3",
            )
            .bind(&user_id)
            .bind(before)
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, LoginHistoryEntry>(
                "SELECT id, user_id, login_meta_data, is_valid, created_at
                 FROM login_history WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
            )
            .bind(&user_id)
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        };

        let cursor = if entries.len() as i64 == limit {
            entries.last().map(|entry| entry.created_at.to_rfc3339())
        } else {
            None
        };

        let logins = entries
            .into_iter()
            .map(|entry| LoginSummary {
                login_id: entry.id,
                user_id: entry.user_id,
                is_valid: entry.is_valid,
                created_at: entry.created_at,
            })
            .collect();

        Ok(LoginHistoryPage { logins, cursor })
    }

    /// The login-vs-signup branch and its two writes, as one unit of work
    /// against the supplied transaction
    #[allow(clippy::too_many_arguments)]
    async fn upsert_session(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        existing: Option<Account>,
        identity: &VerifiedIdentity,
        name: &str,
        email: &str,
        email_hash: &str,
        req: &AuthenticateRequest,
        sealed_meta: Option<String>,
    ) -> AuthResult<BranchOutcome> {
        let now = Utc::now();

        let (method, account) = match existing {
            Some(account) => {
                sqlx::query(
                    "UPDATE account SET name = ?1, photo_url = ?2, fcm_token = ?3, updated_at = ?4
                     WHERE id = ?5",
                )
                .bind(name)
                .bind(&identity.photo_url)
                .bind(&req.fcm_token)
                .bind(now)
                .bind(&account.id)
                .execute(&mut **tx)
                .await?;

                let account = Account {
                    name: name.to_string(),
                    photo_url: identity.photo_url.clone(),
                    fcm_token: req.fcm_token.clone(),
                    updated_at: now,
                    ..account
                };
                (AuthMethod::Login, account)
            }
            None => {
                let account = Account {
                    id: Uuid::new_v4().to_string(),
                    email: email.to_string(),
                    email_hash: email_hash.to_string(),
                    name: name.to_string(),
                    photo_url: identity.photo_url.clone(),
                    description: None,
                    public_key: req.public_key.clone(),
                    fcm_token: req.fcm_token.clone(),
                    email_verified: identity.email_verified,
                    auth_provider: identity.provider.clone(),
                    locale: identity.locale.clone(),
                    created_at: now,
                    updated_at: now,
                };

                sqlx::query(
                    "INSERT INTO account (id, email, email_hash, name, photo_url, description, \
                     public_key, fcm_token, email_verified, auth_provider, locale, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                )
                .bind(&account.id)
                .bind(&account.email)
                .bind(&account.email_hash)
                .bind(&account.name)
                .bind(&account.photo_url)
                .bind(&account.description)
                .bind(&account.public_key)
                .bind(&account.fcm_token)
                .bind(account.email_verified)
                .bind(&account.auth_provider)
                .bind(&account.locale)
                .bind(account.created_at)
                .bind(account.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(map_unique_violation)?;

                (AuthMethod::Signup, account)
            }
        };

        let login = LoginHistoryEntry {
            id: Uuid::new_v4().to_string(),
            user_id: account.id.clone(),
            login_meta_data: sealed_meta,
            is_valid: true,
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO login_history (id, user_id, login_meta_data, is_valid, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&login.id)
        .bind(&login.user_id)
        .bind(&login.login_meta_data)
        .bind(login.is_valid)
        .bind(login.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(BranchOutcome {
            method,
            account,
            login,
        })
    }

    async fn find_account_by_email_hash(&self, email_hash: &str) -> AuthResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE email_hash = ?1"
        ))
        .bind(email_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn fetch_login(&self, login_id: &str) -> AuthResult<Option<LoginHistoryEntry>> {
        let entry = sqlx::query_as::<_, LoginHistoryEntry>(
            "SELECT id, user_id, login_meta_data, is_valid, created_at
             FROM login_history WHERE id = ?1",
        )
        .bind(login_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(entry)
    }

    fn seal_metadata(&self, meta: Option<&Value>) -> AuthResult<Option<String>> {
        // Absent metadata stays absent, never an empty-string blob
        match meta {
            Some(value) => Ok(Some(self.cipher.encrypt(&value.to_string())?)),
            None => Ok(None),
        }
    }
}

/// Entity ids are UUID strings; reject anything else before it reaches storage
fn parse_entity_id(raw: &str, field: &str) -> AuthResult<String> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| AuthError::InvalidArgument(format!("{field} is not a valid id")))
}

/// A unique-index violation on `account.email_hash` means a concurrent signup
/// won the race; surface it as Conflict rather than a storage failure
fn map_unique_violation(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return AuthError::Conflict("Account already exists for this identity".to_string());
        }
    }
    AuthError::Database(e)
}

fn profile_of(account: Account) -> UserProfile {
    UserProfile {
        user_id: account.id,
        name: account.name,
        email: account.email,
        photo_url: account.photo_url,
        description: account.description,
        email_verified: account.email_verified,
        created_at: account.created_at,
    }
}
