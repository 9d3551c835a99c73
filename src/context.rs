/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    db,
    error::AuthResult,
    identity::{GoogleVerifier, IdentityVerifier},
    session::SessionEngine,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub session_engine: Arc<SessionEngine>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AuthResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize storage
        let db = db::create_pool(&config.storage.database_url, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        // Production identity verifier; tests inject a fake at the trait seam
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(GoogleVerifier::new(
            config.identity.google_client_id.clone(),
            config.identity.tokeninfo_url.clone(),
        ));

        let session_engine = Arc::new(SessionEngine::new(
            db.clone(),
            Arc::clone(&config),
            verifier,
        )?);

        Ok(Self {
            config,
            db,
            session_engine,
        })
    }
}
