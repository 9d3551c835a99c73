/// keygate - authentication/session microservice
///
/// Authenticates users via third-party identity tokens, maintains account
/// and login-history records, and issues signed session tokens.

mod api;
mod config;
mod context;
mod crypto;
mod db;
mod error;
mod identity;
mod server;
mod session;

use config::ServerConfig;
use context::AppContext;
use error::AuthResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AuthResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; missing secrets fail here, never per-request
    let config = ServerConfig::from_env()?;

    tracing::info!(
        environment = ?config.storage.environment,
        "keygate v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
