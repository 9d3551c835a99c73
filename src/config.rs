/// Configuration management for keygate
use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub secrets: SecretConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Deployment environment selecting the storage connection string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Dev,
    Prod,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub environment: Environment,
    pub database_url: String,
}

/// Server-held key material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretConfig {
    /// HS256 signing secret for session tokens
    pub jwt_secret: String,
    /// Hex-encoded 32-byte AEAD key for client metadata blobs
    pub encrypt_key: String,
    /// Keyed-hash key for email indexing
    pub hash_key: String,
}

/// Identity-provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Expected audience of incoming identity tokens
    pub google_client_id: String,
    /// Token introspection endpoint
    pub tokeninfo_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AuthResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "50051".to_string())
            .parse()
            .map_err(|_| AuthError::Validation("Invalid port number".to_string()))?;
        let version = env::var("SERVICE_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let environment = match env::var("ENV").as_deref() {
            Ok("prod") => Environment::Prod,
            Ok("dev") | Err(_) => Environment::Dev,
            Ok(other) => {
                return Err(AuthError::Validation(format!("Unknown ENV value: {other}")))
            }
        };
        let database_url = match environment {
            Environment::Dev => env::var("DEV_DATABASE_URL")
                .map_err(|_| AuthError::Validation("DEV_DATABASE_URL required".to_string()))?,
            Environment::Prod => env::var("PROD_DATABASE_URL")
                .map_err(|_| AuthError::Validation("PROD_DATABASE_URL required".to_string()))?,
        };

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AuthError::Validation("JWT_SECRET required".to_string()))?;
        let encrypt_key = env::var("ENCRYPT_KEY")
            .map_err(|_| AuthError::Validation("ENCRYPT_KEY required".to_string()))?;
        let hash_key = env::var("HASH_KEY")
            .map_err(|_| AuthError::Validation("HASH_KEY required".to_string()))?;

        let google_client_id = env::var("GOOGLE_CLIENT_ID")
            .map_err(|_| AuthError::Validation("GOOGLE_CLIENT_ID required".to_string()))?;
        let tokeninfo_url = env::var("GOOGLE_TOKENINFO_URL")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com/tokeninfo".to_string());

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                environment,
                database_url,
            },
            secrets: SecretConfig {
                jwt_secret,
                encrypt_key,
                hash_key,
            },
            identity: IdentityConfig {
                google_client_id,
                tokeninfo_url,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AuthError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.secrets.jwt_secret.len() < 32 {
            return Err(AuthError::Validation(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        match hex::decode(&self.secrets.encrypt_key) {
            Ok(raw) if raw.len() == 32 => {}
            _ => {
                return Err(AuthError::Validation(
                    "ENCRYPT_KEY must be 64 hex characters (32 bytes)".to_string(),
                ))
            }
        }

        if self.secrets.hash_key.is_empty() {
            return Err(AuthError::Validation("HASH_KEY cannot be empty".to_string()));
        }

        if self.identity.google_client_id.is_empty() {
            return Err(AuthError::Validation(
                "GOOGLE_CLIENT_ID cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 50051,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                environment: Environment::Dev,
                database_url: "sqlite::memory:".to_string(),
            },
            secrets: SecretConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123".to_string(),
                encrypt_key: hex::encode([7u8; 32]),
                hash_key: "test-hash-key".to_string(),
            },
            identity: IdentityConfig {
                google_client_id: "test-client".to_string(),
                tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let mut config = base_config();
        config.secrets.jwt_secret = "short".to_string();
        assert!(matches!(config.validate(), Err(AuthError::Validation(_))));
    }

    #[test]
    fn rejects_malformed_encrypt_key() {
        let mut config = base_config();
        config.secrets.encrypt_key = "not-hex".to_string();
        assert!(config.validate().is_err());

        config.secrets.encrypt_key = hex::encode([1u8; 16]); // wrong length
        assert!(config.validate().is_err());
    }
}
