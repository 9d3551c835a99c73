/// API routes and handlers
pub mod auth;
pub mod middleware;
pub mod user;

use crate::context::AppContext;
use axum::Router;
use serde::Serialize;

/// Wire status marker for successful responses
#[derive(Debug, Clone, Copy, Serialize)]
pub enum ResponseStatus {
    #[serde(rename = "SUCCESS")]
    Success,
}

/// Success envelope wrapping every handler payload
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Status-only success marker
    pub fn ok() -> Self {
        Self {
            status: ResponseStatus::Success,
            data: None,
        }
    }
}

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new().merge(auth::routes()).merge(user::routes())
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{
            Environment, IdentityConfig, LoggingConfig, SecretConfig, ServerConfig, ServiceConfig,
            StorageConfig,
        },
        context::AppContext,
        identity::StaticVerifier,
        session::SessionEngine,
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> ServerConfig {
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
                encrypt_key: hex::encode([3u8; 32]),
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

    async fn test_app() -> Router {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        let config = Arc::new(test_config());
        let engine = SessionEngine::new(
            db.clone(),
            Arc::clone(&config),
            Arc::new(StaticVerifier::for_user("A", "a@x.com")),
        )
        .unwrap();

        crate::server::build_router(AppContext {
            config,
            db,
            session_engine: Arc::new(engine),
        })
    }

    async fn post_json(
        app: &Router,
        uri: &str,
        body: Value,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = app
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    fn authenticate_body() -> Value {
        json!({
            "token": "id-token",
            "publicKey": "pk-1",
            "fcmToken": "fcm-1",
            "clientMetaData": {"device": "pixel-8"}
        })
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn authenticate_signs_up_then_logs_in() {
        let app = test_app().await;

        let (status, body) = post_json(&app, "/auth/authenticate", authenticate_body(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "SUCCESS");
        assert_eq!(body["data"]["method"], "SIGNUP");
        // Signup does not echo the key the caller just supplied
        assert!(body["data"]["user"].get("publicKey").is_none());
        assert_eq!(body["data"]["loginInfo"]["loginMetaData"]["device"], "pixel-8");

        let (status, body) = post_json(&app, "/auth/authenticate", authenticate_body(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["method"], "LOGIN");
        assert_eq!(body["data"]["user"]["publicKey"], "pk-1");
    }

    #[tokio::test]
    async fn empty_fields_map_to_invalid_argument() {
        let app = test_app().await;

        let (status, body) = post_json(
            &app,
            "/auth/authenticate",
            json!({"token": "", "publicKey": "pk", "fcmToken": "fcm"}),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidArgument");
    }

    #[tokio::test]
    async fn signout_requires_bearer_and_is_idempotent_to_failure() {
        let app = test_app().await;

        let (_, auth) = post_json(&app, "/auth/authenticate", authenticate_body(), None).await;
        let token = auth["data"]["user"]["token"].as_str().unwrap().to_string();
        let signout_body = json!({
            "loginId": auth["data"]["loginInfo"]["loginId"],
            "userId": auth["data"]["user"]["userId"],
        });

        let (status, body) = post_json(&app, "/auth/signout", signout_body.clone(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthenticated");

        let (status, body) =
            post_json(&app, "/auth/signout", signout_body.clone(), Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "SUCCESS");

        let (status, body) = post_json(&app, "/auth/signout", signout_body, Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");
    }

    #[tokio::test]
    async fn refresh_token_round_trip() {
        let app = test_app().await;

        let (_, auth) = post_json(&app, "/auth/authenticate", authenticate_body(), None).await;
        let refresh_body = json!({
            "loginId": auth["data"]["loginInfo"]["loginId"],
            "userId": auth["data"]["user"]["userId"],
        });

        let (status, body) = post_json(&app, "/auth/refresh-token", refresh_body, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_info_returns_decrypted_metadata() {
        let app = test_app().await;

        let (_, auth) = post_json(&app, "/auth/authenticate", authenticate_body(), None).await;
        let token = auth["data"]["user"]["token"].as_str().unwrap().to_string();
        let lookup_body = json!({
            "loginId": auth["data"]["loginInfo"]["loginId"],
            "userId": auth["data"]["user"]["userId"],
        });

        let (status, body) = post_json(&app, "/users/login-info", lookup_body, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["userLoginInfo"]["loginMetaData"]["device"],
            "pixel-8"
        );
        assert_eq!(body["data"]["userLoginInfo"]["isValid"], true);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
