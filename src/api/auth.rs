/// Authentication endpoints
use crate::{
    api::{middleware, ApiResponse},
    context::AppContext,
    error::AuthResult,
    session::{
        AuthenticateData, AuthenticateRequest, RefreshTokenRequest, SignoutRequest,
        UpdateFcmTokenRequest,
    },
};
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::Serialize;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/authenticate", post(authenticate))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/signout", post(signout))
        .route("/auth/fcm-token", post(update_fcm_token))
}

/// Authenticate endpoint: verifies the identity token and establishes a
/// session, creating the account on first contact
async fn authenticate(
    State(ctx): State<AppContext>,
    Json(req): Json<AuthenticateRequest>,
) -> AuthResult<Json<ApiResponse<AuthenticateData>>> {
    let data = ctx.session_engine.authenticate(req).await?;
    Ok(Json(ApiResponse::success(data)))
}

#[derive(Debug, Serialize)]
struct RefreshTokenData {
    token: String,
}

/// Refresh endpoint: rotates a bearer token for a still-valid session
async fn refresh_token(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshTokenRequest>,
) -> AuthResult<Json<ApiResponse<RefreshTokenData>>> {
    let token = ctx.session_engine.refresh_token(req).await?;
    Ok(Json(ApiResponse::success(RefreshTokenData { token })))
}

/// Signout endpoint
async fn signout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<SignoutRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    middleware::require_auth(&headers, &ctx.config)?;

    ctx.session_engine.signout(req).await?;
    Ok(Json(ApiResponse::ok()))
}

/// Push-token rotation endpoint
async fn update_fcm_token(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<UpdateFcmTokenRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    middleware::require_auth(&headers, &ctx.config)?;

    ctx.session_engine.update_fcm_token(req).await?;
    Ok(Json(ApiResponse::ok()))
}
