/// User lookup endpoints
use crate::{
    api::{middleware, ApiResponse},
    context::AppContext,
    error::AuthResult,
    session::{
        AllUsersRequest, LoginHistoryPage, LoginHistoryRequest, UserDetailsRequest, UserLoginInfo,
        UserLoginInfoRequest, UserProfile,
    },
};
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::Serialize;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users/login-info", post(get_user_login_info))
        .route("/users/details", post(get_user_details))
        .route("/users/all", post(get_all_users))
        .route("/users/login-history", post(get_user_login_history))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserLoginInfoData {
    user_login_info: UserLoginInfo,
}

/// Decrypted login-info lookup
async fn get_user_login_info(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<UserLoginInfoRequest>,
) -> AuthResult<Json<ApiResponse<UserLoginInfoData>>> {
    middleware::require_auth(&headers, &ctx.config)?;

    let user_login_info = ctx.session_engine.get_user_login_info(req).await?;
    Ok(Json(ApiResponse::success(UserLoginInfoData {
        user_login_info,
    })))
}

#[derive(Debug, Serialize)]
struct UserDetailsData {
    user: UserProfile,
}

/// Single-profile lookup
async fn get_user_details(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<UserDetailsRequest>,
) -> AuthResult<Json<ApiResponse<UserDetailsData>>> {
    middleware::require_auth(&headers, &ctx.config)?;

    let user = ctx.session_engine.get_user_details(req).await?;
    Ok(Json(ApiResponse::success(UserDetailsData { user })))
}

#[derive(Debug, Serialize)]
struct AllUsersData {
    users: Vec<UserProfile>,
}

/// Directory listing
async fn get_all_users(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<AllUsersRequest>,
) -> AuthResult<Json<ApiResponse<AllUsersData>>> {
    middleware::require_auth(&headers, &ctx.config)?;

    let users = ctx.session_engine.get_all_users(req).await?;
    Ok(Json(ApiResponse::success(AllUsersData { users })))
}

/// Paged login-history listing
async fn get_user_login_history(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<LoginHistoryRequest>,
) -> AuthResult<Json<ApiResponse<LoginHistoryPage>>> {
    middleware::require_auth(&headers, &ctx.config)?;

    let page = ctx.session_engine.get_user_login_history(req).await?;
    Ok(Json(ApiResponse::success(page)))
}
