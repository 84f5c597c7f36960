use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    response::Json,
    routing::{get, post},
    Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::{AppState, JsonBody};
use crate::auth::{extract_bearer_token, AuthError, Claims, LoginRequest, LoginResponse};
use crate::error::ApiResult;
use crate::models::ApiResponse;

/// Public authentication routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signin", post(signin))
        .route("/verify-token", get(verify_token))
}

#[tracing::instrument(skip(state, request))]
async fn signin(
    State(state): State<AppState>,
    WithRejection(Json(request), _): JsonBody<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    request.validate()?;
    let response = state.auth.login(request).await?;
    Ok(Json(ApiResponse::ok(response).with_message("Signed in")))
}

#[tracing::instrument(skip(state, headers))]
async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ApiResponse<Claims>>> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let claims = state.auth.verify_token(token)?;
    Ok(Json(ApiResponse::ok(claims)))
}
