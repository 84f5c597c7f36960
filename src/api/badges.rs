use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::{AppState, IdPath, JsonBody};
use crate::auth::{UserRole, UserSession};
use crate::error::ApiResult;
use crate::models::{ApiResponse, Badge, BadgeWithStatus, CreateBadgeRequest, EarnedBadge, UpdateBadgeRequest};

const ADMIN: &[UserRole] = &[UserRole::SuperAdmin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_badges).post(create_badge))
        .route("/user/my-badges", get(my_badges))
        .route("/user/all-with-status", get(all_with_status))
        .route("/user/evaluate", post(evaluate_badges))
        .route("/:id", get(get_badge).put(update_badge).delete(delete_badge))
}

async fn list_badges(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Badge>>>> {
    let badges = state.badges.list().await?;
    Ok(Json(ApiResponse::list(badges)))
}

async fn get_badge(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Badge>>> {
    let badge = state.badges.get(id).await?;
    Ok(Json(ApiResponse::ok(badge)))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn create_badge(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): JsonBody<CreateBadgeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Badge>>)> {
    session.require_any(ADMIN)?;
    request.validate()?;
    let badge = state.badges.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(badge).with_message("Badge created"))))
}

async fn update_badge(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<UpdateBadgeRequest>,
) -> ApiResult<Json<ApiResponse<Badge>>> {
    session.require_any(ADMIN)?;
    request.validate()?;
    let badge = state.badges.update(id, request).await?;
    Ok(Json(ApiResponse::ok(badge)))
}

async fn delete_badge(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    session.require_any(ADMIN)?;
    state.badges.delete(id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Badge deleted")))
}

async fn my_badges(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<EarnedBadge>>>> {
    let badges = state.badges.earned_badges(session.user_id).await?;
    Ok(Json(ApiResponse::list(badges)))
}

async fn all_with_status(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<BadgeWithStatus>>>> {
    let badges = state.badges.all_with_status(session.user_id).await?;
    Ok(Json(ApiResponse::list(badges)))
}

async fn evaluate_badges(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<EarnedBadge>>>> {
    let awarded = state.badges.evaluate_and_award(session.user_id).await?;
    let message = format!("{} new badge(s) awarded", awarded.len());
    Ok(Json(ApiResponse::list(awarded).with_message(message)))
}
