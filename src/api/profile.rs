use axum::{extract::State, response::Json, routing::get, Extension, Router};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use super::{AppState, JsonBody};
use crate::auth::UserSession;
use crate::error::ApiResult;
use crate::models::{ApiResponse, EarnedBadge, UpdateProfileRequest, UserResponse, UserThemeInfo};

#[derive(Debug, Serialize)]
pub struct ProfileStats {
    pub total_badges: usize,
    pub score: i64,
    pub member_since: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub badges: Vec<EarnedBadge>,
    pub theme: UserThemeInfo,
    pub stats: ProfileStats,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(get_profile).put(update_profile))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<ProfileResponse>>> {
    let user = state.users.get_user(session.user_id).await?;
    let badges = state.badges.earned_badges(user.id).await?;
    let theme = state.themes.theme_for_user(user.id).await?;

    let stats = ProfileStats {
        total_badges: badges.len(),
        score: user.score,
        member_since: user.created_at,
    };

    Ok(Json(ApiResponse::ok(ProfileResponse {
        user: user.into(),
        badges,
        theme,
        stats,
    })))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): JsonBody<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let request = request.normalized();
    request.validate()?;
    let user = state.users.update_profile(session.user_id, request).await?;
    Ok(Json(ApiResponse::ok(user.into()).with_message("Profile updated")))
}
