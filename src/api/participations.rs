use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get},
    Extension, Router,
};
use axum_extra::extract::WithRejection;

use super::{AppState, IdPath};
use crate::auth::{UserRole, UserSession};
use crate::error::ApiResult;
use crate::models::{ApiResponse, ParticipationDetails};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all))
        .route("/me", get(list_mine))
        .route("/gym-owner/mine", get(list_for_my_challenges))
        .route("/:id", delete(delete_participation))
}

async fn list_all(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<ParticipationDetails>>>> {
    session.require_any(&[UserRole::SuperAdmin])?;
    let participations = state.participations.list_all().await?;
    Ok(Json(ApiResponse::list(participations)))
}

async fn list_mine(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<ParticipationDetails>>>> {
    let participations = state.participations.list_for_user(session.user_id).await?;
    Ok(Json(ApiResponse::list(participations)))
}

async fn list_for_my_challenges(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<ParticipationDetails>>>> {
    session.require_any(&[UserRole::GymOwner])?;
    let participations = state.participations.list_for_creator(session.user_id).await?;
    Ok(Json(ApiResponse::list(participations)))
}

async fn delete_participation(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.participations.delete_own(session.user_id, id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Participation deleted")))
}
