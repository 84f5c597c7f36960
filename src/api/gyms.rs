use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, patch},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::{AppState, IdPath, JsonBody};
use crate::auth::{require_role, UserRole, UserSession};
use crate::error::ApiResult;
use crate::models::{ApiResponse, ApprovalRequest, CreateGymRequest, Gym, GymWithRooms, UpdateGymRequest};

const MANAGERS: &[UserRole] = &[UserRole::SuperAdmin, UserRole::GymOwner];
const ADMIN: &[UserRole] = &[UserRole::SuperAdmin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_gyms).post(create_gym))
        .route("/full", get(list_gyms_full))
        .route("/:id", get(get_gym).put(update_gym).delete(delete_gym))
        .route("/:id/full", get(get_gym_full))
        .route("/:id/approve", patch(approve_gym))
        .route_layer(middleware::from_fn(require_role(MANAGERS)))
}

async fn list_gyms(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<Gym>>>> {
    let gyms = state.gyms.list_gyms_for(&session).await?;
    Ok(Json(ApiResponse::list(gyms)))
}

async fn list_gyms_full(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<GymWithRooms>>>> {
    let gyms = state.gyms.list_gyms_with_rooms_for(&session).await?;
    Ok(Json(ApiResponse::list(gyms)))
}

async fn get_gym(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Gym>>> {
    let gym = state.gyms.get_gym_for(&session, id).await?;
    Ok(Json(ApiResponse::ok(gym)))
}

async fn get_gym_full(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<GymWithRooms>>> {
    let gym = state.gyms.get_gym_with_rooms_for(&session, id).await?;
    Ok(Json(ApiResponse::ok(gym)))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn create_gym(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): JsonBody<CreateGymRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Gym>>)> {
    session.require_any(ADMIN)?;
    request.validate()?;
    let gym = state.gyms.create_gym(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(gym).with_message("Gym created"))))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn update_gym(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<UpdateGymRequest>,
) -> ApiResult<Json<ApiResponse<Gym>>> {
    session.require_any(ADMIN)?;
    request.validate()?;
    let gym = state.gyms.update_gym(id, request).await?;
    Ok(Json(ApiResponse::ok(gym)))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn delete_gym(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    session.require_any(ADMIN)?;
    state.gyms.delete_gym(id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Gym deleted")))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn approve_gym(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<ApprovalRequest>,
) -> ApiResult<Json<ApiResponse<Gym>>> {
    session.require_any(ADMIN)?;
    let gym = state.gyms.set_approval(id, request.is_approved).await?;
    Ok(Json(ApiResponse::ok(gym)))
}
