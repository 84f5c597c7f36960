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
use crate::models::{
    ApiResponse, ApprovalRequest, AssignExerciseTypeRequest, ChangeGymRequest,
    CreateTrainingRoomRequest, SetDifficultyRequest, TrainingRoom, TrainingRoomDetails,
    UpdateTrainingRoomRequest,
};

const MANAGERS: &[UserRole] = &[UserRole::SuperAdmin, UserRole::GymOwner];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms).post(create_room))
        .route("/:id", get(get_room).put(update_room).delete(delete_room))
        .route("/:id/approve", patch(approve_room))
        .route("/:id/assign-exercise-type", patch(assign_exercise_type))
        .route("/:id/set-difficulty", patch(set_difficulty))
        .route("/:id/change-owner", patch(change_gym))
        .route_layer(middleware::from_fn(require_role(MANAGERS)))
}

async fn list_rooms(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<TrainingRoom>>>> {
    let rooms = state.training_rooms.list_rooms_for(&session).await?;
    Ok(Json(ApiResponse::list(rooms)))
}

async fn get_room(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<TrainingRoomDetails>>> {
    let room = state.training_rooms.get_room_details(&session, id).await?;
    Ok(Json(ApiResponse::ok(room)))
}

async fn create_room(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): JsonBody<CreateTrainingRoomRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TrainingRoom>>)> {
    request.validate()?;
    let room = state.training_rooms.create_room(&session, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(room).with_message("Training room created")),
    ))
}

async fn update_room(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<UpdateTrainingRoomRequest>,
) -> ApiResult<Json<ApiResponse<TrainingRoom>>> {
    request.validate()?;
    let room = state.training_rooms.update_room(&session, id, request).await?;
    Ok(Json(ApiResponse::ok(room)))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn delete_room(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.training_rooms.delete_room(&session, id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Training room deleted")))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn approve_room(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<ApprovalRequest>,
) -> ApiResult<Json<ApiResponse<TrainingRoom>>> {
    session.require_any(&[UserRole::SuperAdmin])?;
    let room = state.training_rooms.set_approval(id, request.is_approved).await?;
    Ok(Json(ApiResponse::ok(room)))
}

async fn assign_exercise_type(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<AssignExerciseTypeRequest>,
) -> ApiResult<Json<ApiResponse<TrainingRoom>>> {
    let room = state
        .training_rooms
        .assign_exercise_type(&session, id, request.exercise_type_id)
        .await?;
    Ok(Json(ApiResponse::ok(room)))
}

async fn set_difficulty(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<SetDifficultyRequest>,
) -> ApiResult<Json<ApiResponse<TrainingRoom>>> {
    let room = state
        .training_rooms
        .set_difficulty(&session, id, request.difficulty_level)
        .await?;
    Ok(Json(ApiResponse::ok(room)))
}

async fn change_gym(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<ChangeGymRequest>,
) -> ApiResult<Json<ApiResponse<TrainingRoom>>> {
    let room = state.training_rooms.change_gym(&session, id, request).await?;
    Ok(Json(ApiResponse::ok(room)))
}
