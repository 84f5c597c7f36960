use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::{AppState, IdPath, JsonBody};
use crate::auth::{require_role, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    ApiResponse, CreateExerciseTypeRequest, ExerciseType, TrainingRoom, UpdateExerciseTypeRequest,
};

const ADMIN: &[UserRole] = &[UserRole::SuperAdmin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_types).post(create_type))
        .route("/by-muscle/:muscle", get(types_by_muscle))
        .route("/:id", get(get_type).put(update_type).delete(delete_type))
        .route("/:id/training-rooms", get(rooms_for_type))
        .route_layer(middleware::from_fn(require_role(ADMIN)))
}

async fn list_types(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<ExerciseType>>>> {
    let types = state.exercise_types.list().await?;
    Ok(Json(ApiResponse::list(types)))
}

async fn get_type(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<ExerciseType>>> {
    let exercise_type = state.exercise_types.get(id).await?;
    Ok(Json(ApiResponse::ok(exercise_type)))
}

async fn types_by_muscle(
    State(state): State<AppState>,
    WithRejection(Path(muscle), _): WithRejection<Path<String>, ApiError>,
) -> ApiResult<Json<ApiResponse<Vec<ExerciseType>>>> {
    let types = state.exercise_types.find_by_muscle(&muscle).await?;
    Ok(Json(ApiResponse::list(types)))
}

async fn rooms_for_type(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Vec<TrainingRoom>>>> {
    let rooms = state.exercise_types.training_rooms(id).await?;
    Ok(Json(ApiResponse::list(rooms)))
}

#[tracing::instrument(skip(state, request))]
async fn create_type(
    State(state): State<AppState>,
    WithRejection(Json(request), _): JsonBody<CreateExerciseTypeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ExerciseType>>)> {
    request.validate()?;
    let exercise_type = state.exercise_types.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(exercise_type).with_message("Exercise type created")),
    ))
}

async fn update_type(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<UpdateExerciseTypeRequest>,
) -> ApiResult<Json<ApiResponse<ExerciseType>>> {
    request.validate_all()?;
    let exercise_type = state.exercise_types.update(id, request).await?;
    Ok(Json(ApiResponse::ok(exercise_type)))
}

#[tracing::instrument(skip(state))]
async fn delete_type(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.exercise_types.delete(id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Exercise type deleted")))
}
