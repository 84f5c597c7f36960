use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{delete, get, patch, post, put},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::{AppState, IdPath, JsonBody, QueryParams};
use crate::auth::{require_role, UserRole, UserSession};
use crate::error::ApiResult;
use crate::models::{
    AdminUpdateUserRequest, ApiResponse, CreateUserRequest, UpdateOwnAccountRequest,
    UserListQuery, UserListResponse, UserResponse, UserStatistics,
};

const ADMIN: &[UserRole] = &[UserRole::SuperAdmin];

/// User administration (super admin) plus self-service account edits.
pub fn routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list_users))
        .route("/stats", get(user_statistics))
        .route("/create-client", post(create_client))
        .route("/create-gym-owner", post(create_gym_owner))
        .route("/create-admin", post(create_admin))
        .route("/:id", get(get_user).put(update_user).delete(soft_delete_user))
        .route("/:id/activate", patch(activate_user))
        .route("/:id/deactivate", patch(deactivate_user))
        .route("/:id/permanent", delete(permanent_delete_user))
        .route_layer(middleware::from_fn(require_role(ADMIN)));

    Router::new().route("/me", put(update_me)).merge(admin)
}

#[tracing::instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<UserListQuery>,
) -> ApiResult<Json<ApiResponse<UserListResponse>>> {
    let users = state.users.list_users(&query).await?;
    Ok(Json(ApiResponse::ok(users)))
}

async fn user_statistics(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<UserStatistics>>> {
    let stats = state.users.statistics().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state.users.get_user(id).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

async fn create_client(
    state: State<AppState>,
    body: JsonBody<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    create_with_role(state, body, UserRole::Client).await
}

async fn create_gym_owner(
    state: State<AppState>,
    body: JsonBody<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    create_with_role(state, body, UserRole::GymOwner).await
}

async fn create_admin(
    state: State<AppState>,
    body: JsonBody<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    create_with_role(state, body, UserRole::SuperAdmin).await
}

#[tracing::instrument(skip(state, request))]
async fn create_with_role(
    State(state): State<AppState>,
    WithRejection(Json(request), _): JsonBody<CreateUserRequest>,
    role: UserRole,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    request.validate()?;
    let user = state.users.create_user(request, role).await?;
    let message = format!("{} account created", role);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(user)).with_message(message)),
    ))
}

#[tracing::instrument(skip(state, session, request), fields(actor_id = %session.user_id))]
async fn update_user(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<AdminUpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    request.validate()?;
    let user = state.users.admin_update(session.user_id, id, request).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

async fn activate_user(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state.users.set_active(session.user_id, id, true).await?;
    Ok(Json(ApiResponse::ok(user.into()).with_message("User activated")))
}

async fn deactivate_user(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let user = state.users.set_active(session.user_id, id, false).await?;
    Ok(Json(ApiResponse::ok(user.into()).with_message("User deactivated")))
}

#[tracing::instrument(skip(state, session), fields(actor_id = %session.user_id))]
async fn soft_delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.users.soft_delete(session.user_id, id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("User deleted")))
}

#[tracing::instrument(skip(state, session), fields(actor_id = %session.user_id))]
async fn permanent_delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.users.permanent_delete(session.user_id, id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("User permanently deleted")))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn update_me(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): JsonBody<UpdateOwnAccountRequest>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    request.validate()?;
    let user = state.users.update_own_account(session.user_id, request).await?;
    Ok(Json(ApiResponse::ok(user.into()).with_message("Account updated")))
}
