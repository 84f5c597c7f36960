use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::{AppState, IdPath, JsonBody};
use crate::auth::{UserRole, UserSession};
use crate::error::ApiResult;
use crate::models::{ApiResponse, CreateThemeRequest, Theme, UpdateThemeRequest, UserThemeInfo};

const ADMIN: &[UserRole] = &[UserRole::SuperAdmin];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_themes).post(create_theme))
        .route("/my-theme", get(my_theme))
        .route("/user/:user_id", get(theme_for_user))
        .route("/:id", get(get_theme).put(update_theme).delete(delete_theme))
}

async fn my_theme(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<UserThemeInfo>>> {
    let theme = state.themes.theme_for_user(session.user_id).await?;
    Ok(Json(ApiResponse::ok(theme)))
}

async fn theme_for_user(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): IdPath,
) -> ApiResult<Json<ApiResponse<UserThemeInfo>>> {
    state.users.get_user(user_id).await?;
    let theme = state.themes.theme_for_user(user_id).await?;
    Ok(Json(ApiResponse::ok(theme)))
}

async fn list_themes(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<Theme>>>> {
    session.require_any(ADMIN)?;
    let themes = state.themes.list().await?;
    Ok(Json(ApiResponse::list(themes)))
}

async fn get_theme(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Theme>>> {
    session.require_any(ADMIN)?;
    let theme = state.themes.get(id).await?;
    Ok(Json(ApiResponse::ok(theme)))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn create_theme(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): JsonBody<CreateThemeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Theme>>)> {
    session.require_any(ADMIN)?;
    request.validate()?;
    let theme = state.themes.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(theme).with_message("Theme created"))))
}

async fn update_theme(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<UpdateThemeRequest>,
) -> ApiResult<Json<ApiResponse<Theme>>> {
    session.require_any(ADMIN)?;
    request.validate()?;
    let theme = state.themes.update(id, request).await?;
    Ok(Json(ApiResponse::ok(theme)))
}

async fn delete_theme(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    session.require_any(ADMIN)?;
    state.themes.delete(id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Theme deleted")))
}
