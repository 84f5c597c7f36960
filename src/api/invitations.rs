use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use axum_extra::extract::WithRejection;

use super::{AppState, IdPath, JsonBody};
use crate::auth::UserSession;
use crate::error::ApiResult;
use crate::models::{ApiResponse, CreateInvitationRequest, Invitation, RespondInvitationRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invitations).post(create_invitation))
        .route(
            "/:id",
            get(get_invitation).put(respond_invitation).delete(delete_invitation),
        )
}

async fn create_invitation(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): JsonBody<CreateInvitationRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Invitation>>)> {
    let invitation = state.invitations.create(&session, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(invitation).with_message("Invitation sent")),
    ))
}

async fn list_invitations(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<Invitation>>>> {
    let invitations = state.invitations.list_for(&session).await?;
    Ok(Json(ApiResponse::list(invitations)))
}

async fn get_invitation(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Invitation>>> {
    let invitation = state.invitations.get_for(&session, id).await?;
    Ok(Json(ApiResponse::ok(invitation)))
}

async fn respond_invitation(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<RespondInvitationRequest>,
) -> ApiResult<Json<ApiResponse<Invitation>>> {
    let invitation = state.invitations.respond(&session, id, request.status).await?;
    Ok(Json(ApiResponse::ok(invitation)))
}

async fn delete_invitation(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.invitations.delete(&session, id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Invitation deleted")))
}
