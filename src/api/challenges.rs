use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use validator::Validate;

use super::{AppState, IdPath, JsonBody, QueryParams};
use crate::auth::{UserRole, UserSession};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    ApiResponse, Challenge, ChallengeFilters, CreateChallengeRequest, Invitation,
    InviteUserRequest, ProgressResponse, ProgressUpdate, SessionHistory, ShareChallengeRequest,
};

const CLIENT: &[UserRole] = &[UserRole::Client];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_challenges).post(create_challenge))
        .route("/mine", get(my_challenges))
        .route("/invitations/me", get(my_invitations))
        .route("/invitations/:user_id", get(user_invitations))
        .route("/:id", get(get_challenge).delete(delete_challenge))
        .route("/:id/participate", post(participate))
        .route("/:id/progress", patch(update_progress).post(update_progress))
        .route("/:id/sessions", get(session_history))
        .route("/:id/share", post(share_challenge))
        .route("/:id/invite", post(invite_user))
        .route("/:id/accept", post(accept_invitation))
        .route("/:id/refuse", post(refuse_invitation))
}

async fn list_challenges(
    State(state): State<AppState>,
    WithRejection(Query(filters), _): QueryParams<ChallengeFilters>,
) -> ApiResult<Json<ApiResponse<Vec<Challenge>>>> {
    let challenges = state.challenges.list(&filters).await?;
    Ok(Json(ApiResponse::list(challenges)))
}

async fn my_challenges(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<Challenge>>>> {
    let challenges = state.challenges.created_by(session.user_id).await?;
    Ok(Json(ApiResponse::list(challenges)))
}

async fn my_invitations(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<ApiResponse<Vec<Challenge>>>> {
    let challenges = state.challenges.pending_invitations(session.user_id).await?;
    Ok(Json(ApiResponse::list(challenges)))
}

async fn user_invitations(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(user_id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Vec<Challenge>>>> {
    if user_id != session.user_id && !session.is_super_admin() {
        return Err(ApiError::Forbidden(
            "You can only list your own invitations".to_string(),
        ));
    }
    let challenges = state.challenges.pending_invitations(user_id).await?;
    Ok(Json(ApiResponse::list(challenges)))
}

async fn get_challenge(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Challenge>>> {
    let challenge = state.challenges.get(id).await?;
    Ok(Json(ApiResponse::ok(challenge)))
}

async fn create_challenge(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): JsonBody<CreateChallengeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Challenge>>)> {
    request.validate()?;
    let challenge = state.challenges.create(&session, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(challenge).with_message("Challenge created")),
    ))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn delete_challenge(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.challenges.delete(&session, id).await?;
    Ok(Json(ApiResponse::ok(()).with_message("Challenge deleted")))
}

async fn participate(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<(StatusCode, Json<ApiResponse<Challenge>>)> {
    session.require_any(CLIENT)?;
    let challenge = state.challenges.participate(session.user_id, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(challenge).with_message("Joined challenge")),
    ))
}

async fn update_progress(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(update), _): JsonBody<ProgressUpdate>,
) -> ApiResult<Json<ApiResponse<ProgressResponse>>> {
    session.require_any(CLIENT)?;
    update.validate()?;
    let response = state.challenges.update_progress(session.user_id, id, update).await?;
    Ok(Json(ApiResponse::ok(response)))
}

async fn session_history(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<SessionHistory>>> {
    session.require_any(CLIENT)?;
    let history = state.challenges.sessions(session.user_id, id).await?;
    Ok(Json(ApiResponse::ok(history)))
}

async fn share_challenge(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<ShareChallengeRequest>,
) -> ApiResult<Json<ApiResponse<Challenge>>> {
    let challenge = state
        .challenges
        .share(session.user_id, id, &request.user_ids)
        .await?;
    Ok(Json(ApiResponse::ok(challenge).with_message("Challenge shared")))
}

async fn invite_user(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(request), _): JsonBody<InviteUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Invitation>>)> {
    let invitation = state
        .challenges
        .invite(session.user_id, id, request.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(invitation).with_message("Invitation sent")),
    ))
}

async fn accept_invitation(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Challenge>>> {
    let challenge = state.challenges.accept(session.user_id, id).await?;
    Ok(Json(ApiResponse::ok(challenge).with_message("Invitation accepted")))
}

async fn refuse_invitation(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<Json<ApiResponse<Challenge>>> {
    let challenge = state.challenges.refuse(session.user_id, id).await?;
    Ok(Json(ApiResponse::ok(challenge).with_message("Invitation refused")))
}
