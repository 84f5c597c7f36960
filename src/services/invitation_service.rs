use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::UserSession;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateInvitationRequest, Invitation, InvitationStatus};
use crate::services::challenge_service::{lock_challenge, withdraw_invited, ChallengeService};

/// Invitation records. State transitions go through the challenge flows so
/// the embedded participant list stays consistent.
#[derive(Debug, Clone)]
pub struct InvitationService {
    db: PgPool,
    challenges: ChallengeService,
}

impl InvitationService {
    pub fn new(db: PgPool, challenges: ChallengeService) -> Self {
        Self { db, challenges }
    }

    pub async fn create(&self, session: &UserSession, request: CreateInvitationRequest) -> ApiResult<Invitation> {
        self.challenges
            .invite(session.user_id, request.challenge_id, request.receiver_id)
            .await
    }

    pub async fn list_for(&self, session: &UserSession) -> ApiResult<Vec<Invitation>> {
        let invitations = if session.is_super_admin() {
            sqlx::query_as::<_, Invitation>("SELECT * FROM invitations ORDER BY created_at DESC")
                .fetch_all(&self.db)
                .await?
        } else {
            sqlx::query_as::<_, Invitation>(
                r#"
                SELECT * FROM invitations
                WHERE sender_id = $1 OR receiver_id = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(session.user_id)
            .fetch_all(&self.db)
            .await?
        };

        Ok(invitations)
    }

    pub async fn get_for(&self, session: &UserSession, id: Uuid) -> ApiResult<Invitation> {
        let invitation = self.find(id).await?;
        if !session.is_super_admin() && !invitation.involves(session.user_id) {
            return Err(ApiError::Forbidden("You are not part of this invitation".to_string()));
        }
        Ok(invitation)
    }

    /// Only the receiver answers. Accepting joins the challenge, declining
    /// removes them from it.
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn respond(&self, session: &UserSession, id: Uuid, status: InvitationStatus) -> ApiResult<Invitation> {
        let invitation = self.find(id).await?;
        if invitation.receiver_id != session.user_id {
            return Err(ApiError::Forbidden(
                "Only the receiver can respond to an invitation".to_string(),
            ));
        }
        if invitation.status != InvitationStatus::Pending {
            return Err(ApiError::BadRequest("This invitation was already answered".to_string()));
        }

        match status {
            InvitationStatus::Accepted => {
                self.challenges.accept(session.user_id, invitation.challenge_id).await?;
            }
            InvitationStatus::Declined => {
                self.challenges.refuse(session.user_id, invitation.challenge_id).await?;
            }
            InvitationStatus::Pending => {
                return Err(ApiError::BadRequest(
                    "Status must be either accepted or declined".to_string(),
                ))
            }
        }

        self.find(id).await
    }

    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn delete(&self, session: &UserSession, id: Uuid) -> ApiResult<()> {
        let invitation = self.find(id).await?;
        if invitation.sender_id != session.user_id && !session.is_super_admin() {
            return Err(ApiError::Forbidden(
                "Only the sender can delete this invitation".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        if invitation.status == InvitationStatus::Pending {
            lock_challenge(&mut tx, invitation.challenge_id).await?;
            // Another sender's pending invitation keeps the receiver invited.
            let others: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM invitations
                WHERE receiver_id = $1 AND challenge_id = $2 AND status = 'pending' AND id <> $3
                "#,
            )
            .bind(invitation.receiver_id)
            .bind(invitation.challenge_id)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if others == 0 {
                withdraw_invited(&mut tx, invitation.receiver_id, invitation.challenge_id).await?;
            }
        }
        sqlx::query("DELETE FROM invitations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(invitation_id = %id, "Deleted invitation");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> ApiResult<Invitation> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Invitation"))
    }
}
