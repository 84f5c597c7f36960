use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Participation, ParticipationDetails};
use crate::services::challenge_service::{lock_challenge, save_participants};

const DETAILS_QUERY: &str = r#"
    SELECT p.*, u.username, u.email, c.title AS challenge_title
    FROM participations p
    JOIN users u ON u.id = p.user_id
    JOIN challenges c ON c.id = p.challenge_id
"#;

#[derive(Debug, Clone)]
pub struct ParticipationService {
    db: PgPool,
}

impl ParticipationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_all(&self) -> ApiResult<Vec<ParticipationDetails>> {
        let sql = format!("{} ORDER BY p.created_at DESC", DETAILS_QUERY);
        let rows = sqlx::query_as::<_, ParticipationDetails>(&sql)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> ApiResult<Vec<ParticipationDetails>> {
        let sql = format!("{} WHERE p.user_id = $1 ORDER BY p.created_at DESC", DETAILS_QUERY);
        let rows = sqlx::query_as::<_, ParticipationDetails>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    /// Participations in challenges the given user created.
    pub async fn list_for_creator(&self, creator_id: Uuid) -> ApiResult<Vec<ParticipationDetails>> {
        let sql = format!("{} WHERE c.creator_id = $1 ORDER BY p.created_at DESC", DETAILS_QUERY);
        let rows = sqlx::query_as::<_, ParticipationDetails>(&sql)
            .bind(creator_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    /// Leaves a challenge: the row and the embedded participant go together.
    #[tracing::instrument(skip(self))]
    pub async fn delete_own(&self, user_id: Uuid, participation_id: Uuid) -> ApiResult<()> {
        let participation = sqlx::query_as::<_, Participation>(
            "SELECT * FROM participations WHERE id = $1",
        )
        .bind(participation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Participation"))?;

        if participation.user_id != user_id {
            return Err(ApiError::Forbidden(
                "You can only delete your own participations".to_string(),
            ));
        }

        // Challenge row first, then participation, same as progress updates.
        let mut tx = self.db.begin().await?;
        let mut challenge = lock_challenge(&mut tx, participation.challenge_id).await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM participations WHERE id = $1 FOR UPDATE",
        )
        .bind(participation_id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(ApiError::not_found("Participation"));
        }

        if challenge.remove_participant(user_id) {
            save_participants(&mut tx, &challenge).await?;
        }

        sqlx::query("DELETE FROM participations WHERE id = $1")
            .bind(participation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(participation_id = %participation_id, "Deleted participation");
        Ok(())
    }
}
