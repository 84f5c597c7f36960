use chrono::Utc;
use serde_json::json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{UserRole, UserSession};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Challenge, ChallengeFilters, CreateChallengeRequest, Invitation, InvitationStatus, Participation,
    ParticipationStatus, ProgressResponse, ProgressTracker, ProgressUpdate, SessionHistory,
};
use crate::services::badge_service::BadgeService;
use crate::services::user_service;

/// Challenges with their embedded participant list, plus the flows that
/// keep that list and the participations table in step.
#[derive(Debug, Clone)]
pub struct ChallengeService {
    db: PgPool,
    badges: BadgeService,
}

impl ChallengeService {
    pub fn new(db: PgPool, badges: BadgeService) -> Self {
        Self { db, badges }
    }

    pub async fn list(&self, filters: &ChallengeFilters) -> ApiResult<Vec<Challenge>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM challenges WHERE TRUE");
        if let Some(level) = filters.difficulty_level {
            query.push(" AND difficulty_level = ").push_bind(level);
        }
        if let Some(gym_id) = filters.gym_id {
            query.push(" AND gym_id = ").push_bind(gym_id);
        }
        query.push(" ORDER BY created_at DESC");

        let challenges = query.build_query_as::<Challenge>().fetch_all(&self.db).await?;
        Ok(challenges)
    }

    pub async fn created_by(&self, user_id: Uuid) -> ApiResult<Vec<Challenge>> {
        let challenges = sqlx::query_as::<_, Challenge>(
            "SELECT * FROM challenges WHERE creator_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(challenges)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Challenge> {
        sqlx::query_as::<_, Challenge>("SELECT * FROM challenges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Challenge"))
    }

    #[tracing::instrument(skip(self, session, request), fields(user_id = %session.user_id, title = %request.title))]
    pub async fn create(&self, session: &UserSession, request: CreateChallengeRequest) -> ApiResult<Challenge> {
        let gym_owner = match request.gym_id {
            Some(gym_id) => {
                let owner_id: Uuid = sqlx::query_scalar("SELECT owner_id FROM gyms WHERE id = $1")
                    .bind(gym_id)
                    .fetch_optional(&self.db)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Gym"))?;
                Some(owner_id)
            }
            None => None,
        };
        check_gym_link(session, gym_owner)?;

        let exercise_type_ids = dedup(&request.recommended_exercise_type_ids);
        if !exercise_type_ids.is_empty() {
            let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercise_types WHERE id = ANY($1)")
                .bind(&exercise_type_ids)
                .fetch_one(&self.db)
                .await?;
            if found != exercise_type_ids.len() as i64 {
                return Err(ApiError::BadRequest(
                    "One or more recommended exercise types do not exist".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let challenge = sqlx::query_as::<_, Challenge>(
            r#"
            INSERT INTO challenges (id, title, description, creator_id, gym_id,
                                    recommended_exercise_type_ids, duration, difficulty_level,
                                    goals, participants, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, '[]'::jsonb, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.title.trim())
        .bind(request.description.trim())
        .bind(session.user_id)
        .bind(request.gym_id)
        .bind(&exercise_type_ids)
        .bind(request.duration)
        .bind(request.difficulty_level)
        .bind(request.goals)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(challenge_id = %challenge.id, "Created challenge");
        Ok(challenge)
    }

    pub async fn delete(&self, session: &UserSession, id: Uuid) -> ApiResult<()> {
        let challenge = self.get(id).await?;
        if challenge.creator_id != session.user_id && !session.is_super_admin() {
            return Err(ApiError::Forbidden(
                "Only the creator or a super admin can delete this challenge".to_string(),
            ));
        }

        sqlx::query("DELETE FROM challenges WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(challenge_id = %id, "Deleted challenge");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn participate(&self, user_id: Uuid, challenge_id: Uuid) -> ApiResult<Challenge> {
        let mut tx = self.db.begin().await?;
        let mut challenge = lock_challenge(&mut tx, challenge_id).await?;

        if !challenge.add_participant(user_id, ParticipationStatus::Accepted) {
            return Err(ApiError::Conflict(
                "You are already a participant of this challenge".to_string(),
            ));
        }
        save_participants(&mut tx, &challenge).await?;
        insert_participation(&mut tx, &Participation::new_accepted(user_id, challenge_id, Utc::now())).await?;

        tx.commit().await?;
        tracing::info!(user_id = %user_id, challenge_id = %challenge_id, "Joined challenge");
        Ok(challenge)
    }

    /// Applies a logged session to both copies of the user's counters,
    /// and the user's score, in one transaction. Badges are evaluated after
    /// commit on a best-effort basis.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_progress(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        update: ProgressUpdate,
    ) -> ApiResult<ProgressResponse> {
        update.validate()?;

        let mut tx = self.db.begin().await?;
        let mut challenge = lock_challenge(&mut tx, challenge_id).await?;

        let participant = challenge.participant_mut(user_id).ok_or_else(|| {
            ApiError::BadRequest("You are not a participant of this challenge".to_string())
        })?;
        if participant.status == ParticipationStatus::Invited {
            return Err(ApiError::BadRequest(
                "Accept the invitation before logging progress".to_string(),
            ));
        }
        if !participant.accepts(&update) {
            return Err(ApiError::BadRequest("Progress update out of range".to_string()));
        }
        participant.apply_progress(&update);

        let mut participation = sqlx::query_as::<_, Participation>(
            "SELECT * FROM participations WHERE user_id = $1 AND challenge_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Participation"))?;

        if !participation.accepts(&update) {
            return Err(ApiError::BadRequest("Progress update out of range".to_string()));
        }
        let outcome = participation.record_session(&update, Utc::now());

        save_participants(&mut tx, &challenge).await?;
        sqlx::query(
            r#"
            UPDATE participations SET
                status = $2, progress = $3, calories_burned = $4, sessions = $5,
                completed_at = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(participation.id)
        .bind(participation.status)
        .bind(participation.progress)
        .bind(participation.calories_burned)
        .bind(&participation.sessions)
        .bind(participation.completed_at)
        .bind(participation.updated_at)
        .execute(&mut *tx)
        .await?;

        let points_awarded = outcome.score_points();
        if points_awarded > 0 {
            user_service::add_score(&mut tx, user_id, points_awarded).await?;
        }

        tx.commit().await?;

        if outcome.newly_completed {
            tracing::info!(user_id = %user_id, challenge_id = %challenge_id, "Challenge completed");
        }

        let newly_awarded_badges = match self.badges.evaluate_and_award(user_id).await {
            Ok(badges) => badges,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Badge evaluation failed");
                Vec::new()
            }
        };

        Ok(ProgressResponse {
            challenge,
            participation,
            points_awarded,
            newly_awarded_badges,
        })
    }

    pub async fn sessions(&self, user_id: Uuid, challenge_id: Uuid) -> ApiResult<SessionHistory> {
        self.get(challenge_id).await?;
        let participation = sqlx::query_as::<_, Participation>(
            "SELECT * FROM participations WHERE user_id = $1 AND challenge_id = $2",
        )
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Participation"))?;

        Ok(SessionHistory {
            challenge_id,
            status: participation.status,
            progress: participation.progress,
            calories_burned: participation.calories_burned,
            sessions: participation.sessions.0,
        })
    }

    /// Invites every listed user who is not yet part of the challenge.
    #[tracing::instrument(skip(self, user_ids))]
    pub async fn share(&self, sender_id: Uuid, challenge_id: Uuid, user_ids: &[Uuid]) -> ApiResult<Challenge> {
        let receivers: Vec<Uuid> = dedup(user_ids)
            .into_iter()
            .filter(|id| *id != sender_id)
            .collect();
        self.ensure_users_exist(&receivers).await?;

        let mut tx = self.db.begin().await?;
        let mut challenge = lock_challenge(&mut tx, challenge_id).await?;

        let mut invited = 0;
        for receiver_id in receivers {
            if challenge.add_participant(receiver_id, ParticipationStatus::Invited) {
                upsert_invitation(&mut tx, sender_id, receiver_id, challenge_id).await?;
                invited += 1;
            }
        }
        save_participants(&mut tx, &challenge).await?;
        tx.commit().await?;

        tracing::info!(challenge_id = %challenge_id, invited, "Shared challenge");
        Ok(challenge)
    }

    #[tracing::instrument(skip(self))]
    pub async fn invite(&self, sender_id: Uuid, challenge_id: Uuid, receiver_id: Uuid) -> ApiResult<Invitation> {
        if sender_id == receiver_id {
            return Err(ApiError::BadRequest("You cannot invite yourself".to_string()));
        }
        self.ensure_users_exist(&[receiver_id]).await?;

        let mut tx = self.db.begin().await?;
        let mut challenge = lock_challenge(&mut tx, challenge_id).await?;

        if !challenge.add_participant(receiver_id, ParticipationStatus::Invited) {
            return Err(ApiError::Conflict(
                "This user is already part of the challenge".to_string(),
            ));
        }
        save_participants(&mut tx, &challenge).await?;
        let invitation = upsert_invitation(&mut tx, sender_id, receiver_id, challenge_id).await?;
        tx.commit().await?;

        tracing::info!(invitation_id = %invitation.id, "Invited user to challenge");
        Ok(invitation)
    }

    #[tracing::instrument(skip(self))]
    pub async fn accept(&self, user_id: Uuid, challenge_id: Uuid) -> ApiResult<Challenge> {
        let mut tx = self.db.begin().await?;
        let mut challenge = lock_challenge(&mut tx, challenge_id).await?;

        let participant = challenge
            .participant_mut(user_id)
            .filter(|p| p.status == ParticipationStatus::Invited)
            .ok_or_else(|| ApiError::BadRequest("You have no pending invitation for this challenge".to_string()))?;
        participant.status = ParticipationStatus::Accepted;

        save_participants(&mut tx, &challenge).await?;
        insert_participation(&mut tx, &Participation::new_accepted(user_id, challenge_id, Utc::now())).await?;
        settle_invitations(&mut tx, user_id, challenge_id, InvitationStatus::Accepted).await?;

        tx.commit().await?;
        tracing::info!(user_id = %user_id, challenge_id = %challenge_id, "Accepted challenge invitation");
        Ok(challenge)
    }

    #[tracing::instrument(skip(self))]
    pub async fn refuse(&self, user_id: Uuid, challenge_id: Uuid) -> ApiResult<Challenge> {
        let mut tx = self.db.begin().await?;
        let mut challenge = lock_challenge(&mut tx, challenge_id).await?;

        let is_invited = challenge
            .participant(user_id)
            .is_some_and(|p| p.status == ParticipationStatus::Invited);
        if !is_invited {
            return Err(ApiError::BadRequest(
                "You have no pending invitation for this challenge".to_string(),
            ));
        }
        challenge.remove_participant(user_id);

        save_participants(&mut tx, &challenge).await?;
        settle_invitations(&mut tx, user_id, challenge_id, InvitationStatus::Declined).await?;

        tx.commit().await?;
        tracing::info!(user_id = %user_id, challenge_id = %challenge_id, "Refused challenge invitation");
        Ok(challenge)
    }

    /// Challenges where the user is still listed as invited.
    pub async fn pending_invitations(&self, user_id: Uuid) -> ApiResult<Vec<Challenge>> {
        let invited_filter = json!([{ "user_id": user_id, "status": ParticipationStatus::Invited }]);
        let challenges = sqlx::query_as::<_, Challenge>(
            "SELECT * FROM challenges WHERE participants @> $1 ORDER BY created_at DESC",
        )
        .bind(invited_filter)
        .fetch_all(&self.db)
        .await?;
        Ok(challenges)
    }

    async fn ensure_users_exist(&self, user_ids: &[Uuid]) -> ApiResult<()> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let found: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM users WHERE id = ANY($1) AND is_deleted = FALSE AND is_active = TRUE",
        )
        .bind(user_ids)
        .fetch_all(&self.db)
        .await?;

        if found.len() != user_ids.len() {
            return Err(ApiError::not_found("User"));
        }
        Ok(())
    }
}

/// Drops a still-invited participant, leaving accepted ones untouched.
pub(crate) async fn withdraw_invited(conn: &mut PgConnection, user_id: Uuid, challenge_id: Uuid) -> ApiResult<()> {
    let mut challenge = lock_challenge(conn, challenge_id).await?;
    let is_invited = challenge
        .participant(user_id)
        .is_some_and(|p| p.status == ParticipationStatus::Invited);

    if is_invited && challenge.remove_participant(user_id) {
        save_participants(conn, &challenge).await?;
    }
    Ok(())
}

pub(crate) async fn lock_challenge(conn: &mut PgConnection, challenge_id: Uuid) -> ApiResult<Challenge> {
    sqlx::query_as::<_, Challenge>("SELECT * FROM challenges WHERE id = $1 FOR UPDATE")
        .bind(challenge_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ApiError::not_found("Challenge"))
}

pub(crate) async fn save_participants(conn: &mut PgConnection, challenge: &Challenge) -> ApiResult<()> {
    sqlx::query("UPDATE challenges SET participants = $2, updated_at = NOW() WHERE id = $1")
        .bind(challenge.id)
        .bind(&challenge.participants)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn insert_participation(conn: &mut PgConnection, participation: &Participation) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO participations (id, user_id, challenge_id, status, progress, calories_burned,
                                    sessions, started_at, completed_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(participation.id)
    .bind(participation.user_id)
    .bind(participation.challenge_id)
    .bind(participation.status)
    .bind(participation.progress)
    .bind(participation.calories_burned)
    .bind(&participation.sessions)
    .bind(participation.started_at)
    .bind(participation.completed_at)
    .bind(participation.created_at)
    .bind(participation.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// A repeated invitation from the same sender is reopened.
async fn upsert_invitation(
    conn: &mut PgConnection,
    sender_id: Uuid,
    receiver_id: Uuid,
    challenge_id: Uuid,
) -> ApiResult<Invitation> {
    let invitation = sqlx::query_as::<_, Invitation>(
        r#"
        INSERT INTO invitations (id, sender_id, receiver_id, challenge_id, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'pending', NOW(), NOW())
        ON CONFLICT (sender_id, receiver_id, challenge_id)
        DO UPDATE SET status = 'pending', updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(sender_id)
    .bind(receiver_id)
    .bind(challenge_id)
    .fetch_one(conn)
    .await?;
    Ok(invitation)
}

async fn settle_invitations(
    conn: &mut PgConnection,
    receiver_id: Uuid,
    challenge_id: Uuid,
    status: InvitationStatus,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        UPDATE invitations SET status = $3, updated_at = NOW()
        WHERE receiver_id = $1 AND challenge_id = $2 AND status = 'pending'
        "#,
    )
    .bind(receiver_id)
    .bind(challenge_id)
    .bind(status)
    .execute(conn)
    .await?;
    Ok(())
}

/// Who may link which gym to a new challenge. `gym_owner` is the owner of
/// the requested gym, if one was given.
fn check_gym_link(session: &UserSession, gym_owner: Option<Uuid>) -> ApiResult<()> {
    match (session.role, gym_owner) {
        (UserRole::SuperAdmin, _) => Ok(()),
        (UserRole::GymOwner, Some(owner)) if owner == session.user_id => Ok(()),
        (UserRole::GymOwner, Some(_)) => Err(ApiError::Forbidden(
            "You can only create challenges for your own gyms".to_string(),
        )),
        (UserRole::GymOwner, None) => Err(ApiError::BadRequest(
            "Gym owners must link one of their gyms".to_string(),
        )),
        (UserRole::Client, Some(_)) => Err(ApiError::Forbidden(
            "Clients cannot link a gym to a challenge".to_string(),
        )),
        (UserRole::Client, None) => Ok(()),
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
