use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{UserRole, UserSession};
use crate::error::{ApiError, ApiResult};
use crate::models::validation::clean_list;
use crate::models::{
    ChangeGymRequest, CreateTrainingRoomRequest, DifficultyLevel, ExerciseType, TrainingRoom,
    TrainingRoomDetails, UpdateTrainingRoomRequest,
};

/// Training rooms are managed by super admins and by the owners of the
/// gym a room belongs to.
#[derive(Debug, Clone)]
pub struct TrainingRoomService {
    db: PgPool,
}

impl TrainingRoomService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_rooms_for(&self, session: &UserSession) -> ApiResult<Vec<TrainingRoom>> {
        let rooms = match session.role {
            UserRole::SuperAdmin => {
                sqlx::query_as::<_, TrainingRoom>("SELECT * FROM training_rooms ORDER BY name")
                    .fetch_all(&self.db)
                    .await?
            }
            UserRole::GymOwner => {
                sqlx::query_as::<_, TrainingRoom>(
                    r#"
                    SELECT tr.* FROM training_rooms tr
                    JOIN gyms g ON g.id = tr.gym_id
                    WHERE g.owner_id = $1
                    ORDER BY tr.name
                    "#,
                )
                .bind(session.user_id)
                .fetch_all(&self.db)
                .await?
            }
            UserRole::Client => {
                return Err(ApiError::Forbidden(
                    "Clients cannot manage training rooms".to_string(),
                ))
            }
        };

        Ok(rooms)
    }

    pub async fn get_room_details(&self, session: &UserSession, room_id: Uuid) -> ApiResult<TrainingRoomDetails> {
        let room = self.room_for(session, room_id).await?;
        let assigned_exercise_type = match room.assigned_exercise_type_id {
            Some(type_id) => {
                sqlx::query_as::<_, ExerciseType>("SELECT * FROM exercise_types WHERE id = $1")
                    .bind(type_id)
                    .fetch_optional(&self.db)
                    .await?
            }
            None => None,
        };

        Ok(TrainingRoomDetails {
            room,
            assigned_exercise_type,
        })
    }

    #[tracing::instrument(skip(self, session, request), fields(user_id = %session.user_id, name = %request.name))]
    pub async fn create_room(
        &self,
        session: &UserSession,
        request: CreateTrainingRoomRequest,
    ) -> ApiResult<TrainingRoom> {
        self.ensure_gym_access(session, request.gym_id).await?;
        if let Some(type_id) = request.assigned_exercise_type_id {
            self.ensure_exercise_type(type_id).await?;
        }

        let now = Utc::now();
        let room = sqlx::query_as::<_, TrainingRoom>(
            r#"
            INSERT INTO training_rooms (id, name, capacity, equipment, features, is_approved,
                                        difficulty_level, assigned_exercise_type_id, gym_id,
                                        created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name.trim())
        .bind(request.capacity)
        .bind(clean_list(request.equipment))
        .bind(clean_list(request.features))
        .bind(session.is_super_admin())
        .bind(request.difficulty_level.unwrap_or(DifficultyLevel::Beginner))
        .bind(request.assigned_exercise_type_id)
        .bind(request.gym_id)
        .bind(session.user_id)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(room_id = %room.id, gym_id = %room.gym_id, "Created training room");
        Ok(room)
    }

    pub async fn update_room(
        &self,
        session: &UserSession,
        room_id: Uuid,
        request: UpdateTrainingRoomRequest,
    ) -> ApiResult<TrainingRoom> {
        self.room_for(session, room_id).await?;

        sqlx::query_as::<_, TrainingRoom>(
            r#"
            UPDATE training_rooms SET
                name = COALESCE($2, name),
                capacity = COALESCE($3, capacity),
                equipment = COALESCE($4, equipment),
                features = COALESCE($5, features),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(room_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.capacity)
        .bind(request.equipment.map(clean_list))
        .bind(request.features.map(clean_list))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Training room"))
    }

    pub async fn delete_room(&self, session: &UserSession, room_id: Uuid) -> ApiResult<()> {
        self.room_for(session, room_id).await?;
        sqlx::query("DELETE FROM training_rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.db)
            .await?;

        tracing::info!(room_id = %room_id, "Deleted training room");
        Ok(())
    }

    pub async fn set_approval(&self, room_id: Uuid, is_approved: bool) -> ApiResult<TrainingRoom> {
        let room = sqlx::query_as::<_, TrainingRoom>(
            "UPDATE training_rooms SET is_approved = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(room_id)
        .bind(is_approved)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Training room"))?;

        tracing::info!(room_id = %room.id, is_approved, "Changed training room approval");
        Ok(room)
    }

    pub async fn assign_exercise_type(
        &self,
        session: &UserSession,
        room_id: Uuid,
        exercise_type_id: Option<Uuid>,
    ) -> ApiResult<TrainingRoom> {
        self.room_for(session, room_id).await?;
        if let Some(type_id) = exercise_type_id {
            self.ensure_exercise_type(type_id).await?;
        }

        let room = sqlx::query_as::<_, TrainingRoom>(
            "UPDATE training_rooms SET assigned_exercise_type_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(room_id)
        .bind(exercise_type_id)
        .fetch_one(&self.db)
        .await?;

        Ok(room)
    }

    pub async fn set_difficulty(
        &self,
        session: &UserSession,
        room_id: Uuid,
        difficulty_level: DifficultyLevel,
    ) -> ApiResult<TrainingRoom> {
        self.room_for(session, room_id).await?;

        let room = sqlx::query_as::<_, TrainingRoom>(
            "UPDATE training_rooms SET difficulty_level = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(room_id)
        .bind(difficulty_level)
        .fetch_one(&self.db)
        .await?;

        Ok(room)
    }

    pub async fn change_gym(
        &self,
        session: &UserSession,
        room_id: Uuid,
        request: ChangeGymRequest,
    ) -> ApiResult<TrainingRoom> {
        self.room_for(session, room_id).await?;
        self.ensure_gym_access(session, request.gym_id).await?;

        let room = sqlx::query_as::<_, TrainingRoom>(
            "UPDATE training_rooms SET gym_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(room_id)
        .bind(request.gym_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(room_id = %room.id, gym_id = %room.gym_id, "Moved training room");
        Ok(room)
    }

    /// Loads a room and checks the caller may manage it.
    async fn room_for(&self, session: &UserSession, room_id: Uuid) -> ApiResult<TrainingRoom> {
        let room = sqlx::query_as::<_, TrainingRoom>("SELECT * FROM training_rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Training room"))?;

        self.ensure_gym_access(session, room.gym_id).await?;
        Ok(room)
    }

    async fn ensure_gym_access(&self, session: &UserSession, gym_id: Uuid) -> ApiResult<()> {
        let owner_id: Uuid = sqlx::query_scalar("SELECT owner_id FROM gyms WHERE id = $1")
            .bind(gym_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Gym"))?;

        can_manage_gym(session, owner_id)
    }

    async fn ensure_exercise_type(&self, exercise_type_id: Uuid) -> ApiResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM exercise_types WHERE id = $1)")
            .bind(exercise_type_id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Err(ApiError::not_found("Exercise type"));
        }
        Ok(())
    }
}

fn can_manage_gym(session: &UserSession, owner_id: Uuid) -> ApiResult<()> {
    match session.role {
        UserRole::SuperAdmin => Ok(()),
        UserRole::GymOwner if owner_id == session.user_id => Ok(()),
        UserRole::GymOwner => Err(ApiError::Forbidden(
            "You can only manage training rooms of your own gyms".to_string(),
        )),
        UserRole::Client => Err(ApiError::Forbidden(
            "Clients cannot manage training rooms".to_string(),
        )),
    }
}
