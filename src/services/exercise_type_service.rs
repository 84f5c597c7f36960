use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::validation::{clean_list, like_pattern};
use crate::models::{CreateExerciseTypeRequest, ExerciseType, TrainingRoom, UpdateExerciseTypeRequest};

#[derive(Debug, Clone)]
pub struct ExerciseTypeService {
    db: PgPool,
}

impl ExerciseTypeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> ApiResult<Vec<ExerciseType>> {
        let types = sqlx::query_as::<_, ExerciseType>("SELECT * FROM exercise_types ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(types)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<ExerciseType> {
        sqlx::query_as::<_, ExerciseType>("SELECT * FROM exercise_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Exercise type"))
    }

    /// Case-insensitive substring match against any targeted muscle.
    pub async fn find_by_muscle(&self, muscle: &str) -> ApiResult<Vec<ExerciseType>> {
        let types = sqlx::query_as::<_, ExerciseType>(
            r#"
            SELECT * FROM exercise_types et
            WHERE EXISTS (
                SELECT 1 FROM unnest(et.targeted_muscles) AS muscle
                WHERE muscle ILIKE $1 ESCAPE '\'
            )
            ORDER BY et.name
            "#,
        )
        .bind(like_pattern(muscle.trim()))
        .fetch_all(&self.db)
        .await?;

        Ok(types)
    }

    pub async fn training_rooms(&self, id: Uuid) -> ApiResult<Vec<TrainingRoom>> {
        self.get(id).await?;
        let rooms = sqlx::query_as::<_, TrainingRoom>(
            "SELECT * FROM training_rooms WHERE assigned_exercise_type_id = $1 ORDER BY name",
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;
        Ok(rooms)
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateExerciseTypeRequest) -> ApiResult<ExerciseType> {
        let now = Utc::now();
        let exercise_type = sqlx::query_as::<_, ExerciseType>(
            r#"
            INSERT INTO exercise_types (id, name, description, targeted_muscles, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(clean_list(request.targeted_muscles))
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(exercise_type_id = %exercise_type.id, "Created exercise type");
        Ok(exercise_type)
    }

    pub async fn update(&self, id: Uuid, request: UpdateExerciseTypeRequest) -> ApiResult<ExerciseType> {
        sqlx::query_as::<_, ExerciseType>(
            r#"
            UPDATE exercise_types SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                targeted_muscles = COALESCE($4, targeted_muscles),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.description.as_deref().map(str::trim))
        .bind(request.targeted_muscles.map(clean_list))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Exercise type"))
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let rooms = self.training_rooms(id).await?;
        if !rooms.is_empty() {
            return Err(in_use_error(&rooms));
        }

        sqlx::query("DELETE FROM exercise_types WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(exercise_type_id = %id, "Deleted exercise type");
        Ok(())
    }
}

fn in_use_error(rooms: &[TrainingRoom]) -> ApiError {
    let names: Vec<&str> = rooms.iter().map(|room| room.name.as_str()).collect();
    ApiError::BadRequest(format!(
        "Exercise type is still assigned to training rooms: {}",
        names.join(", ")
    ))
}
