use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::common::DifficultyLevel;
use crate::models::exercise_type::ExerciseType;
use crate::models::validation::validate_not_blank;

pub const MAX_ROOM_CAPACITY: i32 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingRoom {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub equipment: Vec<String>,
    pub features: Vec<String>,
    pub is_approved: bool,
    pub difficulty_level: DifficultyLevel,
    pub assigned_exercise_type_id: Option<Uuid>,
    pub gym_id: Uuid,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingRoomDetails {
    #[serde(flatten)]
    pub room: TrainingRoom,
    pub assigned_exercise_type: Option<ExerciseType>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTrainingRoomRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(range(min = 1, max = 500, message = "Capacity must be between 1 and 500"))]
    pub capacity: i32,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub assigned_exercise_type_id: Option<Uuid>,
    pub gym_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTrainingRoomRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 500, message = "Capacity must be between 1 and 500"))]
    pub capacity: Option<i32>,
    pub equipment: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignExerciseTypeRequest {
    /// `null` clears the assignment
    pub exercise_type_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetDifficultyRequest {
    pub difficulty_level: DifficultyLevel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeGymRequest {
    pub gym_id: Uuid,
}
