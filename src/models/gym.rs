use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::training_room::TrainingRoom;
use crate::models::validation::validate_not_blank;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gym {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub description: Option<String>,
    pub equipment: Vec<String>,
    pub activities: Vec<String>,
    pub owner_id: Uuid,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GymWithRooms {
    #[serde(flatten)]
    pub gym: Gym,
    pub training_rooms: Vec<TrainingRoom>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGymRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(min = 1), custom(function = "validate_not_blank"))]
    pub address: String,
    #[validate(email(message = "Invalid contact email"))]
    pub contact_email: String,
    #[validate(length(max = 50))]
    pub contact_phone: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
    pub owner_id: Uuid,
    #[serde(default)]
    pub is_approved: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateGymRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    #[validate(email(message = "Invalid contact email"))]
    pub contact_email: Option<String>,
    #[validate(length(max = 50))]
    pub contact_phone: Option<String>,
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,
    pub equipment: Option<Vec<String>>,
    pub activities: Option<Vec<String>>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalRequest {
    #[serde(default = "default_true")]
    pub is_approved: bool,
}

fn default_true() -> bool {
    true
}
