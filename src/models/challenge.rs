use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::badge::EarnedBadge;
use crate::models::common::{ChallengeGoal, DifficultyLevel, ParticipationStatus};
use crate::models::participation::{Participation, ProgressSession, ProgressTracker};
use crate::models::validation::validate_not_blank;

/// Participant entry embedded in a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeParticipant {
    pub user_id: Uuid,
    pub status: ParticipationStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub calories_burned: f64,
}

impl ChallengeParticipant {
    pub fn new(user_id: Uuid, status: ParticipationStatus) -> Self {
        Self {
            user_id,
            status,
            progress: 0.0,
            calories_burned: 0.0,
        }
    }
}

impl ProgressTracker for ChallengeParticipant {
    fn counters_mut(&mut self) -> (&mut f64, &mut f64, &mut ParticipationStatus) {
        (&mut self.progress, &mut self.calories_burned, &mut self.status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_id: Uuid,
    pub gym_id: Option<Uuid>,
    pub recommended_exercise_type_ids: Vec<Uuid>,
    /// Minutes
    pub duration: i32,
    pub difficulty_level: DifficultyLevel,
    pub goals: ChallengeGoal,
    pub participants: Json<Vec<ChallengeParticipant>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    pub fn participant(&self, user_id: Uuid) -> Option<&ChallengeParticipant> {
        self.participants.0.iter().find(|p| p.user_id == user_id)
    }

    pub fn participant_mut(&mut self, user_id: Uuid) -> Option<&mut ChallengeParticipant> {
        self.participants.0.iter_mut().find(|p| p.user_id == user_id)
    }

    /// Returns false when the user is already listed.
    pub fn add_participant(&mut self, user_id: Uuid, status: ParticipationStatus) -> bool {
        if self.participant(user_id).is_some() {
            return false;
        }
        self.participants.0.push(ChallengeParticipant::new(user_id, status));
        true
    }

    pub fn remove_participant(&mut self, user_id: Uuid) -> bool {
        let before = self.participants.0.len();
        self.participants.0.retain(|p| p.user_id != user_id);
        self.participants.0.len() != before
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChallengeRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "Description must be between 1 and 1000 characters"))]
    pub description: String,
    pub gym_id: Option<Uuid>,
    #[serde(default)]
    pub recommended_exercise_type_ids: Vec<Uuid>,
    #[validate(range(min = 1, message = "Duration must be at least one minute"))]
    pub duration: i32,
    pub difficulty_level: DifficultyLevel,
    pub goals: ChallengeGoal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeFilters {
    pub difficulty_level: Option<DifficultyLevel>,
    pub gym_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareChallengeRequest {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteUserRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub challenge: Challenge,
    pub participation: Participation,
    pub points_awarded: i64,
    pub newly_awarded_badges: Vec<EarnedBadge>,
}

#[derive(Debug, Serialize)]
pub struct SessionHistory {
    pub challenge_id: Uuid,
    pub status: ParticipationStatus,
    pub progress: f64,
    pub calories_burned: f64,
    pub sessions: Vec<ProgressSession>,
}
