use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::common::ParticipationStatus;

pub const MAX_PROGRESS: f64 = 100.0;

/// Extra points granted on the update that completes a challenge.
pub const COMPLETION_BONUS: i64 = 100;

/// Upper bound on the calories one session may report.
pub const MAX_SESSION_CALORIES: f64 = 10_000.0;

/// One logged workout toward a challenge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct ProgressUpdate {
    #[validate(range(min = 0.0, max = 100.0, message = "Progress must be between 0 and 100"))]
    pub progress: f64,
    #[serde(default)]
    #[validate(range(
        min = 0.0,
        max = 10_000.0,
        message = "Calories burned must be between 0 and 10000"
    ))]
    pub calories_burned: f64,
}

/// What an update actually changed once clamping is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressOutcome {
    pub applied_progress: f64,
    pub applied_calories: f64,
    pub total_progress: f64,
    pub newly_completed: bool,
}

impl ProgressOutcome {
    /// Score earned by this update.
    pub fn score_points(&self) -> i64 {
        let bonus = if self.newly_completed { COMPLETION_BONUS } else { 0 };
        self.applied_progress.round() as i64 + bonus
    }
}

/// Shared accumulation rules for every copy of a user's challenge counters.
pub trait ProgressTracker {
    fn counters_mut(&mut self) -> (&mut f64, &mut f64, &mut ParticipationStatus);

    /// Whether `update` can be applied while keeping both counters finite.
    fn accepts(&mut self, update: &ProgressUpdate) -> bool {
        let (progress, calories, _) = self.counters_mut();
        update.progress.is_finite()
            && update.calories_burned.is_finite()
            && (*progress + update.progress).is_finite()
            && (*calories + update.calories_burned.max(0.0)).is_finite()
    }

    /// Adds `update` to the counters. Non-finite deltas are dropped so the
    /// stored totals always serialize as JSON numbers.
    fn apply_progress(&mut self, update: &ProgressUpdate) -> ProgressOutcome {
        let (progress, calories, status) = self.counters_mut();

        let previous = *progress;
        if update.progress.is_finite() {
            *progress = (previous + update.progress).clamp(0.0, MAX_PROGRESS);
        }
        let applied_progress = *progress - previous;

        let mut applied_calories = update.calories_burned.max(0.0);
        if !(*calories + applied_calories).is_finite() {
            applied_calories = 0.0;
        }
        *calories += applied_calories;

        let newly_completed = *progress >= MAX_PROGRESS && *status != ParticipationStatus::Completed;
        if newly_completed {
            *status = ParticipationStatus::Completed;
        }

        ProgressOutcome {
            applied_progress,
            applied_calories,
            total_progress: *progress,
            newly_completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSession {
    pub date: DateTime<Utc>,
    pub progress: f64,
    pub calories_burned: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub status: ParticipationStatus,
    pub progress: f64,
    pub calories_burned: f64,
    pub sessions: Json<Vec<ProgressSession>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressTracker for Participation {
    fn counters_mut(&mut self) -> (&mut f64, &mut f64, &mut ParticipationStatus) {
        (&mut self.progress, &mut self.calories_burned, &mut self.status)
    }
}

impl Participation {
    pub fn new_accepted(user_id: Uuid, challenge_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            challenge_id,
            status: ParticipationStatus::Accepted,
            progress: 0.0,
            calories_burned: 0.0,
            sessions: Json(Vec::new()),
            started_at: Some(now),
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update and append it to the session history.
    pub fn record_session(&mut self, update: &ProgressUpdate, at: DateTime<Utc>) -> ProgressOutcome {
        let outcome = self.apply_progress(update);

        self.sessions.0.push(ProgressSession {
            date: at,
            progress: outcome.applied_progress,
            calories_burned: outcome.applied_calories,
        });
        if outcome.newly_completed {
            self.completed_at = Some(at);
        }
        self.updated_at = at;

        outcome
    }
}

/// Participation joined with the user and challenge it refers to.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ParticipationDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub participation: Participation,
    pub username: String,
    pub email: String,
    pub challenge_title: String,
}

/// Aggregate statistics that badge rules are evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub completed_challenges: i64,
    pub total_calories_burned: f64,
    pub active_challenges: i64,
    pub average_progress: f64,
}

impl UserStats {
    pub fn from_participations(participations: &[Participation]) -> Self {
        if participations.is_empty() {
            return Self::default();
        }

        let count_with = |status: ParticipationStatus| {
            participations.iter().filter(|p| p.status == status).count() as i64
        };

        let total_progress: f64 = participations.iter().map(|p| p.progress).sum();

        Self {
            completed_challenges: count_with(ParticipationStatus::Completed),
            total_calories_burned: participations.iter().map(|p| p.calories_burned).sum(),
            active_challenges: count_with(ParticipationStatus::Accepted),
            average_progress: total_progress / participations.len() as f64,
        }
    }
}
