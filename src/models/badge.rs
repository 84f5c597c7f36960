use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::validate_not_blank;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon_url: String,
    pub rule: String,
    pub theme_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserBadge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub badge_id: Uuid,
    pub earned_at: DateTime<Utc>,
}

/// A badge a user holds, with the badge data inlined.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EarnedBadge {
    pub user_badge_id: Uuid,
    pub badge_id: Uuid,
    pub earned_at: DateTime<Utc>,
    pub name: String,
    pub description: String,
    pub icon_url: String,
    pub rule: String,
    pub theme_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BadgeWithStatus {
    #[serde(flatten)]
    pub badge: Badge,
    pub earned: bool,
    pub earned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBadgeRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: String,
    #[serde(default)]
    pub icon_url: String,
    #[validate(length(min = 1, max = 1000, message = "Rule must be between 1 and 1000 characters"))]
    pub rule: String,
    pub theme_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBadgeRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    pub icon_url: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub rule: Option<String>,
    /// `Some(None)` unlinks the theme, a missing field leaves it untouched.
    #[serde(default, deserialize_with = "double_option")]
    pub theme_id: Option<Option<Uuid>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}
