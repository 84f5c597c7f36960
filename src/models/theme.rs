use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::{validate_hex_color, validate_not_blank};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ThemePalette {
    #[validate(custom(function = "validate_hex_color"))]
    pub primary: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub secondary: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub accent: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub background: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub background_soft: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub text: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub text_muted: String,
}

impl ThemePalette {
    fn from_hex(colors: [&str; 7]) -> Self {
        let [primary, secondary, accent, background, background_soft, text, text_muted] = colors;
        Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            accent: accent.to_string(),
            background: background.to_string(),
            background_soft: background_soft.to_string(),
            text: text.to_string(),
            text_muted: text_muted.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Theme {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub slug: String,
    pub colors: Json<ThemePalette>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateThemeRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    /// Derived from the name when omitted
    pub slug: Option<String>,
    #[validate(nested)]
    pub colors: ThemePalette,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateThemeRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub slug: Option<String>,
    pub colors: Option<ThemePalette>,
    pub is_active: Option<bool>,
}

/// Badge progression tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeTier {
    Default,
    Beginner,
    Intermediate,
    Advanced,
    Champion,
}

impl ThemeTier {
    pub const ALL: [ThemeTier; 5] = [
        ThemeTier::Default,
        ThemeTier::Beginner,
        ThemeTier::Intermediate,
        ThemeTier::Advanced,
        ThemeTier::Champion,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ThemeTier::Default => "default",
            ThemeTier::Beginner => "beginner",
            ThemeTier::Intermediate => "intermediate",
            ThemeTier::Advanced => "advanced",
            ThemeTier::Champion => "champion",
        }
    }

    /// Tier named by a badge. French and English names are both recognised.
    pub fn from_badge_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "champion" => Some(ThemeTier::Champion),
            "avancé" | "avance" | "advanced" => Some(ThemeTier::Advanced),
            "intermédiaire" | "intermediaire" | "intermediate" => Some(ThemeTier::Intermediate),
            "débutant" | "debutant" | "beginner" => Some(ThemeTier::Beginner),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ThemeTier::Default => "Default",
            ThemeTier::Beginner => "Beginner",
            ThemeTier::Intermediate => "Intermediate",
            ThemeTier::Advanced => "Advanced",
            ThemeTier::Champion => "Champion",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ThemeTier::Default => "Standard application theme",
            ThemeTier::Beginner => "Purple theme unlocked by your first completed challenge",
            ThemeTier::Intermediate => "Blue theme for steady challengers",
            ThemeTier::Advanced => "Orange theme for seasoned athletes",
            ThemeTier::Champion => "Gold theme reserved for champions",
        }
    }

    pub fn palette(&self) -> ThemePalette {
        match self {
            ThemeTier::Default => ThemePalette::from_hex([
                "#6366f1", "#8b5cf6", "#06b6d4", "#ffffff", "#f8fafc", "#1e293b", "#64748b",
            ]),
            ThemeTier::Beginner => ThemePalette::from_hex([
                "#8b5cf6", "#a855f7", "#c084fc", "#1a1625", "#2d1b3d", "#e2e8f0", "#a855f7",
            ]),
            ThemeTier::Intermediate => ThemePalette::from_hex([
                "#3b82f6", "#06b6d4", "#0ea5e9", "#0f172a", "#1e293b", "#e2e8f0", "#64748b",
            ]),
            ThemeTier::Advanced => ThemePalette::from_hex([
                "#f97316", "#ea580c", "#fb923c", "#1c1410", "#2d1b0e", "#fef3e2", "#fdba74",
            ]),
            ThemeTier::Champion => ThemePalette::from_hex([
                "#eab308", "#f59e0b", "#fbbf24", "#1c1a0d", "#2d2411", "#fefce8", "#fde047",
            ]),
        }
    }
}

/// Theme resolved for a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserThemeInfo {
    pub tier: ThemeTier,
    pub theme_id: Option<Uuid>,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub colors: ThemePalette,
}

impl UserThemeInfo {
    pub fn builtin(tier: ThemeTier) -> Self {
        Self {
            tier,
            theme_id: None,
            slug: tier.slug().to_string(),
            name: tier.display_name().to_string(),
            description: tier.description().to_string(),
            colors: tier.palette(),
        }
    }

    pub fn from_theme(tier: ThemeTier, theme: &Theme) -> Self {
        Self {
            tier,
            theme_id: Some(theme.id),
            slug: theme.slug.clone(),
            name: theme.name.clone(),
            description: theme.description.clone(),
            colors: theme.colors.0.clone(),
        }
    }
}
