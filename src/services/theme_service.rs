use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::validation::{slugify, validate_slug};
use crate::models::{CreateThemeRequest, Theme, ThemeTier, UpdateThemeRequest, UserThemeInfo};

/// An earned badge together with the active theme it links, if any.
#[derive(Debug, Clone, FromRow)]
pub struct EarnedThemeLink {
    pub badge_name: String,
    pub earned_at: DateTime<Utc>,
    pub theme_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct ThemeService {
    db: PgPool,
}

impl ThemeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> ApiResult<Vec<Theme>> {
        let themes = sqlx::query_as::<_, Theme>("SELECT * FROM themes ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(themes)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Theme> {
        sqlx::query_as::<_, Theme>("SELECT * FROM themes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Theme"))
    }

    pub async fn find_by_slug(&self, slug: &str) -> ApiResult<Option<Theme>> {
        let theme = sqlx::query_as::<_, Theme>("SELECT * FROM themes WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.db)
            .await?;
        Ok(theme)
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateThemeRequest) -> ApiResult<Theme> {
        let slug = resolve_slug(request.slug.as_deref(), &request.name)?;
        let now = Utc::now();

        let theme = sqlx::query_as::<_, Theme>(
            r#"
            INSERT INTO themes (id, name, description, slug, colors, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(&slug)
        .bind(Json(&request.colors))
        .bind(request.is_active)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(theme_id = %theme.id, slug = %theme.slug, "Created theme");
        Ok(theme)
    }

    pub async fn update(&self, id: Uuid, request: UpdateThemeRequest) -> ApiResult<Theme> {
        let slug = match request.slug.as_deref() {
            Some(slug) => Some(resolve_slug(Some(slug), "")?),
            None => None,
        };
        if let Some(colors) = &request.colors {
            colors.validate()?;
        }

        sqlx::query_as::<_, Theme>(
            r#"
            UPDATE themes SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                slug = COALESCE($4, slug),
                colors = COALESCE($5, colors),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.description.as_deref().map(str::trim))
        .bind(slug)
        .bind(request.colors.map(Json))
        .bind(request.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Theme"))
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM themes WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Theme"));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn theme_for_user(&self, user_id: Uuid) -> ApiResult<UserThemeInfo> {
        let links = sqlx::query_as::<_, EarnedThemeLink>(
            r#"
            SELECT b.name AS badge_name, ub.earned_at,
                   CASE WHEN t.is_active THEN t.id END AS theme_id
            FROM user_badges ub
            JOIN badges b ON b.id = ub.badge_id
            LEFT JOIN themes t ON t.id = b.theme_id
            WHERE ub.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let theme_ids: Vec<Uuid> = links.iter().filter_map(|l| l.theme_id).collect();
        let themes = if theme_ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, Theme>("SELECT * FROM themes WHERE id = ANY($1) AND is_active = TRUE")
                .bind(&theme_ids)
                .fetch_all(&self.db)
                .await?
        };

        Ok(select_theme(&links, &themes))
    }
}

/// An explicit slug must be well formed; otherwise one is derived from the name.
fn resolve_slug(requested: Option<&str>, name: &str) -> ApiResult<String> {
    let slug = match requested {
        Some(slug) => slug.trim().to_string(),
        None => slugify(name),
    };

    validate_slug(&slug).map_err(|_| {
        ApiError::BadRequest(format!(
            "Invalid theme slug {:?}: use lowercase letters, digits and dashes",
            slug
        ))
    })?;

    Ok(slug)
}

/// Picks the theme for a set of earned badges.
///
/// A linked active theme wins, taken from the highest-tier badge that links
/// one (most recently earned on ties). Without any link the built-in palette
/// of the highest tier reached is used.
pub fn select_theme(links: &[EarnedThemeLink], themes: &[Theme]) -> UserThemeInfo {
    let tier_of = |link: &EarnedThemeLink| {
        ThemeTier::from_badge_name(&link.badge_name).unwrap_or(ThemeTier::Default)
    };

    let linked = links
        .iter()
        .filter_map(|link| {
            let theme_id = link.theme_id?;
            let theme = themes.iter().find(|t| t.id == theme_id && t.is_active)?;
            Some((tier_of(link), link.earned_at, theme))
        })
        .max_by_key(|(tier, earned_at, _)| (*tier, *earned_at));

    if let Some((tier, _, theme)) = linked {
        return UserThemeInfo::from_theme(tier, theme);
    }

    let highest = links.iter().map(tier_of).max().unwrap_or(ThemeTier::Default);
    UserThemeInfo::builtin(highest)
}
