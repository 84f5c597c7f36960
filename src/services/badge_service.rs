use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    Badge, BadgeWithStatus, CreateBadgeRequest, EarnedBadge, Participation, UpdateBadgeRequest,
    UserStats,
};
use crate::services::badge_rules::evaluate_rule;

const EARNED_BADGE_COLUMNS: &str = r#"
    SELECT ub.id AS user_badge_id, ub.badge_id, ub.earned_at,
           b.name, b.description, b.icon_url, b.rule, b.theme_id
    FROM user_badges ub
    JOIN badges b ON b.id = ub.badge_id
"#;

#[derive(Debug, Clone)]
pub struct BadgeService {
    db: PgPool,
}

impl BadgeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> ApiResult<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>("SELECT * FROM badges ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(badges)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Badge> {
        sqlx::query_as::<_, Badge>("SELECT * FROM badges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Badge"))
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateBadgeRequest) -> ApiResult<Badge> {
        if let Some(theme_id) = request.theme_id {
            self.ensure_theme(theme_id).await?;
        }

        let now = Utc::now();
        let badge = sqlx::query_as::<_, Badge>(
            r#"
            INSERT INTO badges (id, name, description, icon_url, rule, theme_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(request.icon_url.trim())
        .bind(request.rule.trim())
        .bind(request.theme_id)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(badge_id = %badge.id, rule = %badge.rule, "Created badge");
        Ok(badge)
    }

    pub async fn update(&self, id: Uuid, request: UpdateBadgeRequest) -> ApiResult<Badge> {
        let current = self.get(id).await?;
        let theme_id = match request.theme_id {
            Some(Some(theme_id)) => {
                self.ensure_theme(theme_id).await?;
                Some(theme_id)
            }
            Some(None) => None,
            None => current.theme_id,
        };

        let badge = sqlx::query_as::<_, Badge>(
            r#"
            UPDATE badges SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                icon_url = COALESCE($4, icon_url),
                rule = COALESCE($5, rule),
                theme_id = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.description.as_deref().map(str::trim))
        .bind(request.icon_url.as_deref().map(str::trim))
        .bind(request.rule.as_deref().map(str::trim))
        .bind(theme_id)
        .fetch_one(&self.db)
        .await?;

        Ok(badge)
    }

    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM badges WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Badge"));
        }
        Ok(())
    }

    /// Newest first.
    pub async fn earned_badges(&self, user_id: Uuid) -> ApiResult<Vec<EarnedBadge>> {
        let sql = format!("{} WHERE ub.user_id = $1 ORDER BY ub.earned_at DESC", EARNED_BADGE_COLUMNS);
        let badges = sqlx::query_as::<_, EarnedBadge>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(badges)
    }

    pub async fn all_with_status(&self, user_id: Uuid) -> ApiResult<Vec<BadgeWithStatus>> {
        self.evaluate_and_award(user_id).await?;

        let badges = self.list().await?;
        let earned = self.earned_badges(user_id).await?;

        Ok(badges
            .into_iter()
            .map(|badge| {
                let earned_at = earned
                    .iter()
                    .find(|e| e.badge_id == badge.id)
                    .map(|e| e.earned_at);
                BadgeWithStatus {
                    badge,
                    earned: earned_at.is_some(),
                    earned_at,
                }
            })
            .collect())
    }

    pub async fn user_stats(&self, user_id: Uuid) -> ApiResult<UserStats> {
        let participations =
            sqlx::query_as::<_, Participation>("SELECT * FROM participations WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;

        Ok(UserStats::from_participations(&participations))
    }

    /// Awards every badge whose rule the user now satisfies and returns
    /// the badges granted by this call.
    #[tracing::instrument(skip(self))]
    pub async fn evaluate_and_award(&self, user_id: Uuid) -> ApiResult<Vec<EarnedBadge>> {
        let stats = self.user_stats(user_id).await?;
        let badges = self.list().await?;
        let already: HashSet<Uuid> =
            sqlx::query_scalar::<_, Uuid>("SELECT badge_id FROM user_badges WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?
                .into_iter()
                .collect();

        let mut awarded_ids = Vec::new();
        for badge in badges_to_award(&badges, &already, &stats) {
            let inserted: Option<Uuid> = sqlx::query_scalar(
                r#"
                INSERT INTO user_badges (id, user_id, badge_id, earned_at)
                VALUES ($1, $2, $3, NOW())
                ON CONFLICT (user_id, badge_id) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(badge.id)
            .fetch_optional(&self.db)
            .await?;

            if let Some(id) = inserted {
                tracing::info!(user_id = %user_id, badge = %badge.name, "Awarded badge");
                awarded_ids.push(id);
            }
        }

        if awarded_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("{} WHERE ub.id = ANY($1) ORDER BY b.name", EARNED_BADGE_COLUMNS);
        let awarded = sqlx::query_as::<_, EarnedBadge>(&sql)
            .bind(&awarded_ids)
            .fetch_all(&self.db)
            .await?;

        Ok(awarded)
    }

    async fn ensure_theme(&self, theme_id: Uuid) -> ApiResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM themes WHERE id = $1)")
            .bind(theme_id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Err(ApiError::not_found("Theme"));
        }
        Ok(())
    }
}

/// Badges not yet held whose rule holds for `stats`.
pub fn badges_to_award<'a>(
    badges: &'a [Badge],
    already_earned: &HashSet<Uuid>,
    stats: &UserStats,
) -> Vec<&'a Badge> {
    badges
        .iter()
        .filter(|badge| !already_earned.contains(&badge.id))
        .filter(|badge| evaluate_rule(&badge.rule, stats))
        .collect()
}
