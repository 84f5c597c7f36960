use chrono::Utc;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::{AuthError, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::models::validation::like_pattern;
use crate::models::{
    AdminUpdateUserRequest, CreateUserRequest, Pagination, UpdateOwnAccountRequest,
    UpdateProfileRequest, User, UserListQuery, UserListResponse, UserStatistics,
};

#[derive(Debug, Clone)]
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> ApiResult<User> {
        self.find_user(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    pub async fn find_user(&self, user_id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_deleted = FALSE")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: CreateUserRequest, role: UserRole) -> ApiResult<User> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();
        self.ensure_unique(Some(&username), Some(&email), None).await?;

        let password_hash = hash_password(&request.password).map_err(AuthError::from)?;
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, first_name, last_name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(role)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    pub async fn list_users(&self, query: &UserListQuery) -> ApiResult<UserListResponse> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE is_deleted = FALSE");
        push_user_filters(&mut count_query, query);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.db).await?;

        let mut list_query = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE is_deleted = FALSE");
        push_user_filters(&mut list_query, query);
        list_query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(query.limit())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let users = list_query.build_query_as::<User>().fetch_all(&self.db).await?;

        Ok(UserListResponse {
            users: users.into_iter().map(Into::into).collect(),
            pagination: Pagination::new(query.page(), query.limit(), total),
        })
    }

    pub async fn statistics(&self) -> ApiResult<UserStatistics> {
        let stats = sqlx::query_as::<_, UserStatistics>(
            r#"
            SELECT
                COUNT(*) AS total_users,
                COUNT(*) FILTER (WHERE is_active) AS active_users,
                COUNT(*) FILTER (WHERE NOT is_active) AS inactive_users,
                COUNT(*) FILTER (WHERE role = 'client') AS clients,
                COUNT(*) FILTER (WHERE role = 'gym_owner') AS gym_owners,
                COUNT(*) FILTER (WHERE role = 'super_admin') AS super_admins
            FROM users
            WHERE is_deleted = FALSE
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }

    pub async fn update_own_account(&self, user_id: Uuid, request: UpdateOwnAccountRequest) -> ApiResult<User> {
        let username = request.username.as_deref().map(str::trim);
        let email = request.email.as_deref().map(|e| e.trim().to_lowercase());
        self.ensure_unique(username, email.as_deref(), Some(user_id)).await?;

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(hash_password(password).map_err(AuthError::from)?),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                first_name = COALESCE($5, first_name),
                last_name = COALESCE($6, last_name),
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(request.first_name.as_deref().map(str::trim))
        .bind(request.last_name.as_deref().map(str::trim))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn admin_update(&self, actor_id: Uuid, target_id: Uuid, request: AdminUpdateUserRequest) -> ApiResult<User> {
        if actor_id == target_id {
            return Err(ApiError::BadRequest(
                "Use your profile to edit your own account".to_string(),
            ));
        }
        self.get_user(target_id).await?;

        let username = request.username.as_deref().map(str::trim);
        let email = request.email.as_deref().map(|e| e.trim().to_lowercase());
        self.ensure_unique(username, email.as_deref(), Some(target_id)).await?;

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(hash_password(password).map_err(AuthError::from)?),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                first_name = COALESCE($5, first_name),
                last_name = COALESCE($6, last_name),
                role = COALESCE($7, role),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(target_id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(request.first_name.as_deref().map(str::trim))
        .bind(request.last_name.as_deref().map(str::trim))
        .bind(request.role)
        .bind(request.is_active)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, "User updated by administrator");
        Ok(user)
    }

    pub async fn set_active(&self, actor_id: Uuid, target_id: Uuid, is_active: bool) -> ApiResult<User> {
        let target = self.get_user(target_id).await?;
        guard_admin_action(actor_id, &target)?;

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(target_id)
        .bind(is_active)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, is_active, "Changed account status");
        Ok(user)
    }

    pub async fn soft_delete(&self, actor_id: Uuid, target_id: Uuid) -> ApiResult<()> {
        let target = self.get_user(target_id).await?;
        guard_admin_action(actor_id, &target)?;

        sqlx::query(
            "UPDATE users SET is_deleted = TRUE, is_active = FALSE, deleted_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(target_id)
        .execute(&self.db)
        .await?;

        tracing::info!(user_id = %target_id, "Soft deleted user");
        Ok(())
    }

    /// Remove the user row and scrub them from embedded challenge participant lists.
    pub async fn permanent_delete(&self, actor_id: Uuid, target_id: Uuid) -> ApiResult<()> {
        let target = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(target_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;
        guard_admin_action(actor_id, &target)?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE challenges SET
                participants = COALESCE(
                    (SELECT jsonb_agg(p) FROM jsonb_array_elements(participants) p
                     WHERE p->>'user_id' <> $1::text),
                    '[]'::jsonb
                ),
                updated_at = NOW()
            WHERE participants @> jsonb_build_array(jsonb_build_object('user_id', $1::text))
            "#,
        )
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(target_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %target_id, "Permanently deleted user");
        Ok(())
    }

    pub async fn update_profile(&self, user_id: Uuid, request: UpdateProfileRequest) -> ApiResult<User> {
        let request = request.normalized();
        self.ensure_unique(Some(&request.username), Some(&request.email), Some(user_id))
            .await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET first_name = $2, last_name = $3, email = $4, username = $5, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.username)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

        Ok(user)
    }

    /// Reject usernames or emails held by another account, deleted ones included.
    async fn ensure_unique(&self, username: Option<&str>, email: Option<&str>, exclude: Option<Uuid>) -> ApiResult<()> {
        if username.is_none() && email.is_none() {
            return Ok(());
        }

        let clashes: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT username, email FROM users
            WHERE (username = $1 OR email = $2)
              AND ($3::uuid IS NULL OR id <> $3)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(exclude)
        .fetch_all(&self.db)
        .await?;

        if clashes.iter().any(|(u, _)| Some(u.as_str()) == username) {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }
        if clashes.iter().any(|(_, e)| Some(e.as_str()) == email) {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }

        Ok(())
    }
}

fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserListQuery) {
    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role);
    }
    if let Some(is_active) = query.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(term) = query.search_term() {
        let pattern = like_pattern(term);
        builder
            .push(" AND (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Administrative actions never target the acting admin or another super admin.
fn guard_admin_action(actor_id: Uuid, target: &User) -> ApiResult<()> {
    if target.id == actor_id {
        return Err(ApiError::BadRequest(
            "You cannot perform this action on your own account".to_string(),
        ));
    }
    if target.role == UserRole::SuperAdmin {
        return Err(ApiError::Forbidden(
            "Super admin accounts cannot be modified this way".to_string(),
        ));
    }
    Ok(())
}

/// Credits `points` inside the caller's transaction and returns the new score.
pub(crate) async fn add_score(conn: &mut PgConnection, user_id: Uuid, points: i64) -> ApiResult<i64> {
    let score: i64 = sqlx::query_scalar(
        "UPDATE users SET score = score + $2, updated_at = NOW() WHERE id = $1 RETURNING score",
    )
    .bind(user_id)
    .bind(points)
    .fetch_one(conn)
    .await?;

    Ok(score)
}
