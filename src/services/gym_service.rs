use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{UserRole, UserSession};
use crate::error::{ApiError, ApiResult};
use crate::models::validation::clean_list;
use crate::models::{CreateGymRequest, Gym, GymWithRooms, TrainingRoom, UpdateGymRequest, User};

#[derive(Debug, Clone)]
pub struct GymService {
    db: PgPool,
}

impl GymService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_gym(&self, gym_id: Uuid) -> ApiResult<Gym> {
        sqlx::query_as::<_, Gym>("SELECT * FROM gyms WHERE id = $1")
            .bind(gym_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Gym"))
    }

    /// Gym visible to the caller: super admins see all, owners see their own.
    pub async fn get_gym_for(&self, session: &UserSession, gym_id: Uuid) -> ApiResult<Gym> {
        let gym = self.get_gym(gym_id).await?;
        ensure_can_view(session, &gym)?;
        Ok(gym)
    }

    pub async fn list_gyms_for(&self, session: &UserSession) -> ApiResult<Vec<Gym>> {
        let gyms = match session.role {
            UserRole::SuperAdmin => {
                sqlx::query_as::<_, Gym>("SELECT * FROM gyms ORDER BY name")
                    .fetch_all(&self.db)
                    .await?
            }
            UserRole::GymOwner => {
                sqlx::query_as::<_, Gym>("SELECT * FROM gyms WHERE owner_id = $1 ORDER BY name")
                    .bind(session.user_id)
                    .fetch_all(&self.db)
                    .await?
            }
            UserRole::Client => {
                return Err(ApiError::Forbidden(
                    "Clients cannot browse gym administration data".to_string(),
                ))
            }
        };

        Ok(gyms)
    }

    pub async fn list_gyms_with_rooms_for(&self, session: &UserSession) -> ApiResult<Vec<GymWithRooms>> {
        let gyms = self.list_gyms_for(session).await?;
        let gym_ids: Vec<Uuid> = gyms.iter().map(|g| g.id).collect();

        let rooms = sqlx::query_as::<_, TrainingRoom>(
            "SELECT * FROM training_rooms WHERE gym_id = ANY($1) ORDER BY name",
        )
        .bind(&gym_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(attach_rooms(gyms, rooms))
    }

    pub async fn get_gym_with_rooms_for(&self, session: &UserSession, gym_id: Uuid) -> ApiResult<GymWithRooms> {
        let gym = self.get_gym_for(session, gym_id).await?;
        let training_rooms = sqlx::query_as::<_, TrainingRoom>(
            "SELECT * FROM training_rooms WHERE gym_id = $1 ORDER BY name",
        )
        .bind(gym_id)
        .fetch_all(&self.db)
        .await?;

        Ok(GymWithRooms { gym, training_rooms })
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_gym(&self, request: CreateGymRequest) -> ApiResult<Gym> {
        self.ensure_gym_owner(request.owner_id).await?;
        let now = Utc::now();

        let gym = sqlx::query_as::<_, Gym>(
            r#"
            INSERT INTO gyms (id, name, address, contact_email, contact_phone, description,
                              equipment, activities, owner_id, is_approved, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.name.trim())
        .bind(request.address.trim())
        .bind(request.contact_email.trim().to_lowercase())
        .bind(request.contact_phone)
        .bind(request.description)
        .bind(clean_list(request.equipment))
        .bind(clean_list(request.activities))
        .bind(request.owner_id)
        .bind(request.is_approved)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(gym_id = %gym.id, owner_id = %gym.owner_id, "Created gym");
        Ok(gym)
    }

    pub async fn update_gym(&self, gym_id: Uuid, request: UpdateGymRequest) -> ApiResult<Gym> {
        if let Some(owner_id) = request.owner_id {
            self.ensure_gym_owner(owner_id).await?;
        }

        sqlx::query_as::<_, Gym>(
            r#"
            UPDATE gyms SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                contact_email = COALESCE($4, contact_email),
                contact_phone = COALESCE($5, contact_phone),
                description = COALESCE($6, description),
                equipment = COALESCE($7, equipment),
                activities = COALESCE($8, activities),
                owner_id = COALESCE($9, owner_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(gym_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.address.as_deref().map(str::trim))
        .bind(request.contact_email.map(|e| e.trim().to_lowercase()))
        .bind(request.contact_phone)
        .bind(request.description)
        .bind(request.equipment.map(clean_list))
        .bind(request.activities.map(clean_list))
        .bind(request.owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Gym"))
    }

    pub async fn set_approval(&self, gym_id: Uuid, is_approved: bool) -> ApiResult<Gym> {
        let gym = sqlx::query_as::<_, Gym>(
            "UPDATE gyms SET is_approved = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(gym_id)
        .bind(is_approved)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Gym"))?;

        tracing::info!(gym_id = %gym.id, is_approved, "Changed gym approval");
        Ok(gym)
    }

    pub async fn delete_gym(&self, gym_id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM gyms WHERE id = $1")
            .bind(gym_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Gym"));
        }

        tracing::info!(gym_id = %gym_id, "Deleted gym and its training rooms");
        Ok(())
    }

    async fn ensure_gym_owner(&self, owner_id: Uuid) -> ApiResult<()> {
        let owner = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Owner"))?;

        if owner.role != UserRole::GymOwner || !owner.is_active {
            return Err(ApiError::BadRequest(
                "The owner must be an active gym owner".to_string(),
            ));
        }

        Ok(())
    }
}

/// Super admins see every gym; owners only their own.
pub fn ensure_can_view(session: &UserSession, gym: &Gym) -> ApiResult<()> {
    match session.role {
        UserRole::SuperAdmin => Ok(()),
        UserRole::GymOwner if gym.owner_id == session.user_id => Ok(()),
        _ => Err(ApiError::Forbidden("You do not have access to this gym".to_string())),
    }
}

fn attach_rooms(gyms: Vec<Gym>, rooms: Vec<TrainingRoom>) -> Vec<GymWithRooms> {
    let mut result: Vec<GymWithRooms> = gyms
        .into_iter()
        .map(|gym| GymWithRooms {
            gym,
            training_rooms: Vec::new(),
        })
        .collect();

    for room in rooms {
        if let Some(entry) = result.iter_mut().find(|g| g.gym.id == room.gym_id) {
            entry.training_rooms.push(room);
        }
    }

    result
}
