use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serial_test::serial;
use sqlx::PgPool;

use crate::common::{MockDataGenerator, TestDatabase};
use tsness::auth::UserRole;
use tsness::error::ApiError;
use tsness::models::*;
use tsness::services::*;

struct Services {
    users: UserService,
    gyms: GymService,
    rooms: TrainingRoomService,
    exercise_types: ExerciseTypeService,
    themes: ThemeService,
    challenges: ChallengeService,
}

impl Services {
    fn new(pool: PgPool) -> Self {
        let badges = BadgeService::new(pool.clone());
        Self {
            users: UserService::new(pool.clone()),
            gyms: GymService::new(pool.clone()),
            rooms: TrainingRoomService::new(pool.clone()),
            exercise_types: ExerciseTypeService::new(pool.clone()),
            themes: ThemeService::new(pool.clone()),
            challenges: ChallengeService::new(pool, badges),
        }
    }

    async fn user(&self, role: UserRole) -> User {
        self.users
            .create_user(MockDataGenerator::create_user_request(), role)
            .await
            .unwrap()
    }

    async fn gym(&self, owner: &User, name: &str) -> Gym {
        let mut request = MockDataGenerator::create_gym_request(owner.id);
        request.name = name.to_string();
        self.gyms.create_gym(request).await.unwrap()
    }
}

fn room_request(gym_id: uuid::Uuid, name: &str, exercise_type_id: Option<uuid::Uuid>) -> CreateTrainingRoomRequest {
    CreateTrainingRoomRequest {
        name: name.to_string(),
        capacity: 20,
        equipment: vec!["mats".to_string()],
        features: Vec::new(),
        difficulty_level: None,
        assigned_exercise_type_id: exercise_type_id,
        gym_id,
    }
}

#[cfg(test)]
mod admin_flow_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    #[serial]
    async fn test_gym_owner_only_sees_own_gyms_and_rooms() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let admin = services.user(UserRole::SuperAdmin).await;
        let alice = services.user(UserRole::GymOwner).await;
        let bob = services.user(UserRole::GymOwner).await;
        let alice_gym = services.gym(&alice, "Alice Fitness").await;
        let bob_gym = services.gym(&bob, "Bob Barbell Club").await;

        let alice_session = MockDataGenerator::session(&alice);
        let alice_room = services
            .rooms
            .create_room(&alice_session, room_request(alice_gym.id, "Cardio A", None))
            .await
            .unwrap();
        assert!(!alice_room.is_approved);
        let bob_room = services
            .rooms
            .create_room(&MockDataGenerator::session(&bob), room_request(bob_gym.id, "Strength B", None))
            .await
            .unwrap();

        let gyms = services.gyms.list_gyms_for(&alice_session).await.unwrap();
        let names: Vec<&str> = gyms.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Alice Fitness"]);
        assert_matches!(
            services.gyms.get_gym_for(&alice_session, bob_gym.id).await,
            Err(ApiError::Forbidden(_))
        );

        let rooms = services.rooms.list_rooms_for(&alice_session).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, alice_room.id);

        assert_matches!(
            services.rooms.get_room_details(&alice_session, bob_room.id).await,
            Err(ApiError::Forbidden(_))
        );
        assert_matches!(
            services
                .rooms
                .change_gym(&alice_session, alice_room.id, ChangeGymRequest { gym_id: bob_gym.id })
                .await,
            Err(ApiError::Forbidden(_))
        );
        assert_matches!(
            services.rooms.delete_room(&alice_session, bob_room.id).await,
            Err(ApiError::Forbidden(_))
        );

        let admin_session = MockDataGenerator::session(&admin);
        assert_eq!(services.gyms.list_gyms_for(&admin_session).await.unwrap().len(), 2);
        assert_eq!(services.rooms.list_rooms_for(&admin_session).await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_exercise_type_in_use_cannot_be_deleted() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let owner = services.user(UserRole::GymOwner).await;
        let gym = services.gym(&owner, "Core Studio").await;
        let exercise_type = services
            .exercise_types
            .create(CreateExerciseTypeRequest {
                name: "Plank".to_string(),
                description: "Static core hold".to_string(),
                targeted_muscles: vec!["Abdominals".to_string()],
            })
            .await
            .unwrap();

        let session = MockDataGenerator::session(&owner);
        for name in ["Core Room", "Mat Room"] {
            services
                .rooms
                .create_room(&session, room_request(gym.id, name, Some(exercise_type.id)))
                .await
                .unwrap();
        }

        let err = services.exercise_types.delete(exercise_type.id).await.unwrap_err();
        match err {
            ApiError::BadRequest(message) => {
                assert!(message.contains("Core Room"), "{}", message);
                assert!(message.contains("Mat Room"), "{}", message);
            }
            other => panic!("expected bad request, got {:?}", other),
        }
        assert!(services.exercise_types.get(exercise_type.id).await.is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_soft_deleted_users_are_hidden_from_listing() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let admin = services.user(UserRole::SuperAdmin).await;
        let kept = services.user(UserRole::Client).await;
        let removed = services.user(UserRole::Client).await;

        services.users.soft_delete(admin.id, removed.id).await.unwrap();

        let listed = services.users.list_users(&UserListQuery::default()).await.unwrap();
        let ids: Vec<_> = listed.users.iter().map(|u| u.id).collect();
        assert!(ids.contains(&kept.id));
        assert!(!ids.contains(&removed.id));
        assert_eq!(listed.pagination.total_users, 2);

        assert_matches!(
            services.users.soft_delete(admin.id, admin.id).await,
            Err(ApiError::BadRequest(_))
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_permanent_delete_scrubs_participants_and_respects_gym_ownership() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let admin = services.user(UserRole::SuperAdmin).await;
        let creator = services.user(UserRole::Client).await;
        let member = services.user(UserRole::Client).await;
        let owner = services.user(UserRole::GymOwner).await;
        services.gym(&owner, "Owned Gym").await;

        let challenge = services
            .challenges
            .create(
                &MockDataGenerator::session(&creator),
                MockDataGenerator::create_challenge_request(None),
            )
            .await
            .unwrap();
        services.challenges.participate(creator.id, challenge.id).await.unwrap();
        services.challenges.participate(member.id, challenge.id).await.unwrap();

        services.users.permanent_delete(admin.id, member.id).await.unwrap();

        let challenge = services.challenges.get(challenge.id).await.unwrap();
        assert!(challenge.participant(member.id).is_none());
        assert!(challenge.participant(creator.id).is_some());
        assert_matches!(services.users.get_user(member.id).await, Err(ApiError::NotFound(_)));

        assert_matches!(
            services.users.permanent_delete(admin.id, owner.id).await,
            Err(ApiError::Conflict(_))
        );
        assert!(services.users.get_user(owner.id).await.is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_theme_crud_derives_slug() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let theme = services
            .themes
            .create(CreateThemeRequest {
                name: "  Golden Champion ".to_string(),
                description: "For the very best".to_string(),
                slug: None,
                colors: ThemeTier::Champion.palette(),
                is_active: true,
            })
            .await
            .unwrap();
        assert_eq!(theme.name, "Golden Champion");
        assert_eq!(theme.slug, "golden-champion");

        let found = services.themes.find_by_slug("golden-champion").await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(theme.id));

        assert_matches!(
            services
                .themes
                .create(CreateThemeRequest {
                    name: "Golden Champion".to_string(),
                    description: String::new(),
                    slug: None,
                    colors: ThemeTier::Champion.palette(),
                    is_active: true,
                })
                .await,
            Err(ApiError::Conflict(_))
        );

        let updated = services
            .themes
            .update(
                theme.id,
                UpdateThemeRequest {
                    slug: Some("gold".to_string()),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "gold");
        assert!(!updated.is_active);
        assert_eq!(updated.name, "Golden Champion");

        services.themes.delete(theme.id).await.unwrap();
        assert_matches!(services.themes.get(theme.id).await, Err(ApiError::NotFound(_)));
        assert_matches!(services.themes.delete(theme.id).await, Err(ApiError::NotFound(_)));
    }
}
