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
    badges: BadgeService,
    themes: ThemeService,
    challenges: ChallengeService,
    invitations: InvitationService,
    participations: ParticipationService,
}

impl Services {
    fn new(pool: PgPool) -> Self {
        let users = UserService::new(pool.clone());
        let badges = BadgeService::new(pool.clone());
        let challenges = ChallengeService::new(pool.clone(), badges.clone());
        Self {
            gyms: GymService::new(pool.clone()),
            themes: ThemeService::new(pool.clone()),
            invitations: InvitationService::new(pool.clone(), challenges.clone()),
            participations: ParticipationService::new(pool),
            users,
            badges,
            challenges,
        }
    }

    async fn user(&self, role: UserRole) -> User {
        self.users
            .create_user(MockDataGenerator::create_user_request(), role)
            .await
            .unwrap()
    }
}

fn progress(progress: f64, calories_burned: f64) -> ProgressUpdate {
    ProgressUpdate {
        progress,
        calories_burned,
    }
}

#[cfg(test)]
mod challenge_flow_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    #[serial]
    async fn test_completing_a_challenge_scores_and_awards_badge() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let owner = services.user(UserRole::GymOwner).await;
        let client = services.user(UserRole::Client).await;
        let gym = services
            .gyms
            .create_gym(MockDataGenerator::create_gym_request(owner.id))
            .await
            .unwrap();

        let theme = services
            .themes
            .create(CreateThemeRequest {
                name: "Purple Rookie".to_string(),
                description: "Theme for newcomers".to_string(),
                slug: None,
                colors: ThemeTier::Beginner.palette(),
                is_active: true,
            })
            .await
            .unwrap();
        assert_eq!(theme.slug, "purple-rookie");

        services
            .badges
            .create(CreateBadgeRequest {
                name: "Débutant".to_string(),
                description: "First completed challenge".to_string(),
                icon_url: "/icons/beginner.svg".to_string(),
                rule: "completedChallenges >= 1".to_string(),
                theme_id: Some(theme.id),
            })
            .await
            .unwrap();

        let challenge = services
            .challenges
            .create(
                &MockDataGenerator::session(&owner),
                MockDataGenerator::create_challenge_request(Some(gym.id)),
            )
            .await
            .unwrap();

        services.challenges.participate(client.id, challenge.id).await.unwrap();
        assert_matches!(
            services.challenges.participate(client.id, challenge.id).await,
            Err(ApiError::Conflict(_))
        );

        let first = services
            .challenges
            .update_progress(client.id, challenge.id, progress(60.0, 400.0))
            .await
            .unwrap();
        assert_eq!(first.points_awarded, 60);
        assert!(first.newly_awarded_badges.is_empty());

        let second = services
            .challenges
            .update_progress(client.id, challenge.id, progress(55.0, 300.0))
            .await
            .unwrap();
        assert_eq!(second.participation.progress, 100.0);
        assert_eq!(second.participation.status, ParticipationStatus::Completed);
        assert_eq!(second.points_awarded, 40 + COMPLETION_BONUS);
        assert_eq!(second.newly_awarded_badges.len(), 1);
        assert_eq!(second.newly_awarded_badges[0].name, "Débutant");

        let participant = second.challenge.participant(client.id).unwrap();
        assert_eq!(participant.progress, 100.0);
        assert_eq!(participant.calories_burned, 700.0);

        let user = services.users.get_user(client.id).await.unwrap();
        assert_eq!(user.score, 200);

        let history = services.challenges.sessions(client.id, challenge.id).await.unwrap();
        let logged: Vec<f64> = history.sessions.iter().map(|s| s.progress).collect();
        assert_eq!(logged, vec![60.0, 40.0]);

        // Evaluating again awards nothing new.
        assert!(services.badges.evaluate_and_award(client.id).await.unwrap().is_empty());

        let selected = services.themes.theme_for_user(client.id).await.unwrap();
        assert_eq!(selected.theme_id, Some(theme.id));
        assert_eq!(selected.tier, ThemeTier::Beginner);
    }

    #[tokio::test]
    #[serial]
    async fn test_progress_requires_participation() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let creator = services.user(UserRole::Client).await;
        let outsider = services.user(UserRole::Client).await;
        let challenge = services
            .challenges
            .create(
                &MockDataGenerator::session(&creator),
                MockDataGenerator::create_challenge_request(None),
            )
            .await
            .unwrap();

        assert_matches!(
            services
                .challenges
                .update_progress(outsider.id, challenge.id, progress(10.0, 0.0))
                .await,
            Err(ApiError::BadRequest(_))
        );

        services.challenges.invite(creator.id, challenge.id, outsider.id).await.unwrap();
        assert_matches!(
            services
                .challenges
                .update_progress(outsider.id, challenge.id, progress(10.0, 0.0))
                .await,
            Err(ApiError::BadRequest(_))
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_client_cannot_link_challenge_to_gym() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let owner = services.user(UserRole::GymOwner).await;
        let client = services.user(UserRole::Client).await;
        let gym = services
            .gyms
            .create_gym(MockDataGenerator::create_gym_request(owner.id))
            .await
            .unwrap();

        let result = services
            .challenges
            .create(
                &MockDataGenerator::session(&client),
                MockDataGenerator::create_challenge_request(Some(gym.id)),
            )
            .await;
        assert_matches!(result, Err(ApiError::Forbidden(_)));
    }

    #[tokio::test]
    #[serial]
    async fn test_invitation_accept_and_refuse() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let sender = services.user(UserRole::Client).await;
        let accepting = services.user(UserRole::Client).await;
        let refusing = services.user(UserRole::Client).await;
        let challenge = services
            .challenges
            .create(
                &MockDataGenerator::session(&sender),
                MockDataGenerator::create_challenge_request(None),
            )
            .await
            .unwrap();

        let shared = services
            .challenges
            .share(sender.id, challenge.id, &[accepting.id, refusing.id, accepting.id, sender.id])
            .await
            .unwrap();
        assert_eq!(shared.participants.0.len(), 2);

        assert_matches!(
            services.challenges.invite(sender.id, challenge.id, accepting.id).await,
            Err(ApiError::Conflict(_))
        );

        let pending = services.challenges.pending_invitations(accepting.id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, challenge.id);

        let invitations = services
            .invitations
            .list_for(&MockDataGenerator::session(&accepting))
            .await
            .unwrap();
        assert_eq!(invitations.len(), 1);
        let invitation = &invitations[0];
        assert_eq!(invitation.status, InvitationStatus::Pending);

        // Only the receiver may answer.
        assert_matches!(
            services
                .invitations
                .respond(&MockDataGenerator::session(&sender), invitation.id, InvitationStatus::Accepted)
                .await,
            Err(ApiError::Forbidden(_))
        );

        let answered = services
            .invitations
            .respond(&MockDataGenerator::session(&accepting), invitation.id, InvitationStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(answered.status, InvitationStatus::Accepted);

        let joined = services.participations.list_for_user(accepting.id).await.unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].challenge_title, challenge.title);

        let after_refusal = services.challenges.refuse(refusing.id, challenge.id).await.unwrap();
        assert!(after_refusal.participant(refusing.id).is_none());
        assert_eq!(
            after_refusal.participant(accepting.id).map(|p| p.status),
            Some(ParticipationStatus::Accepted)
        );
        assert!(services.challenges.pending_invitations(refusing.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_leaving_a_challenge_removes_participant() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let creator = services.user(UserRole::Client).await;
        let member = services.user(UserRole::Client).await;
        let challenge = services
            .challenges
            .create(
                &MockDataGenerator::session(&creator),
                MockDataGenerator::create_challenge_request(None),
            )
            .await
            .unwrap();
        services.challenges.participate(member.id, challenge.id).await.unwrap();

        let joined = services.participations.list_for_user(member.id).await.unwrap();
        let participation_id = joined[0].participation.id;

        assert_matches!(
            services.participations.delete_own(creator.id, participation_id).await,
            Err(ApiError::Forbidden(_))
        );
        services.participations.delete_own(member.id, participation_id).await.unwrap();

        let challenge = services.challenges.get(challenge.id).await.unwrap();
        assert!(challenge.participant(member.id).is_none());
        assert!(services.participations.list_for_user(member.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_rejected_progress_leaves_score_untouched() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let creator = services.user(UserRole::Client).await;
        let challenge = services
            .challenges
            .create(
                &MockDataGenerator::session(&creator),
                MockDataGenerator::create_challenge_request(None),
            )
            .await
            .unwrap();
        services.challenges.participate(creator.id, challenge.id).await.unwrap();

        let first = services
            .challenges
            .update_progress(creator.id, challenge.id, progress(10.0, MAX_SESSION_CALORIES))
            .await
            .unwrap();
        assert_eq!(first.points_awarded, 10);

        assert_matches!(
            services
                .challenges
                .update_progress(creator.id, challenge.id, progress(10.0, f64::MAX))
                .await,
            Err(ApiError::Validation(_))
        );

        let user = services.users.get_user(creator.id).await.unwrap();
        assert_eq!(user.score, 10);

        let stored = services.challenges.get(challenge.id).await.unwrap();
        let participant = stored.participant(creator.id).unwrap();
        assert_eq!(participant.progress, 10.0);
        assert_eq!(participant.calories_burned, MAX_SESSION_CALORIES);

        let history = services.challenges.sessions(creator.id, challenge.id).await.unwrap();
        assert_eq!(history.sessions.len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_leaving_while_logging_progress_does_not_deadlock() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let creator = services.user(UserRole::Client).await;
        let challenge = services
            .challenges
            .create(
                &MockDataGenerator::session(&creator),
                MockDataGenerator::create_challenge_request(None),
            )
            .await
            .unwrap();
        services.challenges.participate(creator.id, challenge.id).await.unwrap();
        let participation_id = services.participations.list_for_user(creator.id).await.unwrap()[0]
            .participation
            .id;

        let (logged, left) = tokio::time::timeout(std::time::Duration::from_secs(10), async {
            tokio::join!(
                services
                    .challenges
                    .update_progress(creator.id, challenge.id, progress(20.0, 50.0)),
                services.participations.delete_own(creator.id, participation_id),
            )
        })
        .await
        .expect("progress and leave should not block each other");

        assert_matches!(left, Ok(()));
        assert!(!matches!(logged, Err(ApiError::Database(_))));

        let challenge = services.challenges.get(challenge.id).await.unwrap();
        assert!(challenge.participant(creator.id).is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_deleting_one_of_two_pending_invitations_keeps_receiver_invited() {
        let Some(db) = TestDatabase::try_new().await else { return };
        let services = Services::new(db.pool.clone());

        let first_sender = services.user(UserRole::Client).await;
        let second_sender = services.user(UserRole::Client).await;
        let receiver = services.user(UserRole::Client).await;
        let challenge = services
            .challenges
            .create(
                &MockDataGenerator::session(&first_sender),
                MockDataGenerator::create_challenge_request(None),
            )
            .await
            .unwrap();

        let first = services
            .challenges
            .invite(first_sender.id, challenge.id, receiver.id)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO invitations (id, sender_id, receiver_id, challenge_id, status)
            VALUES ($1, $2, $3, $4, 'pending')
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(second_sender.id)
        .bind(receiver.id)
        .bind(challenge.id)
        .execute(&db.pool)
        .await
        .unwrap();

        services
            .invitations
            .delete(&MockDataGenerator::session(&first_sender), first.id)
            .await
            .unwrap();
        let still_invited = services.challenges.get(challenge.id).await.unwrap();
        assert_eq!(
            still_invited.participant(receiver.id).map(|p| p.status),
            Some(ParticipationStatus::Invited)
        );

        let remaining = services
            .invitations
            .list_for(&MockDataGenerator::session(&receiver))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        services
            .invitations
            .delete(&MockDataGenerator::session(&second_sender), remaining[0].id)
            .await
            .unwrap();
        let withdrawn = services.challenges.get(challenge.id).await.unwrap();
        assert!(withdrawn.participant(receiver.id).is_none());
    }
}
