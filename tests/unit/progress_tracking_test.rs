use chrono::Utc;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use uuid::Uuid;

use tsness::models::*;

fn update(progress: f64, calories_burned: f64) -> ProgressUpdate {
    ProgressUpdate {
        progress,
        calories_burned,
    }
}

#[cfg(test)]
mod progress_tracking_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_participant_and_participation_stay_in_step() {
        let user_id = Uuid::new_v4();
        let mut participant = ChallengeParticipant::new(user_id, ParticipationStatus::Accepted);
        let mut participation = Participation::new_accepted(user_id, Uuid::new_v4(), Utc::now());

        for step in [update(45.0, 300.0), update(45.0, 280.0), update(45.0, 310.0)] {
            let a = participant.apply_progress(&step);
            let b = participation.record_session(&step, Utc::now());
            assert_eq!(a, b);
        }

        assert_eq!(participant.progress, 100.0);
        assert_eq!(participation.progress, 100.0);
        assert_eq!(participant.status, ParticipationStatus::Completed);
        assert_eq!(participation.status, ParticipationStatus::Completed);
        assert_eq!(participation.sessions.0.last().map(|s| s.progress), Some(10.0));
    }

    #[test]
    fn test_completion_bonus_is_granted_once() {
        let mut participation = Participation::new_accepted(Uuid::new_v4(), Uuid::new_v4(), Utc::now());

        let finishing = participation.record_session(&update(100.0, 0.0), Utc::now());
        let after = participation.record_session(&update(20.0, 50.0), Utc::now());

        assert_eq!(finishing.score_points(), 100 + COMPLETION_BONUS);
        assert_eq!(after.score_points(), 0);
        assert_eq!(after.applied_calories, 50.0);
    }

    #[test]
    fn test_user_stats_from_mixed_participations() {
        let now = Utc::now();
        let mut done = Participation::new_accepted(Uuid::new_v4(), Uuid::new_v4(), now);
        done.record_session(&update(100.0, 500.0), now);
        let mut halfway = Participation::new_accepted(Uuid::new_v4(), Uuid::new_v4(), now);
        halfway.record_session(&update(50.0, 100.0), now);

        let stats = UserStats::from_participations(&[done, halfway]);
        assert_eq!(stats.completed_challenges, 1);
        assert_eq!(stats.active_challenges, 1);
        assert_eq!(stats.total_calories_burned, 600.0);
        assert_eq!(stats.average_progress, 75.0);
    }

    proptest! {
        #[test]
        fn prop_progress_is_clamped_and_sessions_sum_to_total(
            steps in prop::collection::vec((0.0f64..=100.0, 0.0f64..1000.0), 1..20)
        ) {
            let mut participation = Participation::new_accepted(Uuid::new_v4(), Uuid::new_v4(), Utc::now());
            let mut completions = 0;

            for (progress, calories) in &steps {
                let outcome = participation.record_session(&update(*progress, *calories), Utc::now());
                prop_assert!(outcome.applied_progress >= 0.0);
                if outcome.newly_completed {
                    completions += 1;
                }
            }

            let logged: f64 = participation.sessions.0.iter().map(|s| s.progress).sum();
            prop_assert!(participation.progress <= MAX_PROGRESS);
            prop_assert!((logged - participation.progress).abs() < 1e-6);
            prop_assert_eq!(participation.sessions.0.len(), steps.len());
            prop_assert!(completions <= 1);
            prop_assert_eq!(
                participation.status == ParticipationStatus::Completed,
                participation.progress >= MAX_PROGRESS
            );
            prop_assert_eq!(participation.completed_at.is_some(), completions == 1);
        }
    }
}
