use assert_matches::assert_matches;
use proptest::prelude::*;
use tsness::models::UserStats;
use tsness::services::badge_rules::{Comparison, StatField};
use tsness::services::{evaluate_rule, BadgeRule, RuleError};

fn stats_with_completed(completed_challenges: i64) -> UserStats {
    UserStats {
        completed_challenges,
        ..UserStats::default()
    }
}

#[cfg(test)]
mod badge_rule_tests {
    use super::*;

    #[test]
    fn test_rule_embedded_in_text_is_found() {
        let rule = BadgeRule::parse("award when totalCaloriesBurned > 5000 kcal").unwrap();
        assert_eq!(rule.field, StatField::TotalCaloriesBurned);
        assert_eq!(rule.comparison, Comparison::Greater);
        assert_eq!(rule.threshold, 5000);
    }

    #[test]
    fn test_unknown_statistic_is_rejected() {
        assert_matches!(
            BadgeRule::parse("marathonsRun >= 1"),
            Err(RuleError::UnknownStatistic(name)) if name == "marathonsRun"
        );
        assert!(!evaluate_rule("marathonsRun >= 1", &stats_with_completed(10)));
    }

    #[test]
    fn test_fractional_threshold_truncates_and_negative_is_malformed() {
        // Only the integer part is captured, so `2.5` reads as `>= 2`.
        let rule = BadgeRule::parse("averageProgress >= 2.5").unwrap();
        assert_eq!(rule.threshold, 2);
        assert_matches!(BadgeRule::parse("averageProgress >= -3"), Err(RuleError::Malformed(_)));
    }

    #[test]
    fn test_empty_stats_earn_only_zero_thresholds() {
        let empty = UserStats::default();
        assert!(evaluate_rule("completedChallenges >= 0", &empty));
        assert!(!evaluate_rule("completedChallenges >= 1", &empty));
        assert!(evaluate_rule("activeChallenges == 0", &empty));
    }

    proptest! {
        #[test]
        fn prop_threshold_comparison_matches_integer_order(completed in 0i64..500, threshold in 0i64..500) {
            let stats = stats_with_completed(completed);

            prop_assert_eq!(evaluate_rule(&format!("completedChallenges >= {}", threshold), &stats), completed >= threshold);
            prop_assert_eq!(evaluate_rule(&format!("completedChallenges > {}", threshold), &stats), completed > threshold);
            prop_assert_eq!(evaluate_rule(&format!("completedChallenges <= {}", threshold), &stats), completed <= threshold);
            prop_assert_eq!(evaluate_rule(&format!("completedChallenges < {}", threshold), &stats), completed < threshold);
            prop_assert_eq!(evaluate_rule(&format!("completedChallenges == {}", threshold), &stats), completed == threshold);
        }

        #[test]
        fn prop_arbitrary_text_never_panics(rule in "\\PC{0,40}") {
            let _ = evaluate_rule(&rule, &stats_with_completed(3));
        }

        #[test]
        fn prop_whitespace_around_operator_is_ignored(spaces in " {0,4}", threshold in 0i64..100) {
            let rule = format!("activeChallenges{}>={}{}", spaces, spaces, threshold);
            let parsed = BadgeRule::parse(&rule).unwrap();
            prop_assert_eq!(parsed.threshold, threshold);
            prop_assert_eq!(parsed.comparison, Comparison::GreaterOrEqual);
        }
    }
}
