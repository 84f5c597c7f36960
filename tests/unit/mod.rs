pub mod badge_rules_test;
pub mod progress_tracking_test;
