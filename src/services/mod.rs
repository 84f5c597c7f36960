// Business logic services

pub mod badge_rules;
pub mod badge_service;
pub mod challenge_service;
pub mod exercise_type_service;
pub mod gym_service;
pub mod invitation_service;
pub mod participation_service;
pub mod theme_service;
pub mod training_room_service;
pub mod user_service;

pub use badge_rules::{evaluate_rule, BadgeRule, RuleError};
pub use badge_service::BadgeService;
pub use challenge_service::ChallengeService;
pub use exercise_type_service::ExerciseTypeService;
pub use gym_service::GymService;
pub use invitation_service::InvitationService;
pub use participation_service::ParticipationService;
pub use theme_service::ThemeService;
pub use training_room_service::TrainingRoomService;
pub use user_service::UserService;
