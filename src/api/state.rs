use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::services::{
    BadgeService, ChallengeService, ExerciseTypeService, GymService, InvitationService,
    ParticipationService, ThemeService, TrainingRoomService, UserService,
};

/// Shared handler state. Every service wraps the same pool.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub users: UserService,
    pub gyms: GymService,
    pub training_rooms: TrainingRoomService,
    pub exercise_types: ExerciseTypeService,
    pub challenges: ChallengeService,
    pub participations: ParticipationService,
    pub invitations: InvitationService,
    pub badges: BadgeService,
    pub themes: ThemeService,
}

impl AppState {
    pub fn new(db: PgPool, auth: AuthService) -> Self {
        let users = UserService::new(db.clone());
        let badges = BadgeService::new(db.clone());
        let challenges = ChallengeService::new(db.clone(), badges.clone());

        Self {
            auth,
            users,
            gyms: GymService::new(db.clone()),
            training_rooms: TrainingRoomService::new(db.clone()),
            exercise_types: ExerciseTypeService::new(db.clone()),
            invitations: InvitationService::new(db.clone(), challenges.clone()),
            challenges,
            participations: ParticipationService::new(db.clone()),
            themes: ThemeService::new(db),
            badges,
        }
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
