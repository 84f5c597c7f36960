use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health::health_check;
use super::{
    auth, badges, challenges, exercise_types, gyms, invitations, participations, profile,
    themes, training_rooms, users, AppState,
};
use crate::auth::{cors_layer, jwt_auth_middleware, security_headers_layer};

pub fn create_routes(state: AppState) -> Router {
    // Role layers inside each module run after the token check added here.
    let protected = Router::new()
        .nest("/api/users", users::routes())
        .nest("/api/profile", profile::routes())
        .nest("/api/gyms", gyms::routes())
        .nest("/api/training-rooms", training_rooms::routes())
        .nest("/api/exercise-types", exercise_types::routes())
        .nest("/api/challenges", challenges::routes())
        .nest("/api/participations", participations::routes())
        .nest("/api/invitations", invitations::routes())
        .nest("/api/badges", badges::routes())
        .nest("/api/themes", themes::routes())
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth::routes())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(security_headers_layer())
        .layer(cors_layer())
        .with_state(state)
}
