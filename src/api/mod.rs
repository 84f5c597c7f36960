// API routes and handlers

pub mod auth;
pub mod badges;
pub mod challenges;
pub mod exercise_types;
pub mod gyms;
pub mod health;
pub mod invitations;
pub mod participations;
pub mod profile;
pub mod routes;
pub mod state;
pub mod themes;
pub mod training_rooms;
pub mod users;

use axum::extract::{Path, Query};
use axum::Json;
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::ApiError;

pub use state::AppState;

/// JSON body whose rejections render as the API error envelope.
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;
pub type IdPath = WithRejection<Path<Uuid>, ApiError>;
pub type QueryParams<T> = WithRejection<Query<T>, ApiError>;
