// Domain models and request/response types

pub mod badge;
pub mod challenge;
pub mod common;
pub mod exercise_type;
pub mod gym;
pub mod invitation;
pub mod participation;
pub mod theme;
pub mod training_room;
pub mod user;
pub mod validation;

pub use badge::*;
pub use challenge::*;
pub use common::*;
pub use exercise_type::*;
pub use gym::*;
pub use invitation::*;
pub use participation::*;
pub use theme::*;
pub use training_room::*;
pub use user::*;
