use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::validation::{validate_non_empty_list, validate_not_blank};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExerciseType {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub targeted_muscles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExerciseTypeRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: String,
    #[validate(custom(function = "validate_non_empty_list"))]
    pub targeted_muscles: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateExerciseTypeRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub description: Option<String>,
    pub targeted_muscles: Option<Vec<String>>,
}

impl UpdateExerciseTypeRequest {
    /// `Validate` covers the scalar fields; the muscle list needs its own check.
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        if let Some(muscles) = &self.targeted_muscles {
            if let Err(err) = validate_non_empty_list(muscles) {
                let mut errors = validator::ValidationErrors::new();
                errors.add("targeted_muscles", err);
                return Err(errors);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targeted_muscles_required() {
        let request = CreateExerciseTypeRequest {
            name: "Squat".into(),
            description: "Lower body compound lift".into(),
            targeted_muscles: vec![],
        };
        assert!(request
            .validate()
            .unwrap_err()
            .field_errors()
            .contains_key("targeted_muscles"));
    }

    #[test]
    fn test_update_checks_muscles_when_present() {
        let request = UpdateExerciseTypeRequest {
            targeted_muscles: Some(vec!["".into()]),
            ..Default::default()
        };
        assert!(request.validate_all().is_err());

        let request = UpdateExerciseTypeRequest {
            name: Some("Deadlift".into()),
            ..Default::default()
        };
        assert!(request.validate_all().is_ok());

        let request = UpdateExerciseTypeRequest {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(request.validate_all().is_err());
    }
}
