//! Error types surfaced at the core's boundary.

use serde::Serialize;
use thiserror::Error;

/// One rejected field of a boundary input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every violation found in a single input, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("validation failed: {}", summary(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `field` already has a recorded violation.
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl CoreError {
    pub fn plant_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: "plant",
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_lists_every_violation() {
        let mut errs = ValidationErrors::default();
        errs.push("ph", "pH must be between 0 and 14");
        errs.push("humidity", "Humidity must be between 0 and 100");
        assert_eq!(
            errs.to_string(),
            "validation failed: pH must be between 0 and 14; Humidity must be between 0 and 100"
        );
        assert!(errs.contains("ph"));
        assert!(!errs.contains("temperature"));
        assert_eq!(errs.fields().collect::<Vec<_>>(), vec!["ph", "humidity"]);
    }

    #[test]
    fn empty_errors_yield_value() {
        assert_eq!(ValidationErrors::default().into_result(5), Ok(5));
    }
}
