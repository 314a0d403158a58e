use serde::{Deserialize, Serialize};

/// A closed `NONE < WARNING < ERROR` ordering so that "level greater than
/// allowed" (spec.md §4.1 step 5, §3 `allowed_validation_level`) is a plain
/// `>` comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationLevel {
    None,
    Warning,
    Error,
}

/// The result of running a single Validator against a Batch's
/// `transform_data`. `validator` names the component that produced the
/// result so that a `ValidationError` can be reported without the caller
/// needing to keep its own index into `schema.validators`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub level: ValidationLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub validator: String,
}

impl ValidationResult {
    pub fn new(validator: impl Into<String>, level: ValidationLevel) -> Self {
        Self {
            level,
            message: None,
            validator: validator.into(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn exceeds(&self, allowed: ValidationLevel) -> bool {
        self.level > allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_severity() {
        assert!(ValidationLevel::None < ValidationLevel::Warning);
        assert!(ValidationLevel::Warning < ValidationLevel::Error);
    }

    #[test]
    fn exceeds_is_strict() {
        let result = ValidationResult::new("my-validator", ValidationLevel::Warning);
        assert!(!result.exceeds(ValidationLevel::Warning));
        assert!(result.exceeds(ValidationLevel::None));
        assert!(!result.exceeds(ValidationLevel::Error));
    }
}
