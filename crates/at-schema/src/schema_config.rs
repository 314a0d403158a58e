use at_core::ValidationLevel;
use orion_error::StructError;

use crate::error::SchemaReason;

/// Per-schema configuration (spec.md §3). `max_submissions`, when present,
/// MUST be positive — matching
/// `original_source/autotransform/schema/config.py`'s
/// `max_submissions_is_positive` validator.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaConfig {
    pub schema_name: String,
    pub allowed_validation_level: ValidationLevel,
    pub max_submissions: Option<u32>,
    pub owners: Vec<String>,
}

impl SchemaConfig {
    pub fn new(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            allowed_validation_level: ValidationLevel::None,
            max_submissions: None,
            owners: Vec::new(),
        }
    }

    pub fn with_allowed_validation_level(mut self, level: ValidationLevel) -> Self {
        self.allowed_validation_level = level;
        self
    }

    pub fn with_max_submissions(mut self, max: Option<u32>) -> Result<Self, StructError<SchemaReason>> {
        if let Some(0) = max {
            return Err(StructError::from(SchemaReason::InvalidConfig(
                "max_submissions must be positive".into(),
            )));
        }
        self.max_submissions = max;
        Ok(self)
    }

    pub fn with_owners(mut self, owners: Vec<String>) -> Self {
        self.owners = owners;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_submissions_is_rejected() {
        let err = SchemaConfig::new("s").with_max_submissions(Some(0)).unwrap_err();
        assert!(format!("{err}").contains("positive"));
    }

    #[test]
    fn builder_applies_fields() {
        let config = SchemaConfig::new("s")
            .with_allowed_validation_level(ValidationLevel::Warning)
            .with_owners(vec!["alice".into()]);
        assert_eq!(config.allowed_validation_level, ValidationLevel::Warning);
        assert_eq!(config.owners, vec!["alice".to_string()]);
    }
}
