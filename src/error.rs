//! Error taxonomy for skillio

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, SkillioError>;

#[derive(Debug, Error)]
pub enum SkillioError {
    /// Query normalized to an empty token/phrase set
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A catalog record failed required-field checks
    #[error("schema validation failed for {id}: {reason}")]
    SchemaValidation { id: String, reason: String },

    /// Index snapshot violates an internal invariant
    #[error("index inconsistency: {0}")]
    IndexInconsistency(String),

    /// No Ready snapshot was published within the wait bound
    #[error("index not ready: {0}")]
    IndexNotReady(String),

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SkillioError {
    /// Stable machine-readable code for robot output
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "invalid_query",
            Self::SchemaValidation { .. } => "schema_validation",
            Self::IndexInconsistency(_) => "index_inconsistency",
            Self::IndexNotReady(_) => "index_not_ready",
            Self::SkillNotFound(_) => "skill_not_found",
            Self::Config(_) | Self::MissingConfig(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }
}

impl From<serde_yaml::Error> for SkillioError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SkillioError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(SkillioError::InvalidQuery("x".into()).code(), "invalid_query");
        assert_eq!(
            SkillioError::SchemaValidation {
                id: "a".into(),
                reason: "b".into()
            }
            .code(),
            "schema_validation"
        );
        assert_eq!(SkillioError::MissingConfig("x".into()).code(), "config");
    }

    #[test]
    fn test_schema_validation_message() {
        let err = SkillioError::SchemaValidation {
            id: "pdf-tools".into(),
            reason: "missing version".into(),
        };
        assert_eq!(
            err.to_string(),
            "schema validation failed for pdf-tools: missing version"
        );
    }
}
