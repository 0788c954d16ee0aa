//! Error types for rule compilation, filter execution and rule loading.

use thiserror::Error;

/// Error raised while compiling or applying a rule
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// Malformed rule string or a missing required argument
    #[error("Invalid rule '{rule}': {reason}")]
    Parse { rule: String, reason: String },

    /// A filter rejected its input value
    #[error("Filter '{filter}' failed: {reason}")]
    Conversion { filter: String, reason: String },
}

impl RuleError {
    pub fn parse(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        RuleError::Parse {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    pub fn conversion(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        RuleError::Conversion {
            filter: filter.into(),
            reason: reason.into(),
        }
    }
}

/// The first failure recorded for a single field.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Field '{field}' failed on '{rule}': {cause}")]
pub struct FieldError {
    /// Field key the rule was attached to
    pub field: String,
    /// Filter name (or whole rule string for parse errors) that failed
    pub rule: String,
    #[source]
    pub cause: RuleError,
}

impl FieldError {
    pub fn message(&self) -> String {
        self.cause.to_string()
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self.cause, RuleError::Parse { .. })
    }
}

/// Error loading a rule set from configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule file: {0}")]
    Parse(#[from] serde_yaml::Error),
}
