use std::fmt;

use async_graphql_parser::Pos;
use serde::Serialize;

/// An error reported while validating an operation.
///
/// Serializes to the shape of a GraphQL response error so a host can hand it
/// to clients as is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Pos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

impl RuleError {
    pub(crate) fn new(locations: Vec<Pos>, message: impl Into<String>) -> Self {
        RuleError {
            message: message.into(),
            locations,
            extensions: None,
        }
    }

    pub(crate) fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions
            .get_or_insert_with(Default::default)
            .insert(key.into(), value);
        self
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, loc) in self.locations.iter().enumerate() {
            if idx == 0 {
                write!(f, "[")?;
            } else {
                write!(f, ", ")?;
            }

            write!(f, "{}:{}", loc.line, loc.column)?;

            if idx == self.locations.len() - 1 {
                write!(f, "] ")?;
            }
        }

        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuleError {}

/// Failures that abort a validation pass as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("no query complexity analyzer is attached to the schema")]
    MissingAnalyzer,
}
