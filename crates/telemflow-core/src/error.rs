use thiserror::Error;

use crate::element::ElementType;

/// Canonical result for the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine-wide error taxonomy.
///
/// Every pipeline error is terminal for its run. The control plane hands the
/// first recorded error back to the driver, hence `Clone`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("failed to parse pipeline '{text}': {reason}")]
    Syntax { text: String, reason: String },

    #[error("failed to parse pipeline '{text}': operator '{name}' does not exist")]
    UnknownOperator { name: String, text: String },

    #[error(
        "unable to execute pipeline: expected {position} type {expected}, got {actual} (operator '{operator}')"
    )]
    InvalidPipelineShape {
        operator: String,
        position: &'static str,
        expected: ElementType,
        actual: ElementType,
    },

    #[error("failed to instantiate operator '{operator}' for schema '{schema}': {reason}")]
    OperatorInstantiation {
        operator: String,
        schema: String,
        reason: String,
    },

    #[error("operator '{operator}' failed: {reason}")]
    OperatorRuntime { operator: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

impl Error {
    /// Shorthand used by operators that fail while producing output.
    pub fn runtime(operator: impl Into<String>, reason: impl ToString) -> Self {
        Error::OperatorRuntime {
            operator: operator.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
