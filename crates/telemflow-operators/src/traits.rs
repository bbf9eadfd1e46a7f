//! Operator traits + common interfaces.
//!
//! Exec calls `instantiate(...)` once per distinct input schema it observes
//! and then pulls the resulting `BatchStream` cooperatively. A stream must
//! yield at least once per output batch and must yield `Batch::Empty` instead
//! of blocking when it needs more input.

use std::fmt;
use std::sync::Arc;

use telemflow_core::prelude::{Batch, ElementType, Schema};
use thiserror::Error;

use crate::control::Control;

/// A lazily evaluated sequence of batches.
pub type BatchStream = Box<dyn Iterator<Item = Batch>>;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Schema(String),

    #[error("{0}")]
    Exec(String),

    #[error(transparent)]
    Io(#[from] telemflow_io::Error),
}

/// A schema-bound runtime instance of a logical operator.
pub enum PhysicalOperator {
    /// Void input: produces batches on its own.
    Source(BatchStream),
    /// Consumes the stage's input stream for one schema.
    Transform(Box<dyn FnOnce(BatchStream) -> BatchStream>),
}

impl PhysicalOperator {
    pub fn source<I>(stream: I) -> Self
    where
        I: Iterator<Item = Batch> + 'static,
    {
        PhysicalOperator::Source(Box::new(stream))
    }

    pub fn transform<F, I>(f: F) -> Self
    where
        F: FnOnce(BatchStream) -> I + 'static,
        I: Iterator<Item = Batch> + 'static,
    {
        PhysicalOperator::Transform(Box::new(move |input: BatchStream| {
            Box::new(f(input)) as BatchStream
        }))
    }

    pub fn is_source(&self) -> bool {
        matches!(self, PhysicalOperator::Source(_))
    }
}

impl fmt::Debug for PhysicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalOperator::Source(_) => f.write_str("PhysicalOperator::Source"),
            PhysicalOperator::Transform(_) => f.write_str("PhysicalOperator::Transform"),
        }
    }
}

/// Trait that all pipeline stages implement.
///
/// Invariants:
/// - Immutable after parsing; `instantiate` may be called many times, once
///   per input schema, and every instance is independent.
/// - `Display` renders the canonical pipeline text that parses back to an
///   equivalent operator.
pub trait LogicalOperator: fmt::Debug + fmt::Display + Send + Sync {
    /// Operator name as registered with the plugin registry (stable).
    fn name(&self) -> &'static str;

    fn input_element_type(&self) -> ElementType;

    fn output_element_type(&self) -> ElementType;

    /// Build the runtime instance for `input_schema`. Sources and byte
    /// consumers receive `None`.
    fn instantiate(
        &self,
        input_schema: Option<&Arc<Schema>>,
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError>;
}
