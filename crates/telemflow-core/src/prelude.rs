//! Convenient re-exports for downstream crates.

pub use crate::config::{ConceptsMap, EngineConfig};
pub use crate::element::ElementType;
pub use crate::error::{Error, Result};
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::{Batch, Chunk, EventBatch, Scalar};
