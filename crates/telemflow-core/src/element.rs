//! Element types: what flows between two adjacent stages.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// No data. Only valid as the input of a source or the output of a sink.
    Void,
    /// Schema-carrying record batches.
    Events,
    /// Raw byte chunks for format-agnostic stages.
    Bytes,
}

impl ElementType {
    pub const fn name(self) -> &'static str {
        match self {
            ElementType::Void => "void",
            ElementType::Events => "events",
            ElementType::Bytes => "bytes",
        }
    }

    pub const fn is_void(self) -> bool {
        matches!(self, ElementType::Void)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
