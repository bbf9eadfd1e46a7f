#![forbid(unsafe_code)]
//! telemflow-operators: pipeline stages and the plugins that parse them.
//!
//! Design intent:
//! - A `LogicalOperator` is what a plugin parses out of pipeline text. It is
//!   immutable and knows its input/output element types.
//! - A `PhysicalOperator` is what exec instantiates from it for one input
//!   schema: a lazy `BatchStream` producer, pulled one batch at a time.
//! - Operators talk back to the run only through the `ControlPlane`.
//! - Everything physical is single-threaded; nothing here spawns or blocks.

pub mod args;
pub mod control;
pub mod registry;
pub mod stream;
pub mod traits;

pub mod aggregate;
pub mod codec;
pub mod filter;
pub mod map;
pub mod pass;
pub mod project;
pub mod sink;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use control::{Control, ControlPlane};
pub use registry::{OperatorPlugin, PluginRegistry, Registry};
pub use traits::{BatchStream, LogicalOperator, OpError, PhysicalOperator};
