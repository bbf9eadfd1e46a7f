#![forbid(unsafe_code)]
//! telemflow-core: the data model shared by every other crate.
//!
//! - `element`: the kinds of values that flow between pipeline stages.
//! - `schema`/`types`: schema identity and the columnar event batch.
//! - `error`: the engine-wide error taxonomy.
//! - `config`: serializable engine configuration.
//!
//! Nothing in here performs IO or drives execution.

pub mod config;
pub mod element;
pub mod error;
pub mod hash;
pub mod prelude;
pub mod schema;
pub mod types;

/// Engine version string used in logs and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
