#![forbid(unsafe_code)]
//! telemflow-exec: runs a validated `Pipeline` as nested lazy batch streams.
//!
//! Execution is single-threaded and pull-driven. The driver pulls the last
//! stage; every stage after the first is a `SchemaMultiplexer` that fans
//! batches out to one physical operator per input schema through a
//! `bridge`. Operators report back only through the `ExecuteCtrl`; the driver
//! checks it after every pulled element.

pub mod bridge;
pub mod control;
pub mod metrics;
pub mod mux;
pub mod runtime;

pub use control::ExecuteCtrl;
pub use metrics::RunStats;
pub use runtime::{make_run, Engine, Execution, PipelineExt, RunReport};
