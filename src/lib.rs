#![forbid(unsafe_code)]
//! telemflow: parse and run pipelines over schema-tagged event batches.
//!
//! This crate re-exports the workspace crates under one name:
//!
//! ```no_run
//! use telemflow::{Pipeline, PipelineExt};
//!
//! let pipeline = Pipeline::parse("from conn.jsonl | where port == 22 | write ssh.jsonl")?;
//! for tick in pipeline.execute() {
//!     tick?;
//! }
//! # Ok::<(), telemflow::Error>(())
//! ```

pub use telemflow_core as core;
pub use telemflow_exec as exec;
pub use telemflow_io as io;
pub use telemflow_operators as operators;
pub use telemflow_planner as planner;

pub use telemflow_core::prelude::{Error, Result};
pub use telemflow_exec::{Engine, Execution, PipelineExt, RunReport, RunStats};
pub use telemflow_planner::Pipeline;
