#![forbid(unsafe_code)]
//! telemflow-planner: pipeline text → ordered logical operators.
//!
//! Design:
//! - `Pipeline` owns the parsed `LogicalOperator`s; it never mutates them.
//! - Parsing delegates each stage's arguments to the operator's plugin, so
//!   this crate only knows how to read operator names.
//! - `validate` checks element types between stages before anything runs.
//! - `dsl::yaml` reads pipeline documents that also carry engine settings.

pub mod dsl;
pub mod pipeline;

pub use dsl::yaml::{parse_yaml_pipeline, ParsedPipeline, PipelineConfig};
pub use pipeline::{Pipeline, StageInfo};
