#![forbid(unsafe_code)]
//! telemflow-io: format adapters used by source and sink operators.
//!
//! The engine never sees these types. Operators wrap them behind the
//! physical-operator interface, so swapping formats never touches exec.

pub mod buf;
pub mod error;
pub mod readers;
pub mod writers;

pub use buf::ChunkReader;
pub use error::{Error, Result};
pub use readers::jsonl::{EventBuilder, JsonlReader};
pub use writers::jsonl::JsonlWriter;
