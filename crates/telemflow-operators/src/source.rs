//! Sources: `from <path>` (JSONL events) and `load <path>` (raw bytes).
//!
//! Both open their file at instantiation, so a missing file fails the run
//! before any batch is produced. Batch sizes follow the control plane's
//! demand. A malformed JSON line is a warning, not an error.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use telemflow_core::prelude::{Batch, ElementType, Error, Schema};
use telemflow_io::{ChunkReader, JsonlReader};

use crate::args::{quote, single_arg};
use crate::control::Control;
use crate::registry::ArgsPlugin;
use crate::traits::{LogicalOperator, OpError, PhysicalOperator};

#[derive(Debug, Clone)]
pub struct FromJsonl {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Load {
    pub path: PathBuf,
}

pub fn from_plugin() -> ArgsPlugin {
    ArgsPlugin::new("from", |args| {
        Ok(Arc::new(FromJsonl {
            path: single_arg("from", args)?.into(),
        }))
    })
}

pub fn load_plugin() -> ArgsPlugin {
    ArgsPlugin::new("load", |args| {
        Ok(Arc::new(Load {
            path: single_arg("load", args)?.into(),
        }))
    })
}

impl fmt::Display for FromJsonl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "from {}", quote(&self.path.to_string_lossy(), false))
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load {}", quote(&self.path.to_string_lossy(), false))
    }
}

fn open(path: &Path) -> Result<File, OpError> {
    File::open(path).map_err(|e| {
        OpError::Io(telemflow_io::Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        )))
    })
}

impl LogicalOperator for FromJsonl {
    fn name(&self) -> &'static str {
        "from"
    }

    fn input_element_type(&self) -> ElementType {
        ElementType::Void
    }

    fn output_element_type(&self) -> ElementType {
        ElementType::Events
    }

    fn instantiate(
        &self,
        _input_schema: Option<&Arc<Schema>>,
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        let file = open(&self.path)?;
        let rows = ctrl.demand(ElementType::Events);
        let mut reader = JsonlReader::new(BufReader::new(file), ctrl.json_schema_name(), rows);
        let ctrl = ctrl.clone();
        let mut done = false;
        tracing::debug!(path = %self.path.display(), rows, "opened jsonl source");
        Ok(PhysicalOperator::source(std::iter::from_fn(move || {
            if done {
                return None;
            }
            match reader.next_batch() {
                Ok(Some(events)) => Some(Batch::Events(events)),
                Ok(None) => {
                    done = true;
                    None
                }
                Err(e) if e.is_recoverable() => {
                    ctrl.warn(Error::Decode(e.to_string()));
                    Some(Batch::Empty)
                }
                Err(e) => {
                    done = true;
                    ctrl.abort(Error::runtime("from", e));
                    None
                }
            }
        })))
    }
}

impl LogicalOperator for Load {
    fn name(&self) -> &'static str {
        "load"
    }

    fn input_element_type(&self) -> ElementType {
        ElementType::Void
    }

    fn output_element_type(&self) -> ElementType {
        ElementType::Bytes
    }

    fn instantiate(
        &self,
        _input_schema: Option<&Arc<Schema>>,
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        let file = open(&self.path)?;
        let mut reader = ChunkReader::new(file, ctrl.demand(ElementType::Bytes));
        let ctrl = ctrl.clone();
        let mut done = false;
        Ok(PhysicalOperator::source(std::iter::from_fn(move || {
            if done {
                return None;
            }
            match reader.next_chunk() {
                Ok(Some(chunk)) => Some(Batch::Bytes(chunk)),
                Ok(None) => {
                    done = true;
                    None
                }
                Err(e) => {
                    done = true;
                    ctrl.abort(Error::runtime("load", e));
                    None
                }
            }
        })))
    }
}
