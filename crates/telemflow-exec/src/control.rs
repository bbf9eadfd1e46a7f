//! The control plane of one run.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;
use telemflow_core::prelude::{ConceptsMap, ElementType, EngineConfig, Error, Schema};
use telemflow_operators::ControlPlane;

/// Per-run state shared by every operator instance.
///
/// The error cell is write-once: the first abort wins and later aborts are
/// only logged.
#[derive(Debug, Default)]
pub struct ExecuteCtrl {
    cfg: EngineConfig,
    error: OnceCell<Error>,
    warnings: RefCell<Vec<Error>>,
    /// Output files already opened by a sink during this run.
    outputs: RefCell<HashSet<PathBuf>>,
}

impl ExecuteCtrl {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            error: OnceCell::new(),
            warnings: RefCell::new(Vec::new()),
            outputs: RefCell::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.get()
    }

    /// Warnings recorded so far, in order.
    pub fn warnings(&self) -> Vec<Error> {
        self.warnings.borrow().clone()
    }
}

impl ControlPlane for ExecuteCtrl {
    fn abort(&self, error: Error) {
        if let Err(later) = self.error.set(error) {
            tracing::debug!(error = %later, "ignoring abort after the first");
        }
    }

    fn warn(&self, error: Error) {
        tracing::warn!(%error, "operator warning");
        self.warnings.borrow_mut().push(error);
    }

    fn demand(&self, element: ElementType) -> usize {
        match element {
            ElementType::Events => self.cfg.batch_rows,
            ElementType::Bytes => self.cfg.chunk_bytes,
            ElementType::Void => 0,
        }
    }

    fn schemas(&self) -> &[Schema] {
        &self.cfg.schemas
    }

    fn concepts(&self) -> &ConceptsMap {
        &self.cfg.concepts
    }

    fn is_aborted(&self) -> bool {
        self.error.get().is_some()
    }

    fn json_schema_name(&self) -> &str {
        &self.cfg.json_schema_name
    }

    fn claim_output(&self, path: &Path) -> bool {
        self.outputs.borrow_mut().insert(path.to_path_buf())
    }
}
