//! Test doubles for operator unit tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use telemflow_core::prelude::*;

use crate::control::{Control, ControlPlane};
use crate::traits::{BatchStream, LogicalOperator, PhysicalOperator};

#[derive(Default)]
pub struct RecordingControl {
    pub error: RefCell<Option<Error>>,
    pub warnings: RefCell<Vec<Error>>,
    pub concepts: ConceptsMap,
    pub demand: usize,
    pub outputs: RefCell<HashSet<PathBuf>>,
}

impl ControlPlane for RecordingControl {
    fn abort(&self, error: Error) {
        let mut slot = self.error.borrow_mut();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    fn warn(&self, error: Error) {
        self.warnings.borrow_mut().push(error);
    }

    fn demand(&self, _element: ElementType) -> usize {
        if self.demand == 0 {
            16
        } else {
            self.demand
        }
    }

    fn schemas(&self) -> &[Schema] {
        &[]
    }

    fn concepts(&self) -> &ConceptsMap {
        &self.concepts
    }

    fn is_aborted(&self) -> bool {
        self.error.borrow().is_some()
    }

    fn claim_output(&self, path: &Path) -> bool {
        self.outputs.borrow_mut().insert(path.to_path_buf())
    }
}

pub fn control_with(recording: RecordingControl) -> (Rc<RecordingControl>, Control) {
    let rc = Rc::new(recording);
    let ctrl: Control = rc.clone();
    (rc, ctrl)
}

pub fn control() -> (Rc<RecordingControl>, Control) {
    control_with(RecordingControl::default())
}

pub fn schema(name: &str, fields: &[(&str, DataType)]) -> Arc<Schema> {
    Arc::new(Schema::new(
        name,
        fields
            .iter()
            .map(|(n, t)| Field::new(*n, *t, true))
            .collect(),
    ))
}

pub fn events(schema: &Arc<Schema>, columns: Vec<Vec<Scalar>>) -> Batch {
    Batch::Events(EventBatch::try_new(Arc::clone(schema), columns).expect("valid test batch"))
}

/// Instantiate `op` for `schema` and run it over `inputs` to completion.
pub fn run_transform(
    op: &dyn LogicalOperator,
    schema: Option<&Arc<Schema>>,
    ctrl: &Control,
    inputs: Vec<Batch>,
) -> Vec<Batch> {
    let physical = op.instantiate(schema, ctrl).expect("instantiate");
    let PhysicalOperator::Transform(f) = physical else {
        panic!("expected a transform");
    };
    let input: BatchStream = Box::new(inputs.into_iter());
    f(input).collect()
}

pub fn non_empty(batches: Vec<Batch>) -> Vec<Batch> {
    batches.into_iter().filter(|b| !b.is_empty()).collect()
}
