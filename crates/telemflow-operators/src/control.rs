//! The operator-facing side of the control plane.
//!
//! Exec owns the concrete implementation. Operators keep a `Control` handle
//! and use it to fail the run, report warnings, size their batches and look
//! up reference data.

use std::path::Path;
use std::rc::Rc;

use telemflow_core::prelude::{ConceptsMap, ElementType, Error, Schema};

pub trait ControlPlane {
    /// Record a fatal error. Only the first call has an effect.
    fn abort(&self, error: Error);

    /// Record a non-fatal problem.
    fn warn(&self, error: Error);

    /// Preferred batch size: rows for events, bytes for byte chunks.
    fn demand(&self, element: ElementType) -> usize;

    /// Schemas known to the host.
    fn schemas(&self) -> &[Schema];

    /// Concept name → field names.
    fn concepts(&self) -> &ConceptsMap;

    fn is_aborted(&self) -> bool;

    /// Claim an output file for this run. Returns `true` only for the first
    /// claim of `path`; that caller truncates, later ones append.
    fn claim_output(&self, path: &Path) -> bool;

    /// Schema name given to events decoded from JSON.
    fn json_schema_name(&self) -> &str {
        "json"
    }
}

/// Shared handle passed to every operator instance of a run.
pub type Control = Rc<dyn ControlPlane>;

/// Indices of the schema fields `name` refers to: the field itself if it
/// exists, otherwise every field of the concept `name` present in `schema`,
/// in concept order.
pub fn resolve_field(schema: &Schema, name: &str, concepts: &ConceptsMap) -> Vec<usize> {
    if let Some(idx) = schema.index_of(name) {
        return vec![idx];
    }
    concepts
        .get(name)
        .map(|fields| fields.iter().filter_map(|f| schema.index_of(f)).collect())
        .unwrap_or_default()
}
