//! Small adaptors for building physical operators out of per-batch functions.
//!
//! Stalls (`Batch::Empty` and other zero-sized batches) pass straight through,
//! so operators built with these helpers yield exactly once per input they
//! pull. Errors abort the run through the control plane and turn into a stall
//! so the driver gets control back and observes the abort.

use telemflow_core::prelude::{Batch, Chunk, ElementType, Error, EventBatch};

use crate::control::Control;
use crate::traits::{BatchStream, OpError};

/// Abort the run because `batch` has the wrong element type for `operator`.
pub fn unexpected_batch(operator: &str, expected: ElementType, batch: &Batch, ctrl: &Control) {
    ctrl.abort(Error::Invariant(format!(
        "operator '{operator}' expected {expected}, got {}",
        batch.element_type()
    )));
}

pub fn map_events<F>(
    operator: &'static str,
    input: BatchStream,
    ctrl: Control,
    mut f: F,
) -> impl Iterator<Item = Batch>
where
    F: FnMut(EventBatch) -> Result<Batch, OpError> + 'static,
{
    input.map(move |batch| match batch {
        stall if stall.is_empty() => Batch::Empty,
        Batch::Events(events) => f(events).unwrap_or_else(|e| {
            ctrl.abort(Error::runtime(operator, e));
            Batch::Empty
        }),
        other => {
            unexpected_batch(operator, ElementType::Events, &other, &ctrl);
            Batch::Empty
        }
    })
}

pub fn map_bytes<F>(
    operator: &'static str,
    input: BatchStream,
    ctrl: Control,
    mut f: F,
) -> impl Iterator<Item = Batch>
where
    F: FnMut(Chunk) -> Result<Batch, OpError> + 'static,
{
    input.map(move |batch| match batch {
        stall if stall.is_empty() => Batch::Empty,
        Batch::Bytes(chunk) => f(chunk).unwrap_or_else(|e| {
            ctrl.abort(Error::runtime(operator, e));
            Batch::Empty
        }),
        other => {
            unexpected_batch(operator, ElementType::Bytes, &other, &ctrl);
            Batch::Empty
        }
    })
}
