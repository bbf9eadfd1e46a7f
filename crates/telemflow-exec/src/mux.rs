//! Schema multiplexer: one stage of a run after the first.
//!
//! Owns the physical operators of its stage, keyed by input schema (byte
//! batches share the key `None`). Each operator reads from its own bridge.
//! A new schema instantiates a new operator; an operator is never evicted and
//! is drained exactly once when upstream is exhausted, in first-seen order.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use telemflow_core::prelude::{Batch, Error, Schema};
use telemflow_operators::{BatchStream, Control, LogicalOperator, PhysicalOperator};

use crate::bridge::{bridge, BridgeFeeder, StopFlag};
use crate::metrics::Counters;

type SchemaKey = Option<Arc<Schema>>;

struct Instance {
    schema: SchemaKey,
    output: BatchStream,
    feeder: BridgeFeeder,
    /// The output stream has ended.
    exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MuxState {
    /// Pull the next upstream batch.
    Pulling,
    /// Forward output of the instance that was just fed.
    Draining(usize),
    /// Upstream ended; drain instances from this index on.
    Flushing(usize),
    Done,
}

pub struct SchemaMultiplexer {
    op: Arc<dyn LogicalOperator>,
    input: BatchStream,
    ctrl: Control,
    counters: Rc<Counters>,
    stop: StopFlag,
    instances: Vec<Instance>,
    index: HashMap<SchemaKey, usize>,
    state: MuxState,
}

impl SchemaMultiplexer {
    pub fn new(
        op: Arc<dyn LogicalOperator>,
        input: BatchStream,
        ctrl: Control,
        counters: Rc<Counters>,
    ) -> Self {
        Self {
            op,
            input,
            ctrl,
            counters,
            stop: StopFlag::new(),
            instances: Vec::new(),
            index: HashMap::new(),
            state: MuxState::Pulling,
        }
    }

    /// Number of live physical operators.
    pub fn instances(&self) -> usize {
        self.instances.len()
    }

    /// Route a non-empty batch to its instance. Returns the instance index,
    /// or `None` when the batch was not delivered: the run was aborted or the
    /// instance's output has already ended.
    fn route(&mut self, batch: Batch) -> Option<usize> {
        let expected = self.op.input_element_type();
        if batch.element_type() != expected {
            self.ctrl.abort(Error::Invariant(format!(
                "operator '{}' expected {expected}, got {}",
                self.op.name(),
                batch.element_type()
            )));
            return None;
        }

        let key: SchemaKey = batch.schema().cloned();
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.instantiate(key.clone())?;
                self.index.insert(key, idx);
                idx
            }
        };
        let instance = &self.instances[idx];
        if instance.exhausted {
            tracing::trace!(operator = self.op.name(), "dropping batch for finished operator");
            return None;
        }
        instance.feeder.push(batch);
        Some(idx)
    }

    fn instantiate(&mut self, key: SchemaKey) -> Option<usize> {
        let schema_name = key
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "<bytes>".to_string());
        let physical = match self.op.instantiate(key.as_ref(), &self.ctrl) {
            Ok(physical) => physical,
            Err(e) => {
                self.ctrl.abort(Error::OperatorInstantiation {
                    operator: self.op.name().to_string(),
                    schema: schema_name,
                    reason: e.to_string(),
                });
                return None;
            }
        };
        let PhysicalOperator::Transform(make_output) = physical else {
            self.ctrl.abort(Error::Invariant(format!(
                "operator '{}' produced a source for a non-void input",
                self.op.name()
            )));
            return None;
        };

        let (feeder, stream) = bridge(self.stop.clone());
        let output = make_output(Box::new(stream));
        self.counters.record_instantiation();
        tracing::debug!(
            operator = self.op.name(),
            schema = %schema_name,
            "instantiated physical operator"
        );
        self.instances.push(Instance {
            schema: key,
            output,
            feeder,
            exhausted: false,
        });
        Some(self.instances.len() - 1)
    }
}

impl Iterator for SchemaMultiplexer {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        loop {
            match self.state {
                MuxState::Pulling => match self.input.next() {
                    Some(batch) if batch.is_empty() => {
                        tracing::trace!(operator = self.op.name(), "upstream stalled");
                        return Some(Batch::Empty);
                    }
                    Some(batch) => match self.route(batch) {
                        Some(idx) => self.state = MuxState::Draining(idx),
                        None => return Some(Batch::Empty),
                    },
                    None => {
                        self.stop.set();
                        self.state = MuxState::Flushing(0);
                    }
                },
                MuxState::Draining(idx) => {
                    let instance = &mut self.instances[idx];
                    match instance.output.next() {
                        Some(batch) if batch.is_empty() => {
                            self.state = MuxState::Pulling;
                            return Some(Batch::Empty);
                        }
                        Some(batch) => return Some(batch),
                        None => {
                            instance.exhausted = true;
                            self.state = MuxState::Pulling;
                        }
                    }
                }
                MuxState::Flushing(idx) => {
                    let Some(instance) = self.instances.get_mut(idx) else {
                        self.state = MuxState::Done;
                        return None;
                    };
                    if instance.exhausted {
                        self.state = MuxState::Flushing(idx + 1);
                        continue;
                    }
                    match instance.output.next() {
                        Some(batch) if batch.is_empty() => {
                            // Give the driver a chance to observe an abort.
                            if self.ctrl.is_aborted() {
                                return Some(Batch::Empty);
                            }
                        }
                        Some(batch) => {
                            self.counters.record_drained();
                            return Some(batch);
                        }
                        None => {
                            instance.exhausted = true;
                            tracing::debug!(
                                operator = self.op.name(),
                                schema = instance.schema.as_ref().map(|s| s.name.as_str()).unwrap_or("<bytes>"),
                                "drained physical operator"
                            );
                            self.state = MuxState::Flushing(idx + 1);
                        }
                    }
                }
                MuxState::Done => return None,
            }
        }
    }
}
