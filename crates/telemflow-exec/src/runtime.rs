//! Runtime: builds the nested batch streams of a run and drives them.
//!
//! - `make_run` wires one stream per stage: the first stage's source as is,
//!   every later stage behind a `SchemaMultiplexer`.
//! - `Execution` pulls the last stage and turns every pulled element into a
//!   tick, checking the control plane after each one.
//! - `Engine` carries the configuration a run is started with.

use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use telemflow_core::prelude::{EngineConfig, Error, Result};
use telemflow_operators::{BatchStream, Control, LogicalOperator, PhysicalOperator};
use telemflow_planner::Pipeline;

use crate::control::ExecuteCtrl;
use crate::metrics::{emit_span, Counters, RunStats};
use crate::mux::SchemaMultiplexer;

/// Wire the stages of `ops` into one lazy stream. `ops` must be non-empty and
/// shape-checked; the first operator must take `Void`.
pub fn make_run(
    ops: &[Arc<dyn LogicalOperator>],
    ctrl: &Control,
    counters: &Rc<Counters>,
) -> BatchStream {
    let Some((first, rest)) = ops.split_first() else {
        return Box::new(std::iter::empty());
    };

    let mut run: BatchStream = match first.instantiate(None, ctrl) {
        Ok(PhysicalOperator::Source(stream)) => {
            counters.record_instantiation();
            tracing::debug!(operator = first.name(), "instantiated source");
            stream
        }
        Ok(PhysicalOperator::Transform(_)) => {
            ctrl.abort(Error::Invariant(format!(
                "first operator '{}' is not a source",
                first.name()
            )));
            Box::new(std::iter::empty())
        }
        Err(e) => {
            ctrl.abort(Error::OperatorInstantiation {
                operator: first.name().to_string(),
                schema: "<none>".to_string(),
                reason: e.to_string(),
            });
            Box::new(std::iter::empty())
        }
    };

    for op in rest {
        run = Box::new(SchemaMultiplexer::new(
            Arc::clone(op),
            run,
            ctrl.clone(),
            Rc::clone(counters),
        ));
    }
    run
}

/// A running pipeline: a lazy sequence of ticks.
///
/// Yields `Ok(())` for every element pulled from the last stage. A recorded
/// error is yielded exactly once, as the last element. A clean run ends
/// without an error.
pub struct Execution {
    run: Option<BatchStream>,
    ctrl: Rc<ExecuteCtrl>,
    counters: Rc<Counters>,
    pending: Option<Error>,
    done: bool,
    started: Instant,
}

impl Execution {
    fn new(pipeline: &Pipeline, cfg: EngineConfig) -> Self {
        let ctrl = Rc::new(ExecuteCtrl::new(cfg));
        let counters = Rc::new(Counters::default());
        let mut exec = Self {
            run: None,
            ctrl,
            counters,
            pending: None,
            done: false,
            started: Instant::now(),
        };
        if let Err(e) = pipeline.validate() {
            exec.pending = Some(e);
            return exec;
        }
        if pipeline.is_empty() {
            return exec;
        }
        tracing::info!(pipeline = %pipeline, "starting pipeline");
        let control: Control = exec.ctrl.clone();
        exec.run = Some(make_run(pipeline.operators(), &control, &exec.counters));
        exec
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> Vec<Error> {
        self.ctrl.warnings()
    }

    pub fn stats(&self) -> RunStats {
        self.counters.snapshot()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn control(&self) -> &ExecuteCtrl {
        &self.ctrl
    }

    fn finish(&mut self, outcome: Option<Error>) -> Option<Result<()>> {
        self.done = true;
        self.run = None;
        let stats = self.stats();
        let mut kv = stats.to_key_values();
        kv.push(("elapsed_ms", self.elapsed().as_millis().to_string()));
        emit_span("run_finished", &kv);
        match outcome {
            Some(error) => {
                tracing::info!(%error, "pipeline failed");
                Some(Err(error))
            }
            None => {
                tracing::info!(ticks = stats.ticks, "pipeline finished");
                None
            }
        }
    }
}

impl Iterator for Execution {
    type Item = Result<()>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(error) = self.pending.take() {
            self.done = true;
            return Some(Err(error));
        }
        let Some(run) = self.run.as_mut() else {
            self.done = true;
            return None;
        };
        match run.next() {
            Some(batch) => {
                self.counters.record_tick(batch.is_empty());
                if let Some(error) = self.ctrl.error().cloned() {
                    return self.finish(Some(error));
                }
                if !batch.is_empty() {
                    tracing::trace!(rows = batch.len(), "final stage produced data");
                }
                Some(Ok(()))
            }
            None => {
                let error = self.ctrl.error().cloned();
                self.finish(error)
            }
        }
    }
}

/// Outcome of running a pipeline to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub stats: RunStats,
    pub warnings: Vec<Error>,
    pub elapsed: Duration,
}

/// Engine owns the configuration runs are started with.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    cfg: EngineConfig,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    pub fn from_env() -> Self {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Start a run of `pipeline`. Nothing happens until the execution is
    /// pulled.
    pub fn execute(&self, pipeline: &Pipeline) -> Execution {
        Execution::new(pipeline, self.cfg.clone())
    }

    /// Run `pipeline` to completion.
    pub fn run(&self, pipeline: &Pipeline) -> Result<RunReport> {
        self.cfg.validate()?;
        let mut exec = self.execute(pipeline);
        for tick in exec.by_ref() {
            tick?;
        }
        Ok(RunReport {
            stats: exec.stats(),
            warnings: exec.warnings(),
            elapsed: exec.elapsed(),
        })
    }
}

/// `pipeline.execute()` with the default configuration.
pub trait PipelineExt {
    fn execute(&self) -> Execution;
}

impl PipelineExt for Pipeline {
    fn execute(&self) -> Execution {
        Engine::default().execute(self)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::Mutex;

    use super::*;
    use telemflow_core::prelude::{Batch, DataType, ElementType, EventBatch, Field, Scalar, Schema};
    use telemflow_operators::{OpError, Registry};

    /// Emits fixed batches, optionally aborting after a number of them.
    #[derive(Debug)]
    struct Emit {
        batches: Vec<Batch>,
        abort_after: Option<usize>,
    }

    impl fmt::Display for Emit {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("emit")
        }
    }

    impl LogicalOperator for Emit {
        fn name(&self) -> &'static str {
            "emit"
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
        ) -> std::result::Result<PhysicalOperator, OpError> {
            let ctrl = ctrl.clone();
            let abort_after = self.abort_after;
            let mut emitted = 0;
            let mut batches = self.batches.clone().into_iter();
            Ok(PhysicalOperator::source(std::iter::from_fn(move || {
                if abort_after == Some(emitted) {
                    ctrl.abort(Error::runtime("emit", "boom"));
                    ctrl.abort(Error::runtime("emit", "ignored"));
                }
                emitted += 1;
                batches.next()
            })))
        }
    }

    /// Records every row it sees.
    #[derive(Debug, Default)]
    struct Sink {
        rows: Arc<Mutex<Vec<i64>>>,
    }

    impl fmt::Display for Sink {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("sink")
        }
    }

    impl LogicalOperator for Sink {
        fn name(&self) -> &'static str {
            "sink"
        }

        fn input_element_type(&self) -> ElementType {
            ElementType::Events
        }

        fn output_element_type(&self) -> ElementType {
            ElementType::Void
        }

        fn instantiate(
            &self,
            _input_schema: Option<&Arc<Schema>>,
            _ctrl: &Control,
        ) -> std::result::Result<PhysicalOperator, OpError> {
            let rows = Arc::clone(&self.rows);
            Ok(PhysicalOperator::transform(move |input: BatchStream| {
                input.map(move |batch| {
                    if let Batch::Events(events) = &batch {
                        for v in &events.columns()[0] {
                            if let Scalar::I64(i) = v {
                                rows.lock().unwrap().push(*i);
                            }
                        }
                    }
                    Batch::Empty
                })
            }))
        }
    }

    fn batch(name: &str, values: &[i64]) -> Batch {
        let schema = Arc::new(Schema::new(name, vec![Field::new("v", DataType::Int64, false)]));
        Batch::Events(
            EventBatch::try_new(schema, vec![values.iter().map(|v| Scalar::I64(*v)).collect()])
                .unwrap(),
        )
    }

    fn pipeline(emit: Emit, sink: &Sink) -> Pipeline {
        Pipeline::new(vec![
            Arc::new(emit),
            Arc::new(Sink {
                rows: Arc::clone(&sink.rows),
            }),
        ])
    }

    #[test]
    fn clean_run_ticks_and_ends_without_error() {
        let sink = Sink::default();
        let p = pipeline(
            Emit {
                batches: vec![batch("a", &[1]), Batch::Empty, batch("b", &[2])],
                abort_after: None,
            },
            &sink,
        );
        let ticks: Vec<_> = p.execute().collect();
        assert!(!ticks.is_empty());
        assert!(ticks.iter().all(|t| t.is_ok()));
        assert_eq!(*sink.rows.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn abort_is_yielded_once_as_the_last_tick() {
        let sink = Sink::default();
        let p = pipeline(
            Emit {
                batches: vec![batch("a", &[1]), batch("a", &[2]), batch("a", &[3])],
                abort_after: Some(1),
            },
            &sink,
        );
        let ticks: Vec<_> = p.execute().collect();
        let errors: Vec<_> = ticks.iter().filter(|t| t.is_err()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            ticks.last().unwrap(),
            &Err(Error::runtime("emit", "boom"))
        );
        assert!(!sink.rows.lock().unwrap().contains(&3));
    }

    #[test]
    fn shape_violation_is_the_only_tick() {
        let registry = Registry::builtin();
        let p = Pipeline::parse_with("where x == 1 | discard", &registry).unwrap();
        let ticks: Vec<_> = p.execute().collect();
        assert_eq!(ticks.len(), 1);
        assert!(matches!(
            ticks[0],
            Err(Error::InvalidPipelineShape { position: "input", .. })
        ));
    }

    #[test]
    fn empty_pipeline_is_a_no_op() {
        let mut exec = Pipeline::default().execute();
        assert!(exec.next().is_none());
        assert_eq!(exec.stats(), RunStats::default());
    }

    #[test]
    fn failed_source_instantiation_surfaces_as_error() {
        let p = Pipeline::parse("from /no/such/file.jsonl | discard").unwrap();
        let ticks: Vec<_> = p.execute().collect();
        assert_eq!(ticks.len(), 1);
        assert!(matches!(
            &ticks[0],
            Err(Error::OperatorInstantiation { operator, .. }) if operator == "from"
        ));
    }

    #[test]
    fn engine_run_reports_stats() {
        let sink = Sink::default();
        let p = pipeline(
            Emit {
                batches: vec![batch("a", &[1]), batch("b", &[2]), batch("a", &[3])],
                abort_after: None,
            },
            &sink,
        );
        let report = Engine::default().run(&p).unwrap();
        assert_eq!(report.stats.instantiations, 3);
        assert!(report.warnings.is_empty());
        assert_eq!(*sink.rows.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn engine_rejects_invalid_config() {
        let engine = Engine::new(EngineConfig {
            batch_rows: 0,
            ..Default::default()
        });
        assert!(matches!(
            engine.run(&Pipeline::default()),
            Err(Error::Config(_))
        ));
    }
}
