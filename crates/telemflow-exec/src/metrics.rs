//! Run statistics and the tracing hook they are reported through.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// Emit a structured trace event for `event`, one record per key/value.
pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "telemflow", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}

/// Snapshot of a run's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Elements pulled from the final stage.
    pub ticks: u64,
    /// Of those, empty ones.
    pub stalls: u64,
    /// Physical operators created, across all stages.
    pub instantiations: u64,
    /// Non-empty batches produced while draining at end of input.
    pub drained_batches: u64,
}

impl RunStats {
    pub fn to_key_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ticks", self.ticks.to_string()),
            ("stalls", self.stalls.to_string()),
            ("instantiations", self.instantiations.to_string()),
            ("drained_batches", self.drained_batches.to_string()),
        ]
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Live counters, shared by the driver and the multiplexers of one run.
#[derive(Debug, Default)]
pub struct Counters {
    ticks: Cell<u64>,
    stalls: Cell<u64>,
    instantiations: Cell<u64>,
    drained_batches: Cell<u64>,
}

impl Counters {
    pub fn record_tick(&self, stalled: bool) {
        bump(&self.ticks);
        if stalled {
            bump(&self.stalls);
        }
    }

    pub fn record_instantiation(&self) {
        bump(&self.instantiations);
    }

    pub fn record_drained(&self) {
        bump(&self.drained_batches);
    }

    pub fn snapshot(&self) -> RunStats {
        RunStats {
            ticks: self.ticks.get(),
            stalls: self.stalls.get(),
            instantiations: self.instantiations.get(),
            drained_batches: self.drained_batches.get(),
        }
    }
}

fn bump(cell: &Cell<u64>) {
    cell.set(cell.get() + 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_snapshot() {
        let c = Counters::default();
        c.record_tick(true);
        c.record_tick(false);
        c.record_instantiation();
        c.record_drained();
        let stats = c.snapshot();
        assert_eq!(
            stats,
            RunStats {
                ticks: 2,
                stalls: 1,
                instantiations: 1,
                drained_batches: 1
            }
        );
        assert_eq!(
            stats.to_json().unwrap(),
            r#"{"ticks":2,"stalls":1,"instantiations":1,"drained_batches":1}"#
        );
        assert_eq!(stats.to_key_values()[0], ("ticks", "2".to_string()));
    }
}
