//! Conversions between bytes and events: `parse-json` and `print-json`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use telemflow_core::prelude::{Batch, Chunk, ElementType, Error, EventBatch, Schema};
use telemflow_io::writers::jsonl::render_batch;
use telemflow_io::EventBuilder;

use crate::args::expect_no_args;
use crate::control::Control;
use crate::registry::ArgsPlugin;
use crate::stream::{map_events, unexpected_batch};
use crate::traits::{BatchStream, LogicalOperator, OpError, PhysicalOperator};

/// Decodes newline-delimited JSON objects from byte chunks.
///
/// Lines may span chunks; the unterminated tail of a chunk is carried into the
/// next one and decoded at end of input. Rows are batched by schema up to the
/// events demand, so output lags input and the last batch appears when the
/// input is exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseJson;

#[derive(Debug, Clone, Copy, Default)]
pub struct PrintJson;

pub fn parse_json_plugin() -> ArgsPlugin {
    ArgsPlugin::new("parse-json", |args| {
        expect_no_args("parse-json", args)?;
        Ok(Arc::new(ParseJson))
    })
}

pub fn print_json_plugin() -> ArgsPlugin {
    ArgsPlugin::new("print-json", |args| {
        expect_no_args("print-json", args)?;
        Ok(Arc::new(PrintJson))
    })
}

impl fmt::Display for ParseJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("parse-json")
    }
}

impl fmt::Display for PrintJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("print-json")
    }
}

impl LogicalOperator for ParseJson {
    fn name(&self) -> &'static str {
        "parse-json"
    }

    fn input_element_type(&self) -> ElementType {
        ElementType::Bytes
    }

    fn output_element_type(&self) -> ElementType {
        ElementType::Events
    }

    fn instantiate(
        &self,
        _input_schema: Option<&Arc<Schema>>,
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        let builder = EventBuilder::new(ctrl.json_schema_name(), ctrl.demand(ElementType::Events));
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |input| LineDecoder {
            input,
            ctrl,
            builder,
            carry: Vec::new(),
            ready: VecDeque::new(),
            finished: false,
        }))
    }
}

struct LineDecoder {
    input: BatchStream,
    ctrl: Control,
    builder: EventBuilder,
    carry: Vec<u8>,
    ready: VecDeque<EventBatch>,
    finished: bool,
}

impl LineDecoder {
    fn decode_line(&mut self, line: &[u8]) {
        let result = match std::str::from_utf8(line) {
            Ok(text) => self.builder.push_line(text),
            Err(e) => {
                self.ctrl.warn(Error::Decode(format!("invalid utf-8: {e}")));
                return;
            }
        };
        match result {
            Ok(Some(batch)) => self.ready.push_back(batch),
            Ok(None) => {}
            Err(e) if e.is_recoverable() => self.ctrl.warn(Error::Decode(e.to_string())),
            Err(e) => self.ctrl.abort(Error::runtime("parse-json", e)),
        }
    }

    fn absorb(&mut self, chunk: &Chunk) {
        let mut bytes = chunk.as_bytes();
        while let Some(pos) = bytes.iter().position(|b| *b == b'\n') {
            if self.carry.is_empty() {
                self.decode_line(&bytes[..pos]);
            } else {
                let mut line = std::mem::take(&mut self.carry);
                line.extend_from_slice(&bytes[..pos]);
                self.decode_line(&line);
            }
            bytes = &bytes[pos + 1..];
        }
        self.carry.extend_from_slice(bytes);
    }

    fn finish(&mut self) {
        if !self.carry.is_empty() {
            let tail = std::mem::take(&mut self.carry);
            self.decode_line(&tail);
        }
        match self.builder.finish() {
            Ok(Some(batch)) => self.ready.push_back(batch),
            Ok(None) => {}
            Err(e) => self.ctrl.abort(Error::runtime("parse-json", e)),
        }
    }
}

impl Iterator for LineDecoder {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if let Some(batch) = self.ready.pop_front() {
            return Some(Batch::Events(batch));
        }
        if self.finished {
            return None;
        }
        match self.input.next() {
            Some(Batch::Bytes(chunk)) => self.absorb(&chunk),
            Some(stall) if stall.is_empty() => {}
            Some(other) => unexpected_batch("parse-json", ElementType::Bytes, &other, &self.ctrl),
            None => {
                self.finished = true;
                self.finish();
                return self.ready.pop_front().map(Batch::Events);
            }
        }
        Some(
            self.ready
                .pop_front()
                .map(Batch::Events)
                .unwrap_or(Batch::Empty),
        )
    }
}

impl LogicalOperator for PrintJson {
    fn name(&self) -> &'static str {
        "print-json"
    }

    fn input_element_type(&self) -> ElementType {
        ElementType::Events
    }

    fn output_element_type(&self) -> ElementType {
        ElementType::Bytes
    }

    fn instantiate(
        &self,
        _input_schema: Option<&Arc<Schema>>,
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |input| {
            map_events("print-json", input, ctrl, |events| {
                Ok(Batch::Bytes(Chunk::from(render_batch(&events)?)))
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use telemflow_core::prelude::{DataType, Scalar};

    fn chunks(parts: &[&str]) -> Vec<Batch> {
        parts
            .iter()
            .map(|p| Batch::Bytes(Chunk::from(p.as_bytes())))
            .collect()
    }

    #[test]
    fn lines_spanning_chunks_are_joined() {
        let (recording, ctrl) = control();
        let out = non_empty(run_transform(
            &ParseJson,
            None,
            &ctrl,
            chunks(&["{\"a\":", "1}\n{\"a\"", ":2}\n{\"a\":3}"]),
        ));
        assert_eq!(out.len(), 1);
        let Batch::Events(events) = &out[0] else {
            panic!("expected events");
        };
        assert_eq!(
            events.column(0).unwrap(),
            &[Scalar::I64(1), Scalar::I64(2), Scalar::I64(3)]
        );
        assert_eq!(events.schema().name, "json");
        assert!(recording.warnings.borrow().is_empty());
    }

    #[test]
    fn output_waits_for_demand_or_end_of_input() {
        let (_, ctrl) = control_with(RecordingControl {
            demand: 2,
            ..Default::default()
        });
        let out = run_transform(
            &ParseJson,
            None,
            &ctrl,
            chunks(&["{\"a\":1}\n", "{\"a\":2}\n", "{\"a\":3}\n"]),
        );
        let sizes: Vec<_> = out.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![0, 0, 2, 1]);
    }

    #[test]
    fn malformed_lines_are_warnings() {
        let (recording, ctrl) = control();
        let out = non_empty(run_transform(
            &ParseJson,
            None,
            &ctrl,
            chunks(&["{\"a\":1}\n[1,2]\n{oops\n{\"a\":2}\n"]),
        ));
        assert_eq!(out[0].len(), 2);
        assert_eq!(recording.warnings.borrow().len(), 2);
        assert!(!ctrl.is_aborted());
    }

    #[test]
    fn print_json_renders_lines() {
        let (_, ctrl) = control();
        let s = schema("x", &[("b", DataType::Boolean), ("n", DataType::Int64)]);
        let batch = events(
            &s,
            vec![
                vec![Scalar::Bool(true), Scalar::Null],
                vec![Scalar::I64(1), Scalar::I64(2)],
            ],
        );
        let out = run_transform(&PrintJson, Some(&s), &ctrl, vec![batch, Batch::Empty]);
        let Batch::Bytes(chunk) = &out[0] else {
            panic!("expected bytes");
        };
        assert_eq!(chunk.as_bytes(), b"{\"b\":true,\"n\":1}\n{\"b\":null,\"n\":2}\n");
        assert_eq!(out[1], Batch::Empty);
    }
}
