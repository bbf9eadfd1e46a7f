//! Sinks: `write <path>`, `save <path>` and `discard`.
//!
//! Sinks output `Void`: they yield one `Batch::Empty` tick per input pulled,
//! so the driver can observe progress and aborts.
//!
//! `write` truncates its file when the first schema instance of a run opens
//! it; later instances append. Every batch is flushed, so rows of different
//! schemas land in the same file without interleaving inside a batch. `save`
//! truncates its file.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use telemflow_core::prelude::{Batch, ElementType, Schema};
use telemflow_io::JsonlWriter;

use crate::args::{expect_no_args, quote, single_arg};
use crate::control::Control;
use crate::registry::ArgsPlugin;
use crate::stream::{map_bytes, map_events};
use crate::traits::{LogicalOperator, OpError, PhysicalOperator};

#[derive(Debug, Clone)]
pub struct WriteJsonl {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Save {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

pub fn write_plugin() -> ArgsPlugin {
    ArgsPlugin::new("write", |args| {
        Ok(Arc::new(WriteJsonl {
            path: single_arg("write", args)?.into(),
        }))
    })
}

pub fn save_plugin() -> ArgsPlugin {
    ArgsPlugin::new("save", |args| {
        Ok(Arc::new(Save {
            path: single_arg("save", args)?.into(),
        }))
    })
}

pub fn discard_plugin() -> ArgsPlugin {
    ArgsPlugin::new("discard", |args| {
        expect_no_args("discard", args)?;
        Ok(Arc::new(Discard))
    })
}

impl fmt::Display for WriteJsonl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write {}", quote(&self.path.to_string_lossy(), false))
    }
}

impl fmt::Display for Save {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "save {}", quote(&self.path.to_string_lossy(), false))
    }
}

impl fmt::Display for Discard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("discard")
    }
}

impl LogicalOperator for WriteJsonl {
    fn name(&self) -> &'static str {
        "write"
    }

    fn input_element_type(&self) -> ElementType {
        ElementType::Events
    }

    fn output_element_type(&self) -> ElementType {
        ElementType::Void
    }

    fn instantiate(
        &self,
        input_schema: Option<&Arc<Schema>>,
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        let mut writer = if ctrl.claim_output(&self.path) {
            JsonlWriter::create(&self.path)?
        } else {
            JsonlWriter::append(&self.path)?
        };
        if let Some(schema) = input_schema {
            tracing::debug!(path = %self.path.display(), schema = %schema.name, "opened jsonl sink");
        }
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |input| {
            map_events("write", input, ctrl, move |events| {
                writer.write_batch(&events)?;
                writer.flush()?;
                Ok(Batch::Empty)
            })
        }))
    }
}

impl LogicalOperator for Save {
    fn name(&self) -> &'static str {
        "save"
    }

    fn input_element_type(&self) -> ElementType {
        ElementType::Bytes
    }

    fn output_element_type(&self) -> ElementType {
        ElementType::Void
    }

    fn instantiate(
        &self,
        _input_schema: Option<&Arc<Schema>>,
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        let mut writer = JsonlWriter::create(&self.path)?;
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |input| {
            map_bytes("save", input, ctrl, move |chunk| {
                writer.write_raw(chunk.as_bytes())?;
                writer.flush()?;
                Ok(Batch::Empty)
            })
        }))
    }
}

impl LogicalOperator for Discard {
    fn name(&self) -> &'static str {
        "discard"
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
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |input| {
            map_events("discard", input, ctrl, |_| Ok(Batch::Empty))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use telemflow_core::prelude::{Chunk, DataType, Scalar};

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("telemflow-sink-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn write_shares_one_file_across_schemas() {
        let path = temp_path("out.jsonl");
        let (_, ctrl) = control();
        let a = schema("a", &[("x", DataType::Int64)]);
        let b = schema("b", &[("y", DataType::Utf8)]);
        let op = WriteJsonl { path: path.clone() };

        let first = run_transform(&op, Some(&a), &ctrl, vec![events(&a, vec![vec![Scalar::I64(1)]])]);
        let second = run_transform(
            &op,
            Some(&b),
            &ctrl,
            vec![events(&b, vec![vec![Scalar::Str("z".into())]])],
        );
        assert_eq!(first, vec![Batch::Empty]);
        assert_eq!(second, vec![Batch::Empty]);
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"x\":1}\n{\"y\":\"z\"}\n");
    }

    #[test]
    fn write_truncates_once_per_run() {
        let path = temp_path("rerun.jsonl");
        std::fs::write(&path, "{\"stale\":true}\n").unwrap();
        let s = schema("a", &[("x", DataType::Int64)]);
        let op = WriteJsonl { path: path.clone() };

        for _ in 0..2 {
            let (_, ctrl) = control();
            run_transform(&op, Some(&s), &ctrl, vec![events(&s, vec![vec![Scalar::I64(1)]])]);
            run_transform(&op, Some(&s), &ctrl, vec![events(&s, vec![vec![Scalar::I64(2)]])]);
            let written = std::fs::read_to_string(&path).unwrap();
            assert_eq!(written, "{\"x\":1}\n{\"x\":2}\n");
        }
    }

    #[test]
    fn interleaved_instances_never_overwrite_each_other() {
        let path = temp_path("interleaved.jsonl");
        let (_, ctrl) = control();
        let a = schema("a", &[("x", DataType::Int64)]);
        let b = schema("b", &[("y", DataType::Int64)]);
        let op = WriteJsonl { path: path.clone() };

        let PhysicalOperator::Transform(make_a) = op.instantiate(Some(&a), &ctrl).unwrap() else {
            panic!("expected a transform");
        };
        let PhysicalOperator::Transform(make_b) = op.instantiate(Some(&b), &ctrl).unwrap() else {
            panic!("expected a transform");
        };
        let a_in = vec![
            events(&a, vec![vec![Scalar::I64(1)]]),
            events(&a, vec![vec![Scalar::I64(3)]]),
        ];
        let b_in = vec![events(&b, vec![vec![Scalar::I64(2)]])];
        let mut out_a = make_a(Box::new(a_in.into_iter()));
        let mut out_b = make_b(Box::new(b_in.into_iter()));
        out_a.next();
        out_b.next();
        out_a.next();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"x\":1}\n{\"y\":2}\n{\"x\":3}\n");
    }

    #[test]
    fn save_writes_chunks_verbatim() {
        let path = temp_path("raw.bin");
        let (_, ctrl) = control();
        let op = Save { path: path.clone() };
        let out = run_transform(
            &op,
            None,
            &ctrl,
            vec![Batch::Bytes(Chunk::from(&b"ab"[..])), Batch::Empty, Batch::Bytes(Chunk::from(&b"c"[..]))],
        );
        assert_eq!(out.len(), 3);
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn discard_ticks_once_per_input() {
        let (_, ctrl) = control();
        let s = schema("a", &[("x", DataType::Int64)]);
        let out = run_transform(
            &Discard,
            Some(&s),
            &ctrl,
            vec![events(&s, vec![vec![Scalar::I64(1)]]), Batch::Empty],
        );
        assert_eq!(out, vec![Batch::Empty, Batch::Empty]);
    }
}
