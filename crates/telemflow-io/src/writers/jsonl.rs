//! Streaming NDJSON writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use telemflow_core::types::{EventBatch, Scalar};

use crate::error::Result;

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    rows_written: u64,
}

impl JsonlWriter<File> {
    /// Create (or truncate) the file at `path`. Writes always land at the end
    /// of the file, so writers appending to the same path are not overwritten.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        File::create(path.as_ref())?;
        Self::append(path)
    }

    /// Open the file at `path` for appending, creating it if needed.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write a batch as one JSON object per line, keys in schema order.
    pub fn write_batch(&mut self, batch: &EventBatch) -> Result<()> {
        let names = batch
            .schema()
            .fields
            .iter()
            .map(|f| serde_json::to_string(&f.name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for r in 0..batch.num_rows() {
            let mut line = String::from("{");
            for (ci, name) in names.iter().enumerate() {
                if ci > 0 {
                    line.push(',');
                }
                line.push_str(name);
                line.push(':');
                line.push_str(&serde_json::to_string(&scalar_to_json(
                    &batch.columns()[ci][r],
                ))?);
            }
            line.push('}');
            writeln!(self.writer, "{}", line)?;
        }
        self.rows_written += batch.num_rows() as u64;
        Ok(())
    }

    /// Write raw bytes unchanged (pre-rendered chunks).
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::Error::Io(e.into_error()))
    }
}

/// Render one batch to JSONL bytes.
pub fn render_batch(batch: &EventBatch) -> Result<Vec<u8>> {
    let mut writer = JsonlWriter::to_writer(Vec::new());
    writer.write_batch(batch)?;
    writer.into_inner()
}

fn scalar_to_json(v: &Scalar) -> serde_json::Value {
    use Scalar::*;
    match v {
        Null => serde_json::Value::Null,
        Bool(b) => serde_json::Value::Bool(*b),
        I64(i) => serde_json::Value::from(*i),
        F64(f) => serde_json::Value::from(*f),
        Str(s) => serde_json::Value::String(s.clone()),
        Bin(b) => serde_json::Value::from(b.clone()),
    }
}
