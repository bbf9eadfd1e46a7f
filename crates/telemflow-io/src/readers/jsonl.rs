//! NDJSON event reader with per-object schema inference.
//!
//! Each line holds one JSON object. Its schema is inferred from the object's
//! keys (sorted) and value types:
//!
//! | JSON       | field type | nullable |
//! |------------|------------|----------|
//! | bool       | Boolean    | no       |
//! | integer    | Int64      | no       |
//! | float      | Float64    | no       |
//! | string     | Utf8       | no       |
//! | null       | Utf8       | yes      |
//! | array/obj  | Utf8 (JSON text) | no |
//!
//! Consecutive lines with the same schema land in the same batch.

use std::collections::HashMap;
use std::io::BufRead;
use std::mem;
use std::sync::Arc;

use serde_json::Value;
use telemflow_core::schema::{DataType, Field, Schema};
use telemflow_core::types::{EventBatch, Scalar};

use crate::error::{Error, Result};

/// Accumulates decoded rows and cuts batches on schema change or row limit.
pub struct EventBuilder {
    schema_name: String,
    max_rows: usize,
    line: usize,
    /// Interned schemas, so equal shapes share one `Arc`.
    interned: HashMap<Schema, Arc<Schema>>,
    current: Option<Arc<Schema>>,
    columns: Vec<Vec<Scalar>>,
}

impl EventBuilder {
    pub fn new(schema_name: impl Into<String>, max_rows: usize) -> Self {
        Self {
            schema_name: schema_name.into(),
            max_rows: max_rows.max(1),
            line: 0,
            interned: HashMap::new(),
            current: None,
            columns: Vec::new(),
        }
    }

    /// Rows buffered for the batch under construction.
    pub fn buffered_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    /// Decode one line. Returns the previous batch when this line starts a
    /// new one. Blank lines and objects without fields are skipped.
    ///
    /// A decode error leaves the builder untouched.
    pub fn push_line(&mut self, line: &str) -> Result<Option<EventBatch>> {
        self.line += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|e| Error::Decode {
            line: self.line,
            reason: e.to_string(),
        })?;
        let Value::Object(object) = value else {
            return Err(Error::Decode {
                line: self.line,
                reason: "expected a JSON object".into(),
            });
        };
        if object.is_empty() {
            return Ok(None);
        }

        let mut fields = Vec::with_capacity(object.len());
        let mut row = Vec::with_capacity(object.len());
        for (key, value) in object {
            let (data_type, nullable, scalar) = infer(value);
            fields.push(Field::new(key, data_type, nullable));
            row.push(scalar);
        }
        let schema = self.intern(Schema::new(self.schema_name.clone(), fields));

        let schema_changed = self
            .current
            .as_ref()
            .is_some_and(|current| !Arc::ptr_eq(current, &schema));
        let flushed = if schema_changed || self.buffered_rows() >= self.max_rows {
            self.take_batch()?
        } else {
            None
        };

        if self.current.is_none() {
            self.columns = vec![Vec::new(); schema.len()];
            self.current = Some(schema);
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(value);
        }
        Ok(flushed)
    }

    /// Emit whatever is buffered.
    pub fn finish(&mut self) -> Result<Option<EventBatch>> {
        self.take_batch()
    }

    fn take_batch(&mut self) -> Result<Option<EventBatch>> {
        let Some(schema) = self.current.take() else {
            return Ok(None);
        };
        let columns = mem::take(&mut self.columns);
        Ok(Some(EventBatch::try_new(schema, columns)?))
    }

    fn intern(&mut self, schema: Schema) -> Arc<Schema> {
        if let Some(existing) = self.interned.get(&schema) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(schema.clone());
        self.interned.insert(schema, Arc::clone(&shared));
        shared
    }
}

fn infer(value: Value) -> (DataType, bool, Scalar) {
    match value {
        Value::Null => (DataType::Utf8, true, Scalar::Null),
        Value::Bool(b) => (DataType::Boolean, false, Scalar::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => (DataType::Int64, false, Scalar::I64(i)),
            None => (
                DataType::Float64,
                false,
                Scalar::F64(n.as_f64().unwrap_or(f64::NAN)),
            ),
        },
        Value::String(s) => (DataType::Utf8, false, Scalar::Str(s)),
        nested @ (Value::Array(_) | Value::Object(_)) => {
            (DataType::Utf8, false, Scalar::Str(nested.to_string()))
        }
    }
}

/// Reads batches of events from any buffered reader.
pub struct JsonlReader<R: BufRead> {
    reader: R,
    builder: EventBuilder,
    line: String,
}

impl<R: BufRead> JsonlReader<R> {
    pub fn new(reader: R, schema_name: impl Into<String>, max_rows: usize) -> Self {
        Self {
            reader,
            builder: EventBuilder::new(schema_name, max_rows),
            line: String::new(),
        }
    }

    /// Next batch of at most `max_rows` rows of a single schema, or `None` at
    /// end of input. After a recoverable error the caller may keep reading.
    pub fn next_batch(&mut self) -> Result<Option<EventBatch>> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line)?;
            if read == 0 {
                return self.builder.finish();
            }
            if let Some(batch) = self.builder.push_line(&self.line)? {
                return Ok(Some(batch));
            }
        }
    }
}
