//! Values, event batches, byte chunks, and the runtime `Batch` union.
//!
//! Event batches are columnar: one `Vec<Scalar>` per schema field. Every batch
//! is immutable once built; operators derive new batches instead of mutating.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::schema::{DataType, Schema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    /// Data type of a non-null value.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(_) => Some(DataType::Boolean),
            Scalar::I64(_) => Some(DataType::Int64),
            Scalar::F64(_) => Some(DataType::Float64),
            Scalar::Str(_) => Some(DataType::Utf8),
            Scalar::Bin(_) => Some(DataType::Binary),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view used by arithmetic aggregations.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::I64(i) => Some(*i as f64),
            Scalar::F64(f) => Some(*f),
            _ => None,
        }
    }

    fn conforms(&self, data_type: DataType, nullable: bool) -> bool {
        match self.data_type() {
            None => nullable,
            Some(dt) => dt == data_type,
        }
    }
}

/// Total order over scalars: nulls first, then by value; mixed types order by
/// variant.
pub fn scalar_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    use Scalar::*;

    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (I64(x), I64(y)) => x.cmp(y),
        (F64(x), F64(y)) => x.total_cmp(y),
        (Str(x), Str(y)) => x.cmp(y),
        (Bin(x), Bin(y)) => x.cmp(y),
        _ => scalar_type_order(a).cmp(&scalar_type_order(b)),
    }
}

pub(crate) fn scalar_type_order(s: &Scalar) -> u8 {
    use Scalar::*;
    match s {
        Null => 0,
        Bool(_) => 1,
        I64(_) => 2,
        F64(_) => 3,
        Str(_) => 4,
        Bin(_) => 5,
    }
}

/// A columnar batch of events sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    schema: Arc<Schema>,
    columns: Vec<Vec<Scalar>>,
}

impl EventBatch {
    /// Build a batch, checking column count, column lengths and value types
    /// against the schema.
    pub fn try_new(schema: Arc<Schema>, columns: Vec<Vec<Scalar>>) -> Result<Self> {
        if columns.len() != schema.len() {
            return Err(Error::Schema(format!(
                "schema '{}' has {} fields but batch has {} columns",
                schema.name,
                schema.len(),
                columns.len()
            )));
        }
        let rows = columns.first().map(Vec::len).unwrap_or(0);
        for (field, column) in schema.fields.iter().zip(&columns) {
            if column.len() != rows {
                return Err(Error::Schema(format!(
                    "column '{}' has {} rows, expected {}",
                    field.name,
                    column.len(),
                    rows
                )));
            }
            if let Some(bad) = column
                .iter()
                .find(|v| !v.conforms(field.data_type, field.nullable))
            {
                return Err(Error::Schema(format!(
                    "value {:?} does not conform to field '{}' of type {}",
                    bad,
                    field.name,
                    field.data_type.name()
                )));
            }
        }
        Ok(Self { schema, columns })
    }

    /// A batch with no rows.
    pub fn empty(schema: Arc<Schema>) -> Self {
        let columns = vec![Vec::new(); schema.len()];
        Self { schema, columns }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn columns(&self) -> &[Vec<Scalar>] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&[Scalar]> {
        self.columns.get(idx).map(Vec::as_slice)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&[Scalar]> {
        self.schema.index_of(name).and_then(|idx| self.column(idx))
    }

    /// Values of one row, in schema order.
    pub fn row(&self, idx: usize) -> Option<Vec<&Scalar>> {
        if idx >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c[idx]).collect())
    }

    /// Keep the rows whose mask entry is `true`.
    pub fn filter(&self, keep: &[bool]) -> Result<EventBatch> {
        if keep.len() != self.num_rows() {
            return Err(Error::Invariant(format!(
                "filter mask has {} entries for {} rows",
                keep.len(),
                self.num_rows()
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|col| {
                col.iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v.clone())
                    .collect()
            })
            .collect();
        Ok(Self {
            schema: Arc::clone(&self.schema),
            columns,
        })
    }

    /// Take the columns at `indices` under a new schema.
    pub fn project(&self, schema: Arc<Schema>, indices: &[usize]) -> Result<EventBatch> {
        let mut columns = Vec::with_capacity(indices.len());
        for &idx in indices {
            let col = self.columns.get(idx).ok_or_else(|| {
                Error::Invariant(format!("projection index {idx} out of bounds"))
            })?;
            columns.push(col.clone());
        }
        EventBatch::try_new(schema, columns)
    }

    /// Reinterpret the columns under a different but compatible schema, e.g.
    /// after renaming fields.
    pub fn with_schema(self, schema: Arc<Schema>) -> Result<EventBatch> {
        EventBatch::try_new(schema, self.columns)
    }

    /// Concatenate batches of one schema.
    pub fn concat(batches: &[EventBatch]) -> Result<EventBatch> {
        let first = batches
            .first()
            .ok_or_else(|| Error::Invariant("cannot concat zero batches".into()))?;
        let mut columns = first.columns.clone();
        for batch in &batches[1..] {
            if batch.schema != first.schema {
                return Err(Error::Schema(format!(
                    "cannot concat '{}' with '{}'",
                    first.schema.name, batch.schema.name
                )));
            }
            for (dst, src) in columns.iter_mut().zip(&batch.columns) {
                dst.extend(src.iter().cloned());
            }
        }
        Ok(Self {
            schema: Arc::clone(&first.schema),
            columns,
        })
    }
}

/// An immutable span of raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk(Arc<[u8]>);

impl Chunk {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Chunk(bytes.into())
    }
}

impl From<&[u8]> for Chunk {
    fn from(bytes: &[u8]) -> Self {
        Chunk(bytes.into())
    }
}

/// The value passed between stages at runtime.
///
/// A batch of size zero is never data: it is a stall (the producer needs more
/// input before it can make progress) or, from a sink, a progress tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Batch {
    #[default]
    Empty,
    Events(EventBatch),
    Bytes(Chunk),
}

impl Batch {
    /// Rows for events, bytes for chunks.
    pub fn len(&self) -> usize {
        match self {
            Batch::Empty => 0,
            Batch::Events(events) => events.num_rows(),
            Batch::Bytes(chunk) => chunk.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Batch::Empty => ElementType::Void,
            Batch::Events(_) => ElementType::Events,
            Batch::Bytes(_) => ElementType::Bytes,
        }
    }

    /// Schema of an events batch. Byte chunks carry no schema.
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        match self {
            Batch::Events(events) => Some(events.schema()),
            _ => None,
        }
    }
}

impl From<EventBatch> for Batch {
    fn from(events: EventBatch) -> Self {
        Batch::Events(events)
    }
}

impl From<Chunk> for Batch {
    fn from(chunk: Chunk) -> Self {
        Batch::Bytes(chunk)
    }
}
