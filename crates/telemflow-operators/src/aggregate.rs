//! `summarize <agg>[, <agg>...] [by <field>[, ...]]`: grouped aggregation.
//!
//! Supported aggregations: `count`, `sum(f)`, `min(f)`, `max(f)`. Each schema
//! instance buffers its groups (in first-seen order) and emits a single batch
//! once its input is exhausted, so all output appears during the drain.
//! Nulls are skipped by `sum`, `min` and `max`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use telemflow_core::hash::{hash_scalars, Hash256};
use telemflow_core::prelude::{
    Batch, DataType, ElementType, Error, EventBatch, Field, Scalar, Schema,
};
use telemflow_core::types::scalar_cmp;

use crate::args::{quote, split_list, unquote};
use crate::control::{resolve_field, Control};
use crate::registry::ArgsPlugin;
use crate::stream::unexpected_batch;
use crate::traits::{BatchStream, LogicalOperator, OpError, PhysicalOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Min,
    Max,
}

impl AggFunc {
    fn name(self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::Sum => "sum",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub func: AggFunc,
    /// Input field; `None` only for `count`.
    pub field: Option<String>,
}

impl Aggregation {
    fn parse(token: &str) -> Result<Self, OpError> {
        if token == "count" || token == "count()" {
            return Ok(Self {
                func: AggFunc::Count,
                field: None,
            });
        }
        let (name, rest) = token
            .split_once('(')
            .ok_or_else(|| OpError::Parse(format!("unknown aggregation '{token}'")))?;
        let func = match name {
            "sum" => AggFunc::Sum,
            "min" => AggFunc::Min,
            "max" => AggFunc::Max,
            _ => return Err(OpError::Parse(format!("unknown aggregation '{name}'"))),
        };
        let field = rest
            .strip_suffix(')')
            .ok_or_else(|| OpError::Parse(format!("missing ')' in '{token}'")))?;
        let (field, _) = unquote(field)?;
        if field.is_empty() {
            return Err(OpError::Parse(format!("{name} expects a field")));
        }
        Ok(Self {
            func,
            field: Some(field),
        })
    }

    /// Name of the output column.
    fn output_name(&self) -> String {
        match &self.field {
            None => self.func.name().to_string(),
            Some(f) => format!("{}({})", self.func.name(), f),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            None => f.write_str(self.func.name()),
            Some(field) => write!(f, "{}({})", self.func.name(), quote(field, false)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Summarize {
    pub aggregations: Vec<Aggregation>,
    pub group_by: Vec<String>,
}

impl Summarize {
    pub fn parse(args: &str) -> Result<Self, OpError> {
        let tokens = split_list(args);
        let (aggs, groups) = match tokens.iter().position(|t| *t == "by") {
            Some(pos) => (&tokens[..pos], &tokens[pos + 1..]),
            None => (&tokens[..], &tokens[..0]),
        };
        if aggs.is_empty() {
            return Err(OpError::Parse("summarize expects at least one aggregation".into()));
        }
        if tokens.contains(&"by") && groups.is_empty() {
            return Err(OpError::Parse("summarize expects fields after 'by'".into()));
        }
        let aggregations = aggs
            .iter()
            .map(|t| Aggregation::parse(t))
            .collect::<Result<Vec<_>, _>>()?;
        let group_by = groups
            .iter()
            .map(|t| unquote(t).map(|(v, _)| v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            aggregations,
            group_by,
        })
    }

    fn plan(&self, input: &Schema, ctrl: &Control) -> Result<SummaryPlan, OpError> {
        let lookup = |name: &str| {
            resolve_field(input, name, ctrl.concepts())
                .first()
                .copied()
                .ok_or_else(|| {
                    OpError::Schema(format!(
                        "field '{name}' not found in schema '{}'",
                        input.name
                    ))
                })
        };

        let mut fields = Vec::new();
        let mut group_cols = Vec::new();
        for name in &self.group_by {
            let idx = lookup(name)?;
            let field = &input.fields[idx];
            fields.push(Field::new(name.clone(), field.data_type, field.nullable));
            group_cols.push(idx);
        }

        let mut aggs = Vec::new();
        for agg in &self.aggregations {
            let (column, data_type) = match (&agg.field, agg.func) {
                (None, _) => (None, DataType::Int64),
                (Some(name), func) => {
                    let idx = lookup(name)?;
                    let dt = input.fields[idx].data_type;
                    if func == AggFunc::Sum && !matches!(dt, DataType::Int64 | DataType::Float64)
                    {
                        return Err(OpError::Schema(format!(
                            "cannot sum field '{name}' of type {}",
                            dt.name()
                        )));
                    }
                    (Some(idx), dt)
                }
            };
            let nullable = agg.func != AggFunc::Count;
            fields.push(Field::new(agg.output_name(), data_type, nullable));
            aggs.push((agg.func, column));
        }

        Ok(SummaryPlan {
            schema: Arc::new(Schema::new(input.name.clone(), fields)),
            group_cols,
            aggs,
        })
    }
}

pub fn plugin() -> ArgsPlugin {
    ArgsPlugin::new("summarize", |args| Ok(Arc::new(Summarize::parse(args)?)))
}

impl fmt::Display for Summarize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aggs: Vec<String> = self.aggregations.iter().map(|a| a.to_string()).collect();
        write!(f, "summarize {}", aggs.join(", "))?;
        if !self.group_by.is_empty() {
            let groups: Vec<String> = self.group_by.iter().map(|g| quote(g, g == "by")).collect();
            write!(f, " by {}", groups.join(", "))?;
        }
        Ok(())
    }
}

impl LogicalOperator for Summarize {
    fn name(&self) -> &'static str {
        "summarize"
    }

    fn input_element_type(&self) -> ElementType {
        ElementType::Events
    }

    fn output_element_type(&self) -> ElementType {
        ElementType::Events
    }

    fn instantiate(
        &self,
        input_schema: Option<&Arc<Schema>>,
        ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        let input = input_schema
            .ok_or_else(|| OpError::Schema("summarize requires an input schema".into()))?;
        let plan = self.plan(input, ctrl)?;
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |stream| Summarizer {
            input: stream,
            ctrl,
            groups: Groups::new(plan),
            done: false,
        }))
    }
}

struct SummaryPlan {
    schema: Arc<Schema>,
    group_cols: Vec<usize>,
    aggs: Vec<(AggFunc, Option<usize>)>,
}

#[derive(Debug, Clone)]
enum Acc {
    Count(i64),
    SumInt(Option<i64>),
    SumFloat(Option<f64>),
    Extreme(Option<Scalar>),
}

impl Acc {
    fn new(func: AggFunc, data_type: DataType) -> Self {
        match func {
            AggFunc::Count => Acc::Count(0),
            AggFunc::Sum if data_type == DataType::Int64 => Acc::SumInt(None),
            AggFunc::Sum => Acc::SumFloat(None),
            AggFunc::Min | AggFunc::Max => Acc::Extreme(None),
        }
    }

    fn update(&mut self, func: AggFunc, value: Option<&Scalar>) -> Result<(), OpError> {
        match self {
            Acc::Count(n) => *n += 1,
            Acc::SumInt(sum) => {
                if let Some(Scalar::I64(v)) = value {
                    let next = sum
                        .unwrap_or(0)
                        .checked_add(*v)
                        .ok_or_else(|| OpError::Exec("integer overflow in sum".into()))?;
                    *sum = Some(next);
                }
            }
            Acc::SumFloat(sum) => {
                if let Some(v) = value.and_then(Scalar::as_f64) {
                    *sum = Some(sum.unwrap_or(0.0) + v);
                }
            }
            Acc::Extreme(best) => {
                if let Some(v) = value.filter(|v| !v.is_null()) {
                    let better = match best {
                        None => true,
                        Some(b) => {
                            let ord = scalar_cmp(v, b);
                            if func == AggFunc::Min {
                                ord.is_lt()
                            } else {
                                ord.is_gt()
                            }
                        }
                    };
                    if better {
                        *best = Some(v.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(&self) -> Scalar {
        match self {
            Acc::Count(n) => Scalar::I64(*n),
            Acc::SumInt(sum) => sum.map(Scalar::I64).unwrap_or(Scalar::Null),
            Acc::SumFloat(sum) => sum.map(Scalar::F64).unwrap_or(Scalar::Null),
            Acc::Extreme(best) => best.clone().unwrap_or(Scalar::Null),
        }
    }
}

struct Groups {
    plan: SummaryPlan,
    index: HashMap<Hash256, usize>,
    keys: Vec<Vec<Scalar>>,
    accs: Vec<Vec<Acc>>,
}

impl Groups {
    fn new(plan: SummaryPlan) -> Self {
        Self {
            plan,
            index: HashMap::new(),
            keys: Vec::new(),
            accs: Vec::new(),
        }
    }

    fn absorb(&mut self, events: &EventBatch) -> Result<(), OpError> {
        let columns = events.columns();
        let first_agg_field = self.plan.group_cols.len();
        for row in 0..events.num_rows() {
            let key: Vec<Scalar> = self
                .plan
                .group_cols
                .iter()
                .map(|&c| columns[c][row].clone())
                .collect();
            let digest = hash_scalars(&key);
            let slot = match self.index.get(&digest) {
                Some(&slot) => slot,
                None => {
                    let accs = self
                        .plan
                        .aggs
                        .iter()
                        .enumerate()
                        .map(|(i, (func, _))| {
                            Acc::new(*func, self.plan.schema.fields[first_agg_field + i].data_type)
                        })
                        .collect();
                    self.keys.push(key);
                    self.accs.push(accs);
                    self.index.insert(digest, self.keys.len() - 1);
                    self.keys.len() - 1
                }
            };
            for (acc, (func, column)) in self.accs[slot].iter_mut().zip(&self.plan.aggs) {
                acc.update(*func, column.map(|c| &columns[c][row]))?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<EventBatch>, Error> {
        if self.keys.is_empty() {
            return Ok(None);
        }
        let mut columns = vec![Vec::with_capacity(self.keys.len()); self.plan.schema.len()];
        for (key, accs) in self.keys.drain(..).zip(self.accs.drain(..)) {
            let values = key.into_iter().chain(accs.iter().map(Acc::finish));
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }
        self.index.clear();
        EventBatch::try_new(Arc::clone(&self.plan.schema), columns).map(Some)
    }
}

struct Summarizer {
    input: BatchStream,
    ctrl: Control,
    groups: Groups,
    done: bool,
}

impl Iterator for Summarizer {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.done {
            return None;
        }
        match self.input.next() {
            Some(Batch::Events(events)) => {
                if let Err(e) = self.groups.absorb(&events) {
                    self.ctrl.abort(Error::runtime("summarize", e));
                }
                Some(Batch::Empty)
            }
            Some(stall) if stall.is_empty() => Some(Batch::Empty),
            Some(other) => {
                unexpected_batch("summarize", ElementType::Events, &other, &self.ctrl);
                Some(Batch::Empty)
            }
            None => {
                self.done = true;
                match self.groups.finish() {
                    Ok(batch) => batch.map(Batch::Events),
                    Err(e) => {
                        self.ctrl.abort(Error::runtime("summarize", e));
                        None
                    }
                }
            }
        }
    }
}
