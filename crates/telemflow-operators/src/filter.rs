//! `where <field> <op> <literal>` and its alias `select`: keep matching rows.
//!
//! Supported operators: `==`, `!=`, `<`, `<=`, `>`, `>=`. The literal is typed
//! against the field once per schema, at instantiation, so a literal that
//! cannot be read as the field's type fails the run up front. The field name
//! may also be a concept; the first concept field present in the schema is
//! used. Schemas without the field drop every row.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use telemflow_core::prelude::{Batch, DataType, ElementType, Schema, Scalar};
use telemflow_core::types::scalar_cmp;

use crate::args::{quote, split_list, unquote};
use crate::control::{resolve_field, Control};
use crate::registry::ArgsPlugin;
use crate::stream::map_events;
use crate::traits::{LogicalOperator, OpError, PhysicalOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    // Two-character operators first so `<=` is not read as `<`.
    const ALL: [(&'static str, CmpOp); 6] = [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    /// Position and operator of the first comparison outside quotes.
    pub fn find_in(text: &str) -> Option<(usize, CmpOp)> {
        Self::ALL
            .iter()
            .find_map(|&(symbol, op)| find_outside_quotes(text, symbol).map(|pos| (pos, op)))
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    /// Operator name the predicate was written with, `where` or `select`.
    pub keyword: &'static str,
    pub field: String,
    pub op: CmpOp,
    pub literal: String,
    /// Whether the literal was written as a quoted string.
    pub quoted: bool,
}

impl Filter {
    /// Parse a predicate like `port > 1024` or `name == "Alice"`.
    pub fn parse(args: &str) -> Result<Self, OpError> {
        Self::parse_as("where", args)
    }

    pub fn parse_as(keyword: &'static str, args: &str) -> Result<Self, OpError> {
        let Some((pos, op)) = CmpOp::find_in(args) else {
            return Err(OpError::Parse(format!("unparseable predicate: '{args}'")));
        };
        let field = args[..pos].trim();
        let rest = args[pos + op.symbol().len()..].trim();
        if field.is_empty() || split_list(field).len() != 1 {
            return Err(OpError::Parse(format!("invalid field in predicate '{args}'")));
        }
        let (literal, quoted) = match split_list(rest).as_slice() {
            [one] => unquote(one)?,
            _ => {
                return Err(OpError::Parse(format!(
                    "expected one literal in predicate '{args}'"
                )))
            }
        };
        Ok(Self {
            keyword,
            field: field.to_string(),
            op,
            literal,
            quoted,
        })
    }

    /// Type the literal for a field of `data_type`.
    fn typed_literal(&self, data_type: DataType) -> Result<Scalar, OpError> {
        let bad = |ty: &str| {
            OpError::Schema(format!(
                "cannot compare field '{}' of type {} with '{}' (expected {ty})",
                self.field,
                data_type.name(),
                self.literal
            ))
        };
        Ok(match data_type {
            DataType::Boolean => {
                if !matches!(self.op, CmpOp::Eq | CmpOp::Ne) {
                    return Err(OpError::Schema(format!(
                        "unsupported op '{}' for bool field '{}'",
                        self.op.symbol(),
                        self.field
                    )));
                }
                Scalar::Bool(self.literal.parse().map_err(|_| bad("bool"))?)
            }
            DataType::Int64 => Scalar::I64(self.literal.parse().map_err(|_| bad("int64"))?),
            DataType::Float64 => Scalar::F64(self.literal.parse().map_err(|_| bad("double"))?),
            DataType::Utf8 => Scalar::Str(self.literal.clone()),
            DataType::Binary => {
                return Err(OpError::Schema(format!(
                    "cannot filter on binary field '{}'",
                    self.field
                )))
            }
        })
    }
}

pub fn plugin() -> ArgsPlugin {
    ArgsPlugin::new("where", |args| Ok(Arc::new(Filter::parse_as("where", args)?)))
}

pub fn select_plugin() -> ArgsPlugin {
    ArgsPlugin::new("select", |args| Ok(Arc::new(Filter::parse_as("select", args)?)))
}

fn find_outside_quotes(text: &str, needle: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ if !in_quotes && text[i..].starts_with(needle) => return Some(i),
            _ => {}
        }
    }
    None
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.keyword,
            self.field,
            self.op.symbol(),
            quote(&self.literal, self.quoted)
        )
    }
}

impl LogicalOperator for Filter {
    fn name(&self) -> &'static str {
        self.keyword
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
        let schema = input_schema
            .ok_or_else(|| OpError::Schema(format!("{} requires an input schema", self.keyword)))?;
        let column = resolve_field(schema, &self.field, ctrl.concepts())
            .first()
            .copied();

        let predicate = match column {
            Some(idx) => {
                let data_type = schema.fields[idx].data_type;
                Some((idx, self.typed_literal(data_type)?))
            }
            None => None,
        };
        let op = self.op;
        let keyword = self.keyword;
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |input| {
            map_events(keyword, input, ctrl, move |events| {
                let Some((idx, literal)) = &predicate else {
                    return Ok(Batch::Empty);
                };
                let keep: Vec<bool> = events.columns()[*idx]
                    .iter()
                    .map(|v| !v.is_null() && op.holds(scalar_cmp(v, literal)))
                    .collect();
                if !keep.contains(&true) {
                    return Ok(Batch::Empty);
                }
                if !keep.contains(&false) {
                    return Ok(Batch::Events(events));
                }
                let filtered = events
                    .filter(&keep)
                    .map_err(|e| OpError::Exec(e.to_string()))?;
                Ok(Batch::Events(filtered))
            })
        }))
    }
}
