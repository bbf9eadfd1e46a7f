//! `rename <old>=<new>[, ...]`: rename fields, keeping values and order.
//!
//! Renames of fields a schema lacks are ignored. A rename that would leave
//! two fields with one name fails instantiation for that schema.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use telemflow_core::prelude::{Batch, ElementType, Schema};

use crate::args::{quote, split_list, unquote};
use crate::control::Control;
use crate::registry::ArgsPlugin;
use crate::stream::map_events;
use crate::traits::{LogicalOperator, OpError, PhysicalOperator};

#[derive(Debug, Clone, Default)]
pub struct Rename {
    /// Column rename list: (old_name, new_name), applied in order.
    pub renames: Vec<(String, String)>,
}

impl Rename {
    pub fn parse(args: &str) -> Result<Self, OpError> {
        let mut renames = Vec::new();
        for item in split_list(args) {
            let (old, new) = split_assignment(item)
                .ok_or_else(|| OpError::Parse(format!("expected old=new, got '{item}'")))?;
            let (old, _) = unquote(old)?;
            let (new, _) = unquote(new)?;
            if old.is_empty() || new.is_empty() {
                return Err(OpError::Parse(format!("empty field name in '{item}'")));
            }
            renames.push((old, new));
        }
        if renames.is_empty() {
            return Err(OpError::Parse("rename expects at least one old=new".into()));
        }
        Ok(Self { renames })
    }

    fn apply(&self, input: &Schema) -> Result<Schema, OpError> {
        let mut schema = input.clone();
        for field in &mut schema.fields {
            if let Some((_, new)) = self.renames.iter().find(|(old, _)| *old == field.name) {
                field.name = new.clone();
            }
        }
        let mut seen = HashSet::new();
        for field in &schema.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(OpError::Schema(format!(
                    "rename produces duplicate field '{}'",
                    field.name
                )));
            }
        }
        Ok(schema)
    }
}

fn split_assignment(item: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in item.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '=' if !in_quotes => return Some((&item[..i], &item[i + 1..])),
            _ => {}
        }
    }
    None
}

pub fn plugin() -> ArgsPlugin {
    ArgsPlugin::new("rename", |args| Ok(Arc::new(Rename::parse(args)?)))
}

impl fmt::Display for Rename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .renames
            .iter()
            .map(|(old, new)| format!("{}={}", quote_name(old), quote_name(new)))
            .collect();
        write!(f, "rename {}", items.join(", "))
    }
}

fn quote_name(name: &str) -> String {
    quote(name, name.contains('='))
}

impl LogicalOperator for Rename {
    fn name(&self) -> &'static str {
        "rename"
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
            .ok_or_else(|| OpError::Schema("rename requires an input schema".into()))?;
        let output = self.apply(input)?;
        let identity = output == **input;
        let output = Arc::new(output);
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |stream| {
            map_events("rename", stream, ctrl, move |events| {
                if identity {
                    return Ok(Batch::Events(events));
                }
                let renamed = events
                    .with_schema(Arc::clone(&output))
                    .map_err(|e| OpError::Exec(e.to_string()))?;
                Ok(Batch::Events(renamed))
            })
        }))
    }
}
