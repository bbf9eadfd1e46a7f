//! `project <field>[, <field>...]`: keep the named fields, in the order given.
//!
//! Names may be concepts and then select every concept field the schema has.
//! Fields the schema lacks are ignored; a schema with none of them is dropped.

use std::fmt;
use std::sync::Arc;

use telemflow_core::prelude::{Batch, ElementType, Schema};

use crate::args::{quote, split_list, unquote};
use crate::filter::CmpOp;
use crate::control::{resolve_field, Control};
use crate::registry::ArgsPlugin;
use crate::stream::map_events;
use crate::traits::{LogicalOperator, OpError, PhysicalOperator};

#[derive(Debug, Clone)]
pub struct Project {
    pub fields: Vec<String>,
}

impl Project {
    pub fn parse(args: &str) -> Result<Self, OpError> {
        let tokens = split_list(args);
        if let Some(token) = tokens.iter().find(|t| CmpOp::find_in(t).is_some()) {
            return Err(OpError::Parse(format!(
                "'{token}' is a predicate, not a field; use where to filter rows"
            )));
        }
        let fields = tokens
            .into_iter()
            .map(|t| unquote(t).map(|(v, _)| v))
            .collect::<Result<Vec<_>, _>>()?;
        if fields.is_empty() {
            return Err(OpError::Parse("project expects at least one field".into()));
        }
        Ok(Self { fields })
    }

    /// Output schema and source column indices for `input`.
    fn plan(&self, input: &Schema, ctrl: &Control) -> (Schema, Vec<usize>) {
        let mut indices = Vec::new();
        for name in &self.fields {
            for idx in resolve_field(input, name, ctrl.concepts()) {
                if !indices.contains(&idx) {
                    indices.push(idx);
                }
            }
        }
        let fields = indices.iter().map(|&i| input.fields[i].clone()).collect();
        (Schema::new(input.name.clone(), fields), indices)
    }
}

pub fn plugin() -> ArgsPlugin {
    ArgsPlugin::new("project", |args| Ok(Arc::new(Project::parse(args)?)))
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.fields.iter().map(|n| quote(n, false)).collect();
        write!(f, "project {}", fields.join(", "))
    }
}

impl LogicalOperator for Project {
    fn name(&self) -> &'static str {
        "project"
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
            .ok_or_else(|| OpError::Schema("project requires an input schema".into()))?;
        let (output, indices) = self.plan(input, ctrl);
        let identity = output == **input;
        let output = Arc::new(output);
        let ctrl = ctrl.clone();
        Ok(PhysicalOperator::transform(move |stream| {
            map_events("project", stream, ctrl, move |events| {
                if indices.is_empty() {
                    return Ok(Batch::Empty);
                }
                if identity {
                    return Ok(Batch::Events(events));
                }
                let projected = events
                    .project(Arc::clone(&output), &indices)
                    .map_err(|e| OpError::Exec(e.to_string()))?;
                Ok(Batch::Events(projected))
            })
        }))
    }
}
