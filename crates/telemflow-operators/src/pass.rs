//! `pass`: forwards every batch unchanged.

use std::fmt;
use std::sync::Arc;

use telemflow_core::prelude::{ElementType, Schema};

use crate::args::expect_no_args;
use crate::control::Control;
use crate::registry::ArgsPlugin;
use crate::traits::{LogicalOperator, OpError, PhysicalOperator};

#[derive(Debug, Clone, Copy, Default)]
pub struct Pass;

pub fn plugin() -> ArgsPlugin {
    ArgsPlugin::new("pass", |args| {
        expect_no_args("pass", args)?;
        Ok(Arc::new(Pass))
    })
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pass")
    }
}

impl LogicalOperator for Pass {
    fn name(&self) -> &'static str {
        "pass"
    }

    fn input_element_type(&self) -> ElementType {
        ElementType::Events
    }

    fn output_element_type(&self) -> ElementType {
        ElementType::Events
    }

    fn instantiate(
        &self,
        _input_schema: Option<&Arc<Schema>>,
        _ctrl: &Control,
    ) -> Result<PhysicalOperator, OpError> {
        Ok(PhysicalOperator::transform(|input| input))
    }
}
