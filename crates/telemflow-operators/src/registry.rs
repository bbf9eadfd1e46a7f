//! Operator plugin registry.
//!
//! A plugin parses the text of one pipeline stage. It consumes its name's
//! arguments and hands back the remaining text, which starts at the next
//! stage (or is empty).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::args::split_args;
use crate::traits::{LogicalOperator, OpError};

pub trait OperatorPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parse the arguments of this operator from the start of `text` (the
    /// operator name already consumed). Returns the rest of the pipeline text
    /// and the parsed operator.
    fn parse<'a>(&self, text: &'a str) -> Result<(&'a str, Arc<dyn LogicalOperator>), OpError>;
}

/// Lookup surface used by the pipeline parser.
pub trait PluginRegistry {
    fn find_by_name(&self, name: &str) -> Option<&dyn OperatorPlugin>;
}

type ParseFn = fn(&str) -> Result<Arc<dyn LogicalOperator>, OpError>;

/// Plugin for operators whose arguments run up to the next unquoted `|`.
pub struct ArgsPlugin {
    name: &'static str,
    parse: ParseFn,
}

impl ArgsPlugin {
    pub const fn new(name: &'static str, parse: ParseFn) -> Self {
        Self { name, parse }
    }
}

impl OperatorPlugin for ArgsPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse<'a>(&self, text: &'a str) -> Result<(&'a str, Arc<dyn LogicalOperator>), OpError> {
        let (args, rest) = split_args(text);
        let op = (self.parse)(args)?;
        Ok((rest, op))
    }
}

#[derive(Default)]
pub struct Registry {
    plugins: BTreeMap<&'static str, Box<dyn OperatorPlugin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in operator.
    pub fn builtin() -> Self {
        let mut r = Self::new();
        r.register(crate::source::from_plugin());
        r.register(crate::source::load_plugin());
        r.register(crate::codec::parse_json_plugin());
        r.register(crate::codec::print_json_plugin());
        r.register(crate::filter::plugin());
        r.register(crate::filter::select_plugin());
        r.register(crate::project::plugin());
        r.register(crate::map::plugin());
        r.register(crate::aggregate::plugin());
        r.register(crate::pass::plugin());
        r.register(crate::sink::write_plugin());
        r.register(crate::sink::save_plugin());
        r.register(crate::sink::discard_plugin());
        r
    }

    /// Shared registry of built-ins.
    pub fn global() -> &'static Registry {
        static GLOBAL: Lazy<Registry> = Lazy::new(Registry::builtin);
        &GLOBAL
    }

    /// Add a plugin, replacing any plugin of the same name.
    pub fn register<P: OperatorPlugin + 'static>(&mut self, plugin: P) -> &mut Self {
        if self.plugins.insert(plugin.name(), Box::new(plugin)).is_some() {
            tracing::debug!("replaced operator plugin");
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginRegistry for Registry {
    fn find_by_name(&self, name: &str) -> Option<&dyn OperatorPlugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.plugins.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let names: Vec<_> = Registry::global().names().collect();
        for expected in [
            "from",
            "load",
            "parse-json",
            "print-json",
            "where",
            "select",
            "project",
            "rename",
            "summarize",
            "pass",
            "write",
            "save",
            "discard",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert!(Registry::global().find_by_name("sort").is_none());
    }

    #[test]
    fn args_plugin_returns_remaining_text() {
        let plugin = Registry::global().find_by_name("where").unwrap();
        let (rest, op) = plugin.parse(" port > 10 | discard").unwrap();
        assert_eq!(rest, " discard");
        assert_eq!(op.to_string(), "where port > 10");
    }
}
