//! The `Pipeline`: an ordered list of logical operators.

use std::fmt;
use std::sync::Arc;

use telemflow_core::prelude::{ElementType, Error, Result};
use telemflow_operators::{LogicalOperator, PluginRegistry, Registry};

use crate::dsl::name::parse_name;

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    ops: Vec<Arc<dyn LogicalOperator>>,
}

/// One stage as reported by `Pipeline::explain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInfo {
    pub index: usize,
    pub name: &'static str,
    pub input: ElementType,
    pub output: ElementType,
    pub text: String,
}

impl Pipeline {
    pub fn new(ops: Vec<Arc<dyn LogicalOperator>>) -> Self {
        Self { ops }
    }

    /// Parse pipeline text with the built-in operator registry.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, Registry::global())
    }

    /// Parse pipeline text, resolving operator names in `registry`.
    ///
    /// Each stage starts with an operator name; the operator's plugin consumes
    /// its arguments and hands back the rest. Whitespace-only text (or
    /// remainder) ends the pipeline.
    pub fn parse_with(text: &str, registry: &dyn PluginRegistry) -> Result<Self> {
        let mut ops = Vec::new();
        let mut rest = text;
        while !rest.trim().is_empty() {
            let (name, after) = parse_name(rest).ok_or_else(|| Error::Syntax {
                text: text.to_string(),
                reason: "operator name is invalid".to_string(),
            })?;
            let plugin = registry
                .find_by_name(name)
                .ok_or_else(|| Error::UnknownOperator {
                    name: name.to_string(),
                    text: text.to_string(),
                })?;
            let (remaining, op) = plugin.parse(after).map_err(|e| Error::Syntax {
                text: text.to_string(),
                reason: format!("{name}: {e}"),
            })?;
            ops.push(op);
            rest = remaining;
        }
        Ok(Self { ops })
    }

    /// Check element types: the first stage takes `Void`, the last produces
    /// `Void`, and every stage consumes what its predecessor produces.
    pub fn validate(&self) -> Result<()> {
        let (Some(first), Some(last)) = (self.ops.first(), self.ops.last()) else {
            return Ok(());
        };
        if !first.input_element_type().is_void() {
            return Err(shape_error(
                first.as_ref(),
                "input",
                ElementType::Void,
                first.input_element_type(),
            ));
        }
        for pair in self.ops.windows(2) {
            let (producer, consumer) = (&pair[0], &pair[1]);
            if producer.output_element_type() != consumer.input_element_type() {
                return Err(shape_error(
                    consumer.as_ref(),
                    "input",
                    producer.output_element_type(),
                    consumer.input_element_type(),
                ));
            }
        }
        if !last.output_element_type().is_void() {
            return Err(shape_error(
                last.as_ref(),
                "output",
                ElementType::Void,
                last.output_element_type(),
            ));
        }
        Ok(())
    }

    pub fn operators(&self) -> &[Arc<dyn LogicalOperator>] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Per-stage names, element types and canonical text.
    pub fn explain(&self) -> Vec<StageInfo> {
        self.ops
            .iter()
            .enumerate()
            .map(|(index, op)| StageInfo {
                index,
                name: op.name(),
                input: op.input_element_type(),
                output: op.output_element_type(),
                text: op.to_string(),
            })
            .collect()
    }
}

fn shape_error(
    op: &dyn LogicalOperator,
    position: &'static str,
    expected: ElementType,
    actual: ElementType,
) -> Error {
    Error::InvalidPipelineShape {
        operator: op.name().to_string(),
        position,
        expected,
        actual,
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Pipeline {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Pipeline::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(p: &Pipeline) -> Vec<&'static str> {
        p.operators().iter().map(|op| op.name()).collect()
    }

    #[test]
    fn parses_stages_in_order() {
        let p = Pipeline::parse("from in.jsonl | where port > 1024 | project src, port | write out.jsonl")
            .unwrap();
        assert_eq!(names(&p), ["from", "where", "project", "write"]);
        p.validate().unwrap();
    }

    #[test]
    fn display_round_trips() {
        let text = r#"load "my file.json"|parse-json|rename a=b   |summarize count by b| write o.jsonl"#;
        let p = Pipeline::parse(text).unwrap();
        let rendered = p.to_string();
        assert_eq!(
            rendered,
            r#"load "my file.json" | parse-json | rename a=b | summarize count by b | write o.jsonl"#
        );
        let again = Pipeline::parse(&rendered).unwrap();
        assert_eq!(names(&again), names(&p));
        assert_eq!(again.to_string(), rendered);
    }

    #[test]
    fn empty_text_is_the_empty_pipeline() {
        for text in ["", "   ", "\n\t"] {
            let p = Pipeline::parse(text).unwrap();
            assert!(p.is_empty());
            p.validate().unwrap();
        }
    }

    #[test]
    fn unknown_operator_names_the_token_and_text() {
        let mut registry = Registry::new();
        registry.register(telemflow_operators::sink::write_plugin());
        let err = Pipeline::parse_with("select field==1 | write", &registry).unwrap_err();
        assert_eq!(
            err,
            Error::UnknownOperator {
                name: "select".into(),
                text: "select field==1 | write".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "failed to parse pipeline 'select field==1 | write': operator 'select' does not exist"
        );
    }

    #[test]
    fn invalid_names_and_arguments_are_syntax_errors() {
        let err = Pipeline::parse("| discard").unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to parse pipeline '| discard': operator name is invalid"
        );
        let err = Pipeline::parse("from a.jsonl | where port").unwrap_err();
        match err {
            Error::Syntax { text, reason } => {
                assert_eq!(text, "from a.jsonl | where port");
                assert!(reason.starts_with("where:"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn shape_errors_name_the_operator() {
        let err = Pipeline::parse("where a == 1 | discard").unwrap().validate().unwrap_err();
        assert_eq!(
            err,
            Error::InvalidPipelineShape {
                operator: "where".into(),
                position: "input",
                expected: ElementType::Void,
                actual: ElementType::Events,
            }
        );

        let err = Pipeline::parse("from a | pass").unwrap().validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPipelineShape { position: "output", actual: ElementType::Events, .. }
        ));

        let err = Pipeline::parse("load a | where x == 1 | discard")
            .unwrap()
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidPipelineShape {
                operator: "where".into(),
                position: "input",
                expected: ElementType::Bytes,
                actual: ElementType::Events,
            }
        );
    }

    #[test]
    fn explain_lists_stage_types() {
        let p = Pipeline::parse("load x | parse-json | discard").unwrap();
        let stages = p.explain();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[1].name, "parse-json");
        assert_eq!(stages[1].input, ElementType::Bytes);
        assert_eq!(stages[1].output, ElementType::Events);
        assert_eq!(stages[2].text, "discard");
    }
}
