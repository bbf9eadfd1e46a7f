//! Pipeline text parsing, rendering and shape checks

use telemflow_core::prelude::{ElementType, Error};
use telemflow_exec::PipelineExt;
use telemflow_operators::{sink, source, Registry};
use telemflow_planner::Pipeline;

#[test]
fn test_round_trip_through_display() {
    let texts = [
        "from conn.jsonl | where port >= 1024 | project src, port | write out.jsonl",
        r#"load "with space.log" | parse-json | where msg == "a | b" | print-json | save x"#,
        "from a | rename src=source | summarize count, max(bytes) by source | discard",
        "from a|pass|pass|discard",
    ];
    for text in texts {
        let first = Pipeline::parse(text).unwrap();
        let rendered = first.to_string();
        let second = Pipeline::parse(&rendered).unwrap();
        assert_eq!(second.to_string(), rendered, "{text}");
        let names = |p: &Pipeline| p.operators().iter().map(|o| o.name()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
        first.validate().unwrap();
    }
}

#[test]
fn test_unknown_operator_reports_name_and_text() {
    let mut registry = Registry::new();
    registry
        .register(source::from_plugin())
        .register(sink::write_plugin());
    let err = Pipeline::parse_with("select field==1 | write", &registry).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownOperator {
            name: "select".into(),
            text: "select field==1 | write".into()
        }
    );
}

#[test]
fn test_events_first_stage_never_runs() {
    let pipeline = Pipeline::parse("select a == 1 | discard").unwrap();
    let ticks: Vec<_> = pipeline.execute().collect();
    assert_eq!(
        ticks,
        vec![Err(Error::InvalidPipelineShape {
            operator: "select".into(),
            position: "input",
            expected: ElementType::Void,
            actual: ElementType::Events,
        })]
    );
}

#[test]
fn test_non_void_last_stage_is_rejected() {
    let err = Pipeline::parse("load x | parse-json").unwrap().validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "unable to execute pipeline: expected output type void, got events (operator 'parse-json')"
    );
}

#[test]
fn test_argument_errors_are_syntax_errors() {
    for text in ["from", "from a b", "summarize avg(x) | discard", "pass now"] {
        assert!(
            matches!(Pipeline::parse(text), Err(Error::Syntax { .. })),
            "{text}"
        );
    }
}
