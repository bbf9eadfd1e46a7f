use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use telemflow_core::prelude::{DataType, EventBatch, Field, Scalar, Schema};
use telemflow_exec::{Engine, PipelineExt};
use telemflow_io::writers::jsonl::render_batch;
use telemflow_planner::Pipeline;

fn make_batch(rows: usize) -> EventBatch {
    let schema = Arc::new(Schema::new(
        "bench",
        vec![
            Field::new("group", DataType::Utf8, false),
            Field::new("port", DataType::Int64, false),
            Field::new("value", DataType::Float64, false),
        ],
    ));
    let mut groups = Vec::with_capacity(rows);
    let mut ports = Vec::with_capacity(rows);
    let mut values = Vec::with_capacity(rows);
    for i in 0..rows {
        groups.push(Scalar::Str(format!("group-{}", i % 4)));
        ports.push(Scalar::I64((i % 1024) as i64));
        values.push(Scalar::F64((i % 10) as f64));
    }
    EventBatch::try_new(schema, vec![groups, ports, values]).expect("bench batch")
}

fn bench_parse(c: &mut Criterion) {
    let text = "from conn.jsonl | where port > 1024 | project src, port | summarize count, sum(bytes) by src | write out.jsonl";
    c.bench_function("pipeline_parse", |b| {
        b.iter(|| Pipeline::parse(text).expect("parse"))
    });
}

fn bench_render(c: &mut Criterion) {
    let batch = make_batch(1024);
    c.bench_function("render_jsonl_1024", |b| {
        b.iter(|| render_batch(&batch).expect("render"))
    });
}

fn bench_execute(c: &mut Criterion) {
    let dir = std::env::temp_dir().join(format!("telemflow-bench-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("bench dir");
    let input = dir.join("input.jsonl");
    let batch = make_batch(4096);
    std::fs::write(&input, render_batch(&batch).expect("render")).expect("write input");

    let text = format!(
        "from \"{}\" | where port >= 512 | summarize count, sum(value) by group | discard",
        input.display()
    );
    let pipeline = Pipeline::parse(&text).expect("parse");
    let engine = Engine::default();
    c.bench_function("execute_summarize_4096", |b| {
        b.iter(|| engine.run(&pipeline).expect("run"))
    });
    c.bench_function("execute_ticks_4096", |b| {
        b.iter(|| pipeline.execute().filter(|t| t.is_ok()).count())
    });
}

criterion_group!(pipelines, bench_parse, bench_render, bench_execute);
criterion_main!(pipelines);
