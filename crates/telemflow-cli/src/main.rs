//! telemflow CLI: parse, inspect and run pipelines.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use telemflow_core::config::EngineConfig;
use telemflow_exec::Engine;
use telemflow_operators::Registry;
use telemflow_planner::{parse_yaml_pipeline, Pipeline, PipelineConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "telemflow")]
#[command(about = "Streaming pipelines over schema-tagged event batches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline
    Run {
        #[command(flatten)]
        source: PipelineSource,

        /// Rows per events batch (overrides config)
        #[arg(long)]
        batch_rows: Option<usize>,

        /// Bytes per byte chunk (overrides config)
        #[arg(long)]
        chunk_bytes: Option<usize>,

        /// Print run statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a pipeline and check its element types
    Validate {
        #[command(flatten)]
        source: PipelineSource,
    },

    /// Show the stages of a pipeline
    Explain {
        #[command(flatten)]
        source: PipelineSource,
    },

    /// List the available operators
    Operators,
}

#[derive(Args)]
struct PipelineSource {
    /// Pipeline text, e.g. "from in.jsonl | where port > 1024 | write out.jsonl"
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    text: Option<String>,

    /// Path to a YAML pipeline document
    #[arg(short, long)]
    file: Option<PathBuf>,
}

struct Loaded {
    pipeline: Pipeline,
    config: PipelineConfig,
}

impl PipelineSource {
    fn load(&self) -> Result<Loaded, Box<dyn Error>> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(Loaded {
                pipeline: Pipeline::parse(text)?,
                config: PipelineConfig::default(),
            }),
            (None, Some(path)) => load_document(path),
            (None, None) => Err("no pipeline given".into()),
        }
    }
}

fn load_document(path: &Path) -> Result<Loaded, Box<dyn Error>> {
    let yaml = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let parsed = parse_yaml_pipeline(&yaml)?;
    Ok(Loaded {
        pipeline: parsed.pipeline,
        config: parsed.config,
    })
}

fn init_logging(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    // A second initialization (e.g. from an embedding host) is not an error.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            source,
            batch_rows,
            chunk_bytes,
            json,
        } => run_pipeline(&source, batch_rows, chunk_bytes, json),
        Commands::Validate { source } => validate_pipeline(&source),
        Commands::Explain { source } => explain_pipeline(&source),
        Commands::Operators => {
            list_operators();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_pipeline(
    source: &PipelineSource,
    batch_rows: Option<usize>,
    chunk_bytes: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let loaded = source.load()?;

    let mut config = EngineConfig::from_env();
    loaded.config.apply(&mut config);
    if let Some(rows) = batch_rows {
        config.batch_rows = rows;
    }
    if let Some(bytes) = chunk_bytes {
        config.chunk_bytes = bytes;
    }
    init_logging(&config.log_level);
    tracing::debug!(
        pipeline = %loaded.pipeline,
        batch_rows = config.batch_rows,
        chunk_bytes = config.chunk_bytes,
        "running pipeline"
    );

    let report = Engine::new(config).run(&loaded.pipeline)?;
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    if json {
        println!("{}", report.stats.to_json()?);
    } else {
        println!("✓ Pipeline executed successfully");
        println!("  Duration: {}ms", report.elapsed.as_millis());
        println!("  Ticks: {} ({} stalls)", report.stats.ticks, report.stats.stalls);
        println!("  Operator instances: {}", report.stats.instantiations);
        println!("  Warnings: {}", report.warnings.len());
    }
    Ok(())
}

fn validate_pipeline(source: &PipelineSource) -> Result<(), Box<dyn Error>> {
    let loaded = source.load()?;
    loaded.pipeline.validate()?;
    println!("✓ Pipeline is valid");
    Ok(())
}

fn explain_pipeline(source: &PipelineSource) -> Result<(), Box<dyn Error>> {
    let loaded = source.load()?;
    let shape = loaded.pipeline.validate();

    println!("Pipeline");
    println!("========");
    println!();
    println!("  {}", loaded.pipeline);
    println!();
    println!("Stages:");
    for stage in loaded.pipeline.explain() {
        println!(
            "  {}. {:<12} {} -> {}    {}",
            stage.index + 1,
            stage.name,
            stage.input,
            stage.output,
            stage.text
        );
    }
    println!();
    match shape {
        Ok(()) => println!("Shape: ok"),
        Err(e) => println!("Shape: {e}"),
    }
    Ok(())
}

fn list_operators() {
    for name in Registry::global().names() {
        println!("{name}");
    }
}
