//! YAML pipeline documents.
//!
//! Example:
//! ```yaml
//! config:
//!   batch_rows: 512
//!   concepts:
//!     net.port: [id.resp_p, port]
//! pipeline: from conn.jsonl | where net.port == 22 | write ssh.jsonl
//! ```
//!
//! Instead of `pipeline`, a document may list `steps`, one stage each; they
//! are joined with `|`.

use serde::{Deserialize, Serialize};

use telemflow_core::prelude::{ConceptsMap, EngineConfig, Error, Result, Schema};
use telemflow_operators::PluginRegistry;

use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDoc {
    #[serde(default)]
    pub config: Option<PipelineConfig>,
    #[serde(default)]
    pub pipeline: Option<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// Engine settings a document may override. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub batch_rows: Option<usize>,
    pub chunk_bytes: Option<usize>,
    pub log_level: Option<String>,
    pub json_schema_name: Option<String>,
    pub concepts: Option<ConceptsMap>,
    pub schemas: Option<Vec<Schema>>,
}

impl PipelineConfig {
    pub fn apply(&self, cfg: &mut EngineConfig) {
        if let Some(v) = self.batch_rows {
            cfg.batch_rows = v;
        }
        if let Some(v) = self.chunk_bytes {
            cfg.chunk_bytes = v;
        }
        if let Some(v) = &self.log_level {
            cfg.log_level = v.clone();
        }
        if let Some(v) = &self.json_schema_name {
            cfg.json_schema_name = v.clone();
        }
        if let Some(v) = &self.concepts {
            cfg.concepts = v.clone();
        }
        if let Some(v) = &self.schemas {
            cfg.schemas = v.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedPipeline {
    pub pipeline: Pipeline,
    pub config: PipelineConfig,
    /// The pipeline text the document described.
    pub text: String,
}

impl PipelineDoc {
    fn text(&self) -> Result<String> {
        match (&self.pipeline, self.steps.is_empty()) {
            (Some(text), true) => Ok(text.clone()),
            (None, false) => Ok(self.steps.join(" | ")),
            (None, true) => Err(Error::Config(
                "pipeline document needs `pipeline` or `steps`".into(),
            )),
            (Some(_), false) => Err(Error::Config(
                "pipeline document cannot have both `pipeline` and `steps`".into(),
            )),
        }
    }
}

/// Parse a YAML document with the built-in operator registry.
pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<ParsedPipeline> {
    parse_yaml_pipeline_with(yaml_src, telemflow_operators::Registry::global())
}

pub fn parse_yaml_pipeline_with(
    yaml_src: &str,
    registry: &dyn PluginRegistry,
) -> Result<ParsedPipeline> {
    let doc: PipelineDoc =
        serde_yaml::from_str(yaml_src).map_err(|e| Error::Config(e.to_string()))?;
    let text = doc.text()?;
    let pipeline = Pipeline::parse_with(&text, registry)?;
    Ok(ParsedPipeline {
        pipeline,
        config: doc.config.unwrap_or_default(),
        text,
    })
}
