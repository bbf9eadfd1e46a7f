//! Engine configuration that downstream crates can serialize/deserialize.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Named concepts: a concept name maps to the field names it stands for.
pub type ConceptsMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Preferred number of rows per events batch (reported as demand).
    pub batch_rows: usize,

    /// Preferred number of bytes per byte chunk (reported as demand).
    pub chunk_bytes: usize,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Schema name given to events decoded from JSON.
    pub json_schema_name: String,

    /// Reference data handed to operators through the control plane.
    pub concepts: ConceptsMap,
    pub schemas: Vec<Schema>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_rows: 1024,
            chunk_bytes: 64 * 1024,
            log_level: "info".to_string(),
            json_schema_name: "json".to_string(),
            concepts: ConceptsMap::new(),
            schemas: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TELEMFLOW_BATCH_ROWS`: rows per events batch
    /// - `TELEMFLOW_CHUNK_BYTES`: bytes per byte chunk
    /// - `TELEMFLOW_LOG`: default log filter
    /// - `TELEMFLOW_JSON_SCHEMA_NAME`: schema name for decoded JSON events
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TELEMFLOW_BATCH_ROWS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.batch_rows = v;
            }
        }

        if let Ok(s) = std::env::var("TELEMFLOW_CHUNK_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.chunk_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("TELEMFLOW_LOG") {
            cfg.log_level = s;
        }

        if let Ok(s) = std::env::var("TELEMFLOW_JSON_SCHEMA_NAME") {
            cfg.json_schema_name = s;
        }

        cfg
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_rows == 0 {
            return Err(Error::Config("batch_rows must be positive".into()));
        }
        if self.chunk_bytes == 0 {
            return Err(Error::Config("chunk_bytes must be positive".into()));
        }
        if self.json_schema_name.trim().is_empty() {
            return Err(Error::Config("json_schema_name must not be empty".into()));
        }
        for (concept, fields) in &self.concepts {
            if fields.is_empty() {
                return Err(Error::Config(format!(
                    "concept '{concept}' does not name any field"
                )));
            }
        }
        Ok(())
    }
}
