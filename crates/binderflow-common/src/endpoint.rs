//! Pipeline stages and the service endpoints that serve them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One remote inference call in the fixed pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    StructureGeneration,
    SequenceDesign,
    StructureValidation,
}

impl Stage {
    pub const ALL: [Stage; 3] = [
        Stage::StructureGeneration,
        Stage::SequenceDesign,
        Stage::StructureValidation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::StructureGeneration => "structure_generation",
            Stage::SequenceDesign => "sequence_design",
            Stage::StructureValidation => "structure_validation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a stage's service lives and how long it may hold a request open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Scheme and host, e.g. "http://localhost"
    pub base_url: String,
    pub port: u16,
    /// Invocation path, without a leading slash
    pub path: String,
    /// Readiness path, without a leading slash
    pub health_path: String,
    /// Long-poll budget advertised via the `poll-seconds` header
    pub poll_seconds: u64,
}

impl ServiceEndpoint {
    pub fn url(&self) -> String {
        join(&self.base_url, self.port, &self.path)
    }

    pub fn health_url(&self) -> String {
        join(&self.base_url, self.port, &self.health_path)
    }
}

fn join(base: &str, port: u16, path: &str) -> String {
    format!(
        "{}:{}/{}",
        base.trim_end_matches('/'),
        port,
        path.trim_start_matches('/')
    )
}
