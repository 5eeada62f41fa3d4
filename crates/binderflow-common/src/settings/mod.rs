//! Configuration loading for binderflow.
//! Reads binderflow.toml from the current directory or the path in BINDERFLOW_CONFIG.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::endpoint::{ServiceEndpoint, Stage};
use crate::error::{BinderError, Result};
use crate::layout::OutputLayoutPolicy;
use crate::region::{RegionCatalog, RegionEntry};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub design: DesignConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub regions: Vec<RegionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Upper bound on one readiness GET. Stage calls are not bounded.
    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,
    #[serde(default = "default_generation")]
    pub structure_generation: ServiceConfig,
    #[serde(default = "default_design")]
    pub sequence_design: ServiceConfig,
    #[serde(default = "default_validation")]
    pub structure_validation: ServiceConfig,
}

fn default_host()         -> String { "http://localhost".to_string() }
fn default_poll_seconds() -> u64    { 900 }
fn default_api_key_env()  -> String { "NGC_CLI_API_KEY".to_string() }
fn default_health_path()  -> String { "v1/health/ready".to_string() }
fn default_probe_timeout_seconds() -> u64 { 10 }

fn default_generation() -> ServiceConfig {
    ServiceConfig { port: 8082, path: "biology/ipd/rfdiffusion/generate".to_string() }
}
fn default_design() -> ServiceConfig {
    ServiceConfig { port: 8083, path: "biology/ipd/proteinmpnn/predict".to_string() }
}
fn default_validation() -> ServiceConfig {
    ServiceConfig {
        port: 8084,
        path: "protein-structure/alphafold2/multimer/predict-structure-from-sequences".to_string(),
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            poll_seconds: default_poll_seconds(),
            api_key_env: default_api_key_env(),
            health_path: default_health_path(),
            probe_timeout_seconds: default_probe_timeout_seconds(),
            structure_generation: default_generation(),
            sequence_design: default_design(),
            structure_validation: default_validation(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub port: u16,
    pub path: String,
}

impl ServicesConfig {
    pub fn endpoint(&self, stage: Stage) -> ServiceEndpoint {
        let svc = match stage {
            Stage::StructureGeneration => &self.structure_generation,
            Stage::SequenceDesign => &self.sequence_design,
            Stage::StructureValidation => &self.structure_validation,
        };
        ServiceEndpoint {
            base_url: self.host.clone(),
            port: svc.port,
            path: svc.path.clone(),
            health_path: self.health_path.clone(),
            poll_seconds: self.poll_seconds,
        }
    }

    /// Reads the bearer credential. A missing or empty variable is fatal.
    pub fn api_key(&self) -> Result<SecretString> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(SecretString::from(key)),
            _ => Err(BinderError::Config(format!(
                "{} environment variable is not set. Export it before running.",
                self.api_key_env
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub layout: OutputLayoutPolicy,
}

fn default_output_root() -> PathBuf { PathBuf::from("./workbench") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { root: default_output_root(), layout: OutputLayoutPolicy::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignConfig {
    #[serde(default)]
    pub chain_selectors: Vec<String>,
    #[serde(default)]
    pub ca_only: bool,
    #[serde(default = "bool_true")]
    pub use_soluble_model: bool,
    #[serde(default = "default_header_marker")]
    pub header_marker: String,
    #[serde(default)]
    pub discard_leading_template: bool,
}

fn bool_true()             -> bool   { true }
fn default_header_marker() -> String { ">T=".to_string() }

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            chain_selectors: vec![],
            ca_only: false,
            use_soluble_model: true,
            header_marker: default_header_marker(),
            discard_leading_template: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_selected_models")]
    pub selected_models: Vec<u32>,
    /// Number of pairs to validate; 0 validates all of them.
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,
}

fn default_selected_models() -> Vec<u32> { vec![1] }
fn default_max_pairs()       -> usize    { 1 }

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            selected_models: default_selected_models(),
            max_pairs: default_max_pairs(),
        }
    }
}

#[cfg(test)]
mod tests;

impl Settings {
    /// Load configuration from binderflow.toml.
    /// Checks BINDERFLOW_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var("BINDERFLOW_CONFIG")
            .unwrap_or_else(|_| "binderflow.toml".to_string());
        Self::load_from(path)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BinderError::Config(format!(
                "Config file not found: {}\n\
                 Copy binderflow.example.toml to binderflow.toml and edit it.",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        if settings.validation.selected_models.is_empty() {
            return Err(BinderError::Config(
                "validation.selected_models must name at least one model".into(),
            ));
        }
        Ok(settings)
    }

    /// Validated region catalog built from `[[regions]]`.
    pub fn region_catalog(&self) -> Result<RegionCatalog> {
        RegionCatalog::new(self.regions.clone())
    }
}
