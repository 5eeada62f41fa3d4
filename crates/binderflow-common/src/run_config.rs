//! Immutable parameters for a single pipeline run.
//!
//! A `RunConfiguration` is validated once, in `RunConfigurationBuilder::build`,
//! and is read-only afterwards. Stages derive new values from it instead of
//! editing it.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{BinderError, Result};
use crate::region::RegionEntry;

/// The 20 standard amino-acid residue codes.
pub const STANDARD_RESIDUES: &str = "ACDEFGHIKLMNPQRSTVWY";

/// Diffusion step range recommended for binder design.
pub const RECOMMENDED_DIFFUSION_STEPS: std::ops::RangeInclusive<u32> = 15..=30;

/// Returns the first character that is not a standard residue code, if any.
pub fn first_invalid_residue(sequence: &str) -> Option<char> {
    sequence.chars().find(|c| !STANDARD_RESIDUES.contains(*c))
}

#[derive(Debug, Clone, Serialize)]
pub struct RunConfiguration {
    region_label: String,
    target_sequence: String,
    region_spec: String,
    structure_path: PathBuf,
    structure_source_url: Option<String>,
    requested_sequence_count: u32,
    diffusion_step_count: u32,
    sampling_temperature: f64,
    chain_selectors: Vec<String>,
    ca_only: bool,
    use_soluble_model: bool,
}

impl RunConfiguration {
    pub fn builder(region_label: impl Into<String>) -> RunConfigurationBuilder {
        RunConfigurationBuilder::new(region_label)
    }

    pub fn region_label(&self) -> &str { &self.region_label }
    pub fn target_sequence(&self) -> &str { &self.target_sequence }
    pub fn region_spec(&self) -> &str { &self.region_spec }
    pub fn structure_path(&self) -> &Path { &self.structure_path }
    pub fn structure_source_url(&self) -> Option<&str> { self.structure_source_url.as_deref() }
    pub fn requested_sequence_count(&self) -> u32 { self.requested_sequence_count }
    pub fn diffusion_step_count(&self) -> u32 { self.diffusion_step_count }
    pub fn sampling_temperature(&self) -> f64 { self.sampling_temperature }
    pub fn chain_selectors(&self) -> &[String] { &self.chain_selectors }
    pub fn ca_only(&self) -> bool { self.ca_only }
    pub fn use_soluble_model(&self) -> bool { self.use_soluble_model }

    /// Deterministic run name: `cycle{label}_{n}seqs_{steps}diff_{temp}temp`.
    pub fn run_name(&self) -> String {
        format!(
            "cycle{}_{}seqs_{}diff_{}temp",
            self.region_label,
            self.requested_sequence_count,
            self.diffusion_step_count,
            format_temperature(self.sampling_temperature),
        )
    }
}

/// Renders a temperature for run and directory names. See [`format_decimal`].
pub fn format_temperature(value: f64) -> String {
    format_decimal(value)
}

/// Shortest round-trip rendering of `value` with at least one fractional
/// digit (`0.2`, `1.0`). Magnitudes below 1e-4 or from 1e16 up switch to
/// exponent form with a signed two-digit exponent (`3.2e-07`, `1e+16`).
pub fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }

    let magnitude = value.abs();
    if value != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let rendered = format!("{:e}", value);
        return match rendered.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => rendered,
        };
    }

    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Builder for [`RunConfiguration`]. All checks happen in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RunConfigurationBuilder {
    region_label: String,
    target_sequence: String,
    region_spec: String,
    structure_path: PathBuf,
    structure_source_url: Option<String>,
    requested_sequence_count: u32,
    diffusion_step_count: u32,
    sampling_temperature: f64,
    chain_selectors: Vec<String>,
    ca_only: bool,
    use_soluble_model: bool,
}

impl RunConfigurationBuilder {
    fn new(region_label: impl Into<String>) -> Self {
        Self {
            region_label: region_label.into(),
            target_sequence: String::new(),
            region_spec: String::new(),
            structure_path: PathBuf::new(),
            structure_source_url: None,
            requested_sequence_count: 1,
            diffusion_step_count: 20,
            sampling_temperature: 0.2,
            chain_selectors: Vec::new(),
            ca_only: false,
            use_soluble_model: true,
        }
    }

    /// Copies target, region spec and structure input from a catalog entry.
    pub fn region(mut self, entry: &RegionEntry) -> Self {
        self.target_sequence = entry.target_sequence.clone();
        self.region_spec = entry.region_spec.clone();
        self.structure_path = entry.structure_path.clone();
        self.structure_source_url = entry.source_url.clone();
        self
    }

    pub fn target_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.target_sequence = sequence.into();
        self
    }

    pub fn region_spec(mut self, spec: impl Into<String>) -> Self {
        self.region_spec = spec.into();
        self
    }

    pub fn structure_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.structure_path = path.into();
        self
    }

    pub fn structure_source_url(mut self, url: Option<String>) -> Self {
        self.structure_source_url = url;
        self
    }

    pub fn requested_sequence_count(mut self, count: u32) -> Self {
        self.requested_sequence_count = count;
        self
    }

    pub fn diffusion_step_count(mut self, steps: u32) -> Self {
        self.diffusion_step_count = steps;
        self
    }

    pub fn sampling_temperature(mut self, temperature: f64) -> Self {
        self.sampling_temperature = temperature;
        self
    }

    pub fn chain_selectors<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chain_selectors = chains.into_iter().map(Into::into).collect();
        self
    }

    pub fn ca_only(mut self, ca_only: bool) -> Self {
        self.ca_only = ca_only;
        self
    }

    pub fn use_soluble_model(mut self, soluble: bool) -> Self {
        self.use_soluble_model = soluble;
        self
    }

    pub fn build(self) -> Result<RunConfiguration> {
        if self.region_label.trim().is_empty() {
            return Err(BinderError::Config("region label must not be empty".into()));
        }
        if self.target_sequence.is_empty() {
            return Err(BinderError::Config("target sequence must not be empty".into()));
        }
        if let Some(c) = first_invalid_residue(&self.target_sequence) {
            return Err(BinderError::Config(format!(
                "target sequence contains non-standard residue '{}'",
                c
            )));
        }
        if self.region_spec.trim().is_empty() {
            return Err(BinderError::Config("region spec must not be empty".into()));
        }
        if self.structure_path.as_os_str().is_empty() {
            return Err(BinderError::Config("structure path must not be empty".into()));
        }
        if self.requested_sequence_count == 0 {
            return Err(BinderError::Config("requested sequence count must be positive".into()));
        }
        if self.diffusion_step_count == 0 {
            return Err(BinderError::Config("diffusion step count must be positive".into()));
        }
        if !self.sampling_temperature.is_finite()
            || !(0.0..=1.0).contains(&self.sampling_temperature)
        {
            return Err(BinderError::Config(format!(
                "sampling temperature {} is outside [0, 1]",
                self.sampling_temperature
            )));
        }
        if let Some(source) = &self.structure_source_url {
            let parsed = url::Url::parse(source)
                .map_err(|e| BinderError::Config(format!("invalid structure source url '{}': {}", source, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(BinderError::Config(format!(
                    "structure source url '{}' must use http or https",
                    source
                )));
            }
        }
        if !RECOMMENDED_DIFFUSION_STEPS.contains(&self.diffusion_step_count) {
            warn!(
                steps = self.diffusion_step_count,
                "Diffusion step count outside the recommended 15-30 range"
            );
        }

        let mut chains: Vec<String> = Vec::with_capacity(self.chain_selectors.len());
        for chain in self.chain_selectors {
            let chain = chain.trim().to_string();
            if chain.is_empty() {
                return Err(BinderError::Config("chain selector must not be empty".into()));
            }
            if !chains.contains(&chain) {
                chains.push(chain);
            }
        }

        Ok(RunConfiguration {
            region_label: self.region_label,
            target_sequence: self.target_sequence,
            region_spec: self.region_spec,
            structure_path: self.structure_path,
            structure_source_url: self.structure_source_url,
            requested_sequence_count: self.requested_sequence_count,
            diffusion_step_count: self.diffusion_step_count,
            sampling_temperature: self.sampling_temperature,
            chain_selectors: chains,
            ca_only: self.ca_only,
            use_soluble_model: self.use_soluble_model,
        })
    }
}
