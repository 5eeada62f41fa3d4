//! Region catalog: maps a cycle label to the target window it designs against.
//!
//! Entries come from the `[[regions]]` array of `binderflow.toml` and are
//! validated as a whole at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{BinderError, Result};
use crate::run_config::first_invalid_residue;

/// One selectable region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    /// Cycle label, e.g. "1", "1A", "2D"
    pub label: String,

    /// Full target protein sequence
    pub target_sequence: String,

    /// Contig expression handed to structure generation, e.g. "A400-440/0 15-25"
    pub region_spec: String,

    /// Precomputed structure for the target
    pub structure_path: PathBuf,

    /// Optional remote copy, fetched when `structure_path` is missing
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    entries: BTreeMap<String, RegionEntry>,
}

impl RegionCatalog {
    /// Builds and validates a catalog. Every entry is checked, so a bad
    /// config fails at startup rather than on the run that selects it.
    pub fn new(entries: Vec<RegionEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(BinderError::Config("region catalog is empty".into()));
        }

        let mut map = BTreeMap::new();
        for mut entry in entries {
            entry.label = entry.label.trim().to_string();
            validate_entry(&entry)?;
            if map.contains_key(&entry.label) {
                return Err(BinderError::Config(format!(
                    "duplicate region label '{}'",
                    entry.label
                )));
            }
            map.insert(entry.label.clone(), entry);
        }
        Ok(Self { entries: map })
    }

    pub fn resolve(&self, label: &str) -> Result<&RegionEntry> {
        let label = label.trim();
        self.entries.get(label).ok_or_else(|| {
            BinderError::Config(format!(
                "unknown region label '{}' (known: {})",
                label,
                self.labels().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_entry(entry: &RegionEntry) -> Result<()> {
    let label = entry.label.as_str();
    if label.is_empty() {
        return Err(BinderError::Config("region label must not be empty".into()));
    }
    if entry.target_sequence.is_empty() {
        return Err(BinderError::Config(format!(
            "region '{}' has an empty target sequence",
            label
        )));
    }
    if let Some(c) = first_invalid_residue(&entry.target_sequence) {
        return Err(BinderError::Config(format!(
            "region '{}' target contains non-standard residue '{}'",
            label, c
        )));
    }
    if entry.region_spec.trim().is_empty() {
        return Err(BinderError::Config(format!(
            "region '{}' has an empty region spec",
            label
        )));
    }
    if entry.structure_path.as_os_str().is_empty() {
        return Err(BinderError::Config(format!(
            "region '{}' has no structure path",
            label
        )));
    }
    Ok(())
}
