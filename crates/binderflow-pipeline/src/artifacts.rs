//! Binder/target pairing and run artifact persistence.
//!
//! Files are named after the run, prefixed with the stage number that
//! produced them. Each file is written in one call as soon as its stage
//! completes; nothing is removed if a later stage fails.

use binderflow_common::{format_decimal, OutputLayoutPolicy, Result, RunConfiguration};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// A designed binder and the target it was designed against.
/// Serialised as `[binder, target]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "(String, String)", from = "(String, String)")]
pub struct BinderTargetPair {
    pub binder: String,
    pub target: String,
}

impl BinderTargetPair {
    pub fn new(binder: impl Into<String>, target: impl Into<String>) -> Self {
        Self { binder: binder.into(), target: target.into() }
    }
}

impl From<BinderTargetPair> for (String, String) {
    fn from(pair: BinderTargetPair) -> Self {
        (pair.binder, pair.target)
    }
}

impl From<(String, String)> for BinderTargetPair {
    fn from((binder, target): (String, String)) -> Self {
        Self { binder, target }
    }
}

/// One pair per designed sequence, in parser order, all sharing `target`.
pub fn pair_with_target(sequences: &[String], target: &str) -> Vec<BinderTargetPair> {
    sequences
        .iter()
        .map(|binder| BinderTargetPair::new(binder.clone(), target))
        .collect()
}

/// `Sequence i:` then one comma-joined row per position, blank line after each block.
pub fn format_probabilities(probs: &[Vec<Vec<f64>>]) -> String {
    let mut out = String::new();
    for (i, matrix) in probs.iter().enumerate() {
        let _ = writeln!(out, "Sequence {}:", i + 1);
        for row in matrix {
            let line: Vec<String> = row.iter().map(|p| format_decimal(*p)).collect();
            let _ = writeln!(out, "{}", line.join(","));
        }
        out.push('\n');
    }
    out
}

pub fn format_pairs_text(pairs: &[BinderTargetPair]) -> String {
    let mut out = String::new();
    for (i, pair) in pairs.iter().enumerate() {
        let _ = writeln!(out, "Binder {}: {}", i + 1, pair.binder);
        let _ = writeln!(out, "Target {}: {}", i + 1, pair.target);
        out.push('\n');
    }
    out
}

pub fn format_scores(scores: &[f64]) -> String {
    scores
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Sequence {}: Score = {}\n", i + 1, format_decimal(*s)))
        .collect()
}

/// Pretty JSON with 4-space indentation.
pub fn pairs_json(pairs: &[BinderTargetPair]) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    pairs.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Predicted structures for one validated pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedPair {
    pub pair: BinderTargetPair,
    pub structures: Vec<String>,
}

pub fn format_validation_summary(results: &[ValidatedPair]) -> String {
    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(out, "Result {}:", i + 1);
        let _ = writeln!(out, "Binder: {}", result.pair.binder);
        if result.structures.is_empty() {
            out.push_str("No result available for this pair.\n");
        }
        for (j, structure) in result.structures.iter().enumerate() {
            let _ = writeln!(out, "Prediction {}:", j + 1);
            out.push_str(structure);
            out.push_str("\n\n");
        }
        let _ = writeln!(out, "{}", "-".repeat(50));
    }
    out
}

/// Files produced by one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunArtifacts {
    pub run_name: String,
    pub run_dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Writes run artifacts under a directory resolved by an [`OutputLayoutPolicy`].
pub struct ArtifactWriter {
    layout: OutputLayoutPolicy,
    artifacts: RunArtifacts,
}

impl ArtifactWriter {
    /// Creates the run directory (and the output root) if needed.
    pub async fn create(root: &Path, layout: OutputLayoutPolicy, cfg: &RunConfiguration) -> Result<Self> {
        let run_dir = layout.run_dir(root, cfg);
        fs::create_dir_all(&run_dir).await?;
        info!("Output dir: {}", run_dir.display());

        Ok(Self {
            layout,
            artifacts: RunArtifacts {
                run_name: cfg.run_name(),
                run_dir,
                files: Vec::new(),
            },
        })
    }

    pub fn artifacts(&self) -> &RunArtifacts {
        &self.artifacts
    }

    pub fn run_dir(&self) -> &Path {
        &self.artifacts.run_dir
    }

    fn run_file(&self, name: String) -> PathBuf {
        self.artifacts.run_dir.join(name)
    }

    async fn write(&mut self, path: PathBuf, contents: &str) -> Result<PathBuf> {
        fs::write(&path, contents).await?;
        debug!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
        self.artifacts.files.push(path.clone());
        Ok(path)
    }

    /// Structure generation output.
    pub async fn write_structure(&mut self, structure_text: &str) -> Result<PathBuf> {
        let path = self.run_file(format!("2_{}_rfdiffusion.pdb", self.artifacts.run_name));
        self.write(path, structure_text).await
    }

    /// Sequence design outputs: pairs document, raw blob, probabilities and,
    /// depending on layout, readable pairs and scores.
    pub async fn write_design(
        &mut self,
        pairs: &[BinderTargetPair],
        raw_sequence_blob: &str,
        probabilities: &[Vec<Vec<f64>>],
        scores: Option<&[f64]>,
    ) -> Result<()> {
        let name = self.artifacts.run_name.clone();

        if self.layout.writes_pairs_text() {
            let path = self.run_file(format!("3_{}_proteinmpnn.txt", name));
            self.write(path, &format_pairs_text(pairs)).await?;
        }

        let pairs_path = self.layout.pairs_path(&self.artifacts.run_dir, &name);
        self.write(pairs_path, &pairs_json(pairs)?).await?;

        let path = self.run_file(format!("3_{}_proteinmpnn.fasta", name));
        self.write(path, raw_sequence_blob).await?;

        if let (true, Some(scores)) = (self.layout.writes_scores(), scores) {
            let path = self.run_file(format!("3_{}_proteinmpnn_scores.txt", name));
            self.write(path, &format_scores(scores)).await?;
        }

        let path = self.run_file(format!("3_{}_proteinmpnn_probs.txt", name));
        self.write(path, &format_probabilities(probabilities)).await?;
        Ok(())
    }

    /// Validation summary plus one structure file per prediction.
    pub async fn write_validation(&mut self, results: &[ValidatedPair]) -> Result<()> {
        let name = self.artifacts.run_name.clone();
        let path = self.run_file(format!("4_{}_multimer.txt", name));
        self.write(path, &format_validation_summary(results)).await?;

        for (i, result) in results.iter().enumerate() {
            for (j, structure) in result.structures.iter().enumerate() {
                let path = self.run_file(format!("4_{}_{}_prediction{}.pdb", name, i + 1, j + 1));
                self.write(path, structure).await?;
            }
        }
        Ok(())
    }

    /// Serialises `value` as the run manifest. Not recorded in the file list.
    pub async fn write_manifest<T: Serialize>(&self, value: &T) -> Result<PathBuf> {
        let path = self.artifacts.run_dir.join("run_manifest.json");
        fs::write(&path, serde_json::to_string_pretty(value)?).await?;
        Ok(path)
    }
}
