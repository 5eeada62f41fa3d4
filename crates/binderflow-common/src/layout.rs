//! Output layout conventions for run artifacts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::BinderError;
use crate::run_config::{format_temperature, RunConfiguration};

/// Directory naming and optional files for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayoutPolicy {
    /// `cycle{label}_{steps}diff_{temp}temp`, readable pairs and scores
    /// files written.
    #[default]
    CycleScoped,
    /// `{steps}diff_{temp}temp_{count}numseq`
    NumSeqScoped,
    /// `{steps}diff_{temp}temp_{count}seq`
    SeqScoped,
}

impl OutputLayoutPolicy {
    pub fn run_dir(&self, root: &Path, cfg: &RunConfiguration) -> PathBuf {
        let temp = format_temperature(cfg.sampling_temperature());
        let steps = cfg.diffusion_step_count();
        let count = cfg.requested_sequence_count();
        let dir = match self {
            OutputLayoutPolicy::CycleScoped => {
                format!("cycle{}_{}diff_{}temp", cfg.region_label(), steps, temp)
            }
            OutputLayoutPolicy::NumSeqScoped => format!("{}diff_{}temp_{}numseq", steps, temp, count),
            OutputLayoutPolicy::SeqScoped => format!("{}diff_{}temp_{}seq", steps, temp, count),
        };
        root.join(dir)
    }

    /// Path of the structured pairs document. Always inside `run_dir`.
    pub fn pairs_path(&self, run_dir: &Path, run_name: &str) -> PathBuf {
        match self {
            OutputLayoutPolicy::CycleScoped => run_dir.join(format!("3_proteinmpnn_pairs_{}.json", run_name)),
            _ => run_dir.join(format!("3_{}_proteinmpnn_pairs.json", run_name)),
        }
    }

    pub fn writes_pairs_text(&self) -> bool {
        matches!(self, OutputLayoutPolicy::CycleScoped)
    }

    pub fn writes_scores(&self) -> bool {
        matches!(self, OutputLayoutPolicy::CycleScoped)
    }
}

impl FromStr for OutputLayoutPolicy {
    type Err = BinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cycle_scoped" | "cycle" => Ok(OutputLayoutPolicy::CycleScoped),
            "num_seq_scoped" | "numseq" => Ok(OutputLayoutPolicy::NumSeqScoped),
            "seq_scoped" | "seq" => Ok(OutputLayoutPolicy::SeqScoped),
            other => Err(BinderError::Config(format!("unknown output layout '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RunConfiguration {
        RunConfiguration::builder("1A")
            .target_sequence("MDPP")
            .region_spec("A400-440/0 15-25")
            .structure_path("in.pdb")
            .requested_sequence_count(5)
            .diffusion_step_count(25)
            .sampling_temperature(0.2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_run_dirs_per_layout() {
        let root = Path::new("/out");
        let cfg = cfg();
        assert_eq!(
            OutputLayoutPolicy::CycleScoped.run_dir(root, &cfg),
            PathBuf::from("/out/cycle1A_25diff_0.2temp")
        );
        assert_eq!(
            OutputLayoutPolicy::NumSeqScoped.run_dir(root, &cfg),
            PathBuf::from("/out/25diff_0.2temp_5numseq")
        );
        assert_eq!(
            OutputLayoutPolicy::SeqScoped.run_dir(root, &cfg),
            PathBuf::from("/out/25diff_0.2temp_5seq")
        );
    }

    #[test]
    fn test_pairs_path_stays_in_run_dir() {
        let dir = Path::new("/out/run");
        assert_eq!(
            OutputLayoutPolicy::CycleScoped.pairs_path(dir, "n"),
            PathBuf::from("/out/run/3_proteinmpnn_pairs_n.json")
        );
        assert_eq!(
            OutputLayoutPolicy::SeqScoped.pairs_path(dir, "n"),
            PathBuf::from("/out/run/3_n_proteinmpnn_pairs.json")
        );
        assert_eq!(
            OutputLayoutPolicy::NumSeqScoped.pairs_path(dir, "n"),
            PathBuf::from("/out/run/3_n_proteinmpnn_pairs.json")
        );
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!("numseq".parse::<OutputLayoutPolicy>().unwrap(), OutputLayoutPolicy::NumSeqScoped);
        assert!("flat".parse::<OutputLayoutPolicy>().is_err());
    }
}
