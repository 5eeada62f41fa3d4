//! Orchestrator for the binder design pipeline.
//!
//! Stages run strictly in sequence, each request built from the previous
//! stage's response:
//!   1. Reduce the precomputed target structure to ATOM records
//!   2. Structure generation (binder backbone)
//!   3. Sequence design on that backbone, parsed and paired with the target
//!   4. Optional complex structure validation, one call per pair
//!
//! The first error ends the run in `Failed`. Artifacts already written stay on
//! disk and a `run_manifest.json` records how far the run got.

use binderflow_common::{BinderError, OutputLayoutPolicy, Result, RunConfiguration};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::artifacts::{pair_with_target, ArtifactWriter, BinderTargetPair, RunArtifacts, ValidatedPair};
use crate::client::StageInvoker;
use crate::fasta::SequenceParser;
use crate::pdb::StructureLoader;
use crate::request;
use crate::response::StageResponse;

/// Run state. Transitions:
/// - `NotStarted` -> `Generating`
/// - `Generating` -> `Designing` | `Failed`
/// - `Designing` -> `Validating` | `Completed` | `Failed`
/// - `Validating` -> `Completed` | `Failed`
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    NotStarted,
    Generating,
    Designing,
    Validating,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (NotStarted, Generating)
                | (Generating, Designing)
                | (Generating, Failed)
                | (Designing, Validating)
                | (Designing, Completed)
                | (Designing, Failed)
                | (Validating, Completed)
                | (Validating, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

/// Current state plus every state visited, in order.
#[derive(Debug, Clone, Serialize)]
pub struct StateMachine {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: PipelineState::NotStarted,
            history: vec![PipelineState::NotStarted],
        }
    }
}

impl StateMachine {
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn advance(&mut self, next: PipelineState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(BinderError::InvariantViolation(format!(
                "illegal pipeline transition {:?} -> {:?}",
                self.state, next
            )));
        }
        info!("Pipeline {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Moves to `Failed` from any non-terminal state.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = PipelineState::Failed;
            self.history.push(PipelineState::Failed);
        }
    }
}

/// Optional validation stage settings.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub selected_models: Vec<u32>,
    /// Pairs to validate, in pairing order; 0 validates all.
    pub max_pairs: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_root: PathBuf,
    pub layout: OutputLayoutPolicy,
    pub parser: SequenceParser,
    pub validation: Option<ValidationOptions>,
}

impl PipelineOptions {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            layout: OutputLayoutPolicy::default(),
            parser: SequenceParser::default(),
            validation: None,
        }
    }
}

/// Summary of a finished run, also persisted as `run_manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_name: String,
    pub region_label: String,
    pub requested_sequence_count: u32,
    pub diffusion_step_count: u32,
    pub sampling_temperature: f64,
    pub state: PipelineState,
    pub history: Vec<PipelineState>,
    pub pairs: Vec<BinderTargetPair>,
    #[serde(skip)]
    pub validated: Vec<ValidatedPair>,
    pub validated_count: usize,
    pub artifacts: RunArtifacts,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub error: Option<String>,
}

/// A run that ended in `Failed`, with the report of how far it got.
#[derive(Debug, Error)]
#[error("run {} failed: {}", .report.run_name, .error)]
pub struct RunFailure {
    pub report: RunReport,
    #[source]
    pub error: BinderError,
}

#[derive(Default)]
struct RunState {
    machine: StateMachine,
    writer: Option<ArtifactWriter>,
    pairs: Vec<BinderTargetPair>,
    validated: Vec<ValidatedPair>,
}

pub struct BinderPipeline {
    invoker: Arc<dyn StageInvoker>,
    loader: StructureLoader,
    options: PipelineOptions,
}

impl BinderPipeline {
    pub fn new(invoker: Arc<dyn StageInvoker>, options: PipelineOptions) -> Self {
        Self {
            invoker,
            loader: StructureLoader::new(),
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs all stages for `cfg`. Each call is an independent run starting
    /// from `NotStarted`.
    pub async fn run(&self, cfg: &RunConfiguration) -> std::result::Result<RunReport, RunFailure> {
        let started_at = Utc::now();
        info!(
            "Running binder pipeline {} (region {}, {})",
            cfg.run_name(),
            cfg.region_label(),
            cfg.region_spec()
        );

        let mut run = RunState::default();
        let outcome = self.drive(cfg, &mut run).await;
        if let Err(e) = &outcome {
            error!("Pipeline failed in {:?}: {}", run.machine.state(), e);
            run.machine.fail();
        }

        let artifacts = run
            .writer
            .as_ref()
            .map(|w| w.artifacts().clone())
            .unwrap_or_else(|| RunArtifacts {
                run_name: cfg.run_name(),
                ..Default::default()
            });
        let report = RunReport {
            run_name: cfg.run_name(),
            region_label: cfg.region_label().to_string(),
            requested_sequence_count: cfg.requested_sequence_count(),
            diffusion_step_count: cfg.diffusion_step_count(),
            sampling_temperature: cfg.sampling_temperature(),
            state: run.machine.state(),
            history: run.machine.history().to_vec(),
            validated_count: run.validated.len(),
            pairs: run.pairs,
            validated: run.validated,
            artifacts,
            started_at,
            finished_at: Utc::now(),
            error: outcome.as_ref().err().map(|e| e.to_string()),
        };

        if let Some(writer) = &run.writer {
            if let Err(e) = writer.write_manifest(&report).await {
                warn!("Could not write run manifest: {}", e);
            }
        }

        match outcome {
            Ok(()) => {
                info!(
                    "Pipeline {} completed: {} binder/target pairs",
                    report.run_name,
                    report.pairs.len()
                );
                Ok(report)
            }
            Err(error) => Err(RunFailure { report, error }),
        }
    }

    async fn drive(&self, cfg: &RunConfiguration, run: &mut RunState) -> Result<()> {
        run.machine.advance(PipelineState::Generating)?;
        let writer = run.writer.insert(
            ArtifactWriter::create(&self.options.output_root, self.options.layout, cfg).await?,
        );

        let structural_input = self
            .loader
            .reduce(cfg.structure_path(), cfg.structure_source_url())
            .await
            .map_err(|e| match e {
                BinderError::InputNotFound(path) => BinderError::Precondition(format!(
                    "precomputed structure {} does not exist",
                    path.display()
                )),
                other => other,
            })?;

        info!("Running structure generation...");
        let generated = self
            .invoker
            .invoke(&request::structure_generation(cfg, structural_input))
            .await?;
        let StageResponse::Structure { structure_text } = &generated else {
            return Err(unexpected(&generated, "structure generation"));
        };
        writer.write_structure(structure_text).await?;

        run.machine.advance(PipelineState::Designing)?;
        info!("Running sequence design...");
        let designed = self
            .invoker
            .invoke(&request::sequence_design(cfg, &generated)?)
            .await?;
        let (raw_sequence_blob, per_position_probabilities, scores) = match designed {
            StageResponse::Design {
                raw_sequence_blob,
                per_position_probabilities,
                scores,
            } => (raw_sequence_blob, per_position_probabilities, scores),
            other => return Err(unexpected(&other, "sequence design")),
        };

        let sequences = self.options.parser.parse(&raw_sequence_blob);
        if sequences.len() != cfg.requested_sequence_count() as usize {
            warn!(
                parsed = sequences.len(),
                requested = cfg.requested_sequence_count(),
                "Designed sequence count differs from request"
            );
        }
        let pairs = pair_with_target(&sequences, cfg.target_sequence());
        writer
            .write_design(&pairs, &raw_sequence_blob, &per_position_probabilities, scores.as_deref())
            .await?;
        run.pairs = pairs;

        if let Some(validation) = &self.options.validation {
            run.machine.advance(PipelineState::Validating)?;
            let limit = match validation.max_pairs {
                0 => run.pairs.len(),
                n => n.min(run.pairs.len()),
            };

            for (i, pair) in run.pairs.iter().take(limit).enumerate() {
                info!("Validating binder/target pair {} of {}", i + 1, limit);
                let validated = self
                    .invoker
                    .invoke(&request::structure_validation(pair, &validation.selected_models))
                    .await?;
                let structures = match validated {
                    StageResponse::Validation { structures } => structures,
                    other => return Err(unexpected(&other, "structure validation")),
                };
                run.validated.push(ValidatedPair {
                    pair: pair.clone(),
                    structures,
                });
            }
            writer.write_validation(&run.validated).await?;
        }

        run.machine.advance(PipelineState::Completed)?;
        Ok(())
    }
}

fn unexpected(response: &StageResponse, expected: &str) -> BinderError {
    BinderError::InvariantViolation(format!(
        "expected a {} response, got {}",
        expected,
        response.stage()
    ))
}
