//! Request bodies for each stage, built from a `RunConfiguration`.
//!
//! Field names follow the inference services' JSON schemas exactly.

use binderflow_common::{BinderError, Result, RunConfiguration, Stage};
use serde::{Deserialize, Serialize};

use crate::response::StageResponse;
use crate::BinderTargetPair;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureGenerationRequest {
    pub input_pdb: String,
    pub contigs: String,
    pub diffusion_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDesignRequest {
    pub input_pdb: String,
    pub input_pdb_chains: Vec<String>,
    pub ca_only: bool,
    pub use_soluble_model: bool,
    pub num_seq_per_target: u32,
    /// Single-element list; the service samples per temperature in a batch.
    pub sampling_temp: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureValidationRequest {
    /// `[binder, target]`
    pub sequences: Vec<String>,
    pub selected_models: Vec<u32>,
}

/// A request tagged with the stage that serves it. Serialises to the bare body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageRequest {
    StructureGeneration(StructureGenerationRequest),
    SequenceDesign(SequenceDesignRequest),
    StructureValidation(StructureValidationRequest),
}

impl StageRequest {
    pub fn stage(&self) -> Stage {
        match self {
            StageRequest::StructureGeneration(_) => Stage::StructureGeneration,
            StageRequest::SequenceDesign(_) => Stage::SequenceDesign,
            StageRequest::StructureValidation(_) => Stage::StructureValidation,
        }
    }
}

pub fn structure_generation(cfg: &RunConfiguration, structural_input: String) -> StageRequest {
    StageRequest::StructureGeneration(StructureGenerationRequest {
        input_pdb: structural_input,
        contigs: cfg.region_spec().to_string(),
        diffusion_steps: cfg.diffusion_step_count(),
    })
}

/// Builds the design request from the generation stage's output.
pub fn sequence_design(cfg: &RunConfiguration, previous: &StageResponse) -> Result<StageRequest> {
    let StageResponse::Structure { structure_text } = previous else {
        return Err(BinderError::InvariantViolation(format!(
            "sequence design expects a structure generation result, got {}",
            previous.stage()
        )));
    };

    Ok(StageRequest::SequenceDesign(SequenceDesignRequest {
        input_pdb: structure_text.clone(),
        input_pdb_chains: cfg.chain_selectors().to_vec(),
        ca_only: cfg.ca_only(),
        use_soluble_model: cfg.use_soluble_model(),
        num_seq_per_target: cfg.requested_sequence_count(),
        sampling_temp: vec![cfg.sampling_temperature()],
    }))
}

pub fn structure_validation(pair: &BinderTargetPair, selected_models: &[u32]) -> StageRequest {
    StageRequest::StructureValidation(StructureValidationRequest {
        sequences: vec![pair.binder.clone(), pair.target.clone()],
        selected_models: selected_models.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg() -> RunConfiguration {
        RunConfiguration::builder("1")
            .target_sequence("MDPPRP")
            .region_spec("A400-600/0 15-25")
            .structure_path("cycle1.pdb")
            .requested_sequence_count(4)
            .diffusion_step_count(30)
            .sampling_temperature(0.2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_generation_body_has_exact_fields() {
        let req = structure_generation(&cfg(), "ATOM 1".to_string());
        assert_eq!(req.stage(), Stage::StructureGeneration);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"input_pdb": "ATOM 1", "contigs": "A400-600/0 15-25", "diffusion_steps": 30})
        );
    }

    #[test]
    fn test_design_body_consumes_previous_structure() {
        let prev = StageResponse::Structure { structure_text: "ATOM backbone".to_string() };
        let req = sequence_design(&cfg(), &prev).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "input_pdb": "ATOM backbone",
                "input_pdb_chains": [],
                "ca_only": false,
                "use_soluble_model": true,
                "num_seq_per_target": 4,
                "sampling_temp": [0.2]
            })
        );
    }

    #[test]
    fn test_design_rejects_wrong_previous_stage() {
        let prev = StageResponse::Validation { structures: vec![] };
        let err = sequence_design(&cfg(), &prev).unwrap_err();
        assert!(matches!(err, BinderError::InvariantViolation(_)));
    }

    #[test]
    fn test_validation_body() {
        let pair = BinderTargetPair::new("AAAA", "MDP");
        let req = structure_validation(&pair, &[1]);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"sequences": ["AAAA", "MDP"], "selected_models": [1]})
        );
    }
}
