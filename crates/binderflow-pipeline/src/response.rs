//! Decoded stage outputs.

use binderflow_common::{BinderError, Result, Stage};
use serde::{Deserialize, Serialize};

/// Output of one stage. Only fields used downstream or persisted are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageResponse {
    Structure {
        structure_text: String,
    },
    Design {
        raw_sequence_blob: String,
        /// One matrix per designed sequence, one row per position.
        per_position_probabilities: Vec<Vec<Vec<f64>>>,
        scores: Option<Vec<f64>>,
    },
    Validation {
        structures: Vec<String>,
    },
}

impl StageResponse {
    pub fn stage(&self) -> Stage {
        match self {
            StageResponse::Structure { .. } => Stage::StructureGeneration,
            StageResponse::Design { .. } => Stage::SequenceDesign,
            StageResponse::Validation { .. } => Stage::StructureValidation,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerationBody {
    output_pdb: String,
}

#[derive(Debug, Deserialize)]
struct DesignBody {
    mfasta: String,
    #[serde(default)]
    probs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    scores: Option<Vec<f64>>,
}

/// Decodes a 200 response body into the shape `stage` promises.
///
/// A body that does not match the contract is an invariant violation.
pub fn decode(stage: Stage, body: &str) -> Result<StageResponse> {
    let violation = |e: serde_json::Error| {
        BinderError::InvariantViolation(format!("undecodable {} response: {}", stage, e))
    };

    match stage {
        Stage::StructureGeneration => {
            let body: GenerationBody = serde_json::from_str(body).map_err(violation)?;
            Ok(StageResponse::Structure { structure_text: body.output_pdb })
        }
        Stage::SequenceDesign => {
            let body: DesignBody = serde_json::from_str(body).map_err(violation)?;
            Ok(StageResponse::Design {
                raw_sequence_blob: body.mfasta,
                per_position_probabilities: body.probs,
                scores: body.scores,
            })
        }
        Stage::StructureValidation => {
            let structures: Vec<String> = serde_json::from_str(body).map_err(violation)?;
            Ok(StageResponse::Validation { structures })
        }
    }
}
