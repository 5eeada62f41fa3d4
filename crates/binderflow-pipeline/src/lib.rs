//! binderflow-pipeline — Staged protein binder design.
//!
//! Drives three remote inference services in a fixed order:
//! 1. Structure generation of a binder backbone against a target region
//! 2. Sequence design on the generated backbone
//! 3. Optional complex structure validation of each binder/target pair
//!
//! and persists every stage's output under a deterministic run name.

pub mod artifacts;
pub mod client;
pub mod fasta;
pub mod pdb;
pub mod pipeline;
pub mod request;
pub mod response;

pub use artifacts::{BinderTargetPair, RunArtifacts};
pub use client::{NimClient, StageInvoker};
pub use fasta::SequenceParser;
pub use pipeline::{BinderPipeline, PipelineOptions, PipelineState, RunFailure, RunReport, ValidationOptions};
pub use response::StageResponse;
