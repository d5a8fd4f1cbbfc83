//! # Pipelines Module
//!
//! High-level workflow orchestration: wiring the window stage, the sample
//! stage and the dense output assembly together.

pub mod imputation;

pub use imputation::{max_chunk_typed_markers, ImputationPipeline, ImputeOutput};
