//! Batch emotion analysis over encrypted features.
//!
//! Wires the pieces together for one process: configuration, the classifier
//! artifact, the embedding extractor, the encryption context and the
//! orchestrator that runs posts through them. The `veilmood` binary is a
//! thin CLI over this crate.

pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod proof;
pub mod stats;
pub mod weights;

use std::sync::Arc;

use veilmood_core::{CkksContext, Error, FeatureExtractor, Result, REQUIRED_DEPTH};
use veilmood_inference::EmbeddingExtractor;

pub use config::PipelineConfig;
pub use orchestrator::{CancellationToken, Pipeline, PipelineOptions};
pub use proof::{CommandProofVerifier, ProofVerifier, Verdict};
pub use stats::AnalysisResult;

/// The production pipeline: ONNX encoder and the CKKS backend.
pub type EncryptedPipeline = Pipeline<EmbeddingExtractor, CkksContext>;

/// Create the encryption context described by `config`.
///
/// With `keys_path` set, keys are loaded from it or generated and saved
/// there on first run.
pub fn open_context(config: &PipelineConfig) -> Result<CkksContext> {
    match &config.keys_path {
        Some(path) => CkksContext::load_or_generate(config.encryption.clone(), path, REQUIRED_DEPTH),
        None => CkksContext::new(config.encryption.clone(), REQUIRED_DEPTH),
    }
}

/// Load every artifact once and build the pipeline.
///
/// A feature length disagreement between encoder and classifier is a
/// deployment error and fails here rather than skipping every post.
pub fn build_pipeline(config: &PipelineConfig) -> Result<EncryptedPipeline> {
    let weights = weights::load_classifier_weights(&config.classifier_path)?;
    let extractor = EmbeddingExtractor::load(&config.encoder)?;
    if extractor.dim() != weights.feature_dim() {
        return Err(Error::Dimension { expected: weights.feature_dim(), actual: extractor.dim() });
    }
    let context = open_context(config)?;

    let options = PipelineOptions { workers: config.workers, snippet_chars: config.snippet_chars };
    Pipeline::new(Arc::new(extractor), Arc::new(context), Arc::new(weights), options)
}
