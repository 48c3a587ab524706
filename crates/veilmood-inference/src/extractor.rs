/// The embedding extractor: post text to feature vector.
///
/// Tokenizer and encoder are loaded once from the paths in `EncoderConfig`
/// and then only read, so one extractor serves every worker thread. No I/O
/// happens per call.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use veilmood_core::features::ensure_text;
use veilmood_core::{FeatureExtractor, FeatureVector, Result};

use crate::embedding::{EmbeddingModel, Pooling};
use crate::tokenizer::SentenceTokenizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub tokenizer_path: PathBuf,
    pub encoder_path: PathBuf,
    /// Fixed token length every post is truncated or padded to.
    pub max_length: usize,
    /// Width of the encoder's final hidden state.
    pub hidden_size: usize,
    pub pooling: Pooling,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            tokenizer_path: PathBuf::from("models/tokenizer.json"),
            encoder_path: PathBuf::from("models/encoder.onnx"),
            max_length: 128,
            hidden_size: 768,
            pooling: Pooling::Mean,
        }
    }
}

pub struct EmbeddingExtractor {
    tokenizer: SentenceTokenizer,
    model: EmbeddingModel,
}

impl EmbeddingExtractor {
    pub fn load(config: &EncoderConfig) -> Result<Self> {
        let tokenizer = SentenceTokenizer::from_file(&config.tokenizer_path, config.max_length)?;
        let model = EmbeddingModel::from_onnx(
            &config.encoder_path,
            config.max_length,
            config.hidden_size,
            config.pooling,
        )?;
        Ok(Self { tokenizer, model })
    }

    /// Raw pooled embedding, before conversion to a `FeatureVector`.
    pub fn embed_f32(&self, text: &str) -> Result<Vec<f32>> {
        ensure_text(text)?;
        let encoded = self.tokenizer.encode(text)?;
        self.model.embed(&encoded)
    }
}

impl FeatureExtractor for EmbeddingExtractor {
    fn dim(&self) -> usize {
        self.model.hidden_size()
    }

    fn extract(&self, text: &str) -> Result<FeatureVector> {
        FeatureVector::from_f32(&self.embed_f32(text)?)
    }
}
