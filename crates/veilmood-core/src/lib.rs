//! Core of the confidential emotion analysis pipeline.
//!
//! Everything between a feature vector and an emotion score lives here: the
//! taxonomy, the plaintext classifier head, the OpenFHE-backed CKKS context
//! behind the `HomomorphicScheme` seam, the encrypted evaluator and the
//! decoder. No model runtime or I/O beyond the key store.

pub mod ckks;
pub mod classifier;
pub mod decoder;
pub mod emotion;
pub mod error;
pub mod evaluator;
pub mod features;
pub mod scheme;

#[cfg(test)]
pub(crate) mod testing;

pub use ckks::{Ciphertext, CkksContext, EncryptionParams, SecurityLevel};
pub use classifier::ClassifierWeights;
pub use decoder::ResultDecoder;
pub use emotion::{Emotion, EmotionScores, EMOTION_COUNT};
pub use error::{Error, Result};
pub use evaluator::{EncryptedEvaluator, REQUIRED_DEPTH};
pub use features::{FeatureExtractor, FeatureVector};
pub use scheme::HomomorphicScheme;
