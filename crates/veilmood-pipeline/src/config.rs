/// Pipeline configuration, read from a JSON file.
///
/// Every field has a default, so an empty object `{}` is a valid config and
/// a file only needs to name what it changes:
///
/// ```json
/// {
///   "encoder": { "encoder_path": "models/emotion-encoder.onnx", "max_length": 128 },
///   "classifier_path": "models/classifier_weights.json",
///   "encryption": { "poly_modulus_degree": 8192, "coeff_modulus_bits": [60, 40, 40, 60] },
///   "keys_path": "state/keys",
///   "workers": 4
/// }
/// ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use veilmood_core::{EncryptionParams, Error, Result};
use veilmood_inference::EncoderConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub encoder: EncoderConfig,
    pub classifier_path: PathBuf,
    pub encryption: EncryptionParams,
    /// Persist keys here and reuse them across restarts.
    pub keys_path: Option<PathBuf>,
    /// Worker threads; defaults to the number of CPUs.
    pub workers: Option<usize>,
    /// Characters of post text kept in each result for display.
    pub snippet_chars: usize,
    /// External zero-knowledge verifier, run as `program args... <artifact>`.
    pub proof: Option<ProofCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            classifier_path: PathBuf::from("models/classifier_weights.json"),
            encryption: EncryptionParams::default(),
            keys_path: None,
            workers: None,
            snippet_chars: 100,
            proof: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::Artifact(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data)
            .map_err(|e| Error::Artifact(format!("Failed to parse config JSON: {}", e)))?;
        if config.workers == Some(0) {
            return Err(Error::InvalidParameters("workers must be at least 1".into()));
        }
        Ok(config)
    }
}
