/// Bridge to the external zero-knowledge verifier.
///
/// Proof generation and verification of the plaintext model live in a
/// separate tool. This side only hands it the model artifact path and reads
/// back a verdict, so the whole interface is one trait method.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use veilmood_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Verdict {
    Verified,
    Rejected { detail: String },
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified)
    }
}

pub trait ProofVerifier: Send + Sync {
    fn verify(&self, model_artifact: &Path) -> Result<Verdict>;
}

/// Runs `program args... <artifact>`; exit status 0 means verified.
///
/// A verifier that cannot be started is an error, not a rejection.
pub struct CommandProofVerifier {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandProofVerifier {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

impl ProofVerifier for CommandProofVerifier {
    fn verify(&self, model_artifact: &Path) -> Result<Verdict> {
        if !model_artifact.exists() {
            return Err(Error::Artifact(format!(
                "Failed to read model artifact {}: file not found",
                model_artifact.display()
            )));
        }
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(model_artifact)
            .output()
            .map_err(|e| {
                Error::Artifact(format!("Failed to run verifier {}: {}", self.program.display(), e))
            })?;

        if output.status.success() {
            tracing::info!(artifact = %model_artifact.display(), "proof verified");
            return Ok(Verdict::Verified);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = match stderr.trim() {
            "" => format!("verifier exited with {}", output.status),
            msg => msg.lines().last().unwrap_or(msg).to_string(),
        };
        tracing::warn!(artifact = %model_artifact.display(), %detail, "proof rejected");
        Ok(Verdict::Rejected { detail })
    }
}
