/// Feature vectors and the extractor seam.
///
/// A `FeatureVector` is the pooled encoder output for one post. It is built
/// once by an extractor and handed to the encryption context; nothing mutates
/// it afterwards, so the only accessors are read-only views.

use crate::error::{Error, Result};

#[derive(Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap extracted values. Rejects empty and non-finite vectors.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidInput("feature vector is empty".into()));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "feature {} is not finite: {}",
                i, values[i]
            )));
        }
        Ok(Self { values })
    }

    pub fn from_f32(values: &[f32]) -> Result<Self> {
        Self::new(values.iter().map(|&v| v as f64).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

// Plaintext features never show up in logs.
impl std::fmt::Debug for FeatureVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureVector").field("len", &self.values.len()).finish()
    }
}

/// Turns raw post text into a fixed-length feature vector.
///
/// Implementations must be deterministic for identical input and do no
/// network or disk I/O per call. Empty or whitespace-only text fails with
/// `Error::InvalidInput`.
pub trait FeatureExtractor: Send + Sync {
    /// Length of every vector this extractor produces.
    fn dim(&self) -> usize;

    fn extract(&self, text: &str) -> Result<FeatureVector>;
}

/// Shared precondition for extractors: non-blank UTF-8 text.
pub fn ensure_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("post text is empty or whitespace".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(FeatureVector::new(vec![]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_nan() {
        let err = FeatureVector::new(vec![1.0, f64::NAN]).unwrap_err();
        assert!(err.to_string().contains("feature 1"));
    }

    #[test]
    fn test_from_f32() {
        let v = FeatureVector::from_f32(&[0.5, -1.25]).unwrap();
        assert_eq!(v.as_slice(), &[0.5, -1.25]);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn test_debug_hides_values() {
        let v = FeatureVector::new(vec![42.4242]).unwrap();
        let dbg = format!("{:?}", v);
        assert!(!dbg.contains("42.42"));
    }

    #[test]
    fn test_ensure_text() {
        assert!(ensure_text("hello").is_ok());
        assert!(ensure_text("   \n\t").is_err());
        assert!(ensure_text("").is_err());
    }
}
