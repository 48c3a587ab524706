//! A transparent `HomomorphicScheme` for unit tests.
//!
//! "Ciphertexts" are the plain values plus a level counter, so tests can
//! check evaluator and decoder logic without key generation, and can count
//! how often something decrypts.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::features::FeatureVector;
use crate::scheme::HomomorphicScheme;

#[derive(Debug, Clone, PartialEq)]
pub struct PlainCt {
    pub values: Vec<f64>,
    pub level: usize,
}

pub struct PlainScheme {
    pub depth: usize,
    pub decrypts: AtomicUsize,
}

impl PlainScheme {
    pub fn new(depth: usize) -> Self {
        Self { depth, decrypts: AtomicUsize::new(0) }
    }

    pub fn decrypt_count(&self) -> usize {
        self.decrypts.load(Ordering::SeqCst)
    }
}

impl HomomorphicScheme for PlainScheme {
    type Ciphertext = PlainCt;

    fn encrypt(&self, features: &FeatureVector) -> Result<PlainCt> {
        Ok(PlainCt { values: features.as_slice().to_vec(), level: self.depth })
    }

    fn decrypt(&self, ct: &PlainCt) -> Result<Vec<f64>> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        Ok(ct.values.clone())
    }

    fn add(&self, a: &PlainCt, b: &PlainCt) -> Result<PlainCt> {
        if a.level != b.level {
            return Err(Error::ScaleMismatch {
                left_scale: 1.0,
                right_scale: 1.0,
                left_level: a.level,
                right_level: b.level,
            });
        }
        let n = a.values.len().max(b.values.len());
        let values = (0..n)
            .map(|i| a.values.get(i).unwrap_or(&0.0) + b.values.get(i).unwrap_or(&0.0))
            .collect();
        Ok(PlainCt { values, level: a.level })
    }

    fn add_plain(&self, ct: &PlainCt, values: &[f64]) -> Result<PlainCt> {
        let n = ct.values.len().max(values.len());
        let values = (0..n)
            .map(|i| ct.values.get(i).unwrap_or(&0.0) + values.get(i).unwrap_or(&0.0))
            .collect();
        Ok(PlainCt { values, level: ct.level })
    }

    fn multiply_plain(&self, ct: &PlainCt, scalar: f64) -> Result<PlainCt> {
        if ct.level == 0 {
            return Err(Error::InsufficientDepth { required: 1, available: 0 });
        }
        Ok(PlainCt { values: ct.values.iter().map(|v| v * scalar).collect(), level: ct.level - 1 })
    }

    fn dot(&self, ct: &PlainCt, weights: &[f64]) -> Result<PlainCt> {
        if weights.len() != ct.values.len() {
            return Err(Error::Dimension { expected: ct.values.len(), actual: weights.len() });
        }
        if ct.level == 0 {
            return Err(Error::InsufficientDepth { required: 1, available: 0 });
        }
        let sum = ct.values.iter().zip(weights).map(|(v, w)| v * w).sum();
        Ok(PlainCt { values: vec![sum], level: ct.level - 1 })
    }

    fn slot_count(&self, ct: &PlainCt) -> usize {
        ct.values.len()
    }

    fn remaining_depth(&self, ct: &PlainCt) -> usize {
        ct.level
    }

    fn ciphertext_bytes(&self, ct: &PlainCt) -> usize {
        ct.values.len() * 8
    }
}
