/// The linear emotion head: logits = W · x + b
///
/// W is 7×N (one row per emotion, rows in `Emotion::index` order) and b has
/// one entry per emotion. Both are extracted once from the trained model and
/// shared read-only by every evaluation, encrypted or not.
///
/// The plaintext `forward` here is the reference the encrypted evaluator is
/// checked against: same rows, same bias, same order, no ciphertext.

use crate::emotion::{Emotion, EMOTION_COUNT};
use crate::error::{Error, Result};
use crate::features::FeatureVector;

#[derive(Debug, Clone)]
pub struct ClassifierWeights {
    rows: Vec<Vec<f64>>,
    bias: [f64; EMOTION_COUNT],
}

impl ClassifierWeights {
    /// Validate shapes and values. Rows must already be in taxonomy order.
    pub fn new(rows: Vec<Vec<f64>>, bias: Vec<f64>) -> Result<Self> {
        if rows.len() != EMOTION_COUNT {
            return Err(Error::Dimension { expected: EMOTION_COUNT, actual: rows.len() });
        }
        if bias.len() != EMOTION_COUNT {
            return Err(Error::Dimension { expected: EMOTION_COUNT, actual: bias.len() });
        }
        let dim = rows[0].len();
        if dim == 0 {
            return Err(Error::Dimension { expected: 1, actual: 0 });
        }
        for row in &rows {
            if row.len() != dim {
                return Err(Error::Dimension { expected: dim, actual: row.len() });
            }
        }
        let finite = rows.iter().flatten().chain(bias.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(Error::Artifact("Classifier weights contain non-finite values".into()));
        }

        let mut b = [0.0; EMOTION_COUNT];
        b.copy_from_slice(&bias);
        Ok(Self { rows, bias: b })
    }

    /// Feature length N every input must match.
    pub fn feature_dim(&self) -> usize {
        self.rows[0].len()
    }

    pub fn row(&self, emotion: Emotion) -> &[f64] {
        &self.rows[emotion.index()]
    }

    pub fn bias(&self, emotion: Emotion) -> f64 {
        self.bias[emotion.index()]
    }

    /// Plaintext forward pass. Returns raw logits.
    pub fn forward(&self, input: &FeatureVector) -> Result<[f64; EMOTION_COUNT]> {
        if input.len() != self.feature_dim() {
            return Err(Error::Dimension { expected: self.feature_dim(), actual: input.len() });
        }
        let x = input.as_slice();
        let mut logits = [0.0; EMOTION_COUNT];
        for (j, row) in self.rows.iter().enumerate() {
            let dot: f64 = row.iter().zip(x).map(|(w, v)| w * v).sum();
            logits[j] = dot + self.bias[j];
        }
        Ok(logits)
    }

    /// Plaintext classification: arg-max of the logits.
    pub fn classify(&self, input: &FeatureVector) -> Result<Emotion> {
        let logits = self.forward(input)?;
        Ok(Emotion::ALL[argmax(&logits)])
    }
}

/// Index of the largest value. Ties resolve to the lowest index.
///
/// argmax(softmax(x)) == argmax(x), so callers that only need the label can
/// skip normalization entirely.
pub fn argmax<const N: usize>(logits: &[f64; N]) -> usize {
    let mut best = 0;
    for i in 1..N {
        if logits[i] > logits[best] {
            best = i;
        }
    }
    best
}
