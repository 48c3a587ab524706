/// Decrypts logit ciphertexts and turns them into emotion scores.
///
/// This is the only place ciphertext crosses back into plaintext, and only
/// the seven final logits do. Softmax runs on the decrypted values with the
/// usual max-subtraction, so large logits cannot overflow `exp`.
///
/// No error correction is attempted: the scheme's approximation error (well
/// under 1e-4 per logit for the default parameters) passes straight through.

use crate::emotion::{EmotionScores, EMOTION_COUNT};
use crate::error::{Error, Result};
use crate::scheme::HomomorphicScheme;

pub struct ResultDecoder<'a, S: HomomorphicScheme> {
    scheme: &'a S,
}

impl<'a, S: HomomorphicScheme> ResultDecoder<'a, S> {
    pub fn new(scheme: &'a S) -> Self {
        Self { scheme }
    }

    /// Decrypt one logit per emotion, in `Emotion::index` order.
    pub fn decrypt_logits(&self, logits: &[S::Ciphertext]) -> Result<[f64; EMOTION_COUNT]> {
        if logits.len() != EMOTION_COUNT {
            return Err(Error::Dimension { expected: EMOTION_COUNT, actual: logits.len() });
        }
        let mut out = [0.0; EMOTION_COUNT];
        for (slot, ct) in out.iter_mut().zip(logits) {
            let values = self.scheme.decrypt(ct)?;
            *slot = *values.first().ok_or(Error::Dimension { expected: 1, actual: 0 })?;
        }
        Ok(out)
    }

    pub fn decode(&self, logits: &[S::Ciphertext]) -> Result<EmotionScores> {
        let raw = self.decrypt_logits(logits)?;
        Ok(EmotionScores::from_probabilities(softmax(&raw)))
    }
}

/// Numerically stable softmax.
pub fn softmax<const N: usize>(logits: &[f64; N]) -> [f64; N] {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut out = [0.0; N];
    let mut sum = 0.0;
    for (o, &l) in out.iter_mut().zip(logits) {
        *o = (l - max).exp();
        sum += *o;
    }
    for o in out.iter_mut() {
        *o /= sum;
    }
    out
}
