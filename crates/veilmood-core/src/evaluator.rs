/// Classifier evaluation on ciphertext.
///
/// For each emotion row W[i]:
///
/// ```text
///   logit_i = dot(ct, W[i]) + b[i]
/// ```
///
/// Seven independent dot products over the same input ciphertext, each
/// followed by a plaintext bias addition. Nothing here decrypts: inputs and
/// outputs are ciphertexts, and the weights only ever meet the features
/// inside the scheme.
///
/// DEPTH BUDGET:
/// A dot product consumes exactly one level, the bias addition none, so the
/// whole head needs depth 1 regardless of feature length. Contexts are
/// created against `REQUIRED_DEPTH` and the evaluator re-checks the incoming
/// ciphertext before doing any work.

use crate::classifier::ClassifierWeights;
use crate::emotion::{Emotion, EMOTION_COUNT};
use crate::error::{Error, Result};
use crate::scheme::HomomorphicScheme;

/// Multiplicative depth one evaluation consumes.
pub const REQUIRED_DEPTH: usize = 1;

pub struct EncryptedEvaluator<'a, S: HomomorphicScheme> {
    scheme: &'a S,
}

impl<'a, S: HomomorphicScheme> EncryptedEvaluator<'a, S> {
    pub fn new(scheme: &'a S) -> Self {
        Self { scheme }
    }

    /// Encrypted logits, one ciphertext per emotion in `Emotion::index` order.
    pub fn evaluate(
        &self,
        ct: &S::Ciphertext,
        weights: &ClassifierWeights,
    ) -> Result<[S::Ciphertext; EMOTION_COUNT]> {
        let slots = self.scheme.slot_count(ct);
        if slots != weights.feature_dim() {
            return Err(Error::Dimension { expected: weights.feature_dim(), actual: slots });
        }
        let available = self.scheme.remaining_depth(ct);
        if available < REQUIRED_DEPTH {
            return Err(Error::InsufficientDepth { required: REQUIRED_DEPTH, available });
        }

        let mut logits = Vec::with_capacity(EMOTION_COUNT);
        for emotion in Emotion::ALL {
            let dot = self.scheme.dot(ct, weights.row(emotion))?;
            logits.push(self.scheme.add_plain(&dot, &[weights.bias(emotion)])?);
        }
        logits
            .try_into()
            .map_err(|v: Vec<S::Ciphertext>| Error::Dimension { expected: EMOTION_COUNT, actual: v.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ckks::{CkksContext, EncryptionParams, SecurityLevel};
    use crate::classifier::argmax;
    use crate::features::FeatureVector;
    use crate::testing::PlainScheme;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn random_weights(rng: &mut ChaCha20Rng, dim: usize) -> ClassifierWeights {
        let rows = (0..EMOTION_COUNT)
            .map(|_| (0..dim).map(|_| rng.gen_range(-0.5..0.5)).collect())
            .collect();
        let bias = (0..EMOTION_COUNT).map(|_| rng.gen_range(-0.1..0.1)).collect();
        ClassifierWeights::new(rows, bias).unwrap()
    }

    fn random_features(rng: &mut ChaCha20Rng, dim: usize) -> FeatureVector {
        FeatureVector::new((0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()).unwrap()
    }

    fn toy_context() -> CkksContext {
        let params = EncryptionParams {
            poly_modulus_degree: 2048,
            coeff_modulus_bits: vec![60, 40, 60],
            scale_bits: 40,
            security: SecurityLevel::None,
        };
        CkksContext::new(params, REQUIRED_DEPTH).unwrap()
    }

    // =========================================================================
    // TEST GROUP 1: Evaluation logic (transparent scheme)
    // =========================================================================

    #[test]
    fn test_logits_match_plaintext_forward() {
        let scheme = PlainScheme::new(1);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let weights = random_weights(&mut rng, 32);
        let x = random_features(&mut rng, 32);

        let ct = scheme.encrypt(&x).unwrap();
        let logits = EncryptedEvaluator::new(&scheme).evaluate(&ct, &weights).unwrap();
        let expected = weights.forward(&x).unwrap();
        for (ct, e) in logits.iter().zip(expected) {
            assert_eq!(ct.values.len(), 1);
            assert!((ct.values[0] - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_never_decrypts() {
        let scheme = PlainScheme::new(1);
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let weights = random_weights(&mut rng, 8);
        let ct = scheme.encrypt(&random_features(&mut rng, 8)).unwrap();
        EncryptedEvaluator::new(&scheme).evaluate(&ct, &weights).unwrap();
        assert_eq!(scheme.decrypt_count(), 0);
    }

    #[test]
    fn test_consumes_exactly_one_level() {
        let scheme = PlainScheme::new(3);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let weights = random_weights(&mut rng, 4);
        let ct = scheme.encrypt(&random_features(&mut rng, 4)).unwrap();
        let logits = EncryptedEvaluator::new(&scheme).evaluate(&ct, &weights).unwrap();
        assert!(logits.iter().all(|l| l.level == 2));
    }

    #[test]
    fn test_dimension_mismatch() {
        let scheme = PlainScheme::new(1);
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let weights = random_weights(&mut rng, 16);
        let ct = scheme.encrypt(&random_features(&mut rng, 12)).unwrap();
        let err = EncryptedEvaluator::new(&scheme).evaluate(&ct, &weights).unwrap_err();
        assert!(matches!(err, Error::Dimension { expected: 16, actual: 12 }));
    }

    #[test]
    fn test_no_depth_left() {
        let scheme = PlainScheme::new(0);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let weights = random_weights(&mut rng, 4);
        let ct = scheme.encrypt(&random_features(&mut rng, 4)).unwrap();
        let err = EncryptedEvaluator::new(&scheme).evaluate(&ct, &weights).unwrap_err();
        assert!(matches!(err, Error::InsufficientDepth { required: 1, available: 0 }));
    }

    // =========================================================================
    // TEST GROUP 2: Real ciphertexts
    // =========================================================================

    #[test]
    fn test_encrypted_logits_within_tolerance() {
        let ctx = toy_context();
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let weights = random_weights(&mut rng, 384);
        let x = random_features(&mut rng, 384);

        let ct = ctx.encrypt(&x).unwrap();
        let logits = EncryptedEvaluator::new(&ctx).evaluate(&ct, &weights).unwrap();
        let expected = weights.forward(&x).unwrap();
        for (ct, e) in logits.iter().zip(expected) {
            let got = ctx.decrypt(ct).unwrap()[0];
            assert!((got - e).abs() < 1e-4, "{} vs {}", got, e);
        }
    }

    #[test]
    fn test_default_params_full_width() {
        // Shipping parameters: N = 8192, [60, 40, 40, 60], scale 2^40. The
        // dot drops the ciphertext from level 2 to level 1.
        let ctx = CkksContext::new(EncryptionParams::default(), REQUIRED_DEPTH).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(8192);
        let weights = random_weights(&mut rng, 768);
        let x = random_features(&mut rng, 768);

        let ct = ctx.encrypt(&x).unwrap();
        assert_eq!(ctx.remaining_depth(&ct), 2);
        let logits = EncryptedEvaluator::new(&ctx).evaluate(&ct, &weights).unwrap();
        let expected = weights.forward(&x).unwrap();
        for (l, e) in logits.iter().zip(expected) {
            assert_eq!(ctx.remaining_depth(l), 1);
            let got = ctx.decrypt(l).unwrap()[0];
            assert!((got - e).abs() < 1e-4, "{} vs {}", got, e);
        }

        let scores = crate::decoder::ResultDecoder::new(&ctx).decode(&logits).unwrap();
        assert_eq!(scores.dominant(), weights.classify(&x).unwrap());
    }

    #[test]
    fn test_argmax_agreement_on_corpus() {
        // Fixed corpus of 100 seeded inputs through one context: the encrypted
        // label must match the plaintext label at least 99% of the time.
        let ctx = toy_context();
        let evaluator = EncryptedEvaluator::new(&ctx);
        let mut rng = ChaCha20Rng::seed_from_u64(2024);
        let weights = random_weights(&mut rng, 64);

        let total = 100;
        let mut agree = 0;
        for _ in 0..total {
            let x = random_features(&mut rng, 64);
            let plain = weights.classify(&x).unwrap();

            let ct = ctx.encrypt(&x).unwrap();
            let logits = evaluator.evaluate(&ct, &weights).unwrap();
            let mut decrypted = [0.0; EMOTION_COUNT];
            for (d, l) in decrypted.iter_mut().zip(&logits) {
                *d = ctx.decrypt(l).unwrap()[0];
            }
            if Emotion::ALL[argmax(&decrypted)] == plain {
                agree += 1;
            }
        }
        assert!(agree * 100 >= total * 99, "agreement {}/{}", agree, total);
    }
}
