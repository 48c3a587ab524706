/// The homomorphic capability interface the rest of the system is written
/// against.
///
/// The evaluator and decoder only ever see these operations, so the CKKS
/// backend in `crate::ckks` can be swapped for a binding to another library
/// without touching them. Contract for every implementation:
/// - operations never decrypt internally;
/// - `add` fails with `ScaleMismatch` when scales or levels differ and with
///   `ForeignCiphertext` when operands come from another context;
/// - `multiply_plain` and `dot` consume exactly one level each and fail with
///   `InsufficientDepth` when none is left;
/// - `dot` leaves Σ v_i·w_i in the first decrypted value;
/// - a result that would not decrypt correctly fails with `Overflow`
///   instead of returning a ciphertext.
use crate::error::Result;
use crate::features::FeatureVector;

pub trait HomomorphicScheme: Send + Sync {
    type Ciphertext: Send + Sync;

    fn encrypt(&self, features: &FeatureVector) -> Result<Self::Ciphertext>;

    fn decrypt(&self, ct: &Self::Ciphertext) -> Result<Vec<f64>>;

    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Add plaintext values position-wise, encoded at the ciphertext's scale.
    fn add_plain(&self, ct: &Self::Ciphertext, values: &[f64]) -> Result<Self::Ciphertext>;

    /// Multiply by a plaintext scalar.
    fn multiply_plain(&self, ct: &Self::Ciphertext, scalar: f64) -> Result<Self::Ciphertext>;

    /// Inner product with a plaintext vector.
    fn dot(&self, ct: &Self::Ciphertext, weights: &[f64]) -> Result<Self::Ciphertext>;

    /// Number of meaningful values the ciphertext carries.
    fn slot_count(&self, ct: &Self::Ciphertext) -> usize;

    /// Multiplicative levels still available on this ciphertext.
    fn remaining_depth(&self, ct: &Self::Ciphertext) -> usize;

    /// Wire size of a ciphertext, for observability.
    fn ciphertext_bytes(&self, ct: &Self::Ciphertext) -> usize;
}
