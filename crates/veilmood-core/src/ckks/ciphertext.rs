//! The ciphertext handle.
//!
//! Wraps the library ciphertext together with what the context checks before
//! combining two of them: the owning context id, the level (rescaling primes
//! left), the scale, the number of meaningful slots and a bound on the
//! magnitude of every slot.

use openfhe::cxx::UniquePtr;
use openfhe::ffi;

pub struct Ciphertext {
    pub(crate) ct: UniquePtr<ffi::CiphertextDCRTPoly>,
    pub(crate) level: usize,
    pub(crate) scale: f64,
    pub(crate) len: usize,
    /// Upper bound on |value| over every meaningful slot.
    pub(crate) max_abs: f64,
    pub(crate) degree: usize,
    pub(crate) context_id: u64,
}

// SAFETY: the handle is only dereferenced by the owning `CkksContext` while
// it holds its evaluation lock. Dropping it just releases a shared_ptr, whose
// reference count is atomic.
unsafe impl Send for Ciphertext {}
unsafe impl Sync for Ciphertext {}

impl Ciphertext {
    /// Remaining rescales before only the first modulus is left.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Number of meaningful leading slots (1 after a dot product).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn max_abs(&self) -> f64 {
        self.max_abs
    }

    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    /// Payload size: two polynomials, one 8-byte residue per coefficient
    /// per remaining modulus.
    pub fn size_bytes(&self) -> usize {
        2 * (self.level + 1) * self.degree * 8
    }
}

impl std::fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ciphertext")
            .field("level", &self.level)
            .field("scale", &self.scale)
            .field("len", &self.len)
            .field("max_abs", &self.max_abs)
            .field("context_id", &self.context_id)
            .finish()
    }
}
