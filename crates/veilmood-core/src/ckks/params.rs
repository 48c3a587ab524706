//! Scheme parameters, their validation and the mapping onto OpenFHE's
//! CKKS-RNS parameter object.
//!
//! Chain layout for `coeff_modulus_bits = [60, 40, 40, 60]`:
//!
//! ```text
//!   q0 (60)   first modulus, decryption happens here      -> SetFirstModSize
//!   q1 (40)   rescaling prime                              \
//!   q2 (40)   rescaling prime                               -> SetScalingModSize,
//!   p  (60)   key-switching modulus, sized by the library     SetMultiplicativeDepth(2)
//! ```
//!
//! Every plaintext multiplication consumes one rescaling prime, so the usable
//! depth is `len - 2`. The last entry never carries data but still counts
//! toward the security budget.

use serde::{Deserialize, Serialize};

use openfhe::cxx::UniquePtr;
use openfhe::ffi;

use crate::error::{Error, Result};

pub const MIN_DEGREE: usize = 1024;
pub const MAX_DEGREE: usize = 65536;
pub const MIN_PRIME_BITS: u32 = 20;
pub const MAX_PRIME_BITS: u32 = 60;

/// Bits of integer headroom the first modulus must keep above the scale.
pub const MIN_INTEGER_BITS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// 128-bit classical security per the homomorphic encryption standard.
    Tc128,
    /// No budget check. Test and benchmark parameters only.
    None,
}

impl SecurityLevel {
    /// Largest total modulus size (bits) allowed for a ring degree.
    pub fn max_modulus_bits(self, degree: usize) -> Option<u32> {
        match self {
            SecurityLevel::None => None,
            SecurityLevel::Tc128 => match degree {
                1024 => Some(27),
                2048 => Some(54),
                4096 => Some(109),
                8192 => Some(218),
                16384 => Some(438),
                32768 => Some(881),
                65536 => Some(1772),
                _ => Some(0),
            },
        }
    }

    fn to_openfhe(self) -> ffi::SecurityLevel {
        match self {
            SecurityLevel::Tc128 => ffi::SecurityLevel::HEStd_128_classic,
            SecurityLevel::None => ffi::SecurityLevel::HEStd_NotSet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionParams {
    pub poly_modulus_degree: usize,
    pub coeff_modulus_bits: Vec<u32>,
    /// Global scale is 2^scale_bits.
    pub scale_bits: u32,
    pub security: SecurityLevel,
}

impl Default for EncryptionParams {
    fn default() -> Self {
        Self {
            poly_modulus_degree: 8192,
            coeff_modulus_bits: vec![60, 40, 40, 60],
            scale_bits: 40,
            security: SecurityLevel::Tc128,
        }
    }
}

impl EncryptionParams {
    pub fn scale(&self) -> f64 {
        (self.scale_bits as f64).exp2()
    }

    /// Levels a fresh ciphertext can descend: rescaling primes only.
    pub fn available_depth(&self) -> usize {
        self.coeff_modulus_bits.len().saturating_sub(2)
    }

    pub fn total_modulus_bits(&self) -> u32 {
        self.coeff_modulus_bits.iter().sum()
    }

    /// Packed slots per ciphertext.
    pub fn slots(&self) -> usize {
        self.poly_modulus_degree / 2
    }

    /// Largest magnitude a value may reach anywhere in a computation.
    ///
    /// Decryption happens modulo the first prime, which holds
    /// `first_bits - scale_bits` bits of integer part. One bit goes to the
    /// sign and one is kept as noise headroom.
    pub fn value_bound(&self) -> f64 {
        let first = self.coeff_modulus_bits.first().copied().unwrap_or(0);
        (first.saturating_sub(self.scale_bits).saturating_sub(2) as f64).exp2()
    }

    /// Check everything that can be checked before key generation.
    ///
    /// `required_depth` is the multiplicative depth the caller's circuit
    /// needs; a chain that cannot hold it fails here instead of producing
    /// garbage at decrypt time.
    pub fn validate(&self, required_depth: usize) -> Result<()> {
        let n = self.poly_modulus_degree;
        if !n.is_power_of_two() || !(MIN_DEGREE..=MAX_DEGREE).contains(&n) {
            return Err(Error::InvalidParameters(format!(
                "poly_modulus_degree must be a power of two in [{}, {}], got {}",
                MIN_DEGREE, MAX_DEGREE, n
            )));
        }
        if self.coeff_modulus_bits.len() < 2 {
            return Err(Error::InvalidParameters(
                "coeff_modulus_bits needs at least a first modulus and a key-switching modulus".into(),
            ));
        }
        for &bits in &self.coeff_modulus_bits {
            if !(MIN_PRIME_BITS..=MAX_PRIME_BITS).contains(&bits) {
                return Err(Error::InvalidParameters(format!(
                    "prime sizes must lie in [{}, {}] bits, got {}",
                    MIN_PRIME_BITS, MAX_PRIME_BITS, bits
                )));
            }
        }
        if self.scale_bits == 0 || self.scale_bits + MIN_INTEGER_BITS > self.coeff_modulus_bits[0] {
            return Err(Error::InvalidParameters(format!(
                "scale_bits {} leaves fewer than {} integer bits in the {}-bit first modulus",
                self.scale_bits, MIN_INTEGER_BITS, self.coeff_modulus_bits[0]
            )));
        }
        let rescaling = &self.coeff_modulus_bits[1..self.coeff_modulus_bits.len() - 1];
        if let Some(&bits) = rescaling.iter().find(|&&b| b != self.scale_bits) {
            return Err(Error::InvalidParameters(format!(
                "rescaling primes must all be scale_bits ({}) wide, got {}",
                self.scale_bits, bits
            )));
        }
        if let Some(max) = self.security.max_modulus_bits(n) {
            let total = self.total_modulus_bits();
            if total > max {
                return Err(Error::InvalidParameters(format!(
                    "total modulus {} bits exceeds the 128-bit security bound of {} bits for degree {}",
                    total, max, n
                )));
            }
        }
        let available = self.available_depth();
        if available < required_depth {
            return Err(Error::InsufficientDepth { required: required_depth, available });
        }
        Ok(())
    }

    /// Build the library parameter object. Call `validate` first.
    pub(crate) fn to_openfhe(&self) -> UniquePtr<ffi::ParamsCKKSRNS> {
        let mut params = ffi::GenParamsCKKSRNS();
        params.pin_mut().SetMultiplicativeDepth(self.available_depth() as u32);
        params.pin_mut().SetScalingModSize(self.scale_bits);
        params.pin_mut().SetFirstModSize(self.coeff_modulus_bits[0]);
        params.pin_mut().SetRingDim(self.poly_modulus_degree as u32);
        params.pin_mut().SetBatchSize(self.slots() as u32);
        params.pin_mut().SetSecurityLevel(self.security.to_openfhe());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_for_depth_one() {
        let params = EncryptionParams::default();
        assert_eq!(params.available_depth(), 2);
        assert_eq!(params.total_modulus_bits(), 200);
        assert_eq!(params.slots(), 4096);
        params.validate(1).unwrap();
    }

    #[test]
    fn test_value_bound_follows_first_modulus() {
        // 60-bit first modulus, 40-bit scale: 20 integer bits, 18 usable.
        assert_eq!(EncryptionParams::default().value_bound(), 262144.0);
        let wider = EncryptionParams { scale_bits: 30, coeff_modulus_bits: vec![60, 30, 60], ..Default::default() };
        assert_eq!(wider.value_bound(), (28f64).exp2());
    }

    #[test]
    fn test_depth_exceeded() {
        let params = EncryptionParams::default();
        let err = params.validate(3).unwrap_err();
        assert!(matches!(err, Error::InsufficientDepth { required: 3, available: 2 }));
    }

    #[test]
    fn test_chain_without_rescaling_primes() {
        let params = EncryptionParams {
            coeff_modulus_bits: vec![60, 60],
            ..EncryptionParams::default()
        };
        assert!(matches!(
            params.validate(1),
            Err(Error::InsufficientDepth { required: 1, available: 0 })
        ));
    }

    #[test]
    fn test_degree_not_power_of_two() {
        let params = EncryptionParams { poly_modulus_degree: 3000, ..EncryptionParams::default() };
        assert!(matches!(params.validate(1), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_security_budget() {
        let params = EncryptionParams {
            poly_modulus_degree: 4096,
            ..EncryptionParams::default()
        };
        let err = params.validate(1).unwrap_err().to_string();
        assert!(err.contains("security bound"), "{}", err);

        let relaxed = EncryptionParams { security: SecurityLevel::None, ..params };
        relaxed.validate(1).unwrap();
    }

    #[test]
    fn test_scale_too_close_to_first_modulus() {
        let params = EncryptionParams { scale_bits: 55, ..EncryptionParams::default() };
        assert!(matches!(params.validate(1), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_rescaling_primes_must_match_scale() {
        let params = EncryptionParams {
            coeff_modulus_bits: vec![60, 40, 30, 60],
            ..EncryptionParams::default()
        };
        let err = params.validate(1).unwrap_err().to_string();
        assert!(err.contains("rescaling primes"), "{}", err);
    }

    #[test]
    fn test_prime_size_bounds() {
        let params = EncryptionParams {
            coeff_modulus_bits: vec![60, 40, 61],
            ..EncryptionParams::default()
        };
        assert!(matches!(params.validate(1), Err(Error::InvalidParameters(_))));
    }
}
