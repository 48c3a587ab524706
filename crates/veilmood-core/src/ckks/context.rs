//! The encryption context: parameters, the library crypto context and the
//! key pair.
//!
//! Built once per process (key generation is the expensive part) and then
//! shared read-only, typically behind an `Arc`. Every method takes `&self`.
//! Library calls go through one lock; the library parallelizes each
//! operation internally, so workers only contend on the homomorphic stage.
//!
//! The library itself does not know a ciphertext's owner, its plaintext
//! magnitude or how many levels our circuit has spent. `Ciphertext` carries
//! those, and every operation checks them before touching the library, so a
//! misuse fails here instead of decrypting to noise.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use openfhe::cxx::{CxxVector, UniquePtr};
use openfhe::ffi;

use super::ciphertext::Ciphertext;
use super::keys::KeyStore;
use super::params::EncryptionParams;
use crate::error::{Error, Result};
use crate::features::FeatureVector;
use crate::scheme::HomomorphicScheme;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Relative tolerance when comparing two scales.
const SCALE_TOLERANCE: f64 = 1e-9;

struct Engine {
    cc: UniquePtr<ffi::CryptoContextDCRTPoly>,
    public: UniquePtr<ffi::PublicKeyDCRTPoly>,
    secret: UniquePtr<ffi::PrivateKeyDCRTPoly>,
}

// SAFETY: the handles are only used through `CkksContext::engine`, which
// serializes access with a mutex.
unsafe impl Send for Engine {}

impl Engine {
    fn pack(&self, values: &[f64]) -> UniquePtr<ffi::Plaintext> {
        let mut v = CxxVector::<f64>::new();
        for &x in values {
            v.pin_mut().push(x);
        }
        self.cc.MakeCKKSPackedPlaintext(&v, 1, 0, &ffi::DCRTPolyGenNullParams(), 0)
    }
}

/// Left rotations that let the inner product fold any length up to `slots`
/// into slot 0.
fn rotation_steps(slots: usize) -> Vec<i32> {
    (0..)
        .map(|k| 1usize << k)
        .take_while(|&step| step < slots)
        .map(|step| step as i32)
        .collect()
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |m, v| m.max(v.abs()))
}

pub struct CkksContext {
    id: u64,
    params: EncryptionParams,
    engine: Mutex<Engine>,
}

impl CkksContext {
    /// Validate parameters and generate fresh keys.
    pub fn new(params: EncryptionParams, required_depth: usize) -> Result<Self> {
        params.validate(required_depth)?;
        tracing::debug!(
            required_depth,
            available_depth = params.available_depth(),
            "modulus chain depth verified"
        );

        let cc = ffi::DCRTPolyGenCryptoContextByParamsCKKSRNS(&params.to_openfhe());
        if cc.is_null() {
            return Err(Error::InvalidParameters("crypto context generation failed".into()));
        }
        cc.EnableByFeature(ffi::PKESchemeFeature::PKE);
        cc.EnableByFeature(ffi::PKESchemeFeature::KEYSWITCH);
        cc.EnableByFeature(ffi::PKESchemeFeature::LEVELEDSHE);
        Self::check_ring(&cc, &params)?;

        let kp = cc.KeyGen();
        let secret = kp.GetPrivateKey();
        let public = kp.GetPublicKey();

        let mut index_list = CxxVector::<i32>::new();
        for step in rotation_steps(params.slots()) {
            index_list.pin_mut().push(step);
        }
        cc.EvalRotateKeyGen(&secret, &index_list, &ffi::DCRTPolyGenNullPublicKey());

        tracing::info!(
            degree = params.poly_modulus_degree,
            levels = params.available_depth(),
            modulus_bits = params.total_modulus_bits(),
            scale_bits = params.scale_bits,
            "generated encryption keys"
        );
        Ok(Self::assemble(params, Engine { cc, public, secret }))
    }

    fn check_ring(cc: &ffi::CryptoContextDCRTPoly, params: &EncryptionParams) -> Result<()> {
        let ring = cc.GetRingDimension() as usize;
        if ring != params.poly_modulus_degree {
            return Err(Error::InvalidParameters(format!(
                "crypto context has ring dimension {}, parameters say {}",
                ring, params.poly_modulus_degree
            )));
        }
        Ok(())
    }

    fn assemble(params: EncryptionParams, engine: Engine) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            params,
            engine: Mutex::new(engine),
        }
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write the key material into directory `path` so a restart can skip
    /// key generation. On unix the directory is 0700 and the secret key 0600.
    pub fn save_keys(&self, path: &Path) -> Result<()> {
        let store = KeyStore::new(path);
        store.prepare()?;
        let engine = self.engine();
        store.write_context(&engine.cc)?;
        store.write_public(&engine.public)?;
        store.write_private(&engine.secret)?;
        store.write_rotation_keys(&engine.cc)?;
        store.write_params(&self.params)?;
        tracing::info!(path = %path.display(), "saved encryption keys");
        Ok(())
    }

    /// Rebuild a context from a key directory, re-validating the parameters.
    pub fn load_keys(path: &Path, required_depth: usize) -> Result<Self> {
        let store = KeyStore::new(path);
        let params = store.read_params()?;
        params.validate(required_depth)?;

        let cc = store.read_context()?;
        Self::check_ring(&cc, &params)?;
        let public = store.read_public()?;
        let secret = store.read_private()?;
        store.read_rotation_keys()?;

        tracing::info!(path = %path.display(), "loaded encryption keys");
        Ok(Self::assemble(params, Engine { cc, public, secret }))
    }

    /// Load keys from `path` if present, otherwise generate and save them.
    ///
    /// A key store made for different parameters is an error, not a silent
    /// regeneration: anything encrypted under the old keys would be lost.
    pub fn load_or_generate(params: EncryptionParams, path: &Path, required_depth: usize) -> Result<Self> {
        if KeyStore::new(path).exists() {
            let ctx = Self::load_keys(path, required_depth)?;
            if ctx.params != params {
                return Err(Error::InvalidParameters(format!(
                    "key store {} was generated for different encryption parameters",
                    path.display()
                )));
            }
            return Ok(ctx);
        }
        let ctx = Self::new(params, required_depth)?;
        ctx.save_keys(path)?;
        Ok(ctx)
    }

    // =========================================================================
    // Accessors and checks
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn params(&self) -> &EncryptionParams {
        &self.params
    }

    pub fn degree(&self) -> usize {
        self.params.poly_modulus_degree
    }

    pub fn slots(&self) -> usize {
        self.params.slots()
    }

    fn check_owner(&self, ct: &Ciphertext) -> Result<()> {
        if ct.context_id != self.id {
            return Err(Error::ForeignCiphertext { expected: self.id, found: ct.context_id });
        }
        Ok(())
    }

    fn check_compatible(a: &Ciphertext, b: &Ciphertext) -> Result<()> {
        let scale_gap = (a.scale - b.scale).abs() / a.scale.max(b.scale);
        if a.level != b.level || scale_gap > SCALE_TOLERANCE {
            return Err(Error::ScaleMismatch {
                left_scale: a.scale,
                right_scale: b.scale,
                left_level: a.level,
                right_level: b.level,
            });
        }
        Ok(())
    }

    fn check_depth(ct: &Ciphertext) -> Result<()> {
        if ct.level == 0 {
            return Err(Error::InsufficientDepth { required: 1, available: 0 });
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len == 0 || len > self.slots() {
            return Err(Error::Dimension { expected: self.slots(), actual: len });
        }
        Ok(())
    }

    /// Every plaintext value must be finite and inside the value bound.
    fn check_values(&self, values: &[f64]) -> Result<f64> {
        let bound = self.params.value_bound();
        if let Some(&bad) = values.iter().find(|v| !(v.abs() <= bound)) {
            return Err(Error::Overflow { value: bad, bound });
        }
        Ok(max_abs(values))
    }

    /// A result whose magnitude bound exceeds the value bound would wrap
    /// modulo the first prime and decrypt to garbage.
    fn check_result(&self, max_abs: f64) -> Result<f64> {
        let bound = self.params.value_bound();
        if !(max_abs <= bound) {
            return Err(Error::Overflow { value: max_abs, bound });
        }
        Ok(max_abs)
    }

    fn derive(&self, from: &Ciphertext, ct: UniquePtr<ffi::CiphertextDCRTPoly>) -> Ciphertext {
        Ciphertext {
            ct,
            level: from.level,
            scale: from.scale,
            len: from.len,
            max_abs: from.max_abs,
            degree: self.degree(),
            context_id: self.id,
        }
    }

    // =========================================================================
    // Encrypt / decrypt
    // =========================================================================

    /// Encrypt raw values at the global scale, at the top level.
    pub fn encrypt_values(&self, values: &[f64]) -> Result<Ciphertext> {
        self.check_len(values.len())?;
        let max_abs = self.check_values(values)?;

        let engine = self.engine();
        let pt = engine.pack(values);
        let ct = engine.cc.EncryptByPublicKey(&engine.public, &pt);

        Ok(Ciphertext {
            ct,
            level: self.params.available_depth(),
            scale: self.params.scale(),
            len: values.len(),
            max_abs,
            degree: self.degree(),
            context_id: self.id,
        })
    }

    /// Decrypt the meaningful slots.
    pub fn decrypt_values(&self, ct: &Ciphertext) -> Result<Vec<f64>> {
        self.check_owner(ct)?;
        let engine = self.engine();
        let mut pt = ffi::GenNullPlainText();
        engine
            .cc
            .DecryptByPrivateKeyAndCiphertext(&engine.secret, &ct.ct, pt.pin_mut());
        pt.SetLength(ct.len);
        let packed = pt.GetRealPackedValue();
        Ok((0..ct.len).map(|i| *packed.get(i).unwrap_or(&0.0)).collect())
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    pub fn add_ct(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.check_owner(a)?;
        self.check_owner(b)?;
        Self::check_compatible(a, b)?;
        let max_abs = self.check_result(a.max_abs + b.max_abs)?;

        let ct = self.engine().cc.EvalAddByCiphertexts(&a.ct, &b.ct);
        Ok(Ciphertext { len: a.len.max(b.len), max_abs, ..self.derive(a, ct) })
    }

    pub fn add_plain_values(&self, ct: &Ciphertext, values: &[f64]) -> Result<Ciphertext> {
        self.check_owner(ct)?;
        self.check_len(values.len())?;
        let max_abs = self.check_result(ct.max_abs + self.check_values(values)?)?;

        let engine = self.engine();
        let pt = engine.pack(values);
        let out = engine.cc.EvalAddByCiphertextAndPlaintext(&ct.ct, &pt);
        Ok(Ciphertext { len: ct.len.max(values.len()), max_abs, ..self.derive(ct, out) })
    }

    /// Multiply every meaningful slot by a scalar. Consumes one level.
    pub fn multiply_scalar(&self, ct: &Ciphertext, scalar: f64) -> Result<Ciphertext> {
        self.check_owner(ct)?;
        Self::check_depth(ct)?;
        self.check_values(&[scalar])?;
        let max_abs = self.check_result(ct.max_abs * scalar.abs())?;

        let engine = self.engine();
        let pt = engine.pack(&vec![scalar; ct.len]);
        let out = engine.cc.EvalMultByCiphertextAndPlaintext(&ct.ct, &pt);
        Ok(Ciphertext { level: ct.level - 1, max_abs, ..self.derive(ct, out) })
    }

    /// Encrypted inner product with a plaintext vector.
    ///
    /// One slot-wise plaintext product (one level), then log2(len) rotate
    /// and add steps that fold the products into slot 0. The result has
    /// length 1.
    pub fn dot_plain(&self, ct: &Ciphertext, weights: &[f64]) -> Result<Ciphertext> {
        self.check_owner(ct)?;
        if weights.len() != ct.len {
            return Err(Error::Dimension { expected: ct.len, actual: weights.len() });
        }
        Self::check_depth(ct)?;
        self.check_values(weights)?;
        let weight_mass: f64 = weights.iter().map(|w| w.abs()).sum();
        let max_abs = self.check_result(ct.max_abs * weight_mass)?;

        let engine = self.engine();
        let w = engine.pack(weights);
        let mut acc = engine.cc.EvalMultByCiphertextAndPlaintext(&ct.ct, &w);
        let mut step = 1;
        while step < ct.len {
            let rotated = engine.cc.EvalRotate(&acc, step as i32);
            acc = engine.cc.EvalAddByCiphertexts(&acc, &rotated);
            step <<= 1;
        }
        drop(engine);

        Ok(Ciphertext { level: ct.level - 1, len: 1, max_abs, ..self.derive(ct, acc) })
    }
}

impl HomomorphicScheme for CkksContext {
    type Ciphertext = Ciphertext;

    fn encrypt(&self, features: &FeatureVector) -> Result<Ciphertext> {
        self.encrypt_values(features.as_slice())
    }

    fn decrypt(&self, ct: &Ciphertext) -> Result<Vec<f64>> {
        self.decrypt_values(ct)
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.add_ct(a, b)
    }

    fn add_plain(&self, ct: &Ciphertext, values: &[f64]) -> Result<Ciphertext> {
        self.add_plain_values(ct, values)
    }

    fn multiply_plain(&self, ct: &Ciphertext, scalar: f64) -> Result<Ciphertext> {
        self.multiply_scalar(ct, scalar)
    }

    fn dot(&self, ct: &Ciphertext, weights: &[f64]) -> Result<Ciphertext> {
        self.dot_plain(ct, weights)
    }

    fn slot_count(&self, ct: &Ciphertext) -> usize {
        ct.len()
    }

    fn remaining_depth(&self, ct: &Ciphertext) -> usize {
        ct.level()
    }

    fn ciphertext_bytes(&self, ct: &Ciphertext) -> usize {
        ct.size_bytes()
    }
}
