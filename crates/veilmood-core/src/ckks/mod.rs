//! CKKS over OpenFHE's RNS implementation.
//!
//! `params` maps our configuration onto the library's parameter object,
//! `keys` is the on-disk key store, `ciphertext` the checked handle and
//! `context` ties them together and implements `HomomorphicScheme`.

pub mod ciphertext;
pub mod context;
pub(crate) mod keys;
pub mod params;

pub use ciphertext::Ciphertext;
pub use context::CkksContext;
pub use params::{EncryptionParams, SecurityLevel};
