//! On-disk key material.
//!
//! A key store is a directory:
//!
//! ```text
//!   params.json           EncryptionParams the keys were generated for
//!   crypto_context.bin    library context (moduli, ring, encoding tables)
//!   public_key.bin
//!   private_key.bin       mode 0600 on unix
//!   rotation_keys.bin     slot rotations used by the inner product
//! ```
//!
//! The `.bin` files are the library's binary serialization and are opaque
//! to us. The directory itself is kept at mode 0700 on unix.

use std::fs;
use std::path::{Path, PathBuf};

use openfhe::cxx::{let_cxx_string, UniquePtr};
use openfhe::ffi;

use super::params::EncryptionParams;
use crate::error::{Error, Result};

const SERIAL_MODE: ffi::SerialMode = ffi::SerialMode::BINARY;

pub(crate) struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf() }
    }

    pub fn exists(&self) -> bool {
        self.params_path().exists()
    }

    fn params_path(&self) -> PathBuf {
        self.dir.join("params.json")
    }

    fn file(&self, name: &str) -> Result<String> {
        let path = self.dir.join(name);
        path.to_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::Artifact(format!("key path is not valid UTF-8: {}", path.display())))
    }

    /// Create the directory (or tighten an existing one) before anything
    /// secret is written into it.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Artifact(format!("Failed to create key directory {}: {}", self.dir.display(), e))
        })?;
        restrict(&self.dir, 0o700)
    }

    pub fn write_params(&self, params: &EncryptionParams) -> Result<()> {
        let json = serde_json::to_vec_pretty(params)
            .map_err(|e| Error::Artifact(format!("Failed to encode key parameters: {}", e)))?;
        fs::write(self.params_path(), json)?;
        Ok(())
    }

    pub fn read_params(&self) -> Result<EncryptionParams> {
        let path = self.params_path();
        let data = fs::read(&path)
            .map_err(|e| Error::Artifact(format!("Failed to read key file {}: {}", path.display(), e)))?;
        serde_json::from_slice(&data)
            .map_err(|e| Error::Artifact(format!("Failed to parse key file {}: {}", path.display(), e)))
    }

    pub fn write_context(&self, cc: &ffi::CryptoContextDCRTPoly) -> Result<()> {
        let path = self.file("crypto_context.bin")?;
        let_cxx_string!(p = path.as_str());
        ensure_io(ffi::DCRTPolySerializeCryptoContextToFile(&p, cc, SERIAL_MODE), "serialize", &path)
    }

    pub fn write_public(&self, pk: &ffi::PublicKeyDCRTPoly) -> Result<()> {
        let path = self.file("public_key.bin")?;
        let_cxx_string!(p = path.as_str());
        ensure_io(ffi::DCRTPolySerializePublicKeyToFile(&p, pk, SERIAL_MODE), "serialize", &path)
    }

    pub fn write_private(&self, sk: &ffi::PrivateKeyDCRTPoly) -> Result<()> {
        let path = self.file("private_key.bin")?;
        {
            let_cxx_string!(p = path.as_str());
            ensure_io(ffi::DCRTPolySerializePrivateKeyToFile(&p, sk, SERIAL_MODE), "serialize", &path)?;
        }
        // The library truncates an existing file in place, keeping its mode.
        restrict(Path::new(&path), 0o600)
    }

    pub fn write_rotation_keys(&self, cc: &ffi::CryptoContextDCRTPoly) -> Result<()> {
        let path = self.file("rotation_keys.bin")?;
        let_cxx_string!(p = path.as_str());
        ensure_io(
            ffi::DCRTPolySerializeEvalAutomorphismKeyToFile(&p, cc, SERIAL_MODE),
            "serialize",
            &path,
        )
    }

    pub fn read_context(&self) -> Result<UniquePtr<ffi::CryptoContextDCRTPoly>> {
        let path = self.file("crypto_context.bin")?;
        let mut cc = ffi::DCRTPolyGenNullCryptoContext();
        let_cxx_string!(p = path.as_str());
        ensure_io(
            ffi::DCRTPolyDeserializeCryptoContextFromFile(&p, cc.pin_mut(), SERIAL_MODE),
            "deserialize",
            &path,
        )?;
        Ok(cc)
    }

    pub fn read_public(&self) -> Result<UniquePtr<ffi::PublicKeyDCRTPoly>> {
        let path = self.file("public_key.bin")?;
        let mut pk = ffi::DCRTPolyGenNullPublicKey();
        let_cxx_string!(p = path.as_str());
        ensure_io(
            ffi::DCRTPolyDeserializePublicKeyFromFile(&p, pk.pin_mut(), SERIAL_MODE),
            "deserialize",
            &path,
        )?;
        Ok(pk)
    }

    pub fn read_private(&self) -> Result<UniquePtr<ffi::PrivateKeyDCRTPoly>> {
        let path = self.file("private_key.bin")?;
        let mut sk = ffi::DCRTPolyGenNullPrivateKey();
        let_cxx_string!(p = path.as_str());
        ensure_io(
            ffi::DCRTPolyDeserializePrivateKeyFromFile(&p, sk.pin_mut(), SERIAL_MODE),
            "deserialize",
            &path,
        )?;
        Ok(sk)
    }

    /// Rotation keys go into the library's process-wide key table.
    pub fn read_rotation_keys(&self) -> Result<()> {
        let path = self.file("rotation_keys.bin")?;
        let_cxx_string!(p = path.as_str());
        ensure_io(
            ffi::DCRTPolyDeserializeEvalAutomorphismKeyFromFile(&p, SERIAL_MODE),
            "deserialize",
            &path,
        )
    }
}

fn ensure_io(ok: bool, action: &str, path: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::Artifact(format!("Failed to {} key file {}", action, path)))
    }
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| {
        Error::Artifact(format!("Failed to set permissions on {}: {}", path.display(), e))
    })
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
