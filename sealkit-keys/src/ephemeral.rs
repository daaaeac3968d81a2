//! Short-lived symmetric keys with explicit, idempotent destruction.
//!
//! An `EphemeralKey` is generated for exactly one encrypt or decrypt
//! operation and destroyed by the cipher before the operation's result is
//! delivered. Destruction zero-fills the owned buffer in place; there is no
//! reliance on allocator or runtime timing.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{KeyError, Result};

/// Symmetric algorithm label carried by an ephemeral key.
pub const ALGORITHM_AES: &str = "AES";

/// An in-memory symmetric key with explicit destruction.
pub struct EphemeralKey {
    material: Box<[u8]>,
    algorithm: &'static str,
    destroyed: bool,
}

impl EphemeralKey {
    /// Generate a fresh key of `size_bits` (128, 192 or 256) from the OS
    /// random source.
    pub fn generate(size_bits: usize) -> Result<Self> {
        if !matches!(size_bits, 128 | 192 | 256) {
            return Err(KeyError::InvalidKeyLength);
        }

        let mut material = vec![0u8; size_bits / 8].into_boxed_slice();
        OsRng
            .try_fill_bytes(&mut material)
            .map_err(|e| KeyError::RandomUnavailable(e.to_string()))?;

        Ok(Self {
            material,
            algorithm: ALGORITHM_AES,
            destroyed: false,
        })
    }

    /// Reconstruct a key from raw bytes recovered by unwrapping a hybrid
    /// envelope. Takes ownership so the caller holds no second copy; rejected
    /// buffers are zero-filled before the error is returned.
    pub fn from_raw(mut bytes: Vec<u8>) -> Result<Self> {
        if !matches!(bytes.len(), 16 | 24 | 32) {
            bytes.zeroize();
            return Err(KeyError::InvalidKeyLength);
        }
        Ok(Self {
            material: bytes.into_boxed_slice(),
            algorithm: ALGORITHM_AES,
            destroyed: false,
        })
    }

    /// Raw key bytes. Fails with `KeyDestroyed` after destruction.
    pub fn bytes(&self) -> Result<&[u8]> {
        if self.destroyed {
            return Err(KeyError::KeyDestroyed);
        }
        Ok(&self.material)
    }

    /// Algorithm label for this key.
    pub fn algorithm(&self) -> &str {
        self.algorithm
    }

    /// Key size in bits. Available after destruction for diagnostics.
    pub fn size_bits(&self) -> usize {
        self.material.len() * 8
    }

    /// Zero-fill the key material and mark the key destroyed. Idempotent.
    pub fn destroy(&mut self) {
        self.material.zeroize();
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for EphemeralKey {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for EphemeralKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("EphemeralKey")
            .field("algorithm", &self.algorithm)
            .field("size_bits", &self.size_bits())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
