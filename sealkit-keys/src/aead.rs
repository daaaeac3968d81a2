//! AES-GCM helpers shared by the software provider and the hybrid path.
//!
//! The key length selects the cipher (128, 192 or 256 bits). The nonce is
//! generated fresh per operation from the OS random source and returned
//! alongside the ciphertext; the GCM tag (128 bits, the provider minimum) is
//! appended by the cipher implementation.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{KeyError, Result};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Size of the GCM nonce in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of a provider-backed symmetric key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

fn init<C: KeyInit>(key: &[u8]) -> Result<C> {
    C::new_from_slice(key)
        .map_err(|e| KeyError::CryptoError(format!("failed to create cipher: {e}")))
}

/// Encrypt `plaintext` under `key`, returning `(nonce, ciphertext_with_tag)`.
pub(crate) fn seal(key: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| KeyError::RandomUnavailable(e.to_string()))?;

    let n = Nonce::from_slice(&nonce);
    let sealed = match key.len() {
        16 => init::<Aes128Gcm>(key)?.encrypt(n, plaintext),
        24 => init::<Aes192Gcm>(key)?.encrypt(n, plaintext),
        32 => init::<Aes256Gcm>(key)?.encrypt(n, plaintext),
        _ => return Err(KeyError::InvalidKeyLength),
    }
    .map_err(|e| KeyError::CryptoError(format!("AES-GCM encryption failed: {e}")))?;

    Ok((nonce.to_vec(), sealed))
}

/// Decrypt `ciphertext` under `key` with the given `nonce`.
pub(crate) fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(KeyError::CryptoError(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }

    let n = Nonce::from_slice(nonce);
    match key.len() {
        16 => init::<Aes128Gcm>(key)?.decrypt(n, ciphertext),
        24 => init::<Aes192Gcm>(key)?.decrypt(n, ciphertext),
        32 => init::<Aes256Gcm>(key)?.decrypt(n, ciphertext),
        _ => return Err(KeyError::InvalidKeyLength),
    }
    .map_err(|e| KeyError::CryptoError(format!("AES-GCM decryption failed: {e}")))
}
