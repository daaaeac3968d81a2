//! Envelope cipher: orchestrates the provider, ephemeral keys and the codec.
//!
//! Hybrid mode delivers the central property of the subsystem: encryption
//! uses only the ungated public wrap and therefore works while the device is
//! locked, while decryption needs the gated private key and therefore an
//! unlocked, authorized session. The ephemeral data key never outlives the
//! single call that used it.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;

use sealkit_common::logging::Logger;

use crate::aead;
use crate::envelope::Envelope;
use crate::ephemeral::EphemeralKey;
use crate::error::{KeyError, Result};
use crate::provider::KeyProvider;

/// Options for the envelope cipher.
#[derive(Debug, Clone)]
pub struct CipherOptions {
    /// Size of the ephemeral data key used by hybrid mode: 128, 192 or 256.
    pub ephemeral_key_bits: usize,
    /// Best-effort decoy rounds run after ephemeral destruction: dummy
    /// public-key operations intended to displace the key's plaintext form
    /// from provider working memory. Heuristic only, no guarantee; the
    /// authoritative mechanism is the zeroized buffer. Default 0 (off).
    pub decoy_rounds: u32,
}

impl Default for CipherOptions {
    fn default() -> Self {
        Self {
            ephemeral_key_bits: 256,
            decoy_rounds: 0,
        }
    }
}

/// Orchestrates encryption and decryption across the three envelope
/// variants. One instance is shared across calls; each call is a
/// self-contained sequence with no state retained afterwards.
pub struct EnvelopeCipher {
    provider: Arc<dyn KeyProvider>,
    options: CipherOptions,
    logger: Arc<Logger>,
}

impl EnvelopeCipher {
    pub fn new(provider: Arc<dyn KeyProvider>, options: CipherOptions, logger: Arc<Logger>) -> Self {
        Self {
            provider,
            options,
            logger,
        }
    }

    /// Encrypt under the named symmetric key; `Symmetric` envelope bytes.
    pub async fn encrypt_symmetric(&self, alias: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let sealed = self.provider.encrypt_symmetric(alias, plaintext).await?;
        if sealed.len() < aead::NONCE_LEN {
            return Err(KeyError::CryptoError(
                "provider returned ciphertext shorter than a nonce".to_string(),
            ));
        }

        let envelope = Envelope::Symmetric {
            iv: sealed[..aead::NONCE_LEN].to_vec(),
            key_alias: alias.to_string(),
            ciphertext: sealed[aead::NONCE_LEN..].to_vec(),
        };
        self.logger.debug(format!(
            "sealed {} bytes under symmetric key '{alias}'",
            plaintext.len()
        ));
        Ok(envelope.encode())
    }

    /// Encrypt directly under the named public key; `Asymmetric` envelope
    /// bytes. Plaintext size is bounded by the RSA-OAEP modulus.
    pub async fn encrypt_asymmetric(&self, alias: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = self.provider.encrypt_asymmetric(alias, plaintext).await?;
        self.logger.debug(format!(
            "sealed {} bytes under public key '{alias}'",
            plaintext.len()
        ));
        Ok(Envelope::Asymmetric {
            key_alias: alias.to_string(),
            ciphertext,
        }
        .encode())
    }

    /// Hybrid encrypt: seal the plaintext under a fresh ephemeral key, wrap
    /// that key under the named public key, destroy the ephemeral key before
    /// returning. Works while the device is locked.
    pub async fn encrypt_hybrid(&self, alias: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut ephemeral = EphemeralKey::generate(self.options.ephemeral_key_bits)?;
        let sealed = self.seal_hybrid(alias, plaintext, &ephemeral).await;
        ephemeral.destroy();
        if self.options.decoy_rounds > 0 {
            self.run_decoy_workload(alias).await;
        }
        sealed
    }

    pub(crate) async fn seal_hybrid(
        &self,
        alias: &str,
        plaintext: &[u8],
        ephemeral: &EphemeralKey,
    ) -> Result<Vec<u8>> {
        let (iv, ciphertext) = aead::seal(ephemeral.bytes()?, plaintext)?;
        let wrapped_key = self
            .provider
            .encrypt_asymmetric(alias, ephemeral.bytes()?)
            .await?;

        self.logger.debug(format!(
            "sealed {} bytes under ephemeral key wrapped by '{alias}'",
            plaintext.len()
        ));
        Ok(Envelope::Ephemeral {
            wrapped_key,
            iv,
            key_alias: alias.to_string(),
            ciphertext,
        }
        .encode())
    }

    /// Decode and decrypt an envelope, dispatching on its type tag. The
    /// `Ephemeral` path may suspend on user-presence authorization for the
    /// private unwrap.
    pub async fn decrypt(&self, envelope_bytes: &[u8]) -> Result<Vec<u8>> {
        match Envelope::decode(envelope_bytes)? {
            Envelope::Symmetric {
                iv,
                key_alias,
                ciphertext,
            } => {
                let mut sealed = iv;
                sealed.extend_from_slice(&ciphertext);
                self.provider.decrypt_symmetric(&key_alias, &sealed).await
            }
            Envelope::Asymmetric {
                key_alias,
                ciphertext,
            } => self.provider.decrypt_asymmetric(&key_alias, &ciphertext).await,
            Envelope::Ephemeral {
                wrapped_key,
                iv,
                key_alias,
                ciphertext,
            } => {
                let raw = self
                    .provider
                    .decrypt_asymmetric(&key_alias, &wrapped_key)
                    .await?;
                let mut ephemeral = EphemeralKey::from_raw(raw)?;
                let plaintext = ephemeral
                    .bytes()
                    .and_then(|key| aead::open(key, &iv, &ciphertext));
                ephemeral.destroy();
                if self.options.decoy_rounds > 0 {
                    self.run_decoy_workload(&key_alias).await;
                }
                plaintext
            }
        }
    }

    /// Dummy public-key operations after ephemeral destruction. Uses only
    /// the ungated wrap so it can never raise an authorization prompt;
    /// failures are logged and ignored.
    async fn run_decoy_workload(&self, alias: &str) {
        for round in 0..self.options.decoy_rounds {
            let mut junk = [0u8; 32];
            if OsRng.try_fill_bytes(&mut junk).is_err() {
                return;
            }
            if let Err(e) = self.provider.encrypt_asymmetric(alias, &junk).await {
                self.logger
                    .debug(format!("decoy round {round} skipped: {e}"));
                return;
            }
        }
        self.logger.debug(format!(
            "{} decoy rounds completed for '{alias}'",
            self.options.decoy_rounds
        ));
    }
}
