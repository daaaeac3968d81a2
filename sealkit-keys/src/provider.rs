//! Key provider facade over the platform keystore.
//!
//! The provider is the boundary to secure storage: keys are referenced by
//! alias and raw material for provider-backed keys never crosses the seam.
//! Operations that require user presence (biometric or credential
//! confirmation) suspend on an [`AuthorizationGate`]; the gate resolves
//! asynchronously because the human may take arbitrarily long, or never
//! answer at all. Cancellation is surfaced as `AuthorizationFailed`.
//!
//! [`SoftwareKeyProvider`] is the in-process reference implementation:
//! AES-256-GCM for symmetric operations and RSA-OAEP-SHA256 for the
//! asymmetric wrap used by hybrid envelopes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::{mpsc, oneshot};
use zeroize::Zeroize;

use sealkit_common::logging::Logger;

use crate::aead;
use crate::ephemeral::ALGORITHM_AES;
use crate::error::{KeyError, Result};

/// Asymmetric algorithm label accepted by the software provider.
pub const ALGORITHM_RSA: &str = "RSA";

/// Padding scheme label for RSA-OAEP with SHA-256.
pub const PADDING_OAEP_SHA256: &str = "OAEP-SHA256";

/// Configuration for a named symmetric key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymmetricKeyConfig {
    /// Algorithm to provision, e.g. "AES". Platform providers map this to
    /// their own key-generation parameters; unsupported values are rejected
    /// with `KeystoreError`.
    pub algorithm: String,
    pub size_bits: usize,
    /// When true, use of the key suspends on the authorization gate.
    pub auth_required: bool,
    /// Seconds a successful authorization stays valid; enforced by the
    /// platform gate, carried here for provisioning.
    pub auth_validity_secs: Option<u32>,
}

impl Default for SymmetricKeyConfig {
    fn default() -> Self {
        Self {
            algorithm: ALGORITHM_AES.to_string(),
            size_bits: 256,
            auth_required: false,
            auth_validity_secs: None,
        }
    }
}

/// Configuration for a named asymmetric key pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsymmetricKeyConfig {
    /// Algorithm to provision, e.g. "RSA".
    pub algorithm: String,
    pub size_bits: usize,
    /// Padding schemes the pair must support. The software provider requires
    /// "OAEP-SHA256" to be among them.
    pub paddings: Vec<String>,
    /// Gates the private-key operation only; the public wrap stays available
    /// while the device is locked.
    pub auth_required: bool,
}

impl Default for AsymmetricKeyConfig {
    fn default() -> Self {
        Self {
            algorithm: ALGORITHM_RSA.to_string(),
            size_bits: 2048,
            paddings: vec![PADDING_OAEP_SHA256.to_string()],
            auth_required: false,
        }
    }
}

/// Asynchronous user-presence authorization seam.
///
/// `authorize` resolves once the user approves, or fails with
/// `AuthorizationFailed` on denial or cancellation. No timeout is enforced
/// here; cancellation belongs to the gate's owner.
#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    async fn authorize(&self, alias: &str) -> Result<()>;
}

/// Gate that approves every request; for keys without auth requirements.
pub struct AlwaysAllow;

#[async_trait]
impl AuthorizationGate for AlwaysAllow {
    async fn authorize(&self, _alias: &str) -> Result<()> {
        Ok(())
    }
}

/// A pending authorization handed to the interactive authorizer.
pub struct AuthorizationRequest {
    pub alias: String,
    responder: oneshot::Sender<bool>,
}

impl AuthorizationRequest {
    pub fn approve(self) {
        let _ = self.responder.send(true);
    }

    pub fn deny(self) {
        let _ = self.responder.send(false);
    }
}

/// Gate that forwards each request to an authorizer task over a channel.
///
/// Dropping the receiving side (or dropping a request without answering)
/// resolves the pending operation as `AuthorizationFailed` rather than
/// hanging the caller.
pub struct ChannelGate {
    requests: mpsc::Sender<AuthorizationRequest>,
}

/// Create a channel-backed gate plus the receiver the authorizer drains.
pub fn authorization_channel(buffer: usize) -> (ChannelGate, mpsc::Receiver<AuthorizationRequest>) {
    let (tx, rx) = mpsc::channel(buffer);
    (ChannelGate { requests: tx }, rx)
}

#[async_trait]
impl AuthorizationGate for ChannelGate {
    async fn authorize(&self, alias: &str) -> Result<()> {
        let (responder, outcome) = oneshot::channel();
        self.requests
            .send(AuthorizationRequest {
                alias: alias.to_string(),
                responder,
            })
            .await
            .map_err(|_| KeyError::AuthorizationFailed("authorizer unavailable".to_string()))?;

        match outcome.await {
            Ok(true) => Ok(()),
            Ok(false) => Err(KeyError::AuthorizationFailed(format!(
                "user declined use of key '{alias}'"
            ))),
            Err(_) => Err(KeyError::AuthorizationFailed(format!(
                "authorization for key '{alias}' was canceled"
            ))),
        }
    }
}

/// Facade consumed by the envelope cipher. Implementations wrap the platform
/// keystore; every method may suspend when the referenced key is gated.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Create or replace a named symmetric key. Returns true when a previous
    /// key under the same alias was replaced.
    async fn generate_symmetric(&self, alias: &str, config: &SymmetricKeyConfig) -> Result<bool>;

    /// Create or replace a named asymmetric key pair.
    async fn generate_asymmetric_pair(
        &self,
        alias: &str,
        config: &AsymmetricKeyConfig,
    ) -> Result<bool>;

    /// Symmetric encrypt; output is nonce-prepended ciphertext.
    async fn encrypt_symmetric(&self, alias: &str, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Symmetric decrypt of nonce-prepended ciphertext.
    async fn decrypt_symmetric(&self, alias: &str, sealed: &[u8]) -> Result<Vec<u8>>;

    /// Public-key encrypt. Never gated: this is the operation that stays
    /// available while the device is locked.
    async fn encrypt_asymmetric(&self, alias: &str, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Private-key decrypt; gated when the pair was provisioned with
    /// `auth_required`.
    async fn decrypt_asymmetric(&self, alias: &str, ciphertext: &[u8]) -> Result<Vec<u8>>;

    async fn key_exists(&self, alias: &str) -> Result<bool>;
}

enum StoredKey {
    Symmetric {
        key: Vec<u8>,
        config: SymmetricKeyConfig,
    },
    Asymmetric {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
        config: AsymmetricKeyConfig,
    },
}

impl Drop for StoredKey {
    fn drop(&mut self) {
        if let StoredKey::Symmetric { key, .. } = self {
            key.zeroize();
        }
    }
}

/// In-memory software keystore.
///
/// Reference implementation of [`KeyProvider`] used where no hardware
/// keystore is present, and by the test suites. Key material stays inside
/// the provider; lookups by alias only.
pub struct SoftwareKeyProvider {
    keys: Mutex<HashMap<String, StoredKey>>,
    gate: Arc<dyn AuthorizationGate>,
    logger: Arc<Logger>,
}

impl SoftwareKeyProvider {
    pub fn new(gate: Arc<dyn AuthorizationGate>, logger: Arc<Logger>) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            gate,
            logger,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredKey>>> {
        self.keys
            .lock()
            .map_err(|_| KeyError::KeystoreError("keystore lock poisoned".to_string()))
    }

    /// Whether use of `alias` must pass the gate. Public-key encryption is
    /// exempt by design.
    fn auth_required(&self, alias: &str) -> Result<bool> {
        let keys = self.lock()?;
        match keys.get(alias) {
            Some(StoredKey::Symmetric { config, .. }) => Ok(config.auth_required),
            Some(StoredKey::Asymmetric { config, .. }) => Ok(config.auth_required),
            None => Err(KeyError::KeyNotFound(alias.to_string())),
        }
    }

    async fn gate_if_required(&self, alias: &str) -> Result<()> {
        if self.auth_required(alias)? {
            self.logger
                .debug(format!("awaiting authorization for key '{alias}'"));
            self.gate.authorize(alias).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyProvider for SoftwareKeyProvider {
    async fn generate_symmetric(&self, alias: &str, config: &SymmetricKeyConfig) -> Result<bool> {
        if config.algorithm != ALGORITHM_AES {
            return Err(KeyError::KeystoreError(format!(
                "unsupported symmetric algorithm: {}",
                config.algorithm
            )));
        }
        if config.size_bits != aead::KEY_LEN * 8 {
            return Err(KeyError::KeystoreError(format!(
                "unsupported symmetric key size: {} bits",
                config.size_bits
            )));
        }

        let mut key = vec![0u8; config.size_bits / 8];
        use rand::RngCore;
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(|e| KeyError::RandomUnavailable(e.to_string()))?;

        let mut keys = self.lock()?;
        let replaced = keys
            .insert(
                alias.to_string(),
                StoredKey::Symmetric {
                    key,
                    config: config.clone(),
                },
            )
            .is_some();
        self.logger
            .info(format!("symmetric key '{alias}' generated (replaced: {replaced})"));
        Ok(replaced)
    }

    async fn generate_asymmetric_pair(
        &self,
        alias: &str,
        config: &AsymmetricKeyConfig,
    ) -> Result<bool> {
        if config.algorithm != ALGORITHM_RSA {
            return Err(KeyError::KeystoreError(format!(
                "unsupported asymmetric algorithm: {}",
                config.algorithm
            )));
        }
        if !config.paddings.iter().any(|p| p == PADDING_OAEP_SHA256) {
            return Err(KeyError::KeystoreError(format!(
                "no supported padding scheme among {:?}",
                config.paddings
            )));
        }

        let private = RsaPrivateKey::new(&mut OsRng, config.size_bits)
            .map_err(|e| KeyError::KeystoreError(format!("RSA key generation failed: {e}")))?;
        let public = RsaPublicKey::from(&private);

        let mut keys = self.lock()?;
        let replaced = keys
            .insert(
                alias.to_string(),
                StoredKey::Asymmetric {
                    private: Box::new(private),
                    public,
                    config: config.clone(),
                },
            )
            .is_some();
        self.logger.info(format!(
            "asymmetric pair '{alias}' generated ({} bits, replaced: {replaced})",
            config.size_bits
        ));
        Ok(replaced)
    }

    async fn encrypt_symmetric(&self, alias: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.gate_if_required(alias).await?;

        let keys = self.lock()?;
        match keys.get(alias) {
            Some(StoredKey::Symmetric { key, .. }) => {
                let (nonce, ciphertext) = aead::seal(key, plaintext)?;
                let mut sealed = nonce;
                sealed.extend_from_slice(&ciphertext);
                Ok(sealed)
            }
            Some(StoredKey::Asymmetric { .. }) => Err(KeyError::KeystoreError(format!(
                "key '{alias}' is not symmetric"
            ))),
            None => Err(KeyError::KeyNotFound(alias.to_string())),
        }
    }

    async fn decrypt_symmetric(&self, alias: &str, sealed: &[u8]) -> Result<Vec<u8>> {
        self.gate_if_required(alias).await?;

        if sealed.len() < aead::NONCE_LEN {
            return Err(KeyError::CryptoError(
                "sealed data too short (missing nonce)".to_string(),
            ));
        }

        let keys = self.lock()?;
        match keys.get(alias) {
            Some(StoredKey::Symmetric { key, .. }) => {
                aead::open(key, &sealed[..aead::NONCE_LEN], &sealed[aead::NONCE_LEN..])
            }
            Some(StoredKey::Asymmetric { .. }) => Err(KeyError::KeystoreError(format!(
                "key '{alias}' is not symmetric"
            ))),
            None => Err(KeyError::KeyNotFound(alias.to_string())),
        }
    }

    async fn encrypt_asymmetric(&self, alias: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        // No gate: public-key wrap is the write-while-locked path.
        let keys = self.lock()?;
        match keys.get(alias) {
            Some(StoredKey::Asymmetric { public, .. }) => public
                .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
                .map_err(|e| KeyError::KeystoreError(format!("RSA-OAEP encryption failed: {e}"))),
            Some(StoredKey::Symmetric { .. }) => Err(KeyError::KeystoreError(format!(
                "key '{alias}' is not asymmetric"
            ))),
            None => Err(KeyError::KeyNotFound(alias.to_string())),
        }
    }

    async fn decrypt_asymmetric(&self, alias: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.gate_if_required(alias).await?;

        let keys = self.lock()?;
        match keys.get(alias) {
            Some(StoredKey::Asymmetric { private, .. }) => private
                .decrypt(Oaep::new::<Sha256>(), ciphertext)
                .map_err(|e| KeyError::KeystoreError(format!("RSA-OAEP decryption failed: {e}"))),
            Some(StoredKey::Symmetric { .. }) => Err(KeyError::KeystoreError(format!(
                "key '{alias}' is not asymmetric"
            ))),
            None => Err(KeyError::KeyNotFound(alias.to_string())),
        }
    }

    async fn key_exists(&self, alias: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(alias))
    }
}
