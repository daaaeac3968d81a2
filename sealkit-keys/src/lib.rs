//! Sealkit keys – envelope encryption core.
//!
//! Builds self-describing encrypted envelopes in three variants (symmetric,
//! asymmetric, hybrid with an ephemeral data key), manages the lifecycle of
//! short-lived symmetric keys including explicit in-memory destruction, and
//! adapts the cipher to whole-buffer file I/O.
//!
//! The platform keystore and the user-presence gate are external
//! collaborators behind the [`KeyProvider`] and [`AuthorizationGate`] seams;
//! this crate never serializes raw key material for provider-backed keys.

pub mod aead;
pub mod cipher;
pub mod envelope;
pub mod ephemeral;
pub mod error;
pub mod file_stream;
pub mod provider;

pub use error::{KeyError, Result};

pub use ephemeral::{EphemeralKey, ALGORITHM_AES};

pub use envelope::{Envelope, TAG_ASYMMETRIC, TAG_EPHEMERAL, TAG_SYMMETRIC};

pub use provider::{
    authorization_channel, AlwaysAllow, AsymmetricKeyConfig, AuthorizationGate,
    AuthorizationRequest, ChannelGate, KeyProvider, SoftwareKeyProvider, SymmetricKeyConfig,
    ALGORITHM_RSA, PADDING_OAEP_SHA256,
};

pub use cipher::{CipherOptions, EnvelopeCipher};

pub use file_stream::{SecureFileStream, StreamMode};

pub use aead::{KEY_LEN, NONCE_LEN};
