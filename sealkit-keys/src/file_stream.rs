//! Whole-buffer encrypted file I/O.
//!
//! Envelope integrity requires the complete plaintext up front, so this
//! stream supports exactly one write of the whole buffer and rejects
//! anything that looks like incremental I/O. Reads pull the whole envelope
//! into memory, decrypt once and cache the cleartext for the stream's open
//! lifetime; the cache is zero-filled on close.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use zeroize::Zeroize;

use sealkit_common::logging::Logger;

use crate::cipher::EnvelopeCipher;
use crate::error::{KeyError, Result};

/// Which envelope variant the stream produces on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Symmetric,
    Hybrid,
}

enum StreamState {
    Idle,
    Written,
    Cached(Vec<u8>),
    Closed,
}

/// Adapts [`EnvelopeCipher`] to all-or-nothing file I/O.
///
/// The underlying file is exclusively owned by the stream for its lifetime;
/// concurrent readers or writers on the same stream are not supported.
pub struct SecureFileStream {
    path: PathBuf,
    key_alias: String,
    mode: StreamMode,
    cipher: Arc<EnvelopeCipher>,
    state: StreamState,
    logger: Arc<Logger>,
}

impl SecureFileStream {
    pub fn new(
        path: impl AsRef<Path>,
        key_alias: &str,
        mode: StreamMode,
        cipher: Arc<EnvelopeCipher>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            key_alias: key_alias.to_string(),
            mode,
            cipher,
            state: StreamState::Idle,
            logger,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypt the whole buffer and write the complete envelope in one call.
    ///
    /// A second write, or a write after a read, fails with
    /// `UnsupportedPartialIo`: appending to an existing envelope would
    /// silently corrupt it.
    pub async fn write_all(&mut self, plaintext: &[u8]) -> Result<()> {
        match self.state {
            StreamState::Idle => {}
            StreamState::Closed => return Err(KeyError::StreamClosed),
            _ => {
                return Err(KeyError::UnsupportedPartialIo(
                    "stream already holds a complete envelope".to_string(),
                ))
            }
        }

        let sealed = match self.mode {
            StreamMode::Symmetric => {
                self.cipher
                    .encrypt_symmetric(&self.key_alias, plaintext)
                    .await?
            }
            StreamMode::Hybrid => {
                self.cipher
                    .encrypt_hybrid(&self.key_alias, plaintext)
                    .await?
            }
        };

        tokio::fs::write(&self.path, &sealed).await?;
        self.state = StreamState::Written;
        self.logger.debug(format!(
            "wrote {} envelope bytes to {}",
            sealed.len(),
            self.path.display()
        ));
        Ok(())
    }

    /// Read the whole underlying file, decrypt once and cache the cleartext.
    /// Repeated reads serve the cache; the file is not touched again.
    pub async fn read_all(&mut self) -> Result<&[u8]> {
        match self.state {
            StreamState::Cached(_) => {}
            StreamState::Closed => return Err(KeyError::StreamClosed),
            StreamState::Idle | StreamState::Written => {
                let sealed = tokio::fs::read(&self.path).await?;
                let cleartext = self.cipher.decrypt(&sealed).await?;
                self.logger.debug(format!(
                    "decrypted {} cleartext bytes from {}",
                    cleartext.len(),
                    self.path.display()
                ));
                self.state = StreamState::Cached(cleartext);
            }
        }

        match &self.state {
            StreamState::Cached(cleartext) => Ok(cleartext),
            _ => Err(KeyError::StreamClosed),
        }
    }

    /// Zero-fill the cached cleartext and mark the stream closed. Idempotent.
    pub fn close(&mut self) {
        if let StreamState::Cached(mut cleartext) =
            std::mem::replace(&mut self.state, StreamState::Closed)
        {
            cleartext.zeroize();
        }
    }
}

impl Drop for SecureFileStream {
    fn drop(&mut self) {
        self.close();
    }
}
