//! Binary codec for the three envelope variants.
//!
//! Wire format (all integers 4-byte big-endian):
//!
//! ```text
//! Symmetric:  [tag=0][ivLen][iv][aliasLen][alias][ciphertext..EOF]
//! Asymmetric: [tag=1][aliasLen][alias][ciphertext..EOF]
//! Ephemeral:  [tag=2][wrapLen][wrappedKey][ivLen][iv][aliasLen][alias][ciphertext..EOF]
//! ```
//!
//! Field order is significant and variant-specific, so each variant gets its
//! own decode path; there is no generic schema. The trailing ciphertext has
//! no length prefix and runs to the end of the buffer.

use crate::error::{KeyError, Result};

pub const TAG_SYMMETRIC: u32 = 0;
pub const TAG_ASYMMETRIC: u32 = 1;
pub const TAG_EPHEMERAL: u32 = 2;

/// A self-describing encrypted blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Symmetric {
        iv: Vec<u8>,
        key_alias: String,
        ciphertext: Vec<u8>,
    },
    Asymmetric {
        key_alias: String,
        ciphertext: Vec<u8>,
    },
    Ephemeral {
        /// The ephemeral data key, asymmetric-encrypted under `key_alias`.
        wrapped_key: Vec<u8>,
        iv: Vec<u8>,
        key_alias: String,
        ciphertext: Vec<u8>,
    },
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let end = self.pos + 4;
        if end > self.buf.len() {
            return Err(KeyError::MalformedEnvelope(format!(
                "truncated buffer while reading {what}"
            )));
        }
        let mut be = [0u8; 4];
        be.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(u32::from_be_bytes(be))
    }

    fn read_block(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.read_u32(what)? as usize;
        let end = self.pos.checked_add(len).ok_or_else(|| {
            KeyError::MalformedEnvelope(format!("{what} length overflows buffer"))
        })?;
        if end > self.buf.len() {
            return Err(KeyError::MalformedEnvelope(format!(
                "{what} length {len} exceeds remaining {} bytes",
                self.buf.len() - self.pos
            )));
        }
        let block = &self.buf[self.pos..end];
        self.pos = end;
        Ok(block)
    }

    /// Everything not yet consumed; the unprefixed trailing ciphertext.
    fn rest(&mut self) -> &'a [u8] {
        let block = &self.buf[self.pos..];
        self.pos = self.buf.len();
        block
    }

    fn read_alias(&mut self) -> Result<String> {
        String::from_utf8(self.read_block("key alias")?.to_vec())
            .map_err(|_| KeyError::MalformedEnvelope("key alias is not valid UTF-8".to_string()))
    }
}

fn put_block(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

impl Envelope {
    /// The wire tag for this variant.
    pub fn tag(&self) -> u32 {
        match self {
            Envelope::Symmetric { .. } => TAG_SYMMETRIC,
            Envelope::Asymmetric { .. } => TAG_ASYMMETRIC,
            Envelope::Ephemeral { .. } => TAG_EPHEMERAL,
        }
    }

    /// Alias of the provider key this envelope references.
    pub fn key_alias(&self) -> &str {
        match self {
            Envelope::Symmetric { key_alias, .. }
            | Envelope::Asymmetric { key_alias, .. }
            | Envelope::Ephemeral { key_alias, .. } => key_alias,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.tag().to_be_bytes());
        match self {
            Envelope::Symmetric {
                iv,
                key_alias,
                ciphertext,
            } => {
                put_block(&mut out, iv);
                put_block(&mut out, key_alias.as_bytes());
                out.extend_from_slice(ciphertext);
            }
            Envelope::Asymmetric {
                key_alias,
                ciphertext,
            } => {
                put_block(&mut out, key_alias.as_bytes());
                out.extend_from_slice(ciphertext);
            }
            Envelope::Ephemeral {
                wrapped_key,
                iv,
                key_alias,
                ciphertext,
            } => {
                put_block(&mut out, wrapped_key);
                put_block(&mut out, iv);
                put_block(&mut out, key_alias.as_bytes());
                out.extend_from_slice(ciphertext);
            }
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Envelope> {
        let mut reader = Reader::new(buf);
        let tag = reader.read_u32("type tag")?;
        match tag {
            TAG_SYMMETRIC => Self::decode_symmetric(&mut reader),
            TAG_ASYMMETRIC => Self::decode_asymmetric(&mut reader),
            TAG_EPHEMERAL => Self::decode_ephemeral(&mut reader),
            other => Err(KeyError::MalformedEnvelope(format!(
                "unrecognized envelope tag {other}"
            ))),
        }
    }

    fn decode_symmetric(reader: &mut Reader<'_>) -> Result<Envelope> {
        let iv = reader.read_block("iv")?.to_vec();
        let key_alias = reader.read_alias()?;
        let ciphertext = reader.rest().to_vec();
        Ok(Envelope::Symmetric {
            iv,
            key_alias,
            ciphertext,
        })
    }

    fn decode_asymmetric(reader: &mut Reader<'_>) -> Result<Envelope> {
        let key_alias = reader.read_alias()?;
        let ciphertext = reader.rest().to_vec();
        Ok(Envelope::Asymmetric {
            key_alias,
            ciphertext,
        })
    }

    fn decode_ephemeral(reader: &mut Reader<'_>) -> Result<Envelope> {
        let wrapped_key = reader.read_block("wrapped key")?.to_vec();
        let iv = reader.read_block("iv")?.to_vec();
        let key_alias = reader.read_alias()?;
        let ciphertext = reader.rest().to_vec();
        Ok(Envelope::Ephemeral {
            wrapped_key,
            iv,
            key_alias,
            ciphertext,
        })
    }
}
