use alloc::string::String;
use core::fmt;

use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::Deserialize;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::ProviderProfile;

pub const KEY_LENGTH: usize = 16;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_MAX_BUFFER_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("decryption key is not valid hex: {0}")]
    InvalidHex(hex::FromHexError),
    #[error("decryption key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

/// AES-128 key the meter's telegrams are encrypted with.
///
/// The key material is wiped when the value is dropped and never shows up in
/// `Debug` output.
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String"))]
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DecryptionKey([u8; KEY_LENGTH]);

impl DecryptionKey {
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        Self(key)
    }

    /// Parses the 32 hex digit form printed on the meter operator's key letter.
    pub fn from_hex(key: &str) -> Result<Self, ConfigError> {
        let mut bytes = hex::decode(key.trim()).map_err(ConfigError::InvalidHex)?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let key = <[u8; KEY_LENGTH]>::try_from(bytes).map_err(|_| {
            ConfigError::InvalidKeyLength { expected: KEY_LENGTH, actual: bytes.len() }
        })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DecryptionKey(<redacted>)")
    }
}

impl TryFrom<&str> for DecryptionKey {
    type Error = ConfigError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        Self::from_hex(key)
    }
}

impl TryFrom<String> for DecryptionKey {
    type Error = ConfigError;

    fn try_from(mut key: String) -> Result<Self, Self::Error> {
        let parsed = Self::from_hex(&key);
        key.zeroize();
        parsed
    }
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

fn default_max_buffer_len() -> usize {
    DEFAULT_MAX_BUFFER_LEN
}

/// Everything a [`DlmsMeter`](crate::DlmsMeter) needs to know about one meter.
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterConfig {
    pub key: DecryptionKey,
    #[cfg_attr(feature = "serde", serde(default))]
    pub profile: ProviderProfile,
    /// Quiet period after the last received byte that ends a telegram.
    #[cfg_attr(feature = "serde", serde(default = "default_read_timeout_ms"))]
    pub read_timeout_ms: u64,
    #[cfg_attr(feature = "serde", serde(default = "default_max_buffer_len"))]
    pub max_buffer_len: usize,
}

impl MeterConfig {
    pub fn new(key: DecryptionKey) -> Self {
        Self {
            key,
            profile: ProviderProfile::default(),
            read_timeout_ms: default_read_timeout_ms(),
            max_buffer_len: default_max_buffer_len(),
        }
    }

    pub fn with_profile(mut self, profile: ProviderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_read_timeout_ms(mut self, read_timeout_ms: u64) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self
    }

    pub fn with_max_buffer_len(mut self, max_buffer_len: usize) -> Self {
        self.max_buffer_len = max_buffer_len;
        self
    }

    pub fn log_summary(&self) {
        debug!(
            "DLMS meter: provider {}, read timeout {} ms, buffer limit {} byte(s)",
            self.profile, self.read_timeout_ms, self.max_buffer_len
        );
        trace!("DLMS meter: decryption key {}", hex::encode(self.key.as_bytes()));
    }
}
