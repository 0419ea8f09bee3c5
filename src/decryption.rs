use alloc::vec::Vec;

use aes::Aes128;
use aes_gcm::{
    AesGcm, Nonce, Tag,
    aead::{AeadInPlace, KeyInit, consts::U12},
};
use cipher::Key;
use log::debug;
use thiserror::Error;

use crate::{DecryptionKey, GeneralGloCiphering};

/// DLMS security suite 0/1 authentication tags are truncated to 12 bytes.
pub const GCM_TAG_LENGTH: usize = 12;

/// AES-128-GCM with the 12-byte IV and 12-byte tag used by general-glo-ciphering.
pub(crate) type DlmsAesGcm = AesGcm<Aes128, U12, U12>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptError {
    #[error("payload of {len} byte(s) cannot hold a {GCM_TAG_LENGTH} byte authentication tag")]
    MissingTag { len: usize },
    #[error("authentication tag mismatch")]
    AuthenticationFailed,
    #[error("packet was decrypted but data is invalid")]
    InvalidPlaintext,
}

/// Authenticated decryption of general-glo-ciphering payloads under one key.
pub struct Decryptor {
    cipher: DlmsAesGcm,
}

impl Decryptor {
    pub fn new(key: &DecryptionKey) -> Self {
        Self { cipher: DlmsAesGcm::new(Key::<Aes128>::from_slice(key.as_bytes())) }
    }

    /// Verifies and decrypts the APDU payload. Nothing is returned unless the tag
    /// matches.
    pub fn decrypt(&self, apdu: &GeneralGloCiphering<'_>) -> Result<Vec<u8>, DecryptError> {
        let payload = apdu.payload();
        let Some(ciphertext_len) = payload.len().checked_sub(GCM_TAG_LENGTH) else {
            return Err(DecryptError::MissingTag { len: payload.len() });
        };
        let (ciphertext, tag) = payload.split_at(ciphertext_len);

        let header = apdu.header();
        if !header.security_control.authentication() {
            debug!(
                "security byte {:#04x} does not announce a tag, verifying the trailing {} bytes anyway",
                header.security_control.byte(),
                GCM_TAG_LENGTH
            );
        }

        let iv = header.iv();
        let mut plaintext = ciphertext.to_vec();

        self.cipher
            .decrypt_in_place_detached(
                Nonce::<U12>::from_slice(&iv),
                &[],
                &mut plaintext,
                Tag::<U12>::from_slice(tag),
            )
            .map_err(|_| DecryptError::AuthenticationFailed)?;

        debug!("decrypted payload: {} byte(s)", plaintext.len());

        Ok(plaintext)
    }
}

impl core::fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Decryptor").finish_non_exhaustive()
    }
}

/// Encrypts `plaintext` the way a meter does, appending the truncated tag.
#[cfg(test)]
pub(crate) fn encrypt(key: &DecryptionKey, iv: &[u8; 12], plaintext: &[u8]) -> Vec<u8> {
    let cipher = DlmsAesGcm::new(Key::<Aes128>::from_slice(key.as_bytes()));
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U12>::from_slice(iv), &[], &mut buffer)
        .unwrap();
    buffer.extend_from_slice(&tag);
    buffer
}
