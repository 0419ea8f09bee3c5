use log::debug;
use thiserror::Error;

use crate::{
    ProviderProfile, SecurityControl,
    reader::{ByteReader, OutOfBounds},
};

/// general-glo-ciphering APDU tag.
pub const GENERAL_GLO_CIPHERING_TAG: u8 = 0xDB;
pub const SYSTEM_TITLE_LENGTH: usize = 8;
pub const FRAME_COUNTER_LENGTH: usize = 4;

/// Shortest ciphertext that is even considered.
pub const MIN_TELEGRAM_LENGTH: usize = 20;
/// Bytes in front of the ciphertext when the length field is a single byte.
pub const HEADER_LENGTH: usize = 16;
/// The length field also counts the security control byte and the frame counter.
pub const LENGTH_CORRECTION: usize = 1 + FRAME_COUNTER_LENGTH;

const LENGTH_OFFSET: usize = 10;
const SECURITY_CONTROL_OFFSET: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("payload too short: {len} byte(s)")]
    TooShort { len: usize },
    #[error("unsupported cipher {0:#04x}, only general-glo-ciphering is supported")]
    UnsupportedCipher(u8),
    #[error("unsupported system title length {0}")]
    UnsupportedTitleLength(u8),
    #[error("length field not recognized for provider {0}")]
    MalformedLength(ProviderProfile),
    #[error("message length {declared} does not match the {actual} byte(s) received")]
    LengthInconsistent { declared: usize, actual: usize },
    #[error("unsupported security control byte {0:#04x}")]
    UnsupportedSecurityByte(u8),
}

impl From<OutOfBounds> for HeaderError {
    fn from(err: OutOfBounds) -> Self {
        Self::TooShort { len: err.len }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecureHeader {
    pub system_title: [u8; SYSTEM_TITLE_LENGTH],
    pub frame_counter: u32,
    /// Bytes of ciphertext and authentication tag following the header.
    pub message_length: usize,
    /// Extra header bytes taken by a multi-byte length field.
    pub header_offset: usize,
    pub security_control: SecurityControl,
}

impl SecureHeader {
    /// GCM initialization vector: system title followed by the frame counter.
    pub fn iv(&self) -> [u8; 12] {
        let mut iv = [0u8; 12];
        iv[..SYSTEM_TITLE_LENGTH].copy_from_slice(&self.system_title);
        iv[SYSTEM_TITLE_LENGTH..].copy_from_slice(&self.frame_counter.to_be_bytes());
        iv
    }
}

/// A general-glo-ciphering APDU as pushed by the meter, borrowing its encrypted
/// payload from the reassembled telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralGloCiphering<'a> {
    header: SecureHeader,
    payload: &'a [u8],
}

impl<'a> GeneralGloCiphering<'a> {
    pub fn header(&self) -> &SecureHeader {
        &self.header
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn parse(telegram: &'a [u8], profile: ProviderProfile) -> Result<Self, HeaderError> {
        if telegram.len() < MIN_TELEGRAM_LENGTH {
            return Err(HeaderError::TooShort { len: telegram.len() });
        }

        let mut reader = ByteReader::new(telegram);

        let cipher = reader.read_u8()?;
        if cipher != GENERAL_GLO_CIPHERING_TAG {
            return Err(HeaderError::UnsupportedCipher(cipher));
        }

        let system_title_length = reader.read_u8()?;
        if usize::from(system_title_length) != SYSTEM_TITLE_LENGTH {
            return Err(HeaderError::UnsupportedTitleLength(system_title_length));
        }
        let system_title = reader.read_array::<SYSTEM_TITLE_LENGTH>()?;

        debug_assert_eq!(reader.position(), LENGTH_OFFSET);
        let (declared, header_offset) = profile
            .resolve_length(&mut reader)
            .map_err(|_| HeaderError::MalformedLength(profile))?;
        let message_length = declared
            .checked_sub(LENGTH_CORRECTION)
            .ok_or(HeaderError::MalformedLength(profile))?;

        let actual = telegram.len() - HEADER_LENGTH - header_offset;
        if actual != message_length {
            debug!(
                "lengths: {}, {}, {}, {}",
                telegram.len(),
                HEADER_LENGTH,
                header_offset,
                message_length
            );
            return Err(HeaderError::LengthInconsistent { declared: message_length, actual });
        }

        reader.seek(SECURITY_CONTROL_OFFSET + header_offset);
        let security_control = SecurityControl::new(reader.read_u8()?);
        if !security_control.is_supported() {
            return Err(HeaderError::UnsupportedSecurityByte(security_control.byte()));
        }

        let frame_counter = reader.read_u32_be()?;
        let payload = reader.read_bytes(message_length)?;

        debug!(
            "general-glo-ciphering: message length {} (header offset {}), frame counter {}, {:?}",
            message_length, header_offset, frame_counter, security_control
        );

        Ok(Self {
            header: SecureHeader {
                system_title,
                frame_counter,
                message_length,
                header_offset,
                security_control,
            },
            payload,
        })
    }
}
