use log::debug;

use crate::{DecryptError, reader::ByteReader};

/// xDLMS data-notification APDU tag.
pub const DATA_NOTIFICATION_TAG: u8 = 0x0F;
/// Length of the date-time octet string in the notification header.
pub const DATE_TIME_LENGTH: u8 = 0x0C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongInvokeIdAndPriority(pub(crate) u32);

impl LongInvokeIdAndPriority {
    pub fn invoke_id(&self) -> u32 {
        self.0 & 0x00ffffff
    }
}

/// Envelope of a decrypted push telegram: tag, long-invoke-id and the
/// length-prefixed date-time that precedes the notification body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataNotificationHeader {
    pub long_invoke_id_and_priority: LongInvokeIdAndPriority,
    pub date_time: [u8; DATE_TIME_LENGTH as usize],
}

impl DataNotificationHeader {
    /// Checks that authenticated plaintext is actually a data notification for
    /// this meter's encoding.
    pub fn parse(plaintext: &[u8]) -> Result<Self, DecryptError> {
        let mut reader = ByteReader::new(plaintext);

        let tag = reader.read_u8().map_err(|_| DecryptError::InvalidPlaintext)?;
        let long_invoke_id_and_priority =
            reader.read_u32_be().map(LongInvokeIdAndPriority).map_err(|_| DecryptError::InvalidPlaintext)?;
        let date_time_length = reader.read_u8().map_err(|_| DecryptError::InvalidPlaintext)?;

        if tag != DATA_NOTIFICATION_TAG || date_time_length != DATE_TIME_LENGTH {
            debug!("unexpected plaintext start: tag {:#04x}, date-time length {:#04x}", tag, date_time_length);
            return Err(DecryptError::InvalidPlaintext);
        }

        let date_time = reader.read_array().map_err(|_| DecryptError::InvalidPlaintext)?;

        Ok(Self { long_invoke_id_and_priority, date_time })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const HEADER: [u8; 18] = [
        0x0F,                   // Data notification
        0x80, 0x01, 0x02, 0x03, // Long-invoke-id-and-priority
        0x0C,                   // Date-time length
        0x07, 0xE7, 0x06, 0x0F, 0x04, 0x0C, 0x1E, 0x00, 0x00, 0x80, 0x00, 0x00,
    ];

    #[test]
    fn test_parse() {
        let header = DataNotificationHeader::parse(&HEADER).unwrap();

        assert_eq!(header.long_invoke_id_and_priority.invoke_id(), 0x010203);
        assert_eq!(header.date_time[..2], [0x07, 0xE7]);
    }

    #[test]
    fn test_wrong_tag() {
        let mut plaintext = HEADER;
        plaintext[0] = 0x02;
        assert_eq!(DataNotificationHeader::parse(&plaintext), Err(DecryptError::InvalidPlaintext));
    }

    #[test]
    fn test_wrong_date_time_length() {
        let mut plaintext = HEADER;
        plaintext[5] = 0x00;
        assert_eq!(DataNotificationHeader::parse(&plaintext), Err(DecryptError::InvalidPlaintext));
    }

    #[test]
    fn test_truncated() {
        assert_eq!(DataNotificationHeader::parse(&HEADER[..4]), Err(DecryptError::InvalidPlaintext));
        assert_eq!(DataNotificationHeader::parse(&HEADER[..10]), Err(DecryptError::InvalidPlaintext));
        assert_eq!(DataNotificationHeader::parse(&[]), Err(DecryptError::InvalidPlaintext));
    }
}
