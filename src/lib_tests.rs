//! Telegram builders shared by the module tests, and end-to-end tests of the whole
//! decode chain.

use alloc::{vec, vec::Vec};

use crate::{
    DecryptionKey, ProviderProfile,
    decryption::{GCM_TAG_LENGTH, encrypt},
    general_glo_ciphering::{GENERAL_GLO_CIPHERING_TAG, LENGTH_CORRECTION, SYSTEM_TITLE_LENGTH},
    mbus::encode_frames,
};

pub(crate) const KEY: [u8; 16] = [
    0x36, 0xc6, 0x66, 0x39, 0xe4, 0x8a, 0x8c, 0xa4, 0xd6, 0xbc, 0x8b, 0x28, 0x2a, 0x79, 0x3b, 0xbb,
];
pub(crate) const SYSTEM_TITLE: [u8; SYSTEM_TITLE_LENGTH] = *b"KFM\x10\x20\x01\x12\xa9";

/// 2023-06-15 12:30:00, Thursday, no deviation.
pub(crate) const TIMESTAMP: [u8; 12] =
    [0x07, 0xE7, 0x06, 0x0F, 0x04, 0x0C, 0x1E, 0x00, 0x00, 0x80, 0x00, 0x00];

/// NetzNoe meters always announce 0xF8 bytes after the length field.
const NETZNOE_PLAINTEXT_LENGTH: usize = 0xF8 - LENGTH_CORRECTION - GCM_TAG_LENGTH;
const FRAME_PAYLOAD: usize = 245;

/// Data-notification header and outer structure around `records`.
pub(crate) fn notification(records: &[Vec<u8>]) -> Vec<u8> {
    let mut plaintext = vec![0x0F, 0x00, 0x00, 0x00, 0x01, 0x0C];
    plaintext.extend_from_slice(&TIMESTAMP);
    plaintext.extend_from_slice(&[0x02, records.len() as u8]);
    for record in records {
        plaintext.extend_from_slice(record);
    }
    plaintext
}

/// `09 06 <code> <value> <trailer>`, where `value` starts with its type tag.
pub(crate) fn obis_record(code: [u8; 6], value: &[u8], trailer: &[u8]) -> Vec<u8> {
    let mut record = vec![0x09, 0x06];
    record.extend_from_slice(&code);
    record.extend_from_slice(value);
    record.extend_from_slice(trailer);
    record
}

pub(crate) fn timestamp_record(trailer: &[u8]) -> Vec<u8> {
    let mut value = vec![0x09, 0x0C];
    value.extend_from_slice(&TIMESTAMP);
    obis_record([0, 0, 1, 0, 0, 255], &value, trailer)
}

pub(crate) fn netznoe_timestamp_record() -> Vec<u8> {
    let mut record = vec![0x09, 0x0C];
    record.extend_from_slice(&TIMESTAMP);
    record
}

/// Encrypts `plaintext` into a general-glo-ciphering APDU, using the length field
/// encoding of `profile`.
pub(crate) fn build_apdu(
    profile: ProviderProfile,
    key: &DecryptionKey,
    system_title: [u8; SYSTEM_TITLE_LENGTH],
    frame_counter: u32,
    plaintext: &[u8],
) -> Vec<u8> {
    let declared = plaintext.len() + GCM_TAG_LENGTH + LENGTH_CORRECTION;

    let mut apdu = vec![GENERAL_GLO_CIPHERING_TAG, SYSTEM_TITLE_LENGTH as u8];
    apdu.extend_from_slice(&system_title);
    match profile {
        ProviderProfile::NetzNoe => {
            assert_eq!(declared, 0xF8, "NetzNoe plaintext must be {} bytes", NETZNOE_PLAINTEXT_LENGTH);
            apdu.extend_from_slice(&[0x81, declared as u8, 0x20]);
        }
        ProviderProfile::Generic if declared < 0x80 => apdu.extend_from_slice(&[declared as u8, 0x21]),
        ProviderProfile::Generic => {
            apdu.push(0x82);
            apdu.extend_from_slice(&(declared as u16).to_be_bytes());
            apdu.push(0x21);
        }
    }
    apdu.extend_from_slice(&frame_counter.to_be_bytes());

    let mut iv = [0u8; 12];
    iv[..SYSTEM_TITLE_LENGTH].copy_from_slice(&system_title);
    iv[SYSTEM_TITLE_LENGTH..].copy_from_slice(&frame_counter.to_be_bytes());
    apdu.extend_from_slice(&encrypt(key, &iv, plaintext));

    apdu
}

/// Timestamp and active energy +A of 12345678 Wh.
pub(crate) fn generic_plaintext() -> Vec<u8> {
    notification(&[
        timestamp_record(&[0x02, 0x02]),
        obis_record(
            [1, 0, 1, 8, 0, 255],
            &[0x06, 0x00, 0xBC, 0x61, 0x4E],
            &[0x02, 0x02, 0x0F, 0x00, 0x16, 0x1E],
        ),
    ])
}

/// [`generic_plaintext`] pushed in two M-Bus frames.
pub(crate) fn generic_telegram() -> Vec<u8> {
    let key = DecryptionKey::new(KEY);
    let apdu = build_apdu(ProviderProfile::Generic, &key, SYSTEM_TITLE, 0x0001_E240, &generic_plaintext());
    encode_frames(&apdu, apdu.len().div_ceil(2))
}

/// Leading timestamp, voltage L1 234.7 V, power factor 0.998 and meter number,
/// padded with an unknown record to the fixed NetzNoe length.
pub(crate) fn netznoe_plaintext() -> Vec<u8> {
    let voltage =
        obis_record([1, 0, 32, 7, 0, 255], &[0x12, 0x09, 0x2B], &[0x02, 0x02, 0x0F, 0xFF, 0x16, 0x23]);
    let power_factor =
        obis_record([1, 0, 13, 7, 0, 255], &[0x12, 0x03, 0xE6], &[0x02, 0x02, 0x0F, 0xFD, 0x16, 0xFF]);
    let meter_number = [&[0x09, 0x0C][..], &b"121110284568"[..]].concat();

    let filler_overhead = obis_record([0, 0, 96, 14, 0, 255], &[0x09, 0x00], &[0x02, 0x02]).len();
    let used = notification(&[
        netznoe_timestamp_record(),
        voltage.clone(),
        power_factor.clone(),
        meter_number.clone(),
    ])
    .len();
    let padding = NETZNOE_PLAINTEXT_LENGTH - used - filler_overhead;

    let mut filler_value = vec![0x09, padding as u8];
    filler_value.resize(2 + padding, 0x00);
    let filler = obis_record([0, 0, 96, 14, 0, 255], &filler_value, &[0x02, 0x02]);

    let plaintext =
        notification(&[netznoe_timestamp_record(), voltage, filler, power_factor, meter_number]);
    assert_eq!(plaintext.len(), NETZNOE_PLAINTEXT_LENGTH);
    plaintext
}

pub(crate) fn netznoe_telegram() -> Vec<u8> {
    let key = DecryptionKey::new(KEY);
    let apdu = build_apdu(ProviderProfile::NetzNoe, &key, SYSTEM_TITLE, 0x0000_0042, &netznoe_plaintext());
    encode_frames(&apdu, FRAME_PAYLOAD)
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use crate::{
        DecodeError, DecryptError, DlmsMeter, Error, HeaderError, MeterConfig, MeterReading, mbus,
    };
    use alloc::borrow::ToOwned;

    fn meter(profile: ProviderProfile) -> DlmsMeter {
        DlmsMeter::new(MeterConfig::new(DecryptionKey::new(KEY)).with_profile(profile))
    }

    fn generic_telegram_for(plaintext: &[u8]) -> Vec<u8> {
        let apdu = build_apdu(ProviderProfile::Generic, &DecryptionKey::new(KEY), SYSTEM_TITLE, 1, plaintext);
        encode_frames(&apdu, FRAME_PAYLOAD)
    }

    #[test]
    fn test_generic_two_frame_telegram() {
        let telegram = generic_telegram();

        let (_, next) = mbus::MbusFrame::parse_at(&telegram, 0).unwrap();
        let (_, end) = mbus::MbusFrame::parse_at(&telegram, next).unwrap();
        assert_eq!(end, telegram.len());

        let mut meter = meter(ProviderProfile::Generic);
        meter.feed(&telegram, 0).unwrap();

        assert_eq!(
            meter.process(),
            Ok(Some(MeterReading {
                timestamp: Some("2023-06-15T12:30:00Z".to_owned()),
                active_energy_plus: Some(12_345_678.0),
                ..MeterReading::default()
            }))
        );
        assert_eq!(meter.buffered(), 0);
    }

    #[test]
    fn test_netznoe_telegram() {
        let mut meter = meter(ProviderProfile::NetzNoe);
        assert_eq!(meter.profile(), ProviderProfile::NetzNoe);

        for (i, chunk) in netznoe_telegram().chunks(32).enumerate() {
            meter.feed(chunk, i as u64 * 5).unwrap();
        }
        let reading = meter.poll(10_000).unwrap().unwrap();

        assert_eq!(
            reading,
            MeterReading {
                timestamp: Some("2023-06-15T12:30:00Z".to_owned()),
                voltage_l1: Some(234.7),
                power_factor: Some(0.998),
                meter_number: Some("121110284568".to_owned()),
                ..MeterReading::default()
            }
        );
    }

    #[test]
    fn test_profile_mismatch() {
        let meter = meter(ProviderProfile::NetzNoe);

        assert_eq!(
            meter.decode_telegram(&generic_telegram()),
            Err(Error::Header(HeaderError::MalformedLength(ProviderProfile::NetzNoe)))
        );
    }

    #[test]
    fn test_tampered_telegram_fails_authentication() {
        let mut telegram = generic_telegram();
        // Inside the ciphertext of the first frame; the frame checksum is only logged.
        telegram[40] ^= 0x04;

        let mut meter = meter(ProviderProfile::Generic);
        meter.feed(&telegram, 0).unwrap();

        assert_eq!(meter.process(), Err(Error::Decrypt(DecryptError::AuthenticationFailed)));
        assert_eq!(meter.buffered(), 0);
    }

    #[test]
    fn test_wrong_key() {
        let mut key = KEY;
        key[15] = 0x00;
        let meter = DlmsMeter::new(MeterConfig::new(DecryptionKey::new(key)));

        assert_eq!(
            meter.decode_telegram(&generic_telegram()),
            Err(Error::Decrypt(DecryptError::AuthenticationFailed))
        );
    }

    #[test]
    fn test_invalid_plaintext() {
        let mut plaintext = generic_plaintext();
        plaintext[0] = 0x02;

        assert_eq!(
            meter(ProviderProfile::Generic).decode_telegram(&generic_telegram_for(&plaintext)),
            Err(Error::Decrypt(DecryptError::InvalidPlaintext))
        );
    }

    #[test]
    fn test_header_only_plaintext_is_dropped() {
        // A valid notification header without the outer structure header.
        let plaintext = &notification(&[])[..18];
        let mut meter = meter(ProviderProfile::Generic);
        meter.feed(&generic_telegram_for(plaintext), 0).unwrap();

        assert!(matches!(meter.process(), Err(Error::Decode(DecodeError::Truncated(_)))));
        assert_eq!(meter.buffered(), 0);
    }

    #[test]
    fn test_decode_error_aborts_reading() {
        let plaintext = notification(&[
            timestamp_record(&[0x02, 0x02]),
            obis_record([8, 0, 1, 0, 0, 255], &[0x06, 0x00, 0x00, 0x00, 0x01], &[]),
        ]);

        assert_eq!(
            meter(ProviderProfile::Generic).decode_telegram(&generic_telegram_for(&plaintext)),
            Err(Error::Decode(DecodeError::UnsupportedMedium(8)))
        );
    }

    #[test]
    fn test_large_generic_telegram() {
        // Enough records to need the 0x82 length form and three frames.
        let records: Vec<Vec<u8>> = (0..30)
            .map(|i| obis_record([0, 0, 96, 14, i, 255], &[0x09, 0x04, 1, 2, 3, 4], &[0x02, 0x02]))
            .chain([obis_record([1, 0, 2, 8, 0, 255], &[0x06, 0x00, 0x00, 0x01, 0x00], &[])])
            .collect();
        let plaintext = notification(&records);
        assert!(plaintext.len() > 0x100);

        assert_eq!(
            meter(ProviderProfile::Generic).decode_telegram(&generic_telegram_for(&plaintext)),
            Ok(MeterReading { active_energy_minus: Some(256.0), ..MeterReading::default() })
        );
    }
}
