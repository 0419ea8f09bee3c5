//! Decoding of the OBIS records in a decrypted data notification.
//!
//! The notification body is a flat sequence of records,
//! `09 <6|12> <code> <type> <value> <break:2>`, optionally followed by an
//! additional-data block introduced by `0x0F`. Records are walked with fixed skips
//! rather than by parsing the full COSEM structure.

use alloc::string::{String, ToString};

use log::{debug, trace};
use thiserror::Error;

use crate::{
    MeterReading, ObisCode, ObisKind, ProviderProfile,
    data::{Accuracy, DataType, Timestamp},
    reader::{ByteReader, OutOfBounds},
};

/// First record: 18 byte notification header plus the outer structure header.
pub const DECODER_START_OFFSET: usize = 20;

const OBIS_CODE_LENGTH: u8 = 0x06;
const TIMESTAMP_CODE_LENGTH: u8 = 0x0C;
const BREAK_LENGTH: usize = 2;
const ADDITIONAL_DATA_MARKER: u8 = 0x0F;
/// The scaler of a `long-unsigned` value sits this many bytes after the value.
const SCALER_OFFSET: usize = 5;
const METER_NUMBER_MARKER: u8 = 0xFF;
const METER_NUMBER_LENGTH: usize = 12;
const POWER_FACTOR_DIVISOR: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported OBIS header type {0:#04x}")]
    UnexpectedType(u8),
    #[error("unsupported OBIS header length {0:#04x}")]
    UnexpectedCodeLength(u8),
    #[error("unsupported OBIS medium {0:#04x}")]
    UnsupportedMedium(u8),
    #[error("unsupported OBIS data type {0:#04x}")]
    UnsupportedDataType(u8),
    #[error("timestamp of {0} byte(s) is too short")]
    InvalidTimestamp(usize),
    #[error("record truncated: {0}")]
    Truncated(#[from] OutOfBounds),
}

/// Records that NetzNoe meters send without an OBIS code in front of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Headerless {
    LeadingTimestamp,
    MeterNumber,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value<'a> {
    DoubleLongUnsigned(u32),
    LongUnsigned { raw: u16, accuracy: Accuracy },
    OctetString(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObisDecoder {
    profile: ProviderProfile,
}

impl ObisDecoder {
    pub fn new(profile: ProviderProfile) -> Self {
        Self { profile }
    }

    /// Decodes every record of `plaintext` into a reading.
    ///
    /// Decoding ends once the cursor leaves the plaintext, which the skip after the
    /// last record normally does. A plaintext that ends inside the notification
    /// header is truncated. Any error discards the whole reading.
    pub fn decode(&self, plaintext: &[u8]) -> Result<MeterReading, DecodeError> {
        if plaintext.len() < DECODER_START_OFFSET {
            return Err(DecodeError::Truncated(OutOfBounds {
                offset: 0,
                wanted: DECODER_START_OFFSET,
                len: plaintext.len(),
            }));
        }

        let mut reader = ByteReader::new(plaintext);
        let mut reading = MeterReading::default();

        reader.seek(DECODER_START_OFFSET);
        while reader.has_remaining() {
            self.decode_record(&mut reader, &mut reading)?;
        }

        Ok(reading)
    }

    fn decode_record(
        &self,
        reader: &mut ByteReader<'_>,
        reading: &mut MeterReading,
    ) -> Result<(), DecodeError> {
        let record_start = reader.position();

        let header_type = reader.read_u8()?;
        if header_type != DataType::OctetString as u8 {
            return Err(DecodeError::UnexpectedType(header_type));
        }

        let code_length = reader.read_u8()?;
        if code_length != OBIS_CODE_LENGTH && code_length != TIMESTAMP_CODE_LENGTH {
            return Err(DecodeError::UnexpectedCodeLength(code_length));
        }
        let code = reader.read_bytes(usize::from(code_length))?;

        let headerless = self.headerless(reader, record_start, code_length);
        let kind = match headerless {
            Some(Headerless::LeadingTimestamp) => ObisKind::Timestamp,
            Some(Headerless::MeterNumber) => ObisKind::MeterNumber,
            None => {
                let (_, obis_code) =
                    ObisCode::parse(code).map_err(|_| DecodeError::UnexpectedCodeLength(code_length))?;
                ObisKind::classify(&obis_code, self.profile).map_err(DecodeError::UnsupportedMedium)?
            }
        };

        if let Some(headerless) = headerless {
            // The value starts right at the record, its octet-string tag doubling as
            // the data type.
            trace!("found {:?} without OBIS medium at {}", headerless, record_start);
            reader.seek(record_start);
        }

        let data_type = reader.read_u8()?;
        let value = match DataType::try_from(data_type) {
            Ok(DataType::DoubleLongUnsigned) => Value::DoubleLongUnsigned(reader.read_u32_be()?),
            Ok(DataType::LongUnsigned) => {
                let value_start = reader.position();
                let raw = reader.read_u16_be()?;
                let accuracy = Accuracy::from_scaler(reader.byte_at(value_start + SCALER_OFFSET));
                Value::LongUnsigned { raw, accuracy }
            }
            Ok(DataType::OctetString) => {
                let length = reader.read_u8()?;
                Value::OctetString(reader.read_bytes(usize::from(length))?)
            }
            _ => return Err(DecodeError::UnsupportedDataType(data_type)),
        };

        trace!("record at {}: {:?} = {:?}", record_start, kind, value);
        store(reading, kind, value)?;

        if headerless != Some(Headerless::LeadingTimestamp) {
            reader.advance(BREAK_LENGTH);
        }

        // May run past the end on the last record, which ends decoding.
        if reader.peek() == Some(ADDITIONAL_DATA_MARKER) {
            reader.advance(self.profile.additional_data_length());
        }

        Ok(())
    }

    fn headerless(
        &self,
        reader: &ByteReader<'_>,
        record_start: usize,
        code_length: u8,
    ) -> Option<Headerless> {
        if !self.profile.has_headerless_records() {
            return None;
        }

        if record_start == DECODER_START_OFFSET {
            (code_length == TIMESTAMP_CODE_LENGTH).then_some(Headerless::LeadingTimestamp)
        } else if reader.byte_at(record_start - 1) == Some(METER_NUMBER_MARKER) {
            Some(Headerless::MeterNumber)
        } else {
            None
        }
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
}

fn store(reading: &mut MeterReading, kind: ObisKind, value: Value<'_>) -> Result<(), DecodeError> {
    match (kind, value) {
        // Already reported by the classification.
        (ObisKind::Unknown, _) => {}
        (ObisKind::Timestamp, Value::OctetString(bytes)) => {
            let (_, timestamp) =
                Timestamp::parse(bytes).map_err(|_| DecodeError::InvalidTimestamp(bytes.len()))?;
            reading.timestamp = Some(timestamp.to_string());
        }
        (ObisKind::MeterNumber, Value::OctetString(bytes)) => {
            reading.meter_number = Some(text(&bytes[..bytes.len().min(METER_NUMBER_LENGTH)]));
        }
        (ObisKind::SerialNumber, Value::OctetString(bytes)) => reading.serial_number = Some(text(bytes)),
        (ObisKind::DeviceName, Value::OctetString(bytes)) => reading.device_name = Some(text(bytes)),
        (ObisKind::PowerFactor, Value::LongUnsigned { raw, accuracy }) => {
            reading.power_factor = Some(accuracy.apply(raw) / POWER_FACTOR_DIVISOR);
        }
        (kind, Value::LongUnsigned { raw, accuracy }) => match instantaneous(reading, kind) {
            Some(field) => *field = Some(accuracy.apply(raw)),
            None => ignore(kind, value),
        },
        (kind, Value::DoubleLongUnsigned(raw)) => match counter(reading, kind) {
            Some(field) => *field = Some(f64::from(raw)),
            None => ignore(kind, value),
        },
        (kind, value) => ignore(kind, value),
    }

    Ok(())
}

/// Voltages and currents, sent as scaled `long-unsigned`.
fn instantaneous(reading: &mut MeterReading, kind: ObisKind) -> Option<&mut Option<f64>> {
    match kind {
        ObisKind::VoltageL1 => Some(&mut reading.voltage_l1),
        ObisKind::VoltageL2 => Some(&mut reading.voltage_l2),
        ObisKind::VoltageL3 => Some(&mut reading.voltage_l3),
        ObisKind::CurrentL1 => Some(&mut reading.current_l1),
        ObisKind::CurrentL2 => Some(&mut reading.current_l2),
        ObisKind::CurrentL3 => Some(&mut reading.current_l3),
        _ => None,
    }
}

/// Powers and energy registers, sent as `double-long-unsigned`.
fn counter(reading: &mut MeterReading, kind: ObisKind) -> Option<&mut Option<f64>> {
    match kind {
        ObisKind::ActivePowerPlus => Some(&mut reading.active_power_plus),
        ObisKind::ActivePowerMinus => Some(&mut reading.active_power_minus),
        ObisKind::ActiveEnergyPlus => Some(&mut reading.active_energy_plus),
        ObisKind::ActiveEnergyMinus => Some(&mut reading.active_energy_minus),
        ObisKind::ReactiveEnergyPlus => Some(&mut reading.reactive_energy_plus),
        ObisKind::ReactiveEnergyMinus => Some(&mut reading.reactive_energy_minus),
        _ => None,
    }
}

fn ignore(kind: ObisKind, value: Value<'_>) {
    debug!("ignoring {:?} value of {:?}", value, kind);
}
