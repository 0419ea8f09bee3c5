//! Decoder for the encrypted DLMS/COSEM telegrams that smart electricity meters push
//! over their customer interface.
//!
//! A telegram passes four stages:
//!
//! 1. [`mbus::assemble`] joins the payloads of the M-Bus long frames it arrived in.
//! 2. [`GeneralGloCiphering::parse`] reads the security header, including the length
//!    quirks of some grid operators ([`ProviderProfile`]).
//! 3. [`Decryptor`] authenticates and decrypts the payload with AES-128-GCM.
//! 4. [`ObisDecoder`] turns the OBIS records of the data notification into a
//!    [`MeterReading`].
//!
//! [`DlmsMeter`] chains the stages and owns the receive buffer:
//!
//! ```no_run
//! use dlms_meter::{DecryptionKey, DlmsMeter, MeterConfig, ProviderProfile};
//!
//! let key = DecryptionKey::from_hex("36C66639E48A8CA4D6BC8B282A793BBB").unwrap();
//! let mut meter = DlmsMeter::new(MeterConfig::new(key).with_profile(ProviderProfile::NetzNoe));
//!
//! # let received: &[u8] = &[];
//! # let now_ms = 0;
//! meter.feed(received, now_ms).unwrap();
//! if let Ok(Some(reading)) = meter.poll(now_ms) {
//!     println!("{:?} V", reading.voltage_l1);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use thiserror::Error;

mod config;
mod control_information;
mod data;
mod data_notification;
mod decryption;
mod general_glo_ciphering;
pub mod mbus;
mod obis_code;
mod obis_decoder;
mod pipeline;
mod provider;
mod reader;
mod reading;
mod security_control;

pub use crate::config::{
    ConfigError, DEFAULT_MAX_BUFFER_LEN, DEFAULT_READ_TIMEOUT_MS, DecryptionKey, KEY_LENGTH,
    MeterConfig,
};
pub use crate::control_information::{ControlInformation, Direction, HeaderType};
pub use crate::data::{Accuracy, DataType, Timestamp};
pub use crate::data_notification::{DataNotificationHeader, LongInvokeIdAndPriority};
pub use crate::decryption::{DecryptError, Decryptor, GCM_TAG_LENGTH};
pub use crate::general_glo_ciphering::{GeneralGloCiphering, HeaderError, SecureHeader};
pub use crate::mbus::{FramingError, MbusFrame};
pub use crate::obis_code::{Medium, ObisCode, ObisKind};
pub use crate::obis_decoder::{DecodeError, ObisDecoder};
pub use crate::pipeline::DlmsMeter;
pub use crate::provider::{ProviderProfile, UnknownProvider};
pub use crate::reader::OutOfBounds;
pub use crate::reading::MeterReading;
pub use crate::security_control::SecurityControl;

/// Reason a telegram was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("framing: {0}")]
    Framing(#[from] FramingError),
    #[error("header: {0}")]
    Header(#[from] HeaderError),
    #[error("decryption: {0}")]
    Decrypt(#[from] DecryptError),
    #[error("decoding: {0}")]
    Decode(#[from] DecodeError),
    #[error("receive buffer exceeded {limit} byte(s)")]
    BufferOverflow { limit: usize },
}

#[cfg(test)]
mod lib_tests;
