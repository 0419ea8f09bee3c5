use core::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reader::ByteReader;

/// Vendor-specific telegram layout.
///
/// Selected once per meter; every decode stage that deviates from the generic
/// layout asks the profile instead of branching on the vendor itself.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderProfile {
    /// Standard general-glo-ciphering length encoding.
    #[default]
    Generic,
    /// EVN / Netz Niederösterreich meters.
    #[cfg_attr(feature = "serde", serde(alias = "evn"))]
    NetzNoe,
}

/// The length field at the current reader position did not match the encoding
/// expected by the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnrecognizedLength;

impl ProviderProfile {
    /// Resolves the raw DLMS length field, returning the declared length and the
    /// number of extra header bytes it occupies.
    pub(crate) fn resolve_length(
        self,
        reader: &mut ByteReader<'_>,
    ) -> Result<(usize, usize), UnrecognizedLength> {
        let raw = reader.read_u8().map_err(|_| UnrecognizedLength)?;

        match self {
            Self::Generic if raw == 0x82 => {
                let length = reader.read_u16_be().map_err(|_| UnrecognizedLength)?;
                Ok((usize::from(length), 2))
            }
            Self::Generic => Ok((usize::from(raw), 0)),
            Self::NetzNoe => {
                // EVN puts 0x81 into the length field with the real length in the next
                // byte, directly followed by security control 0x20.
                let marker = (reader.peek(), reader.byte_at(reader.position() + 1));
                if raw == 0x81 && marker == (Some(0xF8), Some(0x20)) {
                    let length = reader.read_u8().map_err(|_| UnrecognizedLength)?;
                    Ok((usize::from(length), 1))
                } else {
                    Err(UnrecognizedLength)
                }
            }
        }
    }

    /// Leading timestamp and meter number are sent without an OBIS code.
    pub fn has_headerless_records(self) -> bool {
        matches!(self, Self::NetzNoe)
    }

    pub fn has_power_factor(self) -> bool {
        matches!(self, Self::NetzNoe)
    }

    /// Bytes to skip when a record is followed by an additional-data marker.
    pub fn additional_data_length(self) -> usize {
        match self {
            Self::Generic => 6,
            // Three bytes of scaler/unit plus the marker itself, without a break.
            Self::NetzNoe => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::NetzNoe => "netznoe",
        }
    }
}

impl fmt::Display for ProviderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown meter provider {0:?}")]
pub struct UnknownProvider(pub alloc::string::String);

impl FromStr for ProviderProfile {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let matches_any = |names: &[&str]| names.iter().any(|n| n.eq_ignore_ascii_case(name));

        if name.is_empty() || matches_any(&["generic"]) {
            Ok(Self::Generic)
        } else if matches_any(&["netznoe", "netz_noe", "evn"]) {
            Ok(Self::NetzNoe)
        } else {
            Err(UnknownProvider(s.into()))
        }
    }
}
