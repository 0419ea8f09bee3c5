use core::fmt;

use derive_try_from_primitive::TryFromPrimitive;
use nom::{
    IResult, Parser,
    number::complete::{be_u16, u8},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
#[non_exhaustive]
#[rustfmt::skip]
pub enum DataType {
  Null               =  0,
  Array              =  1,
  Structure          =  2,
  Bool               =  3,
  BitString          =  4,
  DoubleLong         =  5,
  DoubleLongUnsigned =  6,
  OctetString        =  9,
  VisibleString      = 10,
  Utf8String         = 12,
  BinaryCodedDecimal = 13,
  Integer            = 15,
  Long               = 16,
  Unsigned           = 17,
  LongUnsigned       = 18,
  CompactArray       = 19,
  Long64             = 20,
  Long64Unsigned     = 21,
  Enum               = 22,
  Float32            = 23,
  Float64            = 24,
  DateTime           = 25,
  Date               = 26,
  Time               = 27,
}

/// Decimal places announced by the scaler that follows a `long-unsigned` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    SingleDigit,
    DoubleDigit,
    None,
}

impl Accuracy {
    pub fn from_scaler(scaler: Option<u8>) -> Self {
        match scaler {
            Some(0xFF) => Self::SingleDigit,
            Some(0xFE) => Self::DoubleDigit,
            _ => Self::None,
        }
    }

    pub fn apply(self, raw: u16) -> f64 {
        let raw = f64::from(raw);
        match self {
            Self::SingleDigit => raw / 10.0,
            Self::DoubleDigit => raw / 100.0,
            Self::None => raw,
        }
    }
}

/// Date and time of a COSEM octet-string timestamp.
///
/// Only the calendar fields are kept; hundredths, deviation and clock status
/// that may follow are not part of the reading.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    pub const ENCODED_LENGTH: usize = 8;

    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, year) = be_u16(input)?;
        let (input, (month, day, day_of_week, hour, minute, second)) =
            (u8, u8, u8, u8, u8, u8).parse(input)?;

        Ok((input, Self { year, month, day, day_of_week, hour, minute, second }))
    }

    /// Calendar-checked conversion; meters may send 0xFF for unspecified fields.
    #[cfg(feature = "chrono")]
    pub fn to_naive_date_time(&self) -> Option<chrono::NaiveDateTime> {
        chrono::NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))?
            .and_hms_opt(u32::from(self.hour), u32::from(self.minute), u32::from(self.second))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp(\"{}\")", self)
    }
}
