use core::fmt::{self, Debug, Display};

use derive_try_from_primitive::TryFromPrimitive;
use log::warn;
use nom::{IResult, Parser, number::complete::u8};

use crate::ProviderProfile;

/// An OBIS code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObisCode {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
}

impl ObisCode {
    pub fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, (a, b, c, d, e, f)) = (u8, u8, u8, u8, u8, u8).parse(input)?;
        Ok((input, Self::new(a, b, c, d, e, f)))
    }
}

impl Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}:{}.{}.{}*{}", self.a, self.b, self.c, self.d, self.e, self.f)
    }
}

impl Debug for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ObisCode({})", self)
    }
}

/// Value group A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Medium {
  Abstract    = 0x00,
  Electricity = 0x01,
  Heat        = 0x06,
  Gas         = 0x07,
  Water       = 0x08,
}

/// The quantity a record carries, as far as the reading is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObisKind {
    Timestamp,
    SerialNumber,
    DeviceName,
    VoltageL1,
    VoltageL2,
    VoltageL3,
    CurrentL1,
    CurrentL2,
    CurrentL3,
    ActivePowerPlus,
    ActivePowerMinus,
    ActiveEnergyPlus,
    ActiveEnergyMinus,
    ReactiveEnergyPlus,
    ReactiveEnergyMinus,
    PowerFactor,
    MeterNumber,
    Unknown,
}

/// Value groups C and D of electricity codes.
#[rustfmt::skip]
const ELECTRICITY: &[([u8; 2], ObisKind)] = &[
    ([0x20, 0x07], ObisKind::VoltageL1),
    ([0x34, 0x07], ObisKind::VoltageL2),
    ([0x48, 0x07], ObisKind::VoltageL3),
    ([0x1F, 0x07], ObisKind::CurrentL1),
    ([0x33, 0x07], ObisKind::CurrentL2),
    ([0x47, 0x07], ObisKind::CurrentL3),
    ([0x01, 0x07], ObisKind::ActivePowerPlus),
    ([0x02, 0x07], ObisKind::ActivePowerMinus),
    ([0x01, 0x08], ObisKind::ActiveEnergyPlus),
    ([0x02, 0x08], ObisKind::ActiveEnergyMinus),
    ([0x03, 0x08], ObisKind::ReactiveEnergyPlus),
    ([0x04, 0x08], ObisKind::ReactiveEnergyMinus),
];

const POWER_FACTOR: [u8; 2] = [0x0D, 0x07];

/// Value groups C and D of abstract codes.
#[rustfmt::skip]
const ABSTRACT: &[([u8; 2], ObisKind)] = &[
    ([0x01, 0x00], ObisKind::Timestamp),
    ([0x60, 0x01], ObisKind::SerialNumber),
    ([0x2A, 0x00], ObisKind::DeviceName),
];

fn lookup(table: &[([u8; 2], ObisKind)], cd: [u8; 2]) -> Option<ObisKind> {
    table.iter().find(|(code, _)| *code == cd).map(|&(_, kind)| kind)
}

impl ObisKind {
    /// Classifies a code by medium and quantity.
    ///
    /// Media other than abstract and electricity are rejected with the raw group A
    /// byte; unknown quantities map to [`ObisKind::Unknown`].
    pub fn classify(code: &ObisCode, profile: ProviderProfile) -> Result<Self, u8> {
        let cd = [code.c, code.d];

        let kind = match Medium::try_from(code.a)? {
            Medium::Electricity if profile.has_power_factor() && cd == POWER_FACTOR => {
                Some(ObisKind::PowerFactor)
            }
            Medium::Electricity => lookup(ELECTRICITY, cd),
            Medium::Abstract => lookup(ABSTRACT, cd),
            Medium::Heat | Medium::Gas | Medium::Water => return Err(code.a),
        };

        Ok(kind.unwrap_or_else(|| {
            warn!("unsupported OBIS code {}", code);
            ObisKind::Unknown
        }))
    }
}
