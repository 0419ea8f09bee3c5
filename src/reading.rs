use alloc::string::String;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Measurements decoded from one telegram.
///
/// A field is `None` when the telegram did not carry the corresponding OBIS code.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterReading {
    /// Voltage L1 in V.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub voltage_l1: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub voltage_l2: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub voltage_l3: Option<f64>,
    /// Current L1 in A.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub current_l1: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub current_l2: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub current_l3: Option<f64>,
    /// Active power taken from the grid, in W.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub active_power_plus: Option<f64>,
    /// Active power fed into the grid, in W.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub active_power_minus: Option<f64>,
    /// Active energy taken from the grid, in Wh.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub active_energy_plus: Option<f64>,
    /// Active energy fed into the grid, in Wh.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub active_energy_minus: Option<f64>,
    /// Reactive energy taken from the grid, in varh.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub reactive_energy_plus: Option<f64>,
    /// Reactive energy fed into the grid, in varh.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub reactive_energy_minus: Option<f64>,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub timestamp: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub serial_number: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub device_name: Option<String>,

    // EVN
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub power_factor: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub meter_number: Option<String>,
}

impl MeterReading {
    /// `true` if no field was decoded.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
