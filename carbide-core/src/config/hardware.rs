//! Hardware configuration types
//!
//! Describes the field wiring: sensor scaling, discrete inputs, the blower
//! switch, the two serial transports and the indicator relays.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Blower current switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlowerConfig {
    /// Disable only on a test bench with no blower fitted
    pub enabled: bool,
    /// Minimum time between samples of the switch (ms)
    pub check_interval_ms: u32,
}

impl Default for BlowerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_ms: 500,
        }
    }
}

/// Discrete input debouncing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InputConfig {
    /// Time a button must be stable before it counts (ms)
    pub debounce_ms: u32,
    /// Time the emergency stop must read released before it counts (ms)
    ///
    /// Activation is never delayed.
    pub estop_release_ms: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            estop_release_ms: 200,
        }
    }
}

/// Serial transports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProtocolConfig {
    /// Enable the RS-485 control transport
    pub rs485_enabled: bool,
    /// RS-485 baud rate
    pub rs485_baudrate: u32,
    /// Enable the read-only telemetry transport
    pub telemetry_enabled: bool,
    /// Telemetry link baud rate
    pub telemetry_baudrate: u32,
    /// Age after which a partial command line is dropped (ms)
    pub fragment_timeout_ms: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            rs485_enabled: true,
            rs485_baudrate: 9600,
            telemetry_enabled: true,
            telemetry_baudrate: 115_200,
            fragment_timeout_ms: 2000,
        }
    }
}

/// Indicator relay behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IndicatorConfig {
    /// Temperature at which the threshold relay closes (°F)
    pub threshold_f: f32,
    /// Drop below the threshold before the relay opens again (°F)
    pub threshold_hysteresis_f: f32,
    /// Output above which the heating relay closes (mA)
    pub heating_threshold_ma: f32,
    /// Error relay blinks per burst
    pub blink_count: u8,
    /// Error relay on/off time (ms)
    pub blink_interval_ms: u32,
    /// Pause between bursts (ms)
    pub blink_rest_ms: u32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            threshold_f: 140.0,
            threshold_hysteresis_f: 5.0,
            heating_threshold_ma: 6.0,
            blink_count: 5,
            blink_interval_ms: 500,
            blink_rest_ms: 1000,
        }
    }
}

/// Analog loop input scaling
///
/// Both temperature channels and the current transducer are 4-20 mA
/// transmitters read across a shunt resistor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    /// Shunt resistor across which loop current is measured (Ω)
    pub shunt_ohms: f32,
    /// Element temperature at 4 mA (°F)
    pub temperature_min_f: f32,
    /// Element temperature at 20 mA (°F)
    pub temperature_max_f: f32,
    /// Blower outlet temperature at 4 mA (°F)
    pub secondary_min_f: f32,
    /// Blower outlet temperature at 20 mA (°F)
    pub secondary_max_f: f32,
    /// Heater current at 20 mA (A)
    pub current_full_scale_a: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            shunt_ohms: 150.0,
            temperature_min_f: 0.0,
            temperature_max_f: 2500.0,
            secondary_min_f: 0.0,
            secondary_max_f: 500.0,
            current_full_scale_a: 100.0,
        }
    }
}
