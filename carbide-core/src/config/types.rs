//! Control configuration type definitions
//!
//! Setpoints, gains and limits used by the control sequence. Temperatures
//! are degrees Fahrenheit, currents amperes, loop signals milliamps.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::hardware::{
    BlowerConfig, IndicatorConfig, InputConfig, ProtocolConfig, SensorConfig,
};

/// Control loop timing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControlConfig {
    /// Control cycle period (ms)
    pub cycle_ms: u32,
    /// Output decrement per cycle while shutting down (mA)
    pub ramp_step_ma: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cycle_ms: 100,
            ramp_step_ma: 0.5,
        }
    }
}

/// Heating phase setpoints
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SetpointConfig {
    /// WARM_UP target (°F)
    pub warm_up_f: f32,
    /// FULL_TEMP target (°F)
    pub full_temp_f: f32,
    /// Band below the setpoint the temperature must leave before the
    /// setpoint counts as reached again (°F)
    pub hysteresis_f: f32,
}

impl Default for SetpointConfig {
    fn default() -> Self {
        Self {
            warm_up_f: 100.0,
            full_temp_f: 150.0,
            hysteresis_f: 5.0,
        }
    }
}

/// PID regulator gains and timing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PidConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Minimum time between recomputations (ms)
    pub sample_ms: u32,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 0.1,
            kd: 0.5,
            sample_ms: 500,
        }
    }
}

/// Physical range of the actuator loop signal
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OutputRange {
    /// Safe low bound (mA), SCR off
    pub low_ma: f32,
    /// High bound (mA), SCR full on
    pub high_ma: f32,
}

impl Default for OutputRange {
    fn default() -> Self {
        Self {
            low_ma: 4.0,
            high_ma: 20.0,
        }
    }
}

impl OutputRange {
    /// Clamp a request into range
    ///
    /// Non-finite requests map to the low bound.
    pub fn clamp(&self, ma: f32) -> f32 {
        if ma.is_finite() {
            ma.clamp(self.low_ma, self.high_ma)
        } else {
            self.low_ma
        }
    }

    /// Width of the range (mA)
    pub fn span(&self) -> f32 {
        self.high_ma - self.low_ma
    }

    /// Convert 0-100 % of span to mA
    pub fn percent_to_ma(&self, percent: f32) -> f32 {
        self.clamp(self.low_ma + self.span() * percent / 100.0)
    }

    /// Convert mA to 0-100 % of span
    pub fn ma_to_percent(&self, ma: f32) -> f32 {
        (self.clamp(ma) - self.low_ma) * 100.0 / self.span()
    }
}

/// Safety evaluator thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SafetyLimits {
    /// Lowest physically plausible element temperature (°F)
    pub temp_min_f: f32,
    /// Highest permitted element temperature (°F)
    pub temp_max_f: f32,
    /// Heater current trip point (A)
    pub overcurrent_a: f32,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            temp_min_f: -40.0,
            temp_max_f: 2500.0,
            overcurrent_a: 80.0,
        }
    }
}

/// Telemetry stream cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TelemetryConfig {
    /// Time between CSV records (ms)
    pub interval_ms: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Output low bound not below high bound
    OutputRange,
    /// Zero sample interval or cycle period
    Timing,
    /// Setpoints out of order or outside the temperature limits
    Setpoints,
    /// Temperature limits inverted or overcurrent not positive
    Limits,
    /// Shutdown ramp step not positive
    RampStep,
}

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    pub control: ControlConfig,
    pub setpoints: SetpointConfig,
    pub pid: PidConfig,
    pub output: OutputRange,
    pub safety: SafetyLimits,
    pub blower: BlowerConfig,
    pub input: InputConfig,
    pub protocol: ProtocolConfig,
    pub telemetry: TelemetryConfig,
    pub indicators: IndicatorConfig,
    pub sensors: SensorConfig,
}

impl ControllerConfig {
    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.output.low_ma < self.output.high_ma) {
            return Err(ConfigError::OutputRange);
        }
        if self.pid.sample_ms == 0 || self.control.cycle_ms == 0 {
            return Err(ConfigError::Timing);
        }
        if !(self.safety.temp_min_f < self.safety.temp_max_f) || !(self.safety.overcurrent_a > 0.0)
        {
            return Err(ConfigError::Limits);
        }
        let sp = &self.setpoints;
        let within = |t: f32| t > self.safety.temp_min_f && t < self.safety.temp_max_f;
        if !(sp.warm_up_f < sp.full_temp_f)
            || !within(sp.warm_up_f)
            || !within(sp.full_temp_f)
            || !(sp.hysteresis_f >= 0.0)
        {
            return Err(ConfigError::Setpoints);
        }
        if !(self.control.ramp_step_ma > 0.0) {
            return Err(ConfigError::RampStep);
        }
        Ok(())
    }
}
