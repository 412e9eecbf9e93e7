//! Telemetry stream records
//!
//! The read-only transport carries one CSV record per line at a fixed
//! cadence. A session starts with [`GREETING`] followed by [`CSV_HEADER`].

use core::fmt;

/// First line sent when a telemetry session starts
pub const GREETING: &str = "CARBIDE SiC Heater Control System - Data Logging Interface";

/// Column header for [`CsvRecord`]
pub const CSV_HEADER: &str =
    "timestamp,state,temperature,secondary_temperature,current,output,airflow_status";

/// Placeholder for a reading that was unavailable this cycle
const MISSING: &str = "ERROR";

/// Seconds with one decimal, from milliseconds
struct Seconds(u64);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 1000, (self.0 % 1000) / 100)
    }
}

/// Optional reading with fixed precision
struct Reading(Option<f32>, usize);

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{:.*}", self.1, value),
            None => f.write_str(MISSING),
        }
    }
}

/// One telemetry line
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CsvRecord {
    /// Milliseconds since boot
    pub timestamp_ms: u64,
    /// State name, or MANUAL_CONTROL
    pub state: &'static str,
    /// Element temperature (°F)
    pub temperature: Option<f32>,
    /// Blower outlet temperature (°F)
    pub secondary_temperature: Option<f32>,
    /// Heater current (A)
    pub current: Option<f32>,
    /// Actuator command (mA)
    pub output_ma: f32,
    /// Blower current detected
    pub airflow_ok: bool,
}

impl fmt::Display for CsvRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{:.2},{}",
            Seconds(self.timestamp_ms),
            self.state,
            Reading(self.temperature, 1),
            Reading(self.secondary_temperature, 1),
            Reading(self.current, 2),
            self.output_ma,
            if self.airflow_ok { "RUNNING" } else { "OFF" },
        )
    }
}

/// Log line emitted after an operator changes the output by hand
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManualActionRecord {
    pub timestamp_ms: u64,
    /// What the operator did, e.g. the OK reply text
    pub action: &'static str,
    pub temperature: Option<f32>,
    pub current: Option<f32>,
    pub output_ma: f32,
}

impl fmt::Display for ManualActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},MANUAL_CONTROL,{},{},{},{:.2}",
            Seconds(self.timestamp_ms),
            self.action,
            Reading(self.temperature, 1),
            Reading(self.current, 2),
            self.output_ma,
        )
    }
}
