//! Sensor and telemetry snapshots
//!
//! The control cycle reads every sensor once into a [`SensorSnapshot`].
//! Queries and telemetry read from snapshots, never from the hardware.

use carbide_protocol::CsvRecord;

use crate::traits::{DisplayStatus, SensorError, SensorPorts};

/// One cycle's sensor readings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSnapshot {
    pub temperature: Result<f32, SensorError>,
    pub secondary_temperature: Result<f32, SensorError>,
    pub current: Result<f32, SensorError>,
    /// Raw blower current switch level
    pub airflow: bool,
    /// Debounced emergency stop level
    pub estop: bool,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            temperature: Err(SensorError::Unavailable),
            secondary_temperature: Err(SensorError::Unavailable),
            current: Err(SensorError::Unavailable),
            airflow: false,
            estop: false,
        }
    }
}

impl SensorSnapshot {
    /// Read every sensor once
    pub fn read<S: SensorPorts>(sensors: &mut S, estop: bool) -> Self {
        Self {
            temperature: sensors.read_temperature(),
            secondary_temperature: sensors.read_secondary_temperature(),
            current: sensors.read_current(),
            airflow: sensors.read_airflow(),
            estop,
        }
    }
}

/// Published plant state for one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySnapshot {
    pub timestamp_ms: u64,
    pub status: DisplayStatus,
    pub temperature: Option<f32>,
    pub secondary_temperature: Option<f32>,
    pub current: Option<f32>,
    /// Actuator command (mA)
    pub actuator_command: f32,
    /// Blower interlock's latest sample
    pub airflow_ok: bool,
}

impl TelemetrySnapshot {
    pub fn to_record(&self) -> CsvRecord {
        CsvRecord {
            timestamp_ms: self.timestamp_ms,
            state: self.status.name(),
            temperature: self.temperature,
            secondary_temperature: self.secondary_temperature,
            current: self.current,
            output_ma: self.actuator_command,
            airflow_ok: self.airflow_ok,
        }
    }
}

/// Decides when the next telemetry record is due
#[derive(Debug, Clone, Copy)]
pub struct TelemetryCadence {
    interval_ms: u32,
    last_ms: Option<u64>,
}

impl TelemetryCadence {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// True at most once per interval; the first call is always due
    pub fn due(&mut self, now_ms: u64) -> bool {
        let due = match self.last_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= u64::from(self.interval_ms),
        };
        if due {
            self.last_ms = Some(now_ms);
        }
        due
    }
}
