//! Fault records

use carbide_protocol::FaultNotice;

/// How a fault may be acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    /// Cleared by INITIALIZE once the condition is gone
    Recoverable,
    /// Cleared only by a hard reset
    Critical,
}

/// Fault conditions, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    EmergencyStop,
    AirflowLoss,
    InvalidTemperature,
    Overcurrent,
    CurrentSignal,
    SelfCheck,
    Internal,
}

impl FaultKind {
    pub fn code(self) -> u16 {
        match self {
            FaultKind::EmergencyStop => 100,
            FaultKind::AirflowLoss => 101,
            FaultKind::InvalidTemperature => 102,
            FaultKind::Overcurrent => 103,
            FaultKind::CurrentSignal => 104,
            FaultKind::SelfCheck => 105,
            FaultKind::Internal => 199,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            FaultKind::EmergencyStop | FaultKind::AirflowLoss => Severity::Critical,
            _ => Severity::Recoverable,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FaultKind::EmergencyStop => "Emergency stop activated",
            FaultKind::AirflowLoss => "Blower not running - airflow required for operation",
            FaultKind::InvalidTemperature => "Temperature reading invalid or out of range",
            FaultKind::Overcurrent => "Heater overcurrent",
            FaultKind::CurrentSignal => "Current loop signal out of range",
            FaultKind::SelfCheck => "Self-check failed",
            FaultKind::Internal => "Internal control error",
        }
    }

    /// Higher wins when two conditions compete for the latch
    pub fn priority(self) -> u8 {
        match self {
            FaultKind::EmergencyStop => 6,
            FaultKind::AirflowLoss => 5,
            FaultKind::InvalidTemperature => 4,
            FaultKind::Overcurrent => 3,
            FaultKind::CurrentSignal | FaultKind::SelfCheck => 2,
            FaultKind::Internal => 1,
        }
    }
}

/// A detected fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultRecord {
    pub kind: FaultKind,
    pub code: u16,
    pub message: &'static str,
    pub severity: Severity,
    /// Detection time (ms since boot)
    pub at_ms: u64,
}

impl FaultRecord {
    pub fn new(kind: FaultKind, at_ms: u64) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: kind.message(),
            severity: kind.severity(),
            at_ms,
        }
    }

    /// Replace the default message
    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = message;
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

impl From<FaultRecord> for FaultNotice {
    fn from(record: FaultRecord) -> Self {
        FaultNotice {
            code: record.code,
            critical: record.is_critical(),
            message: record.message,
        }
    }
}
