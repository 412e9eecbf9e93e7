//! Events that drive the state machine
//!
//! Events are timestamped when created and moved into the machine, so
//! each one is consumed at most once.

use crate::safety::FaultRecord;

/// Panel push buttons (and their remote equivalents)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Initialize,
    Start,
}

/// Event payloads
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// Debounced press, or `C:INIT` / `C:START`
    ButtonPressed(Button),
    /// Measured temperature (°F) crossed the active setpoint
    TemperatureReached(f32),
    /// A safety fault was detected
    ErrorOccurred(FaultRecord),
    /// Emergency stop circuit opened
    EstopActivated,
    /// Emergency stop circuit closed again
    EstopCleared,
    /// Key-switch reset; the only way to clear a critical fault
    HardReset,
}

/// A timestamped event
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    pub kind: EventKind,
    /// Creation time (ms since boot)
    pub at_ms: u64,
}

impl Event {
    pub fn new(kind: EventKind, at_ms: u64) -> Self {
        Self { kind, at_ms }
    }

    pub fn button(button: Button, at_ms: u64) -> Self {
        Self::new(EventKind::ButtonPressed(button), at_ms)
    }

    /// Emergency stop edges are handled before anything else in a cycle
    pub fn is_estop(&self) -> bool {
        matches!(
            self.kind,
            EventKind::EstopActivated | EventKind::EstopCleared
        )
    }
}
