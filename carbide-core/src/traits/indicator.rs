//! Indicator port
//!
//! Lamp and relay patterns are chosen by the implementation; the core only
//! reports what changed.

use crate::state::SystemState;
use crate::telemetry::TelemetrySnapshot;

/// What the operator panel should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayStatus {
    /// Automatic mode in the given state
    State(SystemState),
    /// Manual mode, regardless of the underlying state
    ManualControl,
}

impl DisplayStatus {
    /// Name used on the wire and in telemetry
    pub fn name(self) -> &'static str {
        match self {
            DisplayStatus::State(state) => state.name(),
            DisplayStatus::ManualControl => "MANUAL_CONTROL",
        }
    }

    /// True if the panel should show a fault
    pub fn is_error(self) -> bool {
        self == DisplayStatus::State(SystemState::Error)
    }
}

/// Operator panel
pub trait Indicator {
    /// Called once per state entry and on every mode change
    fn on_state_changed(&mut self, status: DisplayStatus);

    /// Called at the end of every cycle with the published snapshot
    fn on_cycle(&mut self, _telemetry: &TelemetrySnapshot) {}
}

/// No panel fitted
impl Indicator for () {
    fn on_state_changed(&mut self, _status: DisplayStatus) {}
}
