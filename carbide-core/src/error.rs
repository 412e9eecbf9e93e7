//! Control cycle errors
//!
//! A `ControlError` never escapes [`crate::Controller::cycle`]; the
//! controller converts it into an internal fault and fails safe.

use crate::traits::ActuatorError;

/// Unexpected failure inside a control cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// The actuator port rejected a write
    Actuator(ActuatorError),
    /// A regulated state was handed a NaN or infinite temperature
    NonFiniteMeasurement,
}

impl From<ActuatorError> for ControlError {
    fn from(e: ActuatorError) -> Self {
        ControlError::Actuator(e)
    }
}
