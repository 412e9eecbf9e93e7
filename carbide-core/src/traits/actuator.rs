//! Actuator port

/// Errors from the analog output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorError {
    /// Hardware rejected the write
    WriteFailed,
}

/// SCR loop output
///
/// Callers always pass a value already clamped to the output range.
pub trait ActuatorPort {
    /// Drive the loop to `milliamps`
    fn write_actuator(&mut self, milliamps: f32) -> Result<(), ActuatorError>;
}
