//! Sensor ports

/// Errors that can occur reading an analog sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// No reading this cycle (conversion failed or timed out)
    Unavailable,
    /// Loop current outside the transmitter's valid span (open or shorted loop)
    SignalIntegrity,
    /// Converted value outside the sensor's range
    OutOfRange,
}

/// Raw state of the panel's discrete inputs
///
/// `true` means asserted; drivers handle contact polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscreteInputs {
    /// INITIALIZE push button
    pub initialize: bool,
    /// START push button
    pub start: bool,
    /// Emergency stop circuit open
    pub estop: bool,
    /// Key-switch hard reset
    pub hard_reset: bool,
}

/// Everything the control cycle reads
///
/// Every method must return promptly. A failed read is reported as an
/// error, never retried inside the call.
pub trait SensorPorts {
    /// Element temperature (°F)
    fn read_temperature(&mut self) -> Result<f32, SensorError>;

    /// Blower outlet temperature (°F)
    fn read_secondary_temperature(&mut self) -> Result<f32, SensorError>;

    /// Heater current (A)
    ///
    /// Returns [`SensorError::SignalIntegrity`] when the transducer loop is
    /// outside its valid span.
    fn read_current(&mut self) -> Result<f32, SensorError>;

    /// Blower current detected
    fn read_airflow(&mut self) -> bool;

    /// Panel buttons and safety circuits
    fn read_discrete(&mut self) -> DiscreteInputs;
}
