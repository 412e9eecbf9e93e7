//! Analog input abstractions
//!
//! `embedded-hal` 1.0 dropped the ADC traits, so chip HALs are adapted to
//! this one by the firmware.

/// Errors from an analog conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogError {
    /// Conversion did not complete
    Conversion,
    /// Shared converter is held by another channel
    Busy,
}

/// Single-ended analog input channel
///
/// Reads must not block for longer than one conversion.
pub trait AnalogInput {
    /// Read a raw conversion result
    fn read_raw(&mut self) -> Result<u16, AnalogError>;

    /// Raw value corresponding to the reference voltage (4095 for 12-bit)
    fn full_scale(&self) -> u16;

    /// Reference voltage in millivolts
    fn reference_mv(&self) -> u32;

    /// Read the channel in millivolts
    fn read_millivolts(&mut self) -> Result<u32, AnalogError> {
        let raw = self.read_raw()? as u32;
        let full = self.full_scale().max(1) as u32;
        Ok(raw * self.reference_mv() / full)
    }
}
