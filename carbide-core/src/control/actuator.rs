//! Actuator ownership
//!
//! Wraps the output port and remembers the last value written. Every
//! write goes through [`OutputRange::clamp`], so an out-of-range command
//! can not reach the hardware.

use crate::config::OutputRange;
use crate::traits::{ActuatorError, ActuatorPort};

pub struct Actuator<P: ActuatorPort> {
    port: P,
    range: OutputRange,
    command: f32,
}

impl<P: ActuatorPort> Actuator<P> {
    pub fn new(port: P, range: OutputRange) -> Self {
        Self {
            port,
            range,
            command: range.low_ma,
        }
    }

    /// Drive the port to the low bound
    pub fn init(&mut self) -> Result<(), ActuatorError> {
        self.force_low()
    }

    /// Last value written (mA)
    pub fn value(&self) -> f32 {
        self.command
    }

    /// Output above the low bound
    pub fn is_energized(&self) -> bool {
        self.command > self.range.low_ma
    }

    /// Clamp and write
    ///
    /// Returns the value actually applied. The stored command only changes
    /// if the write succeeds.
    pub fn set(&mut self, milliamps: f32) -> Result<f32, ActuatorError> {
        let value = self.range.clamp(milliamps);
        self.port.write_actuator(value)?;
        self.command = value;
        Ok(value)
    }

    /// Add `delta` to the current value, then clamp
    pub fn increment(&mut self, delta: f32) -> Result<f32, ActuatorError> {
        self.set(self.command + delta)
    }

    pub fn force_low(&mut self) -> Result<(), ActuatorError> {
        self.set(self.range.low_ma).map(|_| ())
    }

    /// Step the output down by `step`
    ///
    /// Returns true once the low bound is reached.
    pub fn ramp_down(&mut self, step: f32) -> Result<bool, ActuatorError> {
        let next = (self.command - step).max(self.range.low_ma);
        let applied = self.set(next)?;
        Ok(applied <= self.range.low_ma)
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Default)]
    struct MockPort {
        writes: Vec<f32>,
        fail: bool,
    }

    impl ActuatorPort for MockPort {
        fn write_actuator(&mut self, milliamps: f32) -> Result<(), ActuatorError> {
            if self.fail {
                return Err(ActuatorError::WriteFailed);
            }
            self.writes.push(milliamps);
            Ok(())
        }
    }

    fn actuator() -> Actuator<MockPort> {
        Actuator::new(MockPort::default(), OutputRange::default())
    }

    #[test]
    fn test_set_clamps() {
        let mut out = actuator();
        assert_eq!(out.set(25.0), Ok(20.0));
        assert_eq!(out.set(1.0), Ok(4.0));
        assert_eq!(out.set(f32::NAN), Ok(4.0));
        assert_eq!(out.port().writes, vec![20.0, 4.0, 4.0]);
    }

    #[test]
    fn test_failed_write_keeps_command() {
        let mut out = actuator();
        out.set(10.0).unwrap();
        out.port_mut().fail = true;
        assert_eq!(out.set(12.0), Err(ActuatorError::WriteFailed));
        assert_eq!(out.value(), 10.0);
    }

    #[test]
    fn test_ramp_down_reaches_low() {
        let mut out = actuator();
        out.set(5.2).unwrap();
        assert_eq!(out.ramp_down(0.5), Ok(false));
        assert_eq!(out.ramp_down(0.5), Ok(false));
        assert_eq!(out.ramp_down(0.5), Ok(true));
        assert_eq!(out.value(), 4.0);
        assert!(!out.is_energized());
    }

    proptest! {
        #[test]
        fn test_increments_stay_in_range(deltas in proptest::collection::vec(-1000.0f32..1000.0, 0..64)) {
            let mut out = actuator();
            for delta in deltas {
                let value = out.increment(delta).unwrap();
                prop_assert!((4.0..=20.0).contains(&value));
            }
        }
    }
}
