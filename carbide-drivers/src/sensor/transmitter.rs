//! 4-20 mA loop transmitter input
//!
//! The loop current develops a voltage across a precision shunt that the
//! ADC samples. Loop current maps linearly onto the transmitter's range,
//! 4 mA at the bottom and 20 mA at the top.
//!
//! A live zero makes broken wiring detectable: an open loop reads near
//! 0 mA and a shorted transmitter saturates high. Both are reported as
//! [`SensorError::SignalIntegrity`].

use carbide_core::config::SensorConfig;
use carbide_core::traits::SensorError;
use carbide_hal::AnalogInput;

/// Live zero of the loop (mA)
pub const LOOP_MIN_MA: f32 = 4.0;

/// Top of the loop span (mA)
pub const LOOP_MAX_MA: f32 = 20.0;

/// Below this the loop is considered open (mA)
pub const FAULT_LOW_MA: f32 = 3.8;

/// Above this the loop is considered shorted (mA)
pub const FAULT_HIGH_MA: f32 = 20.5;

/// Scaling for one transmitter
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransmitterConfig {
    /// Shunt resistance (Ω)
    pub shunt_ohms: f32,
    /// Engineering value at 4 mA
    pub range_min: f32,
    /// Engineering value at 20 mA
    pub range_max: f32,
}

impl TransmitterConfig {
    /// Element thermocouple transmitter (°F)
    pub fn temperature(config: &SensorConfig) -> Self {
        Self {
            shunt_ohms: config.shunt_ohms,
            range_min: config.temperature_min_f,
            range_max: config.temperature_max_f,
        }
    }

    /// Blower outlet transmitter (°F)
    pub fn secondary(config: &SensorConfig) -> Self {
        Self {
            shunt_ohms: config.shunt_ohms,
            range_min: config.secondary_min_f,
            range_max: config.secondary_max_f,
        }
    }

    /// Heater current transducer (A)
    pub fn current(config: &SensorConfig) -> Self {
        Self {
            shunt_ohms: config.shunt_ohms,
            range_min: 0.0,
            range_max: config.current_full_scale_a,
        }
    }
}

/// Loop-powered transmitter read through a shunt resistor
pub struct LoopTransmitter<A> {
    adc: A,
    config: TransmitterConfig,
    low_edge_warned: bool,
}

impl<A: AnalogInput> LoopTransmitter<A> {
    pub fn new(adc: A, config: TransmitterConfig) -> Self {
        Self {
            adc,
            config,
            low_edge_warned: false,
        }
    }

    /// Loop current in milliamps
    pub fn read_loop_ma(&mut self) -> Result<f32, SensorError> {
        let mv = self
            .adc
            .read_millivolts()
            .map_err(|_| SensorError::Unavailable)?;
        Ok(mv as f32 / self.config.shunt_ohms)
    }

    /// Read the scaled engineering value
    pub fn read(&mut self) -> Result<f32, SensorError> {
        let ma = self.read_loop_ma()?;
        let ma = self.check_span(ma)?;
        let fraction = (ma - LOOP_MIN_MA) / (LOOP_MAX_MA - LOOP_MIN_MA);
        let span = self.config.range_max - self.config.range_min;
        Ok(self.config.range_min + fraction * span)
    }

    /// Validate loop current, returning the value to scale
    fn check_span(&mut self, ma: f32) -> Result<f32, SensorError> {
        if !(FAULT_LOW_MA..=FAULT_HIGH_MA).contains(&ma) {
            return Err(SensorError::SignalIntegrity);
        }

        if ma < LOOP_MIN_MA {
            if !self.low_edge_warned {
                warn!("Loop current below live zero: {} mA", ma);
                self.low_edge_warned = true;
            }
            return Ok(LOOP_MIN_MA);
        }

        self.low_edge_warned = false;
        Ok(ma.min(LOOP_MAX_MA))
    }

    pub fn config(&self) -> &TransmitterConfig {
        &self.config
    }

    /// True while a low-edge warning is outstanding
    pub fn low_edge_warned(&self) -> bool {
        self.low_edge_warned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbide_hal::AnalogError;

    /// ADC where one count is one millivolt
    struct MockAdc {
        mv: Result<u16, AnalogError>,
    }

    impl AnalogInput for MockAdc {
        fn read_raw(&mut self) -> Result<u16, AnalogError> {
            self.mv
        }

        fn full_scale(&self) -> u16 {
            3300
        }

        fn reference_mv(&self) -> u32 {
            3300
        }
    }

    fn transmitter(mv: u16) -> LoopTransmitter<MockAdc> {
        LoopTransmitter::new(
            MockAdc { mv: Ok(mv) },
            TransmitterConfig {
                shunt_ohms: 150.0,
                range_min: 0.0,
                range_max: 2000.0,
            },
        )
    }

    #[test]
    fn test_scaling_endpoints() {
        // 4 mA × 150 Ω = 600 mV
        assert_eq!(transmitter(600).read(), Ok(0.0));
        // 20 mA × 150 Ω = 3000 mV
        assert_eq!(transmitter(3000).read(), Ok(2000.0));
        // 12 mA is mid-scale
        assert_eq!(transmitter(1800).read(), Ok(1000.0));
    }

    #[test]
    fn test_open_loop_is_signal_fault() {
        // 3.0 mA
        assert_eq!(transmitter(450).read(), Err(SensorError::SignalIntegrity));
        assert_eq!(transmitter(0).read(), Err(SensorError::SignalIntegrity));
    }

    #[test]
    fn test_saturated_loop_is_signal_fault() {
        // 21 mA
        assert_eq!(transmitter(3150).read(), Err(SensorError::SignalIntegrity));
    }

    #[test]
    fn test_low_edge_reads_minimum_and_warns_once() {
        // 3.9 mA
        let mut t = transmitter(585);
        assert_eq!(t.read(), Ok(0.0));
        assert!(t.low_edge_warned());
        assert_eq!(t.read(), Ok(0.0));

        t.adc.mv = Ok(1800);
        assert_eq!(t.read(), Ok(1000.0));
        assert!(!t.low_edge_warned());
    }

    #[test]
    fn test_high_edge_clamps_to_maximum() {
        // 20.2 mA
        assert_eq!(transmitter(3030).read(), Ok(2000.0));
    }

    #[test]
    fn test_adc_error_is_unavailable() {
        let mut t = transmitter(0);
        t.adc.mv = Err(AnalogError::Busy);
        assert_eq!(t.read(), Err(SensorError::Unavailable));
    }

    #[test]
    fn test_current_scaling_from_config() {
        let config = SensorConfig::default();
        let scaling = TransmitterConfig::current(&config);
        assert_eq!(scaling.range_min, 0.0);
        assert_eq!(scaling.range_max, config.current_full_scale_a);
    }
}
