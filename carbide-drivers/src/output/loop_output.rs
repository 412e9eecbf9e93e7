//! 4-20 mA loop output
//!
//! The SCR power unit takes a current loop command. The board generates
//! it from a filtered PWM signal into a voltage-to-current converter, so
//! loop current is proportional to duty cycle: 0 % duty is 0 mA and full
//! duty is `full_scale_ma`.

use carbide_core::traits::{ActuatorError, ActuatorPort};
use embedded_hal::pwm::SetDutyCycle;

/// Loop current at 100 % duty on the reference design
pub const DEFAULT_FULL_SCALE_MA: f32 = 20.0;

pub struct LoopOutput<P> {
    pwm: P,
    full_scale_ma: f32,
}

impl<P: SetDutyCycle> LoopOutput<P> {
    pub fn new(pwm: P) -> Self {
        Self::with_full_scale(pwm, DEFAULT_FULL_SCALE_MA)
    }

    /// Converter calibrated for a different full-scale current
    pub fn with_full_scale(pwm: P, full_scale_ma: f32) -> Self {
        Self { pwm, full_scale_ma }
    }

    /// Duty cycle for `milliamps`, saturating at 0 and full duty
    pub fn duty_for(&self, milliamps: f32) -> u16 {
        let max = self.pwm.max_duty_cycle();
        let fraction = (milliamps / self.full_scale_ma).clamp(0.0, 1.0);
        if !fraction.is_finite() {
            return 0;
        }
        // +0.5 rounds to nearest
        let duty = fraction * max as f32 + 0.5;
        (duty as u16).min(max)
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}

impl<P: SetDutyCycle> ActuatorPort for LoopOutput<P> {
    fn write_actuator(&mut self, milliamps: f32) -> Result<(), ActuatorError> {
        let duty = self.duty_for(milliamps);
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|_| ActuatorError::WriteFailed)
    }
}
