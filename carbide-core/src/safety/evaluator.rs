//! Safety evaluator
//!
//! Pure function of the sensor snapshot and the operating context. When
//! several conditions hold at once only the highest-priority one is
//! reported.

use super::fault::{FaultKind, FaultRecord};
use crate::config::SafetyLimits;
use crate::dispatch::ControlMode;
use crate::state::SystemState;
use crate::telemetry::SensorSnapshot;
use crate::traits::SensorError;

/// Operating context for one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SafetyContext {
    pub state: SystemState,
    pub mode: ControlMode,
    /// Actuator above its low bound
    pub output_energized: bool,
}

impl SafetyContext {
    /// Heating elements may be energized
    ///
    /// In manual mode this follows the actuator itself, since the operator
    /// can drive the output from any state.
    pub fn requires_airflow(&self) -> bool {
        match self.mode {
            ControlMode::Automatic => self.state.requires_airflow(),
            ControlMode::Manual => self.output_energized,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyEvaluator {
    limits: SafetyLimits,
}

impl SafetyEvaluator {
    pub fn new(limits: SafetyLimits) -> Self {
        Self { limits }
    }

    /// Evaluate one cycle
    ///
    /// `airflow` is the blower interlock's verdict for this cycle. It is
    /// only considered when the context requires airflow.
    pub fn evaluate(
        &self,
        sensors: &SensorSnapshot,
        context: SafetyContext,
        airflow: Option<FaultRecord>,
        now_ms: u64,
    ) -> Option<FaultRecord> {
        if sensors.estop {
            return Some(FaultRecord::new(FaultKind::EmergencyStop, now_ms));
        }

        if context.requires_airflow() {
            if let Some(fault) = airflow {
                return Some(fault);
            }
        }

        if self.temperature_invalid(sensors.temperature) {
            return Some(FaultRecord::new(FaultKind::InvalidTemperature, now_ms));
        }

        match sensors.current {
            Ok(amps) if !amps.is_finite() || amps > self.limits.overcurrent_a => {
                Some(FaultRecord::new(FaultKind::Overcurrent, now_ms))
            }
            Err(SensorError::SignalIntegrity) => {
                Some(FaultRecord::new(FaultKind::CurrentSignal, now_ms))
            }
            _ => None,
        }
    }

    /// A missing reading is transient; a reading that cannot be physical is not
    fn temperature_invalid(&self, reading: Result<f32, SensorError>) -> bool {
        match reading {
            Ok(t) => !t.is_finite() || t < self.limits.temp_min_f || t > self.limits.temp_max_f,
            Err(SensorError::Unavailable) => false,
            Err(SensorError::OutOfRange) | Err(SensorError::SignalIntegrity) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> SensorSnapshot {
        SensorSnapshot {
            temperature: Ok(120.0),
            secondary_temperature: Ok(80.0),
            current: Ok(20.0),
            airflow: true,
            estop: false,
        }
    }

    fn auto(state: SystemState) -> SafetyContext {
        SafetyContext {
            state,
            mode: ControlMode::Automatic,
            output_energized: false,
        }
    }

    fn evaluator() -> SafetyEvaluator {
        SafetyEvaluator::new(SafetyLimits::default())
    }

    fn airflow_fault() -> Option<FaultRecord> {
        Some(FaultRecord::new(FaultKind::AirflowLoss, 0))
    }

    #[test]
    fn test_healthy_no_fault() {
        assert_eq!(
            evaluator().evaluate(&healthy(), auto(SystemState::WarmUp), None, 0),
            None
        );
    }

    #[test]
    fn test_estop_outranks_everything() {
        let mut sensors = healthy();
        sensors.estop = true;
        sensors.temperature = Err(SensorError::OutOfRange);
        sensors.current = Ok(500.0);

        let fault = evaluator()
            .evaluate(&sensors, auto(SystemState::FullTemp), airflow_fault(), 0)
            .unwrap();
        assert_eq!(fault.kind, FaultKind::EmergencyStop);
    }

    #[test]
    fn test_airflow_only_in_required_states() {
        let sensors = healthy();
        for state in SystemState::ALL {
            let fault = evaluator().evaluate(&sensors, auto(state), airflow_fault(), 0);
            assert_eq!(fault.is_some(), state.requires_airflow(), "{:?}", state);
        }
    }

    #[test]
    fn test_airflow_in_manual_follows_output() {
        let sensors = healthy();
        let mut context = SafetyContext {
            state: SystemState::Idle,
            mode: ControlMode::Manual,
            output_energized: false,
        };
        assert_eq!(evaluator().evaluate(&sensors, context, airflow_fault(), 0), None);

        context.output_energized = true;
        assert!(evaluator().evaluate(&sensors, context, airflow_fault(), 0).is_some());
    }

    #[test]
    fn test_airflow_outranks_temperature() {
        let mut sensors = healthy();
        sensors.temperature = Ok(3000.0);
        let fault = evaluator()
            .evaluate(&sensors, auto(SystemState::WarmUp), airflow_fault(), 0)
            .unwrap();
        assert_eq!(fault.kind, FaultKind::AirflowLoss);
    }

    #[test]
    fn test_temperature_validity() {
        let mut sensors = healthy();

        sensors.temperature = Err(SensorError::Unavailable);
        assert_eq!(evaluator().evaluate(&sensors, auto(SystemState::Idle), None, 0), None);

        for bad in [Ok(3000.0), Ok(-100.0), Ok(f32::NAN), Err(SensorError::OutOfRange)] {
            sensors.temperature = bad;
            let fault = evaluator()
                .evaluate(&sensors, auto(SystemState::Idle), None, 0)
                .unwrap();
            assert_eq!(fault.kind, FaultKind::InvalidTemperature);
        }
    }

    #[test]
    fn test_temperature_outranks_overcurrent() {
        let mut sensors = healthy();
        sensors.temperature = Ok(2600.0);
        sensors.current = Ok(90.0);
        let fault = evaluator()
            .evaluate(&sensors, auto(SystemState::Idle), None, 0)
            .unwrap();
        assert_eq!(fault.kind, FaultKind::InvalidTemperature);
    }

    #[test]
    fn test_current_faults() {
        let mut sensors = healthy();

        sensors.current = Ok(80.5);
        let fault = evaluator()
            .evaluate(&sensors, auto(SystemState::Idle), None, 0)
            .unwrap();
        assert_eq!(fault.kind, FaultKind::Overcurrent);

        sensors.current = Err(SensorError::SignalIntegrity);
        let fault = evaluator()
            .evaluate(&sensors, auto(SystemState::Idle), None, 0)
            .unwrap();
        assert_eq!(fault.kind, FaultKind::CurrentSignal);

        sensors.current = Err(SensorError::Unavailable);
        assert_eq!(evaluator().evaluate(&sensors, auto(SystemState::Idle), None, 0), None);
    }
}
