//! State definitions and the transition table

use crate::traits::ActuatorError;

/// Heating sequence states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemState {
    /// Powered, output at the low bound, waiting for INITIALIZE
    Idle,
    /// Verifying blower, temperature and current sensing
    SelfCheck,
    /// Checks passed, waiting for START
    SystemArmed,
    /// Regulating to the warm-up setpoint
    WarmUp,
    /// Holding at the warm-up setpoint
    WarmUpComplete,
    /// Regulating to the full-temperature setpoint
    FullTemp,
    /// Holding at the full-temperature setpoint
    FullTempComplete,
    /// Fault latched; output at the low bound
    Error,
    /// Ramping the output down before returning to IDLE
    Shutdown,
}

/// Reasons a transition request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransitionError {
    /// Edge not present in the transition table
    NotPermitted { from: SystemState, to: SystemState },
    /// Leaving ERROR while a fault is still latched
    FaultLatched,
    /// The state changed but its entry action could not drive the output
    Actuator(ActuatorError),
}

impl From<ActuatorError> for TransitionError {
    fn from(e: ActuatorError) -> Self {
        TransitionError::Actuator(e)
    }
}

impl SystemState {
    /// Every state, in sequence order
    pub const ALL: [SystemState; 9] = [
        SystemState::Idle,
        SystemState::SelfCheck,
        SystemState::SystemArmed,
        SystemState::WarmUp,
        SystemState::WarmUpComplete,
        SystemState::FullTemp,
        SystemState::FullTempComplete,
        SystemState::Error,
        SystemState::Shutdown,
    ];

    /// Wire name
    pub fn name(self) -> &'static str {
        match self {
            SystemState::Idle => "IDLE",
            SystemState::SelfCheck => "SELF_CHECK",
            SystemState::SystemArmed => "SYSTEM_ARMED",
            SystemState::WarmUp => "WARM_UP",
            SystemState::WarmUpComplete => "WARM_UP_COMPLETE",
            SystemState::FullTemp => "FULL_TEMP",
            SystemState::FullTempComplete => "FULL_TEMP_COMPLETE",
            SystemState::Error => "ERROR",
            SystemState::Shutdown => "SHUTDOWN",
        }
    }

    /// Check the transition table
    ///
    /// Entry into ERROR on a fault bypasses this table; see
    /// [`super::StateMachine::force_error`].
    pub fn can_transition_to(self, to: SystemState) -> bool {
        use SystemState::*;

        matches!(
            (self, to),
            (Idle, SelfCheck)
                | (SelfCheck, SystemArmed)
                | (SelfCheck, Error)
                | (SystemArmed, WarmUp)
                | (WarmUp, WarmUpComplete)
                | (WarmUp, Shutdown)
                | (WarmUpComplete, FullTemp)
                | (FullTemp, FullTempComplete)
                | (FullTemp, WarmUp)
                | (FullTempComplete, Shutdown)
                | (FullTempComplete, WarmUp)
                | (Shutdown, Idle)
                | (Error, Idle)
        )
    }

    /// Heating elements may be energized, so the blower must run
    pub fn requires_airflow(self) -> bool {
        matches!(
            self,
            SystemState::SelfCheck
                | SystemState::SystemArmed
                | SystemState::WarmUp
                | SystemState::WarmUpComplete
                | SystemState::FullTemp
                | SystemState::FullTempComplete
        )
    }

    /// The PID regulator drives the output in this state
    pub fn is_regulating(self) -> bool {
        matches!(
            self,
            SystemState::WarmUp
                | SystemState::WarmUpComplete
                | SystemState::FullTemp
                | SystemState::FullTempComplete
        )
    }
}
