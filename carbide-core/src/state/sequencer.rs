//! State machine runtime
//!
//! [`StateMachine`] owns the current and previous state and is the only
//! writer of either. Every change goes through one private transition
//! function that runs the exit hook, updates the state and then the entry
//! hook, each exactly once.
//!
//! Everything the machine touches besides its own state is lent to it per
//! call through a [`MachineContext`], so the controller stays the single
//! owner of the actuator and the fault latch.

use super::events::{Button, Event, EventKind};
use super::machine::{SystemState, TransitionError};
use crate::config::{ControllerConfig, SetpointConfig};
use crate::control::{Actuator, Crossing, Hysteresis, PidRegulator};
use crate::error::ControlError;
use crate::safety::{BlowerInterlock, ClearError, ClearRequest, FaultKind, FaultLatch, FaultRecord};
use crate::telemetry::SensorSnapshot;
use crate::traits::{ActuatorError, ActuatorPort, DisplayStatus, Indicator, SensorError};

/// Components with mutable state that the machine drives
pub struct ControlHandles<A: ActuatorPort, L: Indicator> {
    pub pid: PidRegulator,
    pub actuator: Actuator<A>,
    pub indicator: L,
}

/// Everything lent to the machine for one call
pub struct MachineContext<'a, A: ActuatorPort, L: Indicator> {
    pub now_ms: u64,
    pub sensors: &'a SensorSnapshot,
    pub handles: &'a mut ControlHandles<A, L>,
    pub faults: &'a mut FaultLatch,
    pub blower: &'a mut BlowerInterlock,
}

/// Heating sequence automaton
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: SystemState,
    previous: SystemState,
    entered_at_ms: u64,
    setpoints: SetpointConfig,
    ramp_step_ma: f32,
    reached: Hysteresis,
}

/// Rejected transitions are already logged; only actuator failures matter
/// to the caller of a cycle.
fn settle(result: Result<(), TransitionError>) -> Result<(), ControlError> {
    match result {
        Err(TransitionError::Actuator(e)) => Err(ControlError::Actuator(e)),
        _ => Ok(()),
    }
}

impl StateMachine {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            current: SystemState::Idle,
            previous: SystemState::Idle,
            entered_at_ms: 0,
            setpoints: config.setpoints,
            ramp_step_ma: config.control.ramp_step_ma,
            reached: Hysteresis::new(config.setpoints.hysteresis_f),
        }
    }

    pub fn current(&self) -> SystemState {
        self.current
    }

    pub fn previous(&self) -> SystemState {
        self.previous
    }

    /// Time of the last state entry (ms since boot)
    pub fn entered_at_ms(&self) -> u64 {
        self.entered_at_ms
    }

    /// Advance one cycle
    ///
    /// Consumes `event` first, then runs the handler of whatever state the
    /// machine ends up in.
    pub fn step<A: ActuatorPort, L: Indicator>(
        &mut self,
        event: Option<Event>,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ControlError> {
        if let Some(event) = event {
            self.handle_event(event, ctx)?;
        }
        self.run(ctx)
    }

    /// Consume one event without running the state handler
    pub fn handle_event<A: ActuatorPort, L: Indicator>(
        &mut self,
        event: Event,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ControlError> {
        match event.kind {
            EventKind::ButtonPressed(button) => self.on_button(button, ctx),
            EventKind::TemperatureReached(temperature) => {
                let to = match self.current {
                    SystemState::WarmUp => SystemState::WarmUpComplete,
                    SystemState::FullTemp => SystemState::FullTempComplete,
                    state => {
                        debug!("Temperature event ignored in {}", state.name());
                        return Ok(());
                    }
                };
                info!("Setpoint reached at {}F", temperature);
                settle(self.request(to, ctx))
            }
            EventKind::ErrorOccurred(record) => {
                self.force_error(record, ctx);
                Ok(())
            }
            EventKind::EstopActivated => {
                self.force_error(FaultRecord::new(FaultKind::EmergencyStop, event.at_ms), ctx);
                Ok(())
            }
            EventKind::EstopCleared => {
                if ctx.faults.is_latched() {
                    info!("Emergency stop released, fault remains latched");
                }
                Ok(())
            }
            EventKind::HardReset => self.clear_fault(ClearRequest::HardReset, ctx),
        }
    }

    /// Validated transition
    ///
    /// Edges missing from the table are rejected and leave both the state
    /// and the actuator untouched.
    pub fn request<A: ActuatorPort, L: Indicator>(
        &mut self,
        to: SystemState,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), TransitionError> {
        let from = self.current;
        if !from.can_transition_to(to) {
            warn!("Invalid transition: {} -> {}", from.name(), to.name());
            return Err(TransitionError::NotPermitted { from, to });
        }
        if from == SystemState::Error && ctx.faults.is_latched() {
            warn!("Cannot leave ERROR while a fault is latched");
            return Err(TransitionError::FaultLatched);
        }
        self.apply(to, ctx)?;
        Ok(())
    }

    /// Enter ERROR, bypassing the table
    ///
    /// Latches `record` and drives the actuator low. Never fails: an output
    /// that cannot be driven low is logged and the machine stays in ERROR.
    pub fn force_error<A: ActuatorPort, L: Indicator>(
        &mut self,
        record: FaultRecord,
        ctx: &mut MachineContext<'_, A, L>,
    ) {
        ctx.faults.latch(record);

        let result = if self.current == SystemState::Error {
            ctx.handles.actuator.force_low()
        } else {
            error!(
                "Fault {} in {}: {}",
                record.code,
                self.current.name(),
                record.message
            );
            self.apply(SystemState::Error, ctx)
        };
        if let Err(e) = result {
            error!("Output could not be driven low: {}", e);
        }
    }

    /// Return to IDLE after manual control, bypassing the table
    ///
    /// A latched fault keeps the machine in ERROR.
    pub(crate) fn return_to_idle<A: ActuatorPort, L: Indicator>(
        &mut self,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ActuatorError> {
        if self.current == SystemState::Error && ctx.faults.is_latched() {
            ctx.handles
                .indicator
                .on_state_changed(DisplayStatus::State(SystemState::Error));
            return Ok(());
        }
        info!("Returning to IDLE from {}", self.current.name());
        self.apply(SystemState::Idle, ctx)
    }

    /// The single writer of `current`
    fn apply<A: ActuatorPort, L: Indicator>(
        &mut self,
        to: SystemState,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ActuatorError> {
        let from = self.current;
        self.on_exit(from, to);
        self.previous = from;
        self.current = to;
        self.entered_at_ms = ctx.now_ms;
        info!("State: {} -> {}", from.name(), to.name());
        self.on_enter(to, ctx)
    }

    fn on_exit(&mut self, from: SystemState, to: SystemState) {
        if from.is_regulating() && !to.is_regulating() {
            debug!("Leaving regulation");
        }
    }

    fn on_enter<A: ActuatorPort, L: Indicator>(
        &mut self,
        to: SystemState,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ActuatorError> {
        ctx.handles
            .indicator
            .on_state_changed(DisplayStatus::State(to));

        match to {
            SystemState::WarmUp => self.begin_phase(self.setpoints.warm_up_f, ctx),
            SystemState::FullTemp => self.begin_phase(self.setpoints.full_temp_f, ctx),
            SystemState::Idle | SystemState::Error => ctx.handles.actuator.force_low()?,
            _ => {}
        }
        Ok(())
    }

    fn begin_phase<A: ActuatorPort, L: Indicator>(
        &mut self,
        setpoint: f32,
        ctx: &mut MachineContext<'_, A, L>,
    ) {
        ctx.handles.pid.reset();
        ctx.handles.pid.set_setpoint(setpoint);
        self.reached.reset();
    }

    fn on_button<A: ActuatorPort, L: Indicator>(
        &mut self,
        button: Button,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ControlError> {
        use SystemState::*;

        let to = match (self.current, button) {
            (Error, Button::Initialize) => {
                return self.clear_fault(ClearRequest::Initialize, ctx);
            }
            (Idle, Button::Initialize) => SelfCheck,
            (SystemArmed, Button::Start) => WarmUp,
            (WarmUp, Button::Start) => Shutdown,
            (WarmUpComplete, Button::Start) => FullTemp,
            (FullTemp, Button::Initialize) => WarmUp,
            (FullTempComplete, Button::Start) => Shutdown,
            (FullTempComplete, Button::Initialize) => WarmUp,
            (state, button) => {
                warn!("{} ignored in {}", button, state.name());
                return Ok(());
            }
        };
        settle(self.request(to, ctx))
    }

    fn clear_fault<A: ActuatorPort, L: Indicator>(
        &mut self,
        request: ClearRequest,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ControlError> {
        if self.current != SystemState::Error {
            debug!("{} ignored outside ERROR", request);
            return Ok(());
        }
        match ctx.faults.try_clear(request) {
            Ok(_) | Err(ClearError::NoFault) => settle(self.request(SystemState::Idle, ctx)),
            Err(e) => {
                warn!("Fault not cleared: {}", e);
                Ok(())
            }
        }
    }

    fn run<A: ActuatorPort, L: Indicator>(
        &mut self,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ControlError> {
        match self.current {
            SystemState::Idle | SystemState::SystemArmed | SystemState::Error => Ok(()),
            SystemState::SelfCheck => self.run_self_check(ctx),
            SystemState::WarmUp | SystemState::FullTemp => {
                self.regulate(ctx)?;
                self.check_setpoint(ctx)
            }
            SystemState::WarmUpComplete | SystemState::FullTempComplete => self.regulate(ctx),
            SystemState::Shutdown => {
                if ctx.handles.actuator.ramp_down(self.ramp_step_ma)? {
                    info!("Shutdown ramp complete");
                    settle(self.request(SystemState::Idle, ctx))?;
                }
                Ok(())
            }
        }
    }

    fn run_self_check<A: ActuatorPort, L: Indicator>(
        &mut self,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ControlError> {
        let now = ctx.now_ms;
        let failure = if let Some(fault) = ctx.blower.verify(now, ctx.sensors.airflow) {
            Some(fault)
        } else if ctx.sensors.temperature.is_err() {
            Some(
                FaultRecord::new(FaultKind::SelfCheck, now)
                    .with_message("Temperature sensor not responding"),
            )
        } else if ctx.sensors.current == Err(SensorError::SignalIntegrity) {
            Some(
                FaultRecord::new(FaultKind::SelfCheck, now)
                    .with_message("Current loop signal out of range"),
            )
        } else {
            None
        };

        match failure {
            None => {
                info!("Self-check passed");
                settle(self.request(SystemState::SystemArmed, ctx))
            }
            Some(record) => {
                error!("Self-check failed: {}", record.message);
                ctx.faults.latch(record);
                settle(self.request(SystemState::Error, ctx))
            }
        }
    }

    /// Drive the output from the PID regulator
    ///
    /// Without a reading the previous output is held.
    fn regulate<A: ActuatorPort, L: Indicator>(
        &mut self,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ControlError> {
        match ctx.sensors.temperature {
            Ok(t) if !t.is_finite() => Err(ControlError::NonFiniteMeasurement),
            Ok(t) => {
                let output = ctx.handles.pid.compute(t, ctx.now_ms);
                ctx.handles.actuator.set(output)?;
                Ok(())
            }
            Err(_) => Ok(()),
        }
    }

    fn check_setpoint<A: ActuatorPort, L: Indicator>(
        &mut self,
        ctx: &mut MachineContext<'_, A, L>,
    ) -> Result<(), ControlError> {
        let Ok(temperature) = ctx.sensors.temperature else {
            return Ok(());
        };
        let setpoint = ctx.handles.pid.setpoint();
        if self.reached.update(temperature, setpoint) == Some(Crossing::Rising) {
            let event = Event::new(EventKind::TemperatureReached(temperature), ctx.now_ms);
            return self.handle_event(event, ctx);
        }
        Ok(())
    }
}
