//! Command dispatcher
//!
//! Executes one parsed command line against the controller and returns
//! its reply. The dispatcher owns the Automatic/Manual switch: in
//! Automatic mode the state machine drives the actuator, in Manual mode
//! only `S:` commands and `C:STOP` do.
//!
//! Queries answer from the last cycle's snapshot and never touch the
//! hardware.

use carbide_protocol::{
    Command, ControlAction, ErrorReply, FaultNotice, ManualActionRecord, Query, Response,
    Setting, TransportPolicy,
};

use crate::controller::Controller;
use crate::error::ControlError;
use crate::state::{Button, Event, SystemState, TransitionError};
use crate::traits::{ActuatorError, ActuatorPort, DisplayStatus, Indicator};

/// Who writes the actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// State machine and PID regulator
    Automatic,
    /// Operator via `S:` commands
    Manual,
}

impl<A: ActuatorPort, L: Indicator> Controller<A, L> {
    /// Execute one command line received on a transport with `policy`
    pub fn dispatch(&mut self, line: &str, policy: TransportPolicy, now_ms: u64) -> Response {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                debug!("Rejected command: {}", e);
                return ErrorReply::from(e).into();
            }
        };

        if !policy.permits(command.class()) {
            return ErrorReply::ReadOnly.into();
        }

        match command {
            Command::Control(action) => self.control(action, now_ms),
            Command::Get(query) => self.query(query),
            Command::Set(setting) => self.set(setting, now_ms),
        }
    }

    fn control(&mut self, action: ControlAction, now_ms: u64) -> Response {
        match action {
            ControlAction::Init => self.press(Button::Initialize, "System initializing", now_ms),
            ControlAction::Start => self.press(Button::Start, "Start command processed", now_ms),
            ControlAction::Stop => self.stop(now_ms),
            ControlAction::ManualMode => self.enter_manual(now_ms),
            ControlAction::AutoMode => self.exit_manual(now_ms),
        }
    }

    /// Remote equivalent of a panel button
    fn press(&mut self, button: Button, reply: &'static str, now_ms: u64) -> Response {
        if self.mode == ControlMode::Manual {
            return ErrorReply::NotInManualMode.into();
        }

        let event = Event::button(button, now_ms);
        let (machine, mut ctx) = self.parts(now_ms);
        match machine.handle_event(event, &mut ctx) {
            Ok(()) => Response::Ok(reply),
            Err(e) => {
                self.fail_safe(e, now_ms);
                ErrorReply::OutputWriteFailed.into()
            }
        }
    }

    fn stop(&mut self, now_ms: u64) -> Response {
        if self.mode == ControlMode::Manual {
            if let Err(e) = self.handles.actuator.force_low() {
                return self.write_failed(e, now_ms);
            }
            info!("Manual heating stopped");
            self.log_manual("STOP", now_ms);
            return Response::Ok("Manual heating stopped");
        }

        let (machine, mut ctx) = self.parts(now_ms);
        let result = machine.request(SystemState::Shutdown, &mut ctx);
        match result {
            Ok(()) => Response::Ok("System shutdown initiated"),
            Err(TransitionError::Actuator(e)) => self.write_failed(e, now_ms),
            Err(_) => ErrorReply::ShutdownUnavailable(self.machine.current().name()).into(),
        }
    }

    fn enter_manual(&mut self, now_ms: u64) -> Response {
        const REPLY: &str = "Manual control mode enabled";

        if self.mode == ControlMode::Manual {
            return Response::Ok(REPLY);
        }
        if let Some(fault) = self.faults.active() {
            warn!("Manual mode refused, fault {} latched", fault.code);
            return ErrorReply::FaultActive.into();
        }

        self.handles.pid.reset();
        if let Err(e) = self.handles.actuator.force_low() {
            return self.write_failed(e, now_ms);
        }
        self.mode = ControlMode::Manual;
        self.pending.clear();
        self.handles
            .indicator
            .on_state_changed(DisplayStatus::ManualControl);
        info!("Manual control enabled in {}", self.machine.current().name());
        Response::Ok(REPLY)
    }

    fn exit_manual(&mut self, now_ms: u64) -> Response {
        const REPLY: &str = "Automatic control mode enabled";

        if self.mode == ControlMode::Automatic {
            return Response::Ok(REPLY);
        }

        self.mode = ControlMode::Automatic;
        let (machine, mut ctx) = self.parts(now_ms);
        let result = machine.return_to_idle(&mut ctx);
        match result {
            Ok(()) => {
                info!("Automatic control enabled");
                Response::Ok(REPLY)
            }
            Err(e) => self.write_failed(e, now_ms),
        }
    }

    fn query(&self, query: Query) -> Response {
        let snapshot = &self.snapshot;
        match query {
            Query::Temperature => match snapshot.temperature {
                Ok(t) => Response::Temperature(t),
                Err(_) => ErrorReply::TempReadFailed.into(),
            },
            Query::BlowerTemperature => match snapshot.secondary_temperature {
                Ok(t) => Response::BlowerTemperature(t),
                Err(_) => ErrorReply::BlowerTempReadFailed.into(),
            },
            Query::Current => match snapshot.current {
                Ok(a) => Response::Current(a),
                Err(_) => ErrorReply::CurrentReadFailed.into(),
            },
            Query::State => Response::State(self.status().name()),
            Query::Output => Response::Output(self.output()),
            Query::OutputPercent => {
                Response::OutputPercent(self.config.output.ma_to_percent(self.output()))
            }
            Query::Pid => {
                if self.mode == ControlMode::Manual {
                    return ErrorReply::PidInactive.into();
                }
                let gains = self.handles.pid.config();
                Response::Pid {
                    kp: gains.kp,
                    ki: gains.ki,
                    kd: gains.kd,
                }
            }
            Query::Fault => Response::Fault(self.faults.active().map(|f| FaultNotice::from(*f))),
        }
    }

    fn set(&mut self, setting: Setting, now_ms: u64) -> Response {
        if self.mode != ControlMode::Manual {
            return ErrorReply::ManualModeRequired.into();
        }

        let (result, action) = match setting {
            Setting::Output(ma) => (self.handles.actuator.set(ma), "SET_OUTPUT"),
            Setting::OutputIncrement(delta) => {
                (self.handles.actuator.increment(delta), "INCREMENT_OUTPUT")
            }
        };

        match result {
            Ok(applied) => {
                info!("Manual output {}mA", applied);
                self.log_manual(action, now_ms);
                match setting {
                    Setting::Output(_) => Response::OutputSet(applied),
                    Setting::OutputIncrement(_) => Response::OutputIncremented(applied),
                }
            }
            Err(e) => self.write_failed(e, now_ms),
        }
    }

    fn write_failed(&mut self, e: ActuatorError, now_ms: u64) -> Response {
        self.fail_safe(ControlError::Actuator(e), now_ms);
        ErrorReply::OutputWriteFailed.into()
    }

    /// Queue a manual action for the telemetry log, dropping the oldest if full
    fn log_manual(&mut self, action: &'static str, now_ms: u64) {
        let record = ManualActionRecord {
            timestamp_ms: now_ms,
            action,
            temperature: self.snapshot.temperature.ok(),
            current: self.snapshot.current.ok(),
            output_ma: self.output(),
        };
        if self.manual_log.is_full() {
            self.manual_log.pop_front();
        }
        let _ = self.manual_log.push_back(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::Bench;
    use crate::traits::SensorError;

    #[test]
    fn test_read_only_transport() {
        let mut bench = Bench::new();
        bench.cycle();
        assert_eq!(bench.query("C:INIT"), "ERROR:Telemetry interface is read-only");
        assert_eq!(
            bench.query("S:OUTPUT=10"),
            "ERROR:Telemetry interface is read-only"
        );
        assert_eq!(bench.controller.state(), SystemState::Idle);

        assert_eq!(bench.query("G:STATE"), "STATE:IDLE");
        assert_eq!(bench.query("G:TEMP"), "TEMP:70.0");
        assert_eq!(bench.query("G:BLOWER_TEMP"), "BLOWER_TEMP:68.0");
        assert_eq!(bench.query("G:CURRENT"), "CURRENT:0.00");
    }

    #[test]
    fn test_malformed_commands() {
        let mut bench = Bench::new();
        assert_eq!(bench.send("HELLO"), "ERROR:Invalid command format");
        assert_eq!(bench.send(""), "ERROR:Invalid command format");
        assert_eq!(bench.send("C:REBOOT"), "ERROR:Unknown command");
        assert_eq!(bench.send("X:TEMP"), "ERROR:Unknown command");
        assert_eq!(bench.send("S:OUTPUT=abc"), "ERROR:Invalid output value");
        assert_eq!(bench.send("S:OUTPUT_INCREMENT"), "ERROR:Invalid increment value");
    }

    #[test]
    fn test_commands_case_insensitive() {
        let mut bench = Bench::new();
        bench.cycle();
        assert_eq!(bench.send("  g:state "), "STATE:IDLE");
        assert_eq!(bench.send("c:manual_mode"), "OK:Manual control mode enabled");
        assert_eq!(bench.send("s:output:8"), "OK:Output set to 8.00mA");
    }

    #[test]
    fn test_set_requires_manual() {
        let mut bench = Bench::new();
        assert_eq!(
            bench.send("S:OUTPUT=12"),
            "ERROR:Manual mode required for direct output control"
        );
        assert_eq!(
            bench.send("S:OUTPUT_INCREMENT=1"),
            "ERROR:Manual mode required for direct output control"
        );
        assert_eq!(bench.controller.output(), 4.0);
    }

    #[test]
    fn test_buttons_refused_in_manual() {
        let mut bench = Bench::new();
        bench.send("C:MANUAL_MODE");
        assert_eq!(bench.send("C:INIT"), "ERROR:Not available in manual mode");
        assert_eq!(bench.send("C:START"), "ERROR:Not available in manual mode");
        assert_eq!(bench.controller.state(), SystemState::Idle);
    }

    #[test]
    fn test_panel_ignored_in_manual() {
        let mut bench = Bench::new();
        bench.send("C:MANUAL_MODE");
        bench.plant.inputs.initialize = true;
        for _ in 0..3 {
            bench.cycle();
        }
        assert_eq!(bench.controller.state(), SystemState::Idle);
        assert_eq!(bench.controller.mode(), ControlMode::Manual);
    }

    #[test]
    fn test_output_clamped() {
        let mut bench = Bench::new();
        bench.send("C:MANUAL_MODE");
        assert_eq!(bench.send("S:OUTPUT=25"), "OK:Output set to 20.00mA");
        assert_eq!(
            bench.send("S:OUTPUT_INCREMENT=3"),
            "OK:Output incremented to 20.00mA"
        );
        assert_eq!(bench.send("S:OUTPUT=-3"), "OK:Output set to 4.00mA");
        assert_eq!(
            bench.send("S:OUTPUT_INCREMENT=-1"),
            "OK:Output incremented to 4.00mA"
        );
        assert_eq!(bench.send("S:OUTPUT_INCREMENT=+2.5"), "OK:Output incremented to 6.50mA");
    }

    #[test]
    fn test_output_percent() {
        let mut bench = Bench::new();
        assert_eq!(bench.send("G:OUTPUT_PCT"), "OUTPUT_PCT:0.00");
        bench.send("C:MANUAL_MODE");
        bench.send("S:OUTPUT=12");
        assert_eq!(bench.send("G:OUTPUT_PCT"), "OUTPUT_PCT:50.00");
    }

    #[test]
    fn test_stop() {
        let mut bench = Bench::armed();
        assert_eq!(bench.send("C:STOP"), "ERROR:Shutdown not available in SYSTEM_ARMED");
        assert_eq!(bench.controller.state(), SystemState::SystemArmed);

        bench.send("C:START");
        bench.cycle();
        assert_eq!(bench.send("C:STOP"), "OK:System shutdown initiated");
        assert_eq!(bench.controller.state(), SystemState::Shutdown);

        let mut bench = Bench::new();
        bench.send("C:MANUAL_MODE");
        bench.send("S:OUTPUT=15");
        assert_eq!(bench.send("C:STOP"), "OK:Manual heating stopped");
        assert_eq!(bench.controller.output(), 4.0);
        assert_eq!(bench.controller.mode(), ControlMode::Manual);
    }

    #[test]
    fn test_pid_query() {
        let mut bench = Bench::new();
        assert_eq!(bench.send("G:PID"), "PID:2.00,0.10,0.50");
        bench.send("C:MANUAL_MODE");
        assert_eq!(bench.send("G:PID"), "ERROR:PID not active in manual mode");
    }

    #[test]
    fn test_manual_entry_resets_pid() {
        let mut bench = Bench::armed();
        bench.plant.temperature = Ok(98.0);
        bench.send("C:START");
        for _ in 0..12 {
            bench.cycle();
        }
        assert!(bench.controller.pid().integral() > 0.0);

        bench.send("C:MANUAL_MODE");
        assert_eq!(bench.controller.pid().integral(), 0.0);
        assert_eq!(bench.controller.output(), 4.0);
        assert_eq!(
            bench.controller.indicator().statuses.last(),
            Some(&DisplayStatus::ManualControl)
        );
    }

    #[test]
    fn test_manual_refused_while_faulted() {
        let mut bench = Bench::new();
        bench.plant.current = Err(SensorError::SignalIntegrity);
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::Error);
        assert_eq!(bench.send("C:MANUAL_MODE"), "ERROR:Fault active - clear fault first");
        assert_eq!(bench.controller.mode(), ControlMode::Automatic);
        assert_eq!(
            bench.send("G:FAULT"),
            "FAULT:104,RECOVERABLE,Current loop signal out of range"
        );
    }

    #[test]
    fn test_fault_cancels_manual() {
        let mut bench = Bench::new();
        bench.send("C:MANUAL_MODE");
        bench.send("S:OUTPUT=14");
        bench.plant.current = Ok(120.0);
        bench.cycle();

        assert_eq!(bench.controller.mode(), ControlMode::Automatic);
        assert_eq!(bench.controller.state(), SystemState::Error);
        assert_eq!(bench.controller.output(), 4.0);
        assert_eq!(bench.send("G:STATE"), "STATE:ERROR");
    }

    #[test]
    fn test_manual_without_airflow_trips_once_energized() {
        let mut bench = Bench::new();
        bench.plant.airflow = false;
        bench.cycle();
        bench.send("C:MANUAL_MODE");

        // Output at the low bound does not need the blower
        bench.cycle();
        assert_eq!(bench.controller.mode(), ControlMode::Manual);

        bench.send("S:OUTPUT=8");
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::Error);
        assert_eq!(bench.controller.active_fault().map(|f| f.code), Some(101));
    }

    #[test]
    fn test_manual_actions_logged() {
        let mut bench = Bench::new();
        bench.cycle();
        bench.send("C:MANUAL_MODE");
        bench.send("S:OUTPUT=12.5");

        let record = bench.controller.pop_manual_action().unwrap();
        assert_eq!(
            record.to_string(),
            "0.1,MANUAL_CONTROL,SET_OUTPUT,70.0,0.00,12.50"
        );
        assert_eq!(bench.controller.pop_manual_action(), None);

        for _ in 0..6 {
            bench.send("S:OUTPUT_INCREMENT=0.5");
        }
        let mut count = 0;
        while bench.controller.pop_manual_action().is_some() {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn test_auto_mode_when_already_automatic() {
        let mut bench = Bench::armed();
        assert_eq!(bench.send("C:AUTO_MODE"), "OK:Automatic control mode enabled");
        assert_eq!(bench.controller.state(), SystemState::SystemArmed);
    }
}
