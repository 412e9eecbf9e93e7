//! Controller bundle
//!
//! Owns every piece of mutable control state: state machine, control
//! mode, PID regulator, actuator, fault latch and the latest sensor
//! snapshot. One [`Controller::cycle`] call runs the fixed per-cycle
//! order:
//!
//! 1. Debounce discrete inputs (emergency stop handled immediately)
//! 2. Read every sensor into a snapshot
//! 3. Blower interlock and safety evaluation
//! 4. Fault → ERROR, or advance the active mode
//! 5. Publish telemetry
//!
//! Only the active mode's code path holds the actuator during step 4.

use heapless::Deque;

use carbide_protocol::ManualActionRecord;

use crate::config::ControllerConfig;
use crate::control::{Actuator, PidRegulator};
use crate::dispatch::ControlMode;
use crate::error::ControlError;
use crate::input::InputBank;
use crate::safety::{
    BlowerInterlock, FaultKind, FaultLatch, FaultRecord, SafetyContext, SafetyEvaluator,
};
use crate::state::{ControlHandles, Event, EventKind, MachineContext, StateMachine, SystemState};
use crate::telemetry::{SensorSnapshot, TelemetrySnapshot};
use crate::traits::{ActuatorError, ActuatorPort, DisplayStatus, Indicator, SensorPorts};

/// Queued button events awaiting the state machine
const EVENT_QUEUE_LEN: usize = 4;

/// Manual action log lines awaiting the telemetry transport
const MANUAL_LOG_LEN: usize = 4;

/// Result of one control cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleOutcome {
    /// Snapshot published this cycle
    pub telemetry: TelemetrySnapshot,
    /// Fault latched since the last cycle, to be broadcast once
    pub new_fault: Option<FaultRecord>,
}

pub struct Controller<A: ActuatorPort, L: Indicator> {
    pub(crate) config: ControllerConfig,
    pub(crate) machine: StateMachine,
    pub(crate) handles: ControlHandles<A, L>,
    pub(crate) mode: ControlMode,
    pub(crate) faults: FaultLatch,
    pub(crate) safety: SafetyEvaluator,
    pub(crate) blower: BlowerInterlock,
    pub(crate) inputs: InputBank,
    pub(crate) pending: Deque<Event, EVENT_QUEUE_LEN>,
    pub(crate) snapshot: SensorSnapshot,
    pub(crate) telemetry: TelemetrySnapshot,
    pub(crate) manual_log: Deque<ManualActionRecord, MANUAL_LOG_LEN>,
}

impl<A: ActuatorPort, L: Indicator> Controller<A, L> {
    pub fn new(config: ControllerConfig, port: A, indicator: L) -> Self {
        let actuator = Actuator::new(port, config.output);
        let telemetry = TelemetrySnapshot {
            timestamp_ms: 0,
            status: DisplayStatus::State(SystemState::Idle),
            temperature: None,
            secondary_temperature: None,
            current: None,
            actuator_command: actuator.value(),
            airflow_ok: false,
        };

        Self {
            machine: StateMachine::new(&config),
            handles: ControlHandles {
                pid: PidRegulator::new(config.pid, config.output),
                actuator,
                indicator,
            },
            mode: ControlMode::Automatic,
            faults: FaultLatch::new(),
            safety: SafetyEvaluator::new(config.safety),
            blower: BlowerInterlock::new(&config.blower),
            inputs: InputBank::new(&config.input),
            pending: Deque::new(),
            snapshot: SensorSnapshot::default(),
            telemetry,
            manual_log: Deque::new(),
            config,
        }
    }

    /// Drive the output to its low bound and show IDLE
    ///
    /// Call once at startup before the first cycle.
    pub fn init(&mut self) -> Result<(), ActuatorError> {
        self.handles.actuator.init()?;
        self.handles
            .indicator
            .on_state_changed(DisplayStatus::State(SystemState::Idle));
        info!("Controller ready, output at {}mA", self.handles.actuator.value());
        Ok(())
    }

    /// Run one control cycle
    ///
    /// Never fails. An unexpected error forces the output low, cancels
    /// manual mode and latches an internal fault.
    pub fn cycle<S: SensorPorts>(&mut self, now_ms: u64, sensors: &mut S) -> CycleOutcome {
        if let Err(e) = self.run_cycle(now_ms, sensors) {
            self.fail_safe(e, now_ms);
        }

        let telemetry = self.publish(now_ms);
        self.handles.indicator.on_cycle(&telemetry);

        CycleOutcome {
            telemetry,
            new_fault: self.faults.take_unannounced(),
        }
    }

    fn run_cycle<S: SensorPorts>(&mut self, now_ms: u64, sensors: &mut S) -> Result<(), ControlError> {
        let raw = sensors.read_discrete();
        for event in self.inputs.update(raw, now_ms) {
            if event.is_estop() {
                if event.kind == EventKind::EstopActivated {
                    self.leave_manual();
                }
                let (machine, mut ctx) = self.parts(now_ms);
                machine.handle_event(event, &mut ctx)?;
            } else if self.pending.push_back(event).is_err() {
                warn!("Event queue full, dropping {}", event.kind);
            }
        }

        self.snapshot = SensorSnapshot::read(sensors, self.inputs.estop_active());

        let context = SafetyContext {
            state: self.machine.current(),
            mode: self.mode,
            output_energized: self.handles.actuator.is_energized(),
        };
        let airflow = self
            .blower
            .check(now_ms, context.requires_airflow(), self.snapshot.airflow);
        let fault = self
            .safety
            .evaluate(&self.snapshot, context, airflow, now_ms);
        // Airflow is only evaluated while required, but a latched loss stays
        // present until the blower is actually running again
        let mut detected = fault.map(|f| f.kind);
        if detected.is_none()
            && !self.blower.airflow_ok()
            && self.faults.active().map(|a| a.kind) == Some(FaultKind::AirflowLoss)
        {
            detected = Some(FaultKind::AirflowLoss);
        }
        self.faults.observe(detected);

        if let Some(record) = fault {
            self.leave_manual();
            self.pending.clear();
            let event = Event::new(EventKind::ErrorOccurred(record), now_ms);
            let (machine, mut ctx) = self.parts(now_ms);
            return machine.step(Some(event), &mut ctx);
        }

        match self.mode {
            ControlMode::Automatic => {
                let event = self.pending.pop_front();
                let (machine, mut ctx) = self.parts(now_ms);
                machine.step(event, &mut ctx)
            }
            ControlMode::Manual => {
                // Panel buttons have no meaning while the operator holds the output
                while let Some(event) = self.pending.pop_front() {
                    debug!("{} ignored in manual mode", event.kind);
                }
                Ok(())
            }
        }
    }

    /// Force the output low and enter ERROR with an internal fault
    pub(crate) fn fail_safe(&mut self, cause: ControlError, now_ms: u64) {
        error!("Control cycle failed: {}", cause);
        self.leave_manual();
        self.pending.clear();
        let record = FaultRecord::new(FaultKind::Internal, now_ms);
        let (machine, mut ctx) = self.parts(now_ms);
        machine.force_error(record, &mut ctx);
    }

    /// Manual mode ends on any fault
    fn leave_manual(&mut self) {
        if self.mode == ControlMode::Manual {
            warn!("Manual mode cancelled by fault");
            self.mode = ControlMode::Automatic;
        }
    }

    fn publish(&mut self, now_ms: u64) -> TelemetrySnapshot {
        self.telemetry = TelemetrySnapshot {
            timestamp_ms: now_ms,
            status: self.status(),
            temperature: self.snapshot.temperature.ok(),
            secondary_temperature: self.snapshot.secondary_temperature.ok(),
            current: self.snapshot.current.ok(),
            actuator_command: self.handles.actuator.value(),
            airflow_ok: self.blower.airflow_ok(),
        };
        self.telemetry
    }

    /// Split into the state machine and the context it borrows
    pub(crate) fn parts(&mut self, now_ms: u64) -> (&mut StateMachine, MachineContext<'_, A, L>) {
        (
            &mut self.machine,
            MachineContext {
                now_ms,
                sensors: &self.snapshot,
                handles: &mut self.handles,
                faults: &mut self.faults,
                blower: &mut self.blower,
            },
        )
    }

    /// What the panel and telemetry show
    pub fn status(&self) -> DisplayStatus {
        match self.mode {
            ControlMode::Manual => DisplayStatus::ManualControl,
            ControlMode::Automatic => DisplayStatus::State(self.machine.current()),
        }
    }

    pub fn state(&self) -> SystemState {
        self.machine.current()
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Actuator command (mA)
    pub fn output(&self) -> f32 {
        self.handles.actuator.value()
    }

    pub fn active_fault(&self) -> Option<&FaultRecord> {
        self.faults.active()
    }

    pub fn pid(&self) -> &PidRegulator {
        &self.handles.pid
    }

    /// Latest published snapshot
    pub fn telemetry(&self) -> &TelemetrySnapshot {
        &self.telemetry
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn indicator(&self) -> &L {
        &self.handles.indicator
    }

    pub fn actuator_port(&self) -> &A {
        self.handles.actuator.port()
    }

    /// Oldest manual action not yet logged
    pub fn pop_manual_action(&mut self) -> Option<ManualActionRecord> {
        self.manual_log.pop_front()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::safety::Severity;
    use crate::traits::{DiscreteInputs, SensorError};
    use carbide_protocol::{LineAssembler, TransportPolicy};
    use proptest::prelude::*;

    #[derive(Default)]
    pub(crate) struct MockPort {
        pub writes: Vec<f32>,
        pub fail: bool,
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

    #[derive(Default)]
    pub(crate) struct Panel {
        pub statuses: Vec<DisplayStatus>,
        pub cycles: usize,
    }

    impl Indicator for Panel {
        fn on_state_changed(&mut self, status: DisplayStatus) {
            self.statuses.push(status);
        }

        fn on_cycle(&mut self, _telemetry: &TelemetrySnapshot) {
            self.cycles += 1;
        }
    }

    pub(crate) struct Plant {
        pub temperature: Result<f32, SensorError>,
        pub secondary: Result<f32, SensorError>,
        pub current: Result<f32, SensorError>,
        pub airflow: bool,
        pub inputs: DiscreteInputs,
    }

    impl Default for Plant {
        fn default() -> Self {
            Self {
                temperature: Ok(70.0),
                secondary: Ok(68.0),
                current: Ok(0.0),
                airflow: true,
                inputs: DiscreteInputs::default(),
            }
        }
    }

    impl SensorPorts for Plant {
        fn read_temperature(&mut self) -> Result<f32, SensorError> {
            self.temperature
        }

        fn read_secondary_temperature(&mut self) -> Result<f32, SensorError> {
            self.secondary
        }

        fn read_current(&mut self) -> Result<f32, SensorError> {
            self.current
        }

        fn read_airflow(&mut self) -> bool {
            self.airflow
        }

        fn read_discrete(&mut self) -> DiscreteInputs {
            self.inputs
        }
    }

    pub(crate) struct Bench {
        pub controller: Controller<MockPort, Panel>,
        pub plant: Plant,
        pub now: u64,
    }

    impl Bench {
        pub fn new() -> Self {
            let mut controller =
                Controller::new(ControllerConfig::default(), MockPort::default(), Panel::default());
            controller.init().unwrap();
            Self {
                controller,
                plant: Plant::default(),
                now: 0,
            }
        }

        pub fn cycle(&mut self) -> CycleOutcome {
            self.now += 100;
            self.controller.cycle(self.now, &mut self.plant)
        }

        pub fn send(&mut self, line: &str) -> String {
            self.controller
                .dispatch(line, TransportPolicy::Control, self.now)
                .to_line()
                .as_str()
                .to_string()
        }

        pub fn query(&mut self, line: &str) -> String {
            self.controller
                .dispatch(line, TransportPolicy::ReadOnly, self.now)
                .to_line()
                .as_str()
                .to_string()
        }

        pub fn armed() -> Self {
            let mut bench = Self::new();
            bench.cycle();
            bench.send("C:INIT");
            bench.cycle();
            assert_eq!(bench.controller.state(), SystemState::SystemArmed);
            bench
        }
    }

    #[test]
    fn test_scenario_a_init_arms() {
        let mut bench = Bench::new();
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::Idle);

        assert_eq!(bench.send("C:INIT"), "OK:System initializing");
        assert_eq!(bench.controller.state(), SystemState::SelfCheck);

        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::SystemArmed);
        assert_eq!(bench.send("G:STATE"), "STATE:SYSTEM_ARMED");
    }

    #[test]
    fn test_scenario_b_warm_up_completes() {
        let mut bench = Bench::armed();
        assert_eq!(bench.send("C:START"), "OK:Start command processed");
        assert_eq!(bench.controller.state(), SystemState::WarmUp);
        assert_eq!(bench.controller.pid().setpoint(), 100.0);

        bench.cycle();
        assert!(bench.controller.output() > 4.0);

        for t in [85.0, 95.0, 99.0] {
            bench.plant.temperature = Ok(t);
            bench.cycle();
            assert_eq!(bench.controller.state(), SystemState::WarmUp);
        }

        bench.plant.temperature = Ok(102.0);
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::WarmUpComplete);
    }

    #[test]
    fn test_scenario_c_full_temp_completes() {
        let mut bench = Bench::armed();
        bench.send("C:START");
        bench.plant.temperature = Ok(102.0);
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::WarmUpComplete);

        bench.send("C:START");
        assert_eq!(bench.controller.state(), SystemState::FullTemp);
        assert_eq!(bench.controller.pid().setpoint(), 150.0);
        assert_eq!(bench.controller.pid().integral(), 0.0);

        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::FullTemp);

        bench.plant.temperature = Ok(150.0);
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::FullTempComplete);
    }

    #[test]
    fn test_scenario_d_shutdown_ramp() {
        let mut bench = Bench::armed();
        bench.send("C:START");
        bench.cycle();
        let start = bench.controller.output();
        assert!(start > 4.0);

        bench.send("C:START");
        assert_eq!(bench.controller.state(), SystemState::Shutdown);

        let mut last = start;
        let mut saw_intermediate = false;
        for _ in 0..100 {
            bench.cycle();
            let out = bench.controller.output();
            assert!(out <= last);
            if out > 4.0 && out < start {
                saw_intermediate = true;
            }
            last = out;
            if bench.controller.state() == SystemState::Idle {
                break;
            }
        }
        assert!(saw_intermediate);
        assert_eq!(bench.controller.state(), SystemState::Idle);
        assert_eq!(bench.controller.output(), 4.0);
    }

    #[test]
    fn test_scenario_e_manual_round_trip() {
        let mut bench = Bench::armed();
        bench.send("C:START");
        bench.cycle();
        assert!(bench.controller.output() > 4.0);

        assert_eq!(bench.send("C:MANUAL_MODE"), "OK:Manual control mode enabled");
        assert_eq!(bench.controller.output(), 4.0);
        assert_eq!(bench.send("G:STATE"), "STATE:MANUAL_CONTROL");

        assert_eq!(bench.send("S:OUTPUT=12.5"), "OK:Output set to 12.50mA");
        bench.cycle();
        assert_eq!(bench.send("G:OUTPUT"), "OUTPUT:12.50");
        assert_eq!(bench.controller.telemetry().actuator_command, 12.5);

        assert_eq!(bench.send("C:AUTO_MODE"), "OK:Automatic control mode enabled");
        assert_eq!(bench.controller.output(), 4.0);
        assert_eq!(bench.controller.state(), SystemState::Idle);
        assert_eq!(bench.controller.mode(), ControlMode::Automatic);
    }

    fn feed(bench: &mut Bench, assembler: &mut LineAssembler, bytes: &[u8], at: u64) -> Vec<String> {
        let mut replies = Vec::new();
        for &b in bytes {
            if let Ok(Some(line)) = assembler.feed(b, at) {
                let reply = bench.controller.dispatch(&line, TransportPolicy::Control, at);
                replies.push(reply.to_line().as_str().to_string());
            }
        }
        replies
    }

    #[test]
    fn test_scenario_f_fragmented_command() {
        let mut bench = Bench::new();
        bench.send("C:MANUAL_MODE");
        let mut assembler = LineAssembler::new(2000);

        assert!(feed(&mut bench, &mut assembler, b"S:OUTPUT", 1000).is_empty());
        assert_eq!(
            feed(&mut bench, &mut assembler, b"=5.0\r\n", 1500),
            vec!["OK:Output set to 5.00mA"]
        );
        assert_eq!(bench.controller.output(), 5.0);

        // Second fragment arrives after the timeout
        assert!(feed(&mut bench, &mut assembler, b"S:OUTPUT", 3000).is_empty());
        assert_eq!(
            feed(&mut bench, &mut assembler, b"=9.0\r\n", 5001),
            vec!["ERROR:Invalid command format"]
        );
        assert_eq!(bench.controller.output(), 5.0);
    }

    #[test]
    fn test_estop_from_any_state() {
        let setups: [fn(&mut Bench); 4] = [
            |_| {},
            |b| {
                b.send("C:START");
            },
            |b| {
                b.send("C:START");
                b.cycle();
                b.send("C:START");
            },
            |b| {
                b.send("C:MANUAL_MODE");
                b.send("S:OUTPUT=15");
            },
        ];

        for setup in setups {
            let mut bench = Bench::armed();
            setup(&mut bench);
            bench.plant.inputs.estop = true;
            let outcome = bench.cycle();

            assert_eq!(bench.controller.state(), SystemState::Error);
            assert_eq!(bench.controller.mode(), ControlMode::Automatic);
            assert_eq!(bench.controller.output(), 4.0);
            assert_eq!(outcome.new_fault.map(|f| f.code), Some(100));

            // Release, wait out the release debounce, try a soft clear
            bench.plant.inputs.estop = false;
            for _ in 0..5 {
                bench.cycle();
            }
            assert_eq!(bench.send("C:INIT"), "OK:System initializing");
            bench.cycle();
            assert_eq!(bench.controller.state(), SystemState::Error);
            assert_eq!(bench.controller.active_fault().map(|f| f.code), Some(100));
        }
    }

    #[test]
    fn test_airflow_loss_is_critical() {
        let mut bench = Bench::armed();
        bench.send("C:START");
        bench.cycle();

        bench.plant.airflow = false;
        let mut outcome = bench.cycle();
        for _ in 0..10 {
            if bench.controller.state() == SystemState::Error {
                break;
            }
            outcome = bench.cycle();
        }
        assert_eq!(bench.controller.state(), SystemState::Error);
        let fault = outcome.new_fault.unwrap();
        assert_eq!(fault.code, 101);
        assert_eq!(fault.severity, Severity::Critical);
        assert_eq!(
            bench.send("G:FAULT"),
            "FAULT:101,CRITICAL,Blower not running - airflow required for operation"
        );

        // Blower back, INIT does not clear; the physical reset does
        bench.plant.airflow = true;
        for _ in 0..6 {
            bench.cycle();
        }
        bench.send("C:INIT");
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::Error);

        bench.plant.inputs.hard_reset = true;
        for _ in 0..3 {
            bench.cycle();
        }
        assert_eq!(bench.controller.state(), SystemState::Idle);
        assert_eq!(bench.send("G:FAULT"), "FAULT:NONE");
    }

    #[test]
    fn test_hard_reset_refused_while_blower_off() {
        let mut bench = Bench::armed();
        bench.send("C:START");
        bench.cycle();

        bench.plant.airflow = false;
        for _ in 0..10 {
            if bench.controller.state() == SystemState::Error {
                break;
            }
            bench.cycle();
        }
        assert_eq!(bench.controller.state(), SystemState::Error);
        assert_eq!(bench.controller.actuator_port().writes.last(), Some(&4.0));

        bench.plant.inputs.hard_reset = true;
        for _ in 0..5 {
            bench.cycle();
        }
        assert_eq!(bench.controller.state(), SystemState::Error);
        assert_eq!(
            bench.send("G:FAULT"),
            "FAULT:101,CRITICAL,Blower not running - airflow required for operation"
        );

        // Release the key, restore the blower, then reset again
        bench.plant.inputs.hard_reset = false;
        bench.plant.airflow = true;
        for _ in 0..20 {
            bench.cycle();
        }
        bench.plant.inputs.hard_reset = true;
        for _ in 0..5 {
            bench.cycle();
        }
        assert_eq!(bench.controller.state(), SystemState::Idle);
        assert_eq!(bench.send("G:FAULT"), "FAULT:NONE");
    }

    #[test]
    fn test_fault_announced_once() {
        let mut bench = Bench::new();
        bench.plant.current = Ok(95.0);
        assert_eq!(bench.cycle().new_fault.map(|f| f.code), Some(103));
        assert_eq!(bench.cycle().new_fault, None);
        assert_eq!(bench.controller.state(), SystemState::Error);
    }

    #[test]
    fn test_recoverable_fault_cleared_by_init() {
        let mut bench = Bench::new();
        bench.plant.temperature = Ok(4000.0);
        bench.cycle();
        assert_eq!(bench.controller.active_fault().map(|f| f.code), Some(102));

        // Still out of range
        bench.send("C:INIT");
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::Error);

        bench.plant.temperature = Ok(75.0);
        bench.cycle();
        bench.send("C:INIT");
        assert_eq!(bench.controller.state(), SystemState::Idle);
    }

    #[test]
    fn test_unavailable_reading_is_not_a_fault() {
        let mut bench = Bench::armed();
        bench.plant.temperature = Err(SensorError::Unavailable);
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::SystemArmed);
        assert_eq!(bench.send("G:TEMP"), "ERROR:Temp read failed");
        assert_eq!(bench.controller.telemetry().temperature, None);
    }

    #[test]
    fn test_write_failure_fails_safe() {
        let mut bench = Bench::armed();
        bench.send("C:START");
        bench.controller.handles.actuator.port_mut().fail = true;
        let outcome = bench.cycle();

        assert_eq!(bench.controller.state(), SystemState::Error);
        assert_eq!(outcome.new_fault.map(|f| f.code), Some(199));
    }

    #[test]
    fn test_panel_buttons_queue_into_machine() {
        let mut bench = Bench::new();
        bench.plant.inputs.initialize = true;
        // Debounce holds for 50 ms; each bench cycle is 100 ms
        bench.cycle();
        bench.cycle();
        assert_eq!(bench.controller.state(), SystemState::SystemArmed);
    }

    #[test]
    fn test_indicator_sees_every_cycle() {
        let mut bench = Bench::new();
        for _ in 0..3 {
            bench.cycle();
        }
        assert_eq!(bench.controller.indicator().cycles, 3);
        assert_eq!(
            bench.controller.indicator().statuses.first(),
            Some(&DisplayStatus::State(SystemState::Idle))
        );
    }

    proptest! {
        #[test]
        fn test_manual_increments_stay_in_range(deltas in proptest::collection::vec(-50.0f32..50.0, 1..40)) {
            let mut bench = Bench::new();
            bench.send("C:MANUAL_MODE");
            for delta in deltas {
                let reply = bench.send(&format!("S:OUTPUT_INCREMENT={}", delta));
                prop_assert!(reply.starts_with("OK:Output incremented to"));
                bench.cycle();
                let published = bench.controller.telemetry().actuator_command;
                prop_assert!((4.0..=20.0).contains(&published));
            }
        }
    }
}
