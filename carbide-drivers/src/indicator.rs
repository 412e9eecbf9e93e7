//! Indicator relay bank
//!
//! Four panel relays driven from controller status:
//!
//! - threshold: element at or above the threshold temperature, with
//!   hysteresis so the lamp does not chatter
//! - PID active: automatic mode in a regulating state
//! - heating: loop output above the heating threshold
//! - error: blinks in bursts while the controller is in ERROR
//!
//! Blink timing is derived from cycle timestamps, so the pattern advances
//! at the control cycle rate.

use carbide_core::config::IndicatorConfig;
use carbide_core::control::Hysteresis;
use carbide_core::telemetry::TelemetrySnapshot;
use carbide_core::traits::{DisplayStatus, Indicator};
use embedded_hal::digital::{OutputPin, PinState};

/// Panel relay positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Relay {
    Threshold = 0,
    PidActive = 1,
    Heating = 2,
    Error = 3,
}

pub struct IndicatorRelays<P> {
    pins: [P; 4],
    levels: [Option<bool>; 4],
    config: IndicatorConfig,
    threshold: Hysteresis,
    status: Option<DisplayStatus>,
    error_since_ms: Option<u64>,
}

impl<P: OutputPin> IndicatorRelays<P> {
    pub fn new(threshold: P, pid_active: P, heating: P, error: P, config: IndicatorConfig) -> Self {
        Self {
            pins: [threshold, pid_active, heating, error],
            levels: [None; 4],
            threshold: Hysteresis::new(config.threshold_hysteresis_f),
            config,
            status: None,
            error_since_ms: None,
        }
    }

    /// Drive every relay off
    pub fn all_off(&mut self) {
        for relay in [
            Relay::Threshold,
            Relay::PidActive,
            Relay::Heating,
            Relay::Error,
        ] {
            self.drive(relay, false);
        }
    }

    /// Error relay level `elapsed_ms` into the ERROR state
    pub fn blink_level(&self, elapsed_ms: u64) -> bool {
        let interval = u64::from(self.config.blink_interval_ms.max(1));
        let burst = u64::from(self.config.blink_count) * 2 * interval;
        let period = burst + u64::from(self.config.blink_rest_ms);
        if period == 0 {
            return false;
        }
        let pos = elapsed_ms % period;
        pos < burst && (pos / interval) % 2 == 0
    }

    /// Last level successfully written to `relay`
    pub fn is_on(&self, relay: Relay) -> bool {
        self.levels[relay as usize].unwrap_or(false)
    }

    fn pid_active(&self) -> bool {
        matches!(self.status, Some(DisplayStatus::State(state)) if state.is_regulating())
    }

    fn drive(&mut self, relay: Relay, on: bool) {
        let idx = relay as usize;
        if self.levels[idx] == Some(on) {
            return;
        }
        match self.pins[idx].set_state(PinState::from(on)) {
            Ok(()) => self.levels[idx] = Some(on),
            Err(_) => warn!("Indicator relay {} write failed", relay),
        }
    }
}

impl<P: OutputPin> Indicator for IndicatorRelays<P> {
    fn on_state_changed(&mut self, status: DisplayStatus) {
        debug!("Indicator status: {}", status.name());
        self.status = Some(status);
        if !status.is_error() {
            self.error_since_ms = None;
            self.drive(Relay::Error, false);
        }
        let pid = self.pid_active();
        self.drive(Relay::PidActive, pid);
    }

    fn on_cycle(&mut self, telemetry: &TelemetrySnapshot) {
        if self.status != Some(telemetry.status) {
            self.on_state_changed(telemetry.status);
        }

        if let Some(temp) = telemetry.temperature {
            self.threshold.update(temp, self.config.threshold_f);
        }
        let above = self.threshold.is_above();
        self.drive(Relay::Threshold, above);

        let heating = telemetry.actuator_command > self.config.heating_threshold_ma;
        self.drive(Relay::Heating, heating);

        if telemetry.status.is_error() {
            let since = *self.error_since_ms.get_or_insert(telemetry.timestamp_ms);
            let level = self.blink_level(telemetry.timestamp_ms.saturating_sub(since));
            self.drive(Relay::Error, level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbide_core::state::SystemState;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    struct MockRelay {
        writes: u32,
    }

    impl ErrorType for MockRelay {
        type Error = ErrorKind;
    }

    impl OutputPin for MockRelay {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.writes += 1;
            Ok(())
        }
    }

    fn relays() -> IndicatorRelays<MockRelay> {
        IndicatorRelays::new(
            MockRelay { writes: 0 },
            MockRelay { writes: 0 },
            MockRelay { writes: 0 },
            MockRelay { writes: 0 },
            IndicatorConfig::default(),
        )
    }

    fn snapshot(at: u64, state: SystemState, temp: f32, output: f32) -> TelemetrySnapshot {
        TelemetrySnapshot {
            timestamp_ms: at,
            status: DisplayStatus::State(state),
            temperature: Some(temp),
            secondary_temperature: None,
            current: Some(0.0),
            actuator_command: output,
            airflow_ok: true,
        }
    }

    #[test]
    fn test_threshold_relay_hysteresis() {
        let mut r = relays();
        r.on_cycle(&snapshot(0, SystemState::FullTemp, 139.0, 4.0));
        assert!(!r.is_on(Relay::Threshold));

        r.on_cycle(&snapshot(100, SystemState::FullTemp, 140.0, 4.0));
        assert!(r.is_on(Relay::Threshold));

        r.on_cycle(&snapshot(200, SystemState::FullTemp, 136.0, 4.0));
        assert!(r.is_on(Relay::Threshold));

        r.on_cycle(&snapshot(300, SystemState::FullTemp, 134.0, 4.0));
        assert!(!r.is_on(Relay::Threshold));
    }

    #[test]
    fn test_pid_and_heating_relays() {
        let mut r = relays();
        r.on_state_changed(DisplayStatus::State(SystemState::WarmUp));
        assert!(r.is_on(Relay::PidActive));

        r.on_cycle(&snapshot(0, SystemState::WarmUp, 80.0, 9.0));
        assert!(r.is_on(Relay::Heating));

        r.on_state_changed(DisplayStatus::ManualControl);
        assert!(!r.is_on(Relay::PidActive));

        r.on_cycle(&snapshot(100, SystemState::Idle, 80.0, 4.0));
        assert!(!r.is_on(Relay::Heating));
    }

    #[test]
    fn test_error_blink_pattern() {
        let r = relays();
        // 5 blinks of 500 ms on / 500 ms off, then 1000 ms rest
        assert!(r.blink_level(0));
        assert!(r.blink_level(499));
        assert!(!r.blink_level(500));
        assert!(r.blink_level(4_000));
        assert!(!r.blink_level(4_500));
        assert!(!r.blink_level(5_200));
        assert!(!r.blink_level(5_999));
        assert!(r.blink_level(6_000));
    }

    #[test]
    fn test_error_relay_follows_cycles() {
        let mut r = relays();
        r.on_cycle(&snapshot(10_000, SystemState::Error, 80.0, 4.0));
        assert!(r.is_on(Relay::Error));

        r.on_cycle(&snapshot(10_600, SystemState::Error, 80.0, 4.0));
        assert!(!r.is_on(Relay::Error));

        r.on_cycle(&snapshot(11_000, SystemState::Error, 80.0, 4.0));
        assert!(r.is_on(Relay::Error));

        r.on_state_changed(DisplayStatus::State(SystemState::Idle));
        assert!(!r.is_on(Relay::Error));
    }

    #[test]
    fn test_unchanged_levels_are_not_rewritten() {
        let mut r = relays();
        for at in 0..10 {
            r.on_cycle(&snapshot(at * 100, SystemState::Idle, 70.0, 4.0));
        }
        assert_eq!(r.pins[Relay::Heating as usize].writes, 1);
        assert_eq!(r.pins[Relay::Threshold as usize].writes, 1);
    }
}
