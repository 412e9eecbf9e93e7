//! Time-based debouncing
//!
//! A raw level must hold steady for the configured time before it becomes
//! the stable level. Press and release use separate hold times so the
//! emergency stop can trip immediately but release only after it has
//! stayed closed for a while.

use heapless::Vec;

use crate::config::InputConfig;
use crate::state::{Button, Event, EventKind};
use crate::traits::DiscreteInputs;

/// Stable level change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    press_ms: u32,
    release_ms: u32,
    stable: bool,
    candidate: bool,
    since_ms: u64,
}

impl Debouncer {
    pub fn new(press_ms: u32, release_ms: u32) -> Self {
        Self {
            press_ms,
            release_ms,
            stable: false,
            candidate: false,
            since_ms: 0,
        }
    }

    /// Feed the raw level sampled at `now_ms`
    pub fn update(&mut self, raw: bool, now_ms: u64) -> Option<Edge> {
        if raw == self.stable {
            self.candidate = raw;
            return None;
        }
        if raw != self.candidate {
            self.candidate = raw;
            self.since_ms = now_ms;
        }

        let hold = if raw { self.press_ms } else { self.release_ms };
        if now_ms.saturating_sub(self.since_ms) < u64::from(hold) {
            return None;
        }

        self.stable = raw;
        Some(if raw { Edge::Pressed } else { Edge::Released })
    }

    pub fn is_pressed(&self) -> bool {
        self.stable
    }
}

/// The panel's four discrete inputs
#[derive(Debug, Clone, Copy)]
pub struct InputBank {
    initialize: Debouncer,
    start: Debouncer,
    estop: Debouncer,
    hard_reset: Debouncer,
}

impl InputBank {
    pub fn new(config: &InputConfig) -> Self {
        let ms = config.debounce_ms;
        Self {
            initialize: Debouncer::new(ms, ms),
            start: Debouncer::new(ms, ms),
            estop: Debouncer::new(0, config.estop_release_ms),
            hard_reset: Debouncer::new(ms, ms),
        }
    }

    /// Debounce one sample of every input
    ///
    /// Emergency stop edges come first in the returned list.
    pub fn update(&mut self, raw: DiscreteInputs, now_ms: u64) -> Vec<Event, 4> {
        let mut events = Vec::new();

        match self.estop.update(raw.estop, now_ms) {
            Some(Edge::Pressed) => {
                warn!("Emergency stop activated");
                let _ = events.push(Event::new(EventKind::EstopActivated, now_ms));
            }
            Some(Edge::Released) => {
                info!("Emergency stop released");
                let _ = events.push(Event::new(EventKind::EstopCleared, now_ms));
            }
            None => {}
        }
        if self.hard_reset.update(raw.hard_reset, now_ms) == Some(Edge::Pressed) {
            let _ = events.push(Event::new(EventKind::HardReset, now_ms));
        }
        if self.initialize.update(raw.initialize, now_ms) == Some(Edge::Pressed) {
            let _ = events.push(Event::button(Button::Initialize, now_ms));
        }
        if self.start.update(raw.start, now_ms) == Some(Edge::Pressed) {
            let _ = events.push(Event::button(Button::Start, now_ms));
        }

        events
    }

    /// Debounced emergency stop level
    pub fn estop_active(&self) -> bool {
        self.estop.is_pressed()
    }
}
