//! Operator panel inputs
//!
//! Push buttons and the reset key switch are normally open contacts to
//! ground with pull-ups, so pressed reads low. The emergency stop chain
//! is normally closed: an open chain (or a cut wire) lets the pull-up
//! win and the input reads high.

use carbide_core::traits::DiscreteInputs;
use embedded_hal::digital::InputPin;

pub struct PanelInputs<P> {
    initialize: P,
    start: P,
    estop: P,
    hard_reset: P,
}

impl<P: InputPin> PanelInputs<P> {
    pub fn new(initialize: P, start: P, estop: P, hard_reset: P) -> Self {
        Self {
            initialize,
            start,
            estop,
            hard_reset,
        }
    }

    /// Sample every input once
    ///
    /// A failed read of a button counts as released. A failed read of the
    /// emergency stop counts as asserted.
    pub fn read(&mut self) -> DiscreteInputs {
        DiscreteInputs {
            initialize: self.initialize.is_low().unwrap_or(false),
            start: self.start.is_low().unwrap_or(false),
            estop: self.estop.is_high().unwrap_or(true),
            hard_reset: self.hard_reset.is_low().unwrap_or(false),
        }
    }
}
