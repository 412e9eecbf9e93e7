//! Blower current switch
//!
//! A current-sensing relay on the blower motor feed closes when the motor
//! draws current. The contact pulls the input low, so low means airflow.

use embedded_hal::digital::InputPin;

pub struct AirflowSwitch<P> {
    pin: P,
}

impl<P: InputPin> AirflowSwitch<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Blower current detected
    ///
    /// A pin read error counts as no airflow.
    pub fn is_running(&mut self) -> bool {
        self.pin.is_low().unwrap_or(false)
    }
}
