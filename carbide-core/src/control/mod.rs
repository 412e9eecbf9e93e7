//! Closed-loop control
//!
//! The PID regulator turns a setpoint and a measured temperature into a
//! loop current; the actuator owns the single output register.

pub mod actuator;
pub mod pid;
pub mod threshold;

pub use actuator::Actuator;
pub use pid::PidRegulator;
pub use threshold::{Crossing, Hysteresis};
