//! Port traits
//!
//! The control core reaches the outside world only through these narrow
//! interfaces. Drivers implement them for real hardware, tests for mocks.

pub mod actuator;
pub mod indicator;
pub mod sensor;

pub use actuator::{ActuatorError, ActuatorPort};
pub use indicator::{DisplayStatus, Indicator};
pub use sensor::{DiscreteInputs, SensorError, SensorPorts};
