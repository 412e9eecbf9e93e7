//! Embassy async tasks
//!
//! The control task owns the sensors and runs the cycle. Each transport
//! gets its own task that only touches the controller to dispatch a line.

pub mod control;
pub mod rs485;
pub mod telemetry;

pub use control::control_task;
pub use rs485::rs485_task;
pub use telemetry::telemetry_task;
