//! Sensor drivers
//!
//! Each driver converts one physical input. [`SensorBank`] groups them
//! into the [`SensorPorts`](carbide_core::traits::SensorPorts) the
//! controller reads every cycle.

pub mod airflow;
pub mod bank;
pub mod panel;
pub mod transmitter;

pub use airflow::AirflowSwitch;
pub use bank::SensorBank;
pub use panel::PanelInputs;
pub use transmitter::{LoopTransmitter, TransmitterConfig};
