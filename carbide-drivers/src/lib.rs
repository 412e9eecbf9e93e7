//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the port traits
//! defined in carbide-core, built on `embedded-hal` 1.0 and carbide-hal:
//!
//! - 4-20 mA loop output (PWM into a V/I converter)
//! - 4-20 mA loop transmitter inputs (temperature, heater current)
//! - Blower current switch and panel inputs
//! - RS-485 half-duplex transmit with driver-enable turnaround
//! - Indicator relay bank

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod indicator;
pub mod output;
pub mod rs485;
pub mod sensor;

pub use indicator::{IndicatorRelays, Relay};
pub use output::LoopOutput;
pub use rs485::{EchoFilter, Rs485Error, Rs485Port};
pub use sensor::{AirflowSwitch, LoopTransmitter, PanelInputs, SensorBank, TransmitterConfig};
