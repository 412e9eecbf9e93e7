//! Board-agnostic control core for the SiC heater controller
//!
//! This crate contains all control logic that does not depend on a
//! specific board:
//!
//! - Sensor, actuator and indicator port traits
//! - Debounced discrete inputs
//! - Safety evaluation and the blower interlock
//! - PID regulation and actuator ownership
//! - The heating sequence state machine
//! - The controller bundle and its command dispatcher
//! - Telemetry snapshots
//! - Configuration type definitions
//!
//! Everything runs from one [`controller::Controller::cycle`] call per
//! control period. Nothing in here allocates or blocks.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod control;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod safety;
pub mod state;
pub mod telemetry;
pub mod traits;

pub use controller::{Controller, CycleOutcome};
pub use dispatch::ControlMode;
pub use error::ControlError;
