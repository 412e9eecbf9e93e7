//! Carbide Hardware Abstraction Layer
//!
//! Digital I/O, PWM and byte streams are covered by `embedded-hal` 1.0 and
//! `embedded-io`. This crate fills the gaps the controller needs on top of
//! those: analog input channels and serial line timing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  carbide-firmware (embassy-rp bring-up) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  carbide-drivers (loop I/O, RS-485)     │
//! └─────────────────────────────────────────┘
//!          │                       │
//!          ▼                       ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │  carbide-hal    │     │  embedded-hal   │
//! │  (this crate)   │     │  embedded-io    │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`analog::AnalogInput`] - ADC channels
//! - [`serial::LineSettings`] - UART framing and transmit timing

#![no_std]
#![deny(unsafe_code)]

pub mod analog;
pub mod serial;

pub use analog::{AnalogError, AnalogInput};
pub use serial::{DataBits, LineSettings, Parity, StopBits};
