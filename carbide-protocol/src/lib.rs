//! Carbide Command Protocol
//!
//! Text protocol spoken by the heater controller on its two serial
//! transports: the RS-485 control bus and the read-only telemetry link.
//!
//! # Protocol Overview
//!
//! Every request is one ASCII line terminated by CR and/or LF:
//! ```text
//! ┌──────┬───┬──────────┬──────────────────┬────────┐
//! │ TYPE │ : │ NAME     │ [=VALUE | :VALUE]│ CR/LF  │
//! │ C|G|S│   │ A-Z_     │ decimal          │        │
//! └──────┴───┴──────────┴──────────────────┴────────┘
//! ```
//!
//! - `C` control commands drive the state machine or switch control mode
//! - `G` get commands are read-only queries, legal on every transport
//! - `S` set commands write the actuator directly (manual mode only)
//!
//! Every request is answered with exactly one line: `OK:<message>`,
//! `<FIELD>:<value>` or `ERROR:<message>`. The telemetry link additionally
//! carries a CSV stream and asynchronous `FAULT:` notices.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod line;
pub mod response;
pub mod telemetry;
pub mod transport;

pub use command::{Command, CommandClass, ControlAction, ParseError, Query, Setting};
pub use line::{Line, LineAssembler, LineError, FRAGMENT_TIMEOUT_MS, MAX_LINE_LEN};
pub use response::{ErrorReply, FaultNotice, Response, ResponseLine, MAX_RESPONSE_LEN};
pub use telemetry::{CsvRecord, ManualActionRecord, CSV_HEADER, GREETING};
pub use transport::TransportPolicy;
