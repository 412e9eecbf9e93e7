//! Configuration types
//!
//! Board-agnostic configuration structures. The firmware fills these from
//! `controller.toml` with [`parse_config`]; every group falls back to its
//! `Default`.

pub mod hardware;
pub mod parse;
pub mod types;

pub use hardware::*;
pub use parse::{parse_config, ParseError};
pub use types::*;
