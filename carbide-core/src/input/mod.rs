//! Discrete panel inputs

pub mod debounce;

pub use debounce::{Debouncer, Edge, InputBank};
