//! Analog output drivers

pub mod loop_output;

pub use loop_output::LoopOutput;
