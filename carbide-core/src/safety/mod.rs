//! Safety layer
//!
//! The evaluator runs once per cycle before any actuator decision and
//! yields at most one fault. The latch holds that fault until an
//! acknowledgment of the right kind arrives.

pub mod blower;
pub mod evaluator;
pub mod fault;
pub mod latch;

pub use blower::BlowerInterlock;
pub use evaluator::{SafetyContext, SafetyEvaluator};
pub use fault::{FaultKind, FaultRecord, Severity};
pub use latch::{ClearError, ClearRequest, FaultLatch};
