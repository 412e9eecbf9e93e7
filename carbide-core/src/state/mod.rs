//! Heating sequence state machine
//!
//! Defines the authoritative automatic-mode behaviour. The set of states
//! is closed and every transition is checked against one table.

pub mod events;
pub mod machine;
pub mod sequencer;

pub use events::{Button, Event, EventKind};
pub use machine::{SystemState, TransitionError};
pub use sequencer::{ControlHandles, MachineContext, StateMachine};
