//! Inter-task communication channels
//!
//! The controller itself lives behind one mutex owned by the control task
//! and borrowed briefly by the transport tasks to dispatch commands.
//! Everything else flows through these statics.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::pubsub::PubSubChannel;
use embassy_sync::signal::Signal;
use portable_atomic::AtomicU32;

use carbide_core::telemetry::TelemetrySnapshot;
use carbide_protocol::{FaultNotice, ManualActionRecord};

/// Queued manual-control records awaiting the telemetry stream
const MANUAL_ACTION_QUEUE: usize = 4;

/// Fault notices buffered per subscriber
const FAULT_QUEUE: usize = 4;

/// RS-485 and telemetry transports
const FAULT_SUBSCRIBERS: usize = 2;

/// Snapshot published at the end of every control cycle
///
/// Readers take a copy; a slow reader only ever sees the latest one.
pub static TELEMETRY: Signal<CriticalSectionRawMutex, TelemetrySnapshot> = Signal::new();

/// Manual output changes, in the order they were applied
pub static MANUAL_ACTIONS: Channel<CriticalSectionRawMutex, ManualActionRecord, MANUAL_ACTION_QUEUE> =
    Channel::new();

/// Newly latched faults, broadcast to every transport
pub static FAULTS: PubSubChannel<
    CriticalSectionRawMutex,
    FaultNotice,
    FAULT_QUEUE,
    FAULT_SUBSCRIBERS,
    1,
> = PubSubChannel::new();

/// Control cycles that ran past their period
pub static CYCLE_OVERRUNS: AtomicU32 = AtomicU32::new(0);
