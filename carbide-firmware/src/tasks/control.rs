//! Control loop task
//!
//! Runs one controller cycle per period and fans the results out: the
//! snapshot to the telemetry stream, manual actions to the data log and
//! new faults to every transport.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};
use portable_atomic::Ordering;

use carbide_protocol::FaultNotice;

use crate::board::{Sensors, SharedController};
use crate::channels::{CYCLE_OVERRUNS, FAULTS, MANUAL_ACTIONS, TELEMETRY};

#[embassy_executor::task]
pub async fn control_task(controller: &'static SharedController, mut sensors: Sensors, cycle_ms: u32) {
    info!("Control task started, {} ms cycle", cycle_ms);

    let period = Duration::from_millis(u64::from(cycle_ms));
    let faults = FAULTS.immediate_publisher();
    let mut ticker = Ticker::every(period);

    loop {
        ticker.next().await;
        let started = Instant::now();

        let outcome = {
            let mut ctl = controller.lock().await;
            let outcome = ctl.cycle(started.as_millis(), &mut sensors);
            while let Some(record) = ctl.pop_manual_action() {
                if MANUAL_ACTIONS.try_send(record).is_err() {
                    warn!("Manual action queue full, dropping record");
                }
            }
            outcome
        };

        TELEMETRY.signal(outcome.telemetry);

        if let Some(fault) = outcome.new_fault {
            error!("Fault {}: {}", fault.code, fault.message);
            faults.publish_immediate(FaultNotice::from(fault));
        }

        if started.elapsed() > period {
            let overruns = CYCLE_OVERRUNS.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("Control cycle overran its period ({} total)", overruns);
        }
    }
}
