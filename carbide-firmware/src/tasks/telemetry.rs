//! Telemetry stream task
//!
//! Read-only transport. Greets the session, then writes one CSV record
//! per telemetry interval, a record for every manual output change and a
//! line for every new fault. Incoming lines are answered with the
//! read-only dispatch policy, so only `G:` queries succeed.

use core::fmt::Write as _;

use defmt::*;
use embassy_futures::select::{select4, Either4};
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::Instant;
use embedded_io_async::{Read, Write};
use heapless::String;

use carbide_core::telemetry::TelemetryCadence;
use carbide_protocol::{LineAssembler, Response, TransportPolicy, CSV_HEADER, GREETING};

use crate::board::SharedController;
use crate::channels::{FAULTS, MANUAL_ACTIONS, TELEMETRY};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 32;

/// Longest CSV record
const RECORD_LEN: usize = 160;

#[embassy_executor::task]
pub async fn telemetry_task(
    controller: &'static SharedController,
    mut tx: BufferedUartTx,
    mut rx: BufferedUartRx,
    interval_ms: u32,
    fragment_timeout_ms: u32,
) {
    info!("Telemetry task started, {} ms interval", interval_ms);

    let Ok(mut faults) = FAULTS.subscriber() else {
        error!("No fault subscriber slot for telemetry");
        return;
    };

    write_line(&mut tx, GREETING).await;
    write_line(&mut tx, CSV_HEADER).await;

    let mut cadence = TelemetryCadence::new(interval_ms);
    let mut assembler = LineAssembler::new(u64::from(fragment_timeout_ms));
    let mut buf = [0u8; RX_BUF_SIZE];
    let mut record: String<RECORD_LEN> = String::new();

    loop {
        record.clear();
        match select4(
            TELEMETRY.wait(),
            MANUAL_ACTIONS.receive(),
            faults.next_message_pure(),
            rx.read(&mut buf),
        )
        .await
        {
            Either4::First(snapshot) => {
                if !cadence.due(snapshot.timestamp_ms) {
                    continue;
                }
                let _ = write!(record, "{}", snapshot.to_record());
                write_line(&mut tx, &record).await;
            }
            Either4::Second(action) => {
                let _ = write!(record, "{}", action);
                write_line(&mut tx, &record).await;
            }
            Either4::Third(notice) => {
                write_line(&mut tx, &Response::Fault(Some(notice)).to_line()).await;
            }
            Either4::Fourth(Ok(n)) => {
                let now_ms = Instant::now().as_millis();
                for &byte in &buf[..n] {
                    match assembler.feed(byte, now_ms) {
                        Ok(Some(line)) => {
                            let response = controller
                                .lock()
                                .await
                                .dispatch(&line, TransportPolicy::ReadOnly, now_ms);
                            write_line(&mut tx, &response.to_line()).await;
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Telemetry line dropped: {:?}", e),
                    }
                }
            }
            Either4::Fourth(Err(e)) => {
                warn!("Telemetry read error: {:?}", e);
            }
        }
    }
}

async fn write_line(tx: &mut BufferedUartTx, text: &str) {
    let result = match tx.write_all(text.as_bytes()).await {
        Ok(()) => tx.write_all(b"\r\n").await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!("Telemetry write failed: {:?}", e);
    }
}
