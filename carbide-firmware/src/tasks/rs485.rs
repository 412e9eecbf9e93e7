//! RS-485 command bus task
//!
//! Full-control transport. Lines are assembled from the receive stream,
//! dispatched against the controller and answered on the same bus. The
//! transceiver echoes our own replies back, so the echo is filtered out
//! before line assembly.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::uart::BufferedUartRx;
use embassy_time::Instant;
use embedded_io_async::Read;
use heapless::Vec;

use carbide_drivers::EchoFilter;
use carbide_protocol::{LineAssembler, Response, ResponseLine, TransportPolicy, MAX_RESPONSE_LEN};

use crate::board::{BusPort, SharedController};
use crate::channels::FAULTS;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Time allowed for the echo to finish arriving after a send (ms)
const ECHO_WINDOW_MS: u64 = 50;

#[embassy_executor::task]
pub async fn rs485_task(
    controller: &'static SharedController,
    mut rx: BufferedUartRx,
    mut port: BusPort,
    fragment_timeout_ms: u32,
) {
    info!("RS-485 task started at {} baud", port.line().baudrate);

    let Ok(mut faults) = FAULTS.subscriber() else {
        error!("No fault subscriber slot for RS-485");
        return;
    };

    let mut assembler = LineAssembler::new(u64::from(fragment_timeout_ms));
    let mut echo = EchoFilter::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match select(rx.read(&mut buf), faults.next_message_pure()).await {
            Either::First(Ok(n)) => {
                let now_ms = Instant::now().as_millis();
                for &byte in &buf[..n] {
                    if !echo.accept(byte, now_ms) {
                        continue;
                    }
                    match assembler.feed(byte, now_ms) {
                        Ok(Some(line)) => {
                            debug!("RS-485 command: {}", line.as_str());
                            let response = controller
                                .lock()
                                .await
                                .dispatch(&line, TransportPolicy::Control, now_ms);
                            send_line(&mut port, &mut echo, &response.to_line()).await;
                        }
                        Ok(None) => {}
                        Err(e) => warn!("RS-485 line dropped: {:?}", e),
                    }
                }
            }
            Either::First(Err(e)) => {
                warn!("RS-485 read error: {:?}", e);
            }
            Either::Second(notice) => {
                send_line(&mut port, &mut echo, &Response::Fault(Some(notice)).to_line()).await;
            }
        }
    }
}

async fn send_line(port: &mut BusPort, echo: &mut EchoFilter, line: &ResponseLine) {
    let mut frame: Vec<u8, { MAX_RESPONSE_LEN + 2 }> = Vec::new();
    // Capacity covers the longest line plus CRLF
    let _ = frame.extend_from_slice(line.as_bytes());
    let _ = frame.extend_from_slice(b"\r\n");

    if let Err(e) = port.send(&frame).await {
        warn!("RS-485 send failed: {:?}", e);
        return;
    }
    echo.arm(&frame, Instant::now().as_millis() + ECHO_WINDOW_MS);
}
