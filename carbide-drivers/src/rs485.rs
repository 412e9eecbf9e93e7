//! RS-485 half-duplex port
//!
//! The transceiver's driver-enable line must be held high for the whole
//! frame and released only after the last stop bit has left the shift
//! register, otherwise the tail of the reply is cut off. `flush` on most
//! UARTs returns when the FIFO drains, not when the line goes idle, so
//! the port waits out the frame time before releasing the bus.
//!
//! The receiver stays enabled while transmitting on the reference board,
//! so the reply echoes back into the RX FIFO. [`EchoFilter`] strips it
//! from the receive stream.

use carbide_hal::LineSettings;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::Write;

/// Settle time after asserting driver enable (µs)
pub const DRIVER_SETTLE_US: u32 = 5_000;

/// Minimum hold time after the last byte (µs)
pub const MIN_TURNAROUND_US: u32 = 5_000;

/// Errors from a bus transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rs485Error<E> {
    /// UART write failed
    Write(E),
    /// Driver-enable pin could not be driven
    DriverEnable,
}

pub struct Rs485Port<W, DE, D> {
    tx: W,
    driver_enable: DE,
    delay: D,
    line: LineSettings,
}

impl<W, DE, D> Rs485Port<W, DE, D>
where
    W: Write,
    DE: OutputPin,
    D: DelayNs,
{
    pub fn new(tx: W, driver_enable: DE, delay: D, line: LineSettings) -> Self {
        Self {
            tx,
            driver_enable,
            delay,
            line,
        }
    }

    /// Time to hold the driver after writing `len` bytes (µs)
    pub fn turnaround_us(&self, len: usize) -> u32 {
        let frame = self.line.transmit_time_us(len).saturating_mul(2);
        let frame = u32::try_from(frame).unwrap_or(u32::MAX);
        frame.max(MIN_TURNAROUND_US)
    }

    /// Transmit one frame, releasing the bus afterwards
    ///
    /// The driver is released even if the write fails.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), Rs485Error<W::Error>> {
        self.driver_enable
            .set_high()
            .map_err(|_| Rs485Error::DriverEnable)?;
        self.delay.delay_us(DRIVER_SETTLE_US).await;

        let written = match self.tx.write_all(bytes).await {
            Ok(()) => self.tx.flush().await,
            Err(e) => Err(e),
        };

        if written.is_ok() {
            let hold = self.turnaround_us(bytes.len());
            self.delay.delay_us(hold).await;
        }

        let released = self.driver_enable.set_low();

        written.map_err(Rs485Error::Write)?;
        released.map_err(|_| Rs485Error::DriverEnable)
    }

    pub fn line(&self) -> &LineSettings {
        &self.line
    }
}

/// Longest reply whose echo can be recognised
pub const MAX_ECHO_LEN: usize = 128;

/// Drops the local echo of a transmitted frame from the receive stream
///
/// Armed with the bytes just sent, it swallows received bytes for as long
/// as they match the frame in order. The first mismatch, or a byte after
/// the deadline, disarms it and passes through.
#[derive(Debug, Clone, Default)]
pub struct EchoFilter {
    expected: heapless::Vec<u8, MAX_ECHO_LEN>,
    matched: usize,
    deadline_ms: u64,
}

impl EchoFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `frame` to come back before `deadline_ms`
    ///
    /// Frames longer than [`MAX_ECHO_LEN`] are only filtered up to the
    /// capacity.
    pub fn arm(&mut self, frame: &[u8], deadline_ms: u64) {
        self.expected.clear();
        let take = frame.len().min(MAX_ECHO_LEN);
        let _ = self.expected.extend_from_slice(&frame[..take]);
        self.matched = 0;
        self.deadline_ms = deadline_ms;
    }

    /// True if `byte` received at `now_ms` belongs to the caller
    pub fn accept(&mut self, byte: u8, now_ms: u64) -> bool {
        if !self.is_armed() {
            return true;
        }
        if now_ms > self.deadline_ms || self.expected[self.matched] != byte {
            trace!("Echo filter disarmed after {} bytes", self.matched);
            self.disarm();
            return true;
        }
        self.matched += 1;
        if self.matched == self.expected.len() {
            self.disarm();
        }
        false
    }

    pub fn is_armed(&self) -> bool {
        self.matched < self.expected.len()
    }

    fn disarm(&mut self) {
        self.expected.clear();
        self.matched = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use embassy_futures::block_on;
    use embedded_hal::digital::{ErrorKind as PinErrorKind, ErrorType as PinErrorType};
    use embedded_io_async::{ErrorKind, ErrorType};
    use heapless::Vec;

    /// Ordered record of what the port did to the hardware
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        DriverHigh,
        DriverLow,
        Wrote(usize),
        Flushed,
        Waited(u32),
    }

    type Log = RefCell<Vec<Op, 16>>;

    fn record(log: &Log, op: Op) {
        log.borrow_mut().push(op).unwrap();
    }

    struct MockUart<'a> {
        log: &'a Log,
        fail: bool,
    }

    impl ErrorType for MockUart<'_> {
        type Error = ErrorKind;
    }

    impl Write for MockUart<'_> {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            record(self.log, Op::Wrote(buf.len()));
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            record(self.log, Op::Flushed);
            Ok(())
        }
    }

    struct MockDe<'a> {
        log: &'a Log,
    }

    impl PinErrorType for MockDe<'_> {
        type Error = PinErrorKind;
    }

    impl OutputPin for MockDe<'_> {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            record(self.log, Op::DriverLow);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            record(self.log, Op::DriverHigh);
            Ok(())
        }
    }

    struct MockDelay<'a> {
        log: &'a Log,
    }

    impl DelayNs for MockDelay<'_> {
        async fn delay_ns(&mut self, ns: u32) {
            record(self.log, Op::Waited(ns / 1_000));
        }

        async fn delay_us(&mut self, us: u32) {
            record(self.log, Op::Waited(us));
        }
    }

    fn port(log: &Log, fail: bool) -> Rs485Port<MockUart<'_>, MockDe<'_>, MockDelay<'_>> {
        Rs485Port::new(
            MockUart { log, fail },
            MockDe { log },
            MockDelay { log },
            LineSettings::new(9600),
        )
    }

    #[test]
    fn test_send_sequence() {
        let log = Log::default();
        let mut port = port(&log, false);

        // 40 bytes at 9600 8N1 = 41.666 ms on the wire
        block_on(port.send(&[b'x'; 40])).unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            &[
                Op::DriverHigh,
                Op::Waited(5_000),
                Op::Wrote(40),
                Op::Flushed,
                Op::Waited(83_332),
                Op::DriverLow,
            ]
        );
    }

    #[test]
    fn test_short_reply_uses_minimum_turnaround() {
        let log = Log::default();
        let port = port(&log, false);
        // 2 bytes = 2.08 ms, doubled is still under 5 ms
        assert_eq!(port.turnaround_us(2), MIN_TURNAROUND_US);
    }

    #[test]
    fn test_driver_released_on_write_error() {
        let log = Log::default();
        let mut port = port(&log, true);

        let result = block_on(port.send(b"OK:\r\n"));
        assert_eq!(result, Err(Rs485Error::Write(ErrorKind::Other)));
        assert_eq!(log.borrow().last(), Some(&Op::DriverLow));
    }

    #[test]
    fn test_echo_is_swallowed() {
        let mut filter = EchoFilter::new();
        filter.arm(b"OK:\r\n", 100);

        let passed: Vec<u8, 16> = b"OK:\r\nG:STATE\r\n"
            .iter()
            .copied()
            .filter(|&b| filter.accept(b, 50))
            .collect();
        assert_eq!(passed.as_slice(), b"G:STATE\r\n");
        assert!(!filter.is_armed());
    }

    #[test]
    fn test_mismatch_passes_through() {
        let mut filter = EchoFilter::new();
        filter.arm(b"OK:\r\n", 100);

        assert!(!filter.accept(b'O', 10));
        assert!(filter.accept(b'X', 10));
        assert!(filter.accept(b':', 10));
    }

    #[test]
    fn test_late_bytes_pass_through() {
        let mut filter = EchoFilter::new();
        filter.arm(b"OK", 100);
        assert!(filter.accept(b'O', 101));
        assert!(!filter.is_armed());
    }
}
