//! Line assembly from a byte stream
//!
//! Bytes arrive in arbitrary fragments. A line is only released once a CR
//! or LF is seen; a partial line that has been waiting longer than the
//! fragment timeout is dropped so a stale prefix can never be glued onto a
//! later fragment. An overlong line is dropped whole: everything up to its
//! terminator is skipped.

use heapless::{String, Vec};

/// Maximum line length in bytes, excluding the terminator
pub const MAX_LINE_LEN: usize = 128;

/// Default age after which a partial line is discarded
pub const FRAGMENT_TIMEOUT_MS: u64 = 2000;

/// A complete command line
pub type Line = String<MAX_LINE_LEN>;

/// Errors reported while assembling lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line grew past [`MAX_LINE_LEN`]; the partial line was dropped
    Overflow,
    /// Terminated line was not valid UTF-8
    InvalidUtf8,
}

/// Accumulates bytes into terminated lines
#[derive(Debug, Clone)]
pub struct LineAssembler {
    buffer: Vec<u8, MAX_LINE_LEN>,
    /// Time the first byte of the pending fragment arrived
    started_ms: Option<u64>,
    timeout_ms: u64,
    discarded: u32,
    /// Skipping the rest of an overlong line
    skipping: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(FRAGMENT_TIMEOUT_MS)
    }
}

impl LineAssembler {
    /// Create an assembler with the given fragment timeout
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            buffer: Vec::new(),
            started_ms: None,
            timeout_ms,
            discarded: 0,
            skipping: false,
        }
    }

    /// Feed one byte received at `now_ms`
    ///
    /// Returns `Ok(Some(line))` when a terminator completes a non-empty line.
    pub fn feed(&mut self, byte: u8, now_ms: u64) -> Result<Option<Line>, LineError> {
        self.expire(now_ms);

        if byte == b'\r' || byte == b'\n' {
            if self.skipping {
                self.skipping = false;
                return Ok(None);
            }
            if self.buffer.is_empty() {
                // CRLF pairs and blank lines
                return Ok(None);
            }
            return self.take_line().map(Some);
        }

        if self.skipping {
            return Ok(None);
        }
        if self.buffer.push(byte).is_err() {
            self.discard();
            self.skipping = true;
            return Err(LineError::Overflow);
        }
        if self.started_ms.is_none() {
            self.started_ms = Some(now_ms);
        }
        Ok(None)
    }

    /// Drop the pending fragment if it is older than the timeout
    ///
    /// Returns true if something was discarded. Call this periodically
    /// when the link is idle.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        match self.started_ms {
            Some(started) if now_ms.saturating_sub(started) > self.timeout_ms => {
                self.discard();
                true
            }
            _ => false,
        }
    }

    /// Drop any pending fragment
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.started_ms = None;
        self.skipping = false;
    }

    /// Number of bytes waiting for a terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Number of fragments dropped by timeout or overflow
    pub fn discarded(&self) -> u32 {
        self.discarded
    }

    fn discard(&mut self) {
        self.buffer.clear();
        self.started_ms = None;
        self.discarded = self.discarded.saturating_add(1);
    }

    fn take_line(&mut self) -> Result<Line, LineError> {
        let result = core::str::from_utf8(&self.buffer)
            .map_err(|_| LineError::InvalidUtf8)
            .and_then(|text| {
                let mut line = Line::new();
                line.push_str(text).map_err(|_| LineError::Overflow)?;
                Ok(line)
            });
        self.reset();
        result
    }
}
