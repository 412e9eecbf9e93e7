//! Response formatting
//!
//! Every request gets exactly one reply line. Replies are built as a
//! [`Response`] value and rendered through [`core::fmt::Display`] so the
//! firmware can write them straight into a fixed-size buffer.

use core::fmt::{self, Write};

use crate::command::ParseError;

/// Longest rendered reply, excluding the line terminator
pub const MAX_RESPONSE_LEN: usize = 96;

/// Fixed-capacity rendered reply
pub type ResponseLine = heapless::String<MAX_RESPONSE_LEN>;

/// Explicit `ERROR:` replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorReply {
    InvalidFormat,
    UnknownCommand,
    InvalidOutputValue,
    InvalidIncrementValue,
    ManualModeRequired,
    NotInManualMode,
    PidInactive,
    ReadOnly,
    TempReadFailed,
    BlowerTempReadFailed,
    CurrentReadFailed,
    /// Manual mode refused while a fault is latched
    FaultActive,
    /// The actuator port rejected the write
    OutputWriteFailed,
    /// No SHUTDOWN edge from the named state
    ShutdownUnavailable(&'static str),
}

impl fmt::Display for ErrorReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorReply::InvalidFormat => "Invalid command format",
            ErrorReply::UnknownCommand => "Unknown command",
            ErrorReply::InvalidOutputValue => "Invalid output value",
            ErrorReply::InvalidIncrementValue => "Invalid increment value",
            ErrorReply::ManualModeRequired => "Manual mode required for direct output control",
            ErrorReply::NotInManualMode => "Not available in manual mode",
            ErrorReply::PidInactive => "PID not active in manual mode",
            ErrorReply::ReadOnly => "Telemetry interface is read-only",
            ErrorReply::TempReadFailed => "Temp read failed",
            ErrorReply::BlowerTempReadFailed => "Blower temp read failed",
            ErrorReply::CurrentReadFailed => "Current read failed",
            ErrorReply::FaultActive => "Fault active - clear fault first",
            ErrorReply::OutputWriteFailed => "Output write failed",
            ErrorReply::ShutdownUnavailable(state) => {
                return write!(f, "Shutdown not available in {}", state);
            }
        };
        f.write_str(text)
    }
}

impl From<ParseError> for ErrorReply {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Empty | ParseError::InvalidFormat => ErrorReply::InvalidFormat,
            ParseError::UnknownCommand => ErrorReply::UnknownCommand,
            ParseError::InvalidOutputValue => ErrorReply::InvalidOutputValue,
            ParseError::InvalidIncrementValue => ErrorReply::InvalidIncrementValue,
        }
    }
}

/// Fault summary broadcast to every transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultNotice {
    /// Numeric fault code
    pub code: u16,
    /// Critical faults need a hard reset
    pub critical: bool,
    /// Human-readable description
    pub message: &'static str,
}

impl fmt::Display for FaultNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.critical {
            "CRITICAL"
        } else {
            "RECOVERABLE"
        };
        write!(f, "{},{},{}", self.code, severity, self.message)
    }
}

/// A reply to one command line
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// `OK:<message>`
    Ok(&'static str),
    /// `OK:Output set to 12.50mA`
    OutputSet(f32),
    /// `OK:Output incremented to 12.50mA`
    OutputIncremented(f32),
    /// `TEMP:123.4`
    Temperature(f32),
    /// `BLOWER_TEMP:123.4`
    BlowerTemperature(f32),
    /// `CURRENT:12.34`
    Current(f32),
    /// `OUTPUT:12.50`
    Output(f32),
    /// `OUTPUT_PCT:53.13`
    OutputPercent(f32),
    /// `STATE:<NAME>`
    State(&'static str),
    /// `PID:kp,ki,kd`
    Pid { kp: f32, ki: f32, kd: f32 },
    /// `FAULT:<code>,<severity>,<message>` or `FAULT:NONE`
    Fault(Option<FaultNotice>),
    /// `ERROR:<message>`
    Error(ErrorReply),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok(message) => write!(f, "OK:{}", message),
            Response::OutputSet(ma) => write!(f, "OK:Output set to {:.2}mA", ma),
            Response::OutputIncremented(ma) => write!(f, "OK:Output incremented to {:.2}mA", ma),
            Response::Temperature(t) => write!(f, "TEMP:{:.1}", t),
            Response::BlowerTemperature(t) => write!(f, "BLOWER_TEMP:{:.1}", t),
            Response::Current(a) => write!(f, "CURRENT:{:.2}", a),
            Response::Output(ma) => write!(f, "OUTPUT:{:.2}", ma),
            Response::OutputPercent(pct) => write!(f, "OUTPUT_PCT:{:.2}", pct),
            Response::State(name) => write!(f, "STATE:{}", name),
            Response::Pid { kp, ki, kd } => write!(f, "PID:{:.2},{:.2},{:.2}", kp, ki, kd),
            Response::Fault(Some(notice)) => write!(f, "FAULT:{}", notice),
            Response::Fault(None) => f.write_str("FAULT:NONE"),
            Response::Error(reply) => write!(f, "ERROR:{}", reply),
        }
    }
}

impl Response {
    /// Render into a fixed-capacity line
    ///
    /// Output that does not fit is truncated at the capacity.
    pub fn to_line(&self) -> ResponseLine {
        let mut line = ResponseLine::new();
        let mut writer = Truncating(&mut line);
        let _ = write!(writer, "{}", self);
        line
    }

    /// True for `ERROR:` replies
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

impl From<ErrorReply> for Response {
    fn from(reply: ErrorReply) -> Self {
        Response::Error(reply)
    }
}

/// Writer that silently drops characters past the buffer capacity
struct Truncating<'a, const N: usize>(&'a mut heapless::String<N>);

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}
