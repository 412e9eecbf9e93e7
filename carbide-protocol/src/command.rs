//! Command parsing
//!
//! Names are matched case-insensitively and surrounding whitespace is
//! ignored. Set commands accept either `S:NAME=value` or `S:NAME:value`.

/// Broad command category, used for per-transport policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandClass {
    /// `C:` state machine and mode control
    Control,
    /// `G:` read-only query
    Get,
    /// `S:` direct actuator write
    Set,
}

/// `C:` commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlAction {
    /// Equivalent to pressing INITIALIZE
    Init,
    /// Equivalent to pressing START
    Start,
    /// Stop heating (shutdown ramp, or zero output in manual mode)
    Stop,
    /// Enter manual control mode
    ManualMode,
    /// Return to automatic control mode
    AutoMode,
}

/// `G:` queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Query {
    /// Element temperature
    Temperature,
    /// Blower outlet temperature
    BlowerTemperature,
    /// Current state name, or MANUAL_CONTROL
    State,
    /// Heater current
    Current,
    /// Actuator command in mA
    Output,
    /// Actuator command in percent of span
    OutputPercent,
    /// PID gains
    Pid,
    /// Active fault record
    Fault,
}

/// `S:` settings, carrying the parsed argument
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Setting {
    /// Absolute output in mA
    Output(f32),
    /// Signed change to the current output in mA
    OutputIncrement(f32),
}

/// A parsed command line
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Control(ControlAction),
    Get(Query),
    Set(Setting),
}

/// Reasons a line could not be turned into a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Line was blank
    Empty,
    /// No `TYPE:` separator
    InvalidFormat,
    /// Unknown type or name
    UnknownCommand,
    /// `S:OUTPUT` argument missing or not a finite number
    InvalidOutputValue,
    /// `S:OUTPUT_INCREMENT` argument missing or not a finite number
    InvalidIncrementValue,
}

const CONTROL_NAMES: [(&str, ControlAction); 5] = [
    ("INIT", ControlAction::Init),
    ("START", ControlAction::Start),
    ("STOP", ControlAction::Stop),
    ("MANUAL_MODE", ControlAction::ManualMode),
    ("AUTO_MODE", ControlAction::AutoMode),
];

const QUERY_NAMES: [(&str, Query); 8] = [
    ("TEMP", Query::Temperature),
    ("BLOWER_TEMP", Query::BlowerTemperature),
    ("STATE", Query::State),
    ("CURRENT", Query::Current),
    ("OUTPUT", Query::Output),
    ("OUTPUT_PCT", Query::OutputPercent),
    ("PID", Query::Pid),
    ("FAULT", Query::Fault),
];

fn lookup<T: Copy>(table: &[(&'static str, T)], name: &str) -> Option<T> {
    table
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, v)| v)
}

fn reverse_lookup<T: Copy + PartialEq>(table: &[(&'static str, T)], value: T) -> &'static str {
    table
        .iter()
        .find(|(_, v)| *v == value)
        .map(|&(n, _)| n)
        .unwrap_or("?")
}

fn parse_number(value: Option<&str>) -> Option<f32> {
    let value: f32 = value?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

impl ControlAction {
    /// Wire name of the action
    pub fn name(self) -> &'static str {
        reverse_lookup(&CONTROL_NAMES, self)
    }
}

impl Query {
    /// Wire name of the query
    pub fn name(self) -> &'static str {
        reverse_lookup(&QUERY_NAMES, self)
    }
}

impl Setting {
    fn parse(body: &str) -> Result<Self, ParseError> {
        let (name, value) = match body.find(['=', ':']) {
            Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
            None => (body, None),
        };
        let name = name.trim();

        if name.eq_ignore_ascii_case("OUTPUT") {
            parse_number(value)
                .map(Setting::Output)
                .ok_or(ParseError::InvalidOutputValue)
        } else if name.eq_ignore_ascii_case("OUTPUT_INCREMENT") {
            parse_number(value)
                .map(Setting::OutputIncrement)
                .ok_or(ParseError::InvalidIncrementValue)
        } else {
            Err(ParseError::UnknownCommand)
        }
    }
}

impl Command {
    /// Parse one line (without terminator)
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let (kind, body) = line.split_once(':').ok_or(ParseError::InvalidFormat)?;
        let kind = kind.trim();

        if kind.eq_ignore_ascii_case("C") {
            lookup(&CONTROL_NAMES, body.trim())
                .map(Command::Control)
                .ok_or(ParseError::UnknownCommand)
        } else if kind.eq_ignore_ascii_case("G") {
            lookup(&QUERY_NAMES, body.trim())
                .map(Command::Get)
                .ok_or(ParseError::UnknownCommand)
        } else if kind.eq_ignore_ascii_case("S") {
            Setting::parse(body).map(Command::Set)
        } else {
            Err(ParseError::UnknownCommand)
        }
    }

    /// Category of this command
    pub fn class(&self) -> CommandClass {
        match self {
            Command::Control(_) => CommandClass::Control,
            Command::Get(_) => CommandClass::Get,
            Command::Set(_) => CommandClass::Set,
        }
    }
}
