//! Minimal TOML reader for `controller.toml`
//!
//! Handles the subset the controller file uses:
//!
//! - `[section]` headers naming a [`ControllerConfig`] group
//! - `key = value` pairs with float, integer or boolean values
//! - `#` comments, whole-line or trailing
//!
//! Keys left out keep their defaults. Unknown keys are ignored so a newer
//! file still loads on older firmware; unknown sections are an error.

use super::{ConfigError, ControllerConfig};

/// Errors reading a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Header does not name a configuration group
    InvalidSection,
    /// Line is neither a header nor `key = value`
    InvalidLine,
    /// Value does not parse as the key's type
    InvalidValue,
    /// File parsed but the result is inconsistent
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Invalid(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Control,
    Setpoints,
    Pid,
    Output,
    Safety,
    Blower,
    Input,
    Protocol,
    Telemetry,
    Indicators,
    Sensors,
}

/// Parse and validate a configuration file
pub fn parse_config(input: &str) -> Result<ControllerConfig, ParseError> {
    let mut config = ControllerConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = strip_comment(line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = parse_section_header(header)?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(section, key, value, &mut config)?;
    }

    config.validate()?;
    Ok(config)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "control" => Ok(Section::Control),
        "setpoints" => Ok(Section::Setpoints),
        "pid" => Ok(Section::Pid),
        "output" => Ok(Section::Output),
        "safety" => Ok(Section::Safety),
        "blower" => Ok(Section::Blower),
        "input" => Ok(Section::Input),
        "protocol" => Ok(Section::Protocol),
        "telemetry" => Ok(Section::Telemetry),
        "indicators" => Ok(Section::Indicators),
        "sensors" => Ok(Section::Sensors),
        _ => Err(ParseError::InvalidSection),
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_float(value: &str) -> Result<f32, ParseError> {
    let v: f32 = value.parse().map_err(|_| ParseError::InvalidValue)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ParseError::InvalidValue)
    }
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut ControllerConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Control => match key {
            "cycle_ms" => config.control.cycle_ms = parse_int(value)?,
            "ramp_step_ma" => config.control.ramp_step_ma = parse_float(value)?,
            _ => {}
        },
        Section::Setpoints => match key {
            "warm_up_f" => config.setpoints.warm_up_f = parse_float(value)?,
            "full_temp_f" => config.setpoints.full_temp_f = parse_float(value)?,
            "hysteresis_f" => config.setpoints.hysteresis_f = parse_float(value)?,
            _ => {}
        },
        Section::Pid => match key {
            "kp" => config.pid.kp = parse_float(value)?,
            "ki" => config.pid.ki = parse_float(value)?,
            "kd" => config.pid.kd = parse_float(value)?,
            "sample_ms" => config.pid.sample_ms = parse_int(value)?,
            _ => {}
        },
        Section::Output => match key {
            "low_ma" => config.output.low_ma = parse_float(value)?,
            "high_ma" => config.output.high_ma = parse_float(value)?,
            _ => {}
        },
        Section::Safety => match key {
            "temp_min_f" => config.safety.temp_min_f = parse_float(value)?,
            "temp_max_f" => config.safety.temp_max_f = parse_float(value)?,
            "overcurrent_a" => config.safety.overcurrent_a = parse_float(value)?,
            _ => {}
        },
        Section::Blower => match key {
            "enabled" => config.blower.enabled = parse_bool(value)?,
            "check_interval_ms" => config.blower.check_interval_ms = parse_int(value)?,
            _ => {}
        },
        Section::Input => match key {
            "debounce_ms" => config.input.debounce_ms = parse_int(value)?,
            "estop_release_ms" => config.input.estop_release_ms = parse_int(value)?,
            _ => {}
        },
        Section::Protocol => match key {
            "rs485_enabled" => config.protocol.rs485_enabled = parse_bool(value)?,
            "rs485_baudrate" => config.protocol.rs485_baudrate = parse_int(value)?,
            "telemetry_enabled" => config.protocol.telemetry_enabled = parse_bool(value)?,
            "telemetry_baudrate" => config.protocol.telemetry_baudrate = parse_int(value)?,
            "fragment_timeout_ms" => config.protocol.fragment_timeout_ms = parse_int(value)?,
            _ => {}
        },
        Section::Telemetry => match key {
            "interval_ms" => config.telemetry.interval_ms = parse_int(value)?,
            _ => {}
        },
        Section::Indicators => match key {
            "threshold_f" => config.indicators.threshold_f = parse_float(value)?,
            "threshold_hysteresis_f" => {
                config.indicators.threshold_hysteresis_f = parse_float(value)?
            }
            "heating_threshold_ma" => config.indicators.heating_threshold_ma = parse_float(value)?,
            "blink_count" => config.indicators.blink_count = parse_int(value)?,
            "blink_interval_ms" => config.indicators.blink_interval_ms = parse_int(value)?,
            "blink_rest_ms" => config.indicators.blink_rest_ms = parse_int(value)?,
            _ => {}
        },
        Section::Sensors => match key {
            "shunt_ohms" => config.sensors.shunt_ohms = parse_float(value)?,
            "temperature_min_f" => config.sensors.temperature_min_f = parse_float(value)?,
            "temperature_max_f" => config.sensors.temperature_max_f = parse_float(value)?,
            "secondary_min_f" => config.sensors.secondary_min_f = parse_float(value)?,
            "secondary_max_f" => config.sensors.secondary_max_f = parse_float(value)?,
            "current_full_scale_a" => config.sensors.current_full_scale_a = parse_float(value)?,
            _ => {}
        },
        Section::Root => {}
    }

    Ok(())
}
