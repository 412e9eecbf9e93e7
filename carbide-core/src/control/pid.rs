//! PID regulator
//!
//! Textbook positional PID with two changes: the derivative acts on the
//! measurement rather than the error, and the integral stops accumulating
//! while the output is saturated in the direction the error pushes.

use crate::config::{OutputRange, PidConfig};

#[derive(Debug, Clone, Copy)]
pub struct PidRegulator {
    config: PidConfig,
    range: OutputRange,
    setpoint: f32,
    integral: f32,
    last_measurement: Option<f32>,
    last_update_ms: Option<u64>,
    output: f32,
}

impl PidRegulator {
    pub fn new(config: PidConfig, range: OutputRange) -> Self {
        Self {
            config,
            range,
            setpoint: 0.0,
            integral: 0.0,
            last_measurement: None,
            last_update_ms: None,
            output: range.low_ma,
        }
    }

    /// Compute the output for `measurement` taken at `now_ms`
    ///
    /// Recomputes at most once per sample interval and returns the
    /// previous output in between. Non-finite measurements are ignored.
    pub fn compute(&mut self, measurement: f32, now_ms: u64) -> f32 {
        if !measurement.is_finite() {
            return self.output;
        }

        let sample_ms = u64::from(self.config.sample_ms);
        let dt_ms = match self.last_update_ms {
            None => sample_ms,
            Some(last) => {
                let elapsed = now_ms.saturating_sub(last);
                if elapsed < sample_ms {
                    return self.output;
                }
                elapsed
            }
        };
        let dt = dt_ms as f32 / 1000.0;

        let error = self.setpoint - measurement;
        self.integral += error * dt;

        let p = self.config.kp * error;
        let i = self.config.ki * self.integral;
        let d = match self.last_measurement {
            Some(previous) => -self.config.kd * (measurement - previous) / dt,
            None => 0.0,
        };

        let output = self.range.clamp(p + i + d);

        let pushing_high = output >= self.range.high_ma && error > 0.0;
        let pushing_low = output <= self.range.low_ma && error < 0.0;
        if pushing_high || pushing_low {
            self.integral -= error * dt;
        }

        self.last_measurement = Some(measurement);
        self.last_update_ms = Some(now_ms);
        self.output = output;

        trace!(
            "PID sp={} pv={} p={} i={} d={} out={}",
            self.setpoint,
            measurement,
            p,
            i,
            d,
            output
        );
        output
    }

    /// Change the setpoint
    ///
    /// The integral restarts from zero whenever the value actually changes.
    pub fn set_setpoint(&mut self, setpoint: f32) {
        if setpoint != self.setpoint {
            debug!("PID setpoint {} -> {}", self.setpoint, setpoint);
            self.setpoint = setpoint;
            self.integral = 0.0;
        }
    }

    /// Clear all dynamic state and drop the output to the low bound
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_measurement = None;
        self.last_update_ms = None;
        self.output = self.range.low_ma;
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }
}
