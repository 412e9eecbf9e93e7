//! Blower interlock
//!
//! The blower current switch is a noisy discrete input, so it is sampled
//! at a bounded interval. The most recent sample decides every cycle in
//! between.

use super::fault::{FaultKind, FaultRecord};
use crate::config::BlowerConfig;

#[derive(Debug, Clone, Copy)]
pub struct BlowerInterlock {
    enabled: bool,
    interval_ms: u32,
    last_sample_ms: Option<u64>,
    airflow_ok: bool,
    warned: bool,
}

impl BlowerInterlock {
    pub fn new(config: &BlowerConfig) -> Self {
        Self {
            enabled: config.enabled,
            interval_ms: config.check_interval_ms,
            last_sample_ms: None,
            airflow_ok: false,
            warned: false,
        }
    }

    /// Periodic check
    ///
    /// Samples `airflow_signal` if the interval has elapsed, then reports a
    /// critical fault if airflow is `required` and the latest sample shows
    /// none.
    pub fn check(&mut self, now_ms: u64, required: bool, airflow_signal: bool) -> Option<FaultRecord> {
        if self.bypassed() {
            return None;
        }

        let due = match self.last_sample_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= u64::from(self.interval_ms),
        };
        if due {
            self.sample(now_ms, airflow_signal);
        }

        if required && !self.airflow_ok {
            Some(FaultRecord::new(FaultKind::AirflowLoss, now_ms))
        } else {
            None
        }
    }

    /// Immediate check, used by the self-check
    pub fn verify(&mut self, now_ms: u64, airflow_signal: bool) -> Option<FaultRecord> {
        if self.bypassed() {
            return None;
        }
        self.sample(now_ms, airflow_signal);
        if self.airflow_ok {
            info!("Blower operation verified");
            None
        } else {
            Some(FaultRecord::new(FaultKind::AirflowLoss, now_ms))
        }
    }

    /// Latest sampled airflow state
    pub fn airflow_ok(&self) -> bool {
        self.airflow_ok
    }

    fn sample(&mut self, now_ms: u64, airflow_signal: bool) {
        if self.airflow_ok && !airflow_signal {
            warn!("Blower airflow lost");
        }
        self.airflow_ok = airflow_signal;
        self.last_sample_ms = Some(now_ms);
    }

    fn bypassed(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        if !self.warned {
            warn!("Blower interlock disabled, assuming airflow");
            self.warned = true;
        }
        self.airflow_ok = true;
        true
    }
}
