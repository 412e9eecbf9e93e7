//! Fault latch
//!
//! Holds the single active fault. A new fault only displaces the active
//! one if it ranks higher, so the operator always sees the most severe
//! cause.

use super::fault::{FaultKind, FaultRecord};

/// Acknowledgment sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClearRequest {
    /// INITIALIZE button or `C:INIT`
    Initialize,
    /// Physical key-switch reset
    HardReset,
}

/// Reasons a clear request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClearError {
    /// Nothing latched
    NoFault,
    /// The fault condition is still being detected
    ConditionPresent,
    /// Critical faults need a hard reset
    Critical,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FaultLatch {
    active: Option<FaultRecord>,
    condition_present: bool,
    unannounced: bool,
}

impl FaultLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a fault
    ///
    /// Returns true if `record` became the active fault.
    pub fn latch(&mut self, record: FaultRecord) -> bool {
        let replace = match &self.active {
            None => true,
            Some(active) => record.kind.priority() > active.kind.priority(),
        };
        if replace {
            error!(
                "Fault latched: {} {}",
                record.code, record.message
            );
            self.active = Some(record);
            self.unannounced = true;
        }
        if self.active.map(|a| a.kind) == Some(record.kind) {
            self.condition_present = true;
        }
        replace
    }

    /// Record whether the active fault's condition was detected this cycle
    pub fn observe(&mut self, detected: Option<FaultKind>) {
        if let Some(active) = &self.active {
            self.condition_present = detected == Some(active.kind);
        }
    }

    /// Attempt to acknowledge the active fault
    pub fn try_clear(&mut self, request: ClearRequest) -> Result<FaultRecord, ClearError> {
        let active = self.active.ok_or(ClearError::NoFault)?;
        if self.condition_present {
            return Err(ClearError::ConditionPresent);
        }
        if request == ClearRequest::Initialize && active.is_critical() {
            return Err(ClearError::Critical);
        }
        info!("Fault {} cleared", active.code);
        self.active = None;
        self.condition_present = false;
        self.unannounced = false;
        Ok(active)
    }

    pub fn active(&self) -> Option<&FaultRecord> {
        self.active.as_ref()
    }

    pub fn is_latched(&self) -> bool {
        self.active.is_some()
    }

    /// The active fault, once, if it has not been broadcast yet
    pub fn take_unannounced(&mut self) -> Option<FaultRecord> {
        if self.unannounced {
            self.unannounced = false;
            self.active
        } else {
            None
        }
    }
}
