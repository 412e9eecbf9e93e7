//! Per-transport command policy

use crate::command::CommandClass;

/// What a transport is allowed to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportPolicy {
    /// Control bus: every command class
    Control,
    /// Telemetry link: `G:` queries only
    ReadOnly,
}

impl TransportPolicy {
    /// Check whether a command class may be executed on this transport
    pub fn permits(self, class: CommandClass) -> bool {
        match self {
            TransportPolicy::Control => true,
            TransportPolicy::ReadOnly => class == CommandClass::Get,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_permits_everything() {
        for class in [CommandClass::Control, CommandClass::Get, CommandClass::Set] {
            assert!(TransportPolicy::Control.permits(class));
        }
    }

    #[test]
    fn test_read_only_permits_get_only() {
        assert!(TransportPolicy::ReadOnly.permits(CommandClass::Get));
        assert!(!TransportPolicy::ReadOnly.permits(CommandClass::Control));
        assert!(!TransportPolicy::ReadOnly.permits(CommandClass::Set));
    }
}
