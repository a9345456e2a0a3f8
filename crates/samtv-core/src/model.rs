// ── Domain model ──
//
// The device as the rest of the workspace sees it, and the two views of
// its power: what a probe observed, and the coarse active/inactive value
// exposed to callers that only need a yes/no.

use serde::Serialize;
use strum::{Display, EnumString};

use samtv_api::{Capabilities, DeviceStatus, MacAddress, ReportedPower};

/// Identity and capabilities of one TV. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub host: String,
    pub mac: Option<MacAddress>,
    /// Stable identifier (`uuid:...`); the credential storage key.
    pub id: String,
    pub name: String,
    pub model: Option<String>,
    pub capabilities: Capabilities,
}

impl DeviceDescriptor {
    /// Build from a status document. An unparsable `wifiMac` is dropped.
    pub fn from_status(host: impl Into<String>, status: &DeviceStatus) -> Self {
        Self {
            host: host.into(),
            mac: status.wifi_mac.as_deref().and_then(|m| m.parse().ok()),
            id: status.id.clone(),
            name: status.name.clone(),
            model: status.model_name.clone(),
            capabilities: status.capabilities.clone(),
        }
    }

    /// Whether the TV accepts remote key input.
    pub fn remote_available(&self) -> bool {
        self.capabilities.remote_available()
    }
}

/// Observed power state. `Unreachable` means the probe got no answer, not
/// that the TV confirmed it is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PowerState {
    On,
    Standby,
    Unreachable,
}

impl From<ReportedPower> for PowerState {
    fn from(power: ReportedPower) -> Self {
        match power {
            ReportedPower::On => Self::On,
            ReportedPower::Standby => Self::Standby,
        }
    }
}

/// Coarse observable: the TV is on, or it is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActiveState {
    Active,
    Inactive,
}

impl From<PowerState> for ActiveState {
    fn from(state: PowerState) -> Self {
        match state {
            PowerState::On => Self::Active,
            PowerState::Standby | PowerState::Unreachable => Self::Inactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_on_is_active() {
        assert_eq!(ActiveState::from(PowerState::On), ActiveState::Active);
        assert_eq!(ActiveState::from(PowerState::Standby), ActiveState::Inactive);
        assert_eq!(ActiveState::from(PowerState::Unreachable), ActiveState::Inactive);
    }

    #[test]
    fn power_state_names() {
        assert_eq!(PowerState::Standby.to_string(), "standby");
        assert_eq!("on".parse::<PowerState>().ok(), Some(PowerState::On));
    }
}
