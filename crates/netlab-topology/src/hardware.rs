//! Hardware profiles referenced by devices.

use serde::{Deserialize, Serialize};

use crate::device::DeviceKind;

/// A hardware model from the device catalog.
///
/// Drives CLI availability, the firmware string shown by `show version`
/// and the PoE budget a switch can hand out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareModel {
    pub name: String,
    pub firmware: String,
    #[serde(default)]
    pub cli_capable: bool,
    /// Total PoE budget in watts (0 for devices that do not source power)
    #[serde(default)]
    pub poe_budget_watts: f32,
}

impl HardwareModel {
    /// Build a catalog entry.
    pub fn new(name: &str, firmware: &str, cli_capable: bool, poe_budget_watts: f32) -> Self {
        Self {
            name: name.to_string(),
            firmware: firmware.to_string(),
            cli_capable,
            poe_budget_watts,
        }
    }

    /// A generic profile for devices without a catalog reference.
    pub fn generic() -> Self {
        Self::new("generic", "netlab-os 1.0", false, 0.0)
    }

    /// The built-in catalog.
    pub fn catalog() -> Vec<HardwareModel> {
        vec![
            Self::new("ISR-4331", "IOS-XE 17.9.4a", true, 0.0),
            Self::new("ISR-1100", "IOS-XE 17.6.5", true, 0.0),
            Self::new("C9300-48P", "IOS-XE 17.9.4a", true, 437.0),
            Self::new("C2960X-24PS", "IOS 15.2(7)E8", true, 370.0),
            Self::new("C9500-24Y4C", "IOS-XE 17.12.1", true, 0.0),
            Self::new("ASA-5506", "ASA 9.16(4)", true, 0.0),
            Self::new("AIR-AP2802", "AireOS 8.10.185", false, 0.0),
            Self::new("PowerEdge-R650", "iDRAC 6.10", false, 0.0),
            Self::new("Workstation", "Linux 6.8", false, 0.0),
            Self::new("IoT-Sensor", "Zephyr 3.5", false, 0.0),
        ]
    }

    /// The profile used when a device carries no model reference.
    pub fn default_for(kind: DeviceKind) -> Self {
        let name = match kind {
            DeviceKind::Router => "ISR-4331",
            DeviceKind::SwitchL2 => "C2960X-24PS",
            DeviceKind::SwitchL3 => "C9300-48P",
            DeviceKind::Firewall => "ASA-5506",
            DeviceKind::AccessPoint => "AIR-AP2802",
            DeviceKind::Server => "PowerEdge-R650",
            DeviceKind::Pc | DeviceKind::Laptop => "Workstation",
            DeviceKind::IotSensor | DeviceKind::IotCamera => "IoT-Sensor",
            DeviceKind::Cloud => return Self::generic(),
        };
        Self::lookup(name).unwrap_or_else(Self::generic)
    }

    /// Find a catalog entry by name (case-insensitive).
    pub fn lookup(name: &str) -> Option<HardwareModel> {
        Self::catalog()
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

impl Default for HardwareModel {
    fn default() -> Self {
        Self::generic()
    }
}
