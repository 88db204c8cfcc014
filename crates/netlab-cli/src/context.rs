//! The seam between the CLI and whoever owns device data.
//!
//! The CLI never edits a device itself. Commands that change configuration
//! describe the change as a patch and hand it to a [`DeviceStore`].

use netlab_topology::{AdminState, Device, Interface, InterfaceId, Ipv4Cidr};
use serde::{Deserialize, Serialize};

/// Partial update of device-level fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePatch {
    /// New hostname, shown as the device label
    pub hostname: Option<String>,
}

impl DevicePatch {
    pub fn apply(&self, device: &mut Device) {
        if let Some(hostname) = &self.hostname {
            device.label = hostname.clone();
        }
    }
}

/// Partial update of one interface. `None` leaves a field alone; for the
/// optional fields, `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfacePatch {
    pub ip: Option<Option<Ipv4Cidr>>,
    pub admin: Option<AdminState>,
    pub description: Option<Option<String>>,
}

impl InterfacePatch {
    pub fn apply(&self, interface: &mut Interface) {
        if let Some(ip) = self.ip {
            interface.ip = ip;
        }
        if let Some(admin) = self.admin {
            interface.admin = admin;
        }
        if let Some(description) = &self.description {
            interface.description = description.clone();
        }
    }
}

/// Receives the CLI's configuration changes.
///
/// Both callbacks may be invoked any number of times per command, including
/// zero.
pub trait DeviceStore {
    fn on_update_data(&mut self, patch: DevicePatch);
    fn on_update_interface(&mut self, interface: &InterfaceId, patch: InterfacePatch);
}

/// A device applies patches to itself.
impl DeviceStore for Device {
    fn on_update_data(&mut self, patch: DevicePatch) {
        patch.apply(self);
    }

    fn on_update_interface(&mut self, interface: &InterfaceId, patch: InterfacePatch) {
        match self.interface_mut(interface.as_str()) {
            Some(iface) => patch.apply(iface),
            None => tracing::warn!(device = %self.id, %interface, "patch for unknown interface"),
        }
    }
}

/// Collects patches instead of applying them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchLog {
    pub device: Vec<DevicePatch>,
    pub interfaces: Vec<(InterfaceId, InterfacePatch)>,
}

impl DeviceStore for PatchLog {
    fn on_update_data(&mut self, patch: DevicePatch) {
        self.device.push(patch);
    }

    fn on_update_interface(&mut self, interface: &InterfaceId, patch: InterfacePatch) {
        self.interfaces.push((interface.clone(), patch));
    }
}

/// What a command may look at and where its changes go.
pub struct CliContext<'a> {
    /// Read-only view of the device the session belongs to
    pub device: &'a Device,
    pub store: &'a mut dyn DeviceStore,
}

impl<'a> CliContext<'a> {
    pub fn new(device: &'a Device, store: &'a mut dyn DeviceStore) -> Self {
        Self { device, store }
    }
}
