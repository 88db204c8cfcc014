//! Links between device ports.

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, EdgeId, InterfaceId};

/// One side of a link: a device and the port the cable plugs into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub device: DeviceId,
    pub interface: InterfaceId,
}

impl Endpoint {
    pub fn new(device: impl Into<DeviceId>, interface: impl Into<InterfaceId>) -> Self {
        Self {
            device: device.into(),
            interface: interface.into(),
        }
    }
}

fn default_valid() -> bool {
    true
}

/// A link between two ports.
///
/// `valid` is false when the diagram store found the link media or PoE
/// incompatible. Such edges stay in the graph but never carry traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: Endpoint,
    pub target: Endpoint,
    /// Declared protocol or media label ("ethernet", "fiber", "wifi", ...)
    #[serde(default)]
    pub protocol: String,
    #[serde(default = "default_valid")]
    pub valid: bool,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: Endpoint, target: Endpoint) -> Self {
        Self {
            id: id.into(),
            source,
            target,
            protocol: "ethernet".to_string(),
            valid: true,
        }
    }

    #[must_use]
    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = protocol.to_string();
        self
    }

    /// The endpoint on `device`, if the edge touches it.
    pub fn endpoint_on(&self, device: &str) -> Option<&Endpoint> {
        if self.source.device == device {
            Some(&self.source)
        } else if self.target.device == device {
            Some(&self.target)
        } else {
            None
        }
    }

    /// The endpoint opposite `device`, if the edge touches it.
    pub fn far_end(&self, device: &str) -> Option<&Endpoint> {
        if self.source.device == device {
            Some(&self.target)
        } else if self.target.device == device {
            Some(&self.source)
        } else {
            None
        }
    }

    pub fn endpoints(&self) -> [&Endpoint; 2] {
        [&self.source, &self.target]
    }
}
