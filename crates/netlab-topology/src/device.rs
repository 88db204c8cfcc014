//! Devices and their interfaces.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::addr::{Ipv4Cidr, MacAddr};
use crate::hardware::HardwareModel;
use crate::id::{DeviceId, EdgeId, InterfaceId};

/// The class of a device on the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    Router,
    SwitchL2,
    SwitchL3,
    AccessPoint,
    Pc,
    Laptop,
    Server,
    Firewall,
    IotSensor,
    IotCamera,
    Cloud,
}

impl DeviceKind {
    /// Hosts, servers and IoT devices terminate traffic and never forward it.
    pub fn is_endpoint(&self) -> bool {
        matches!(
            self,
            DeviceKind::Pc
                | DeviceKind::Laptop
                | DeviceKind::Server
                | DeviceKind::IotSensor
                | DeviceKind::IotCamera
        )
    }

    /// Transparent layer-2 forwarders (MAC learning, flooding).
    pub fn is_l2_forwarder(&self) -> bool {
        matches!(
            self,
            DeviceKind::SwitchL2 | DeviceKind::AccessPoint | DeviceKind::Cloud
        )
    }

    /// Devices that forward on a layer-3 route lookup.
    pub fn is_router(&self) -> bool {
        matches!(self, DeviceKind::Router | DeviceKind::SwitchL3)
    }

    pub fn is_firewall(&self) -> bool {
        matches!(self, DeviceKind::Firewall)
    }

    /// Human-readable class name used in console output.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Router => "router",
            DeviceKind::SwitchL2 => "switch",
            DeviceKind::SwitchL3 => "L3 switch",
            DeviceKind::AccessPoint => "access point",
            DeviceKind::Pc => "PC",
            DeviceKind::Laptop => "laptop",
            DeviceKind::Server => "server",
            DeviceKind::Firewall => "firewall",
            DeviceKind::IotSensor => "IoT sensor",
            DeviceKind::IotCamera => "IoT camera",
            DeviceKind::Cloud => "cloud",
        }
    }
}

/// Physical or radio medium of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMedia {
    Copper,
    Fiber,
    Wireless24,
    Wireless5,
}

impl LinkMedia {
    /// Whether a link between two ports of these media can carry traffic.
    ///
    /// Wireless bands interoperate with each other; wired media only with
    /// themselves.
    pub fn is_compatible(&self, other: LinkMedia) -> bool {
        match (self, other) {
            (LinkMedia::Copper, LinkMedia::Copper) | (LinkMedia::Fiber, LinkMedia::Fiber) => true,
            (a, b) => a.is_wireless() && b.is_wireless(),
        }
    }

    pub fn is_wireless(&self) -> bool {
        matches!(self, LinkMedia::Wireless24 | LinkMedia::Wireless5)
    }
}

/// Administrative state of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    #[default]
    Up,
    Down,
}

impl AdminState {
    pub fn is_up(&self) -> bool {
        matches!(self, AdminState::Up)
    }
}

/// A port on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub id: InterfaceId,
    pub media: LinkMedia,
    #[serde(default)]
    pub admin: AdminState,
    /// Assigned MAC; interfaces without one get a derived address
    #[serde(default)]
    pub mac: Option<MacAddr>,
    #[serde(default)]
    pub ip: Option<Ipv4Cidr>,
    /// The single edge occupying this port, if any
    #[serde(default)]
    pub connected_edge_id: Option<EdgeId>,
    #[serde(default)]
    pub description: Option<String>,
    /// Power drawn from the peer port when this is a powered device
    #[serde(default)]
    pub poe_draw_watts: Option<f32>,
}

impl Interface {
    /// Create an administratively up port with no addressing.
    pub fn new(id: impl Into<InterfaceId>, media: LinkMedia) -> Self {
        Self {
            id: id.into(),
            media,
            admin: AdminState::Up,
            mac: None,
            ip: None,
            connected_edge_id: None,
            description: None,
            poe_draw_watts: None,
        }
    }

    #[must_use]
    pub fn with_ip(mut self, ip: Ipv4Cidr) -> Self {
        self.ip = Some(ip);
        self
    }

    #[must_use]
    pub fn with_mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    #[must_use]
    pub fn with_edge(mut self, edge: impl Into<EdgeId>) -> Self {
        self.connected_edge_id = Some(edge.into());
        self
    }

    #[must_use]
    pub fn shutdown(mut self) -> Self {
        self.admin = AdminState::Down;
        self
    }

    pub fn is_up(&self) -> bool {
        self.admin.is_up()
    }

    /// The assigned MAC, or a stable derived one.
    pub fn effective_mac(&self, device: &DeviceId) -> MacAddr {
        self.mac
            .unwrap_or_else(|| MacAddr::derive(device.as_str(), self.id.as_str()))
    }
}

/// Firewall rule action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclAction {
    Permit,
    Deny,
}

/// An ordered firewall rule matching on destination prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclRule {
    pub action: AclAction,
    pub destination: Ipv4Cidr,
}

/// A node on the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub label: String,
    /// Catalog model name; falls back to the default profile for the kind
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub acl: Vec<AclRule>,
    #[serde(default)]
    pub static_routes: Vec<Ipv4Cidr>,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>, kind: DeviceKind, label: &str) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.to_string(),
            model: None,
            interfaces: Vec::new(),
            acl: Vec::new(),
            static_routes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    #[must_use]
    pub fn with_route(mut self, destination: Ipv4Cidr) -> Self {
        self.static_routes.push(destination);
        self
    }

    #[must_use]
    pub fn with_acl(mut self, action: AclAction, destination: Ipv4Cidr) -> Self {
        self.acl.push(AclRule { action, destination });
        self
    }

    /// Resolve the hardware profile for this device.
    pub fn hardware(&self) -> HardwareModel {
        self.model
            .as_deref()
            .and_then(HardwareModel::lookup)
            .unwrap_or_else(|| HardwareModel::default_for(self.kind))
    }

    pub fn interface(&self, id: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.id == id)
    }

    pub fn interface_mut(&mut self, id: &str) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.id == id)
    }

    /// First configured address, used as the L3 identity of the device.
    pub fn primary_ip(&self) -> Option<Ipv4Addr> {
        self.interfaces.iter().find_map(|i| i.ip.map(|ip| ip.addr()))
    }

    /// True if any interface is administratively up.
    pub fn has_up_interface(&self) -> bool {
        self.interfaces.iter().any(Interface::is_up)
    }

    /// Longest-prefix match over connected subnets (of up interfaces) and
    /// static routes.
    ///
    /// Returns the matched prefix and, for connected routes, the egress
    /// interface.
    pub fn route_lookup(&self, destination: Ipv4Addr) -> Option<(Ipv4Cidr, Option<&Interface>)> {
        let connected = self
            .interfaces
            .iter()
            .filter(|i| i.is_up())
            .filter_map(|i| i.ip.map(|ip| (ip.network(), Some(i))));
        let static_routes = self.static_routes.iter().map(|r| (r.network(), None));

        let mut best: Option<(Ipv4Cidr, Option<&Interface>)> = None;
        for (prefix, egress) in connected.chain(static_routes) {
            if !prefix.contains(destination) {
                continue;
            }
            if best.map_or(true, |(b, _)| prefix.prefix() > b.prefix()) {
                best = Some((prefix, egress));
            }
        }
        best
    }

    /// Evaluate the ACL for a destination. First match wins; no match permits.
    pub fn acl_permits(&self, destination: Ipv4Addr) -> bool {
        self.acl
            .iter()
            .find(|rule| rule.destination.contains(destination))
            .map_or(true, |rule| rule.action == AclAction::Permit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Ipv4Cidr {
        s.parse().unwrap()
    }

    fn router() -> Device {
        Device::new("r1", DeviceKind::Router, "R1")
            .with_interface(Interface::new("gi0/0", LinkMedia::Copper).with_ip(cidr("10.0.1.1/24")))
            .with_interface(Interface::new("gi0/1", LinkMedia::Copper).with_ip(cidr("10.0.2.1/24")))
    }

    #[test]
    fn endpoint_classification() {
        assert!(DeviceKind::Pc.is_endpoint());
        assert!(DeviceKind::IotCamera.is_endpoint());
        assert!(!DeviceKind::SwitchL2.is_endpoint());
        assert!(DeviceKind::SwitchL3.is_router());
        assert!(DeviceKind::AccessPoint.is_l2_forwarder());
    }

    #[test]
    fn media_compatibility() {
        assert!(LinkMedia::Copper.is_compatible(LinkMedia::Copper));
        assert!(!LinkMedia::Copper.is_compatible(LinkMedia::Fiber));
        assert!(LinkMedia::Wireless24.is_compatible(LinkMedia::Wireless5));
        assert!(!LinkMedia::Wireless5.is_compatible(LinkMedia::Copper));
    }

    #[test]
    fn route_lookup_matches_connected_subnet() {
        let r = router();
        let (prefix, egress) = r.route_lookup("10.0.2.77".parse().unwrap()).unwrap();
        assert_eq!(prefix.to_string(), "10.0.2.0/24");
        assert_eq!(egress.unwrap().id, "gi0/1");
        assert!(r.route_lookup("192.168.0.1".parse().unwrap()).is_none());
    }

    #[test]
    fn route_lookup_ignores_down_interfaces() {
        let mut r = router();
        r.interface_mut("gi0/1").unwrap().admin = AdminState::Down;
        assert!(r.route_lookup("10.0.2.77".parse().unwrap()).is_none());
    }

    #[test]
    fn route_lookup_prefers_longest_prefix() {
        let r = router()
            .with_route(Ipv4Cidr::DEFAULT_ROUTE)
            .with_route(cidr("10.0.2.64/26"));
        let (prefix, egress) = r.route_lookup("10.0.2.77".parse().unwrap()).unwrap();
        assert_eq!(prefix.prefix(), 26);
        assert!(egress.is_none());

        let (prefix, _) = r.route_lookup("8.8.8.8".parse().unwrap()).unwrap();
        assert_eq!(prefix, Ipv4Cidr::DEFAULT_ROUTE);
    }

    #[test]
    fn acl_first_match_wins() {
        let fw = Device::new("fw", DeviceKind::Firewall, "FW")
            .with_acl(AclAction::Permit, cidr("10.0.9.5/32"))
            .with_acl(AclAction::Deny, cidr("10.0.9.0/24"));

        assert!(fw.acl_permits("10.0.9.5".parse().unwrap()));
        assert!(!fw.acl_permits("10.0.9.6".parse().unwrap()));
        assert!(fw.acl_permits("10.0.8.1".parse().unwrap()));
    }

    #[test]
    fn hardware_falls_back_to_kind_default() {
        let r = router();
        assert!(r.hardware().cli_capable);
        let pc = Device::new("pc", DeviceKind::Pc, "PC");
        assert!(!pc.hardware().cli_capable);
        let custom = Device::new("s", DeviceKind::SwitchL2, "S").with_model("C9300-48P");
        assert_eq!(custom.hardware().name, "C9300-48P");
    }

    #[test]
    fn device_deserializes_with_defaults() {
        let json = r#"{
            "id": "pc1",
            "kind": "pc",
            "label": "PC 1",
            "interfaces": [{ "id": "eth0", "media": "copper", "ip": "10.0.1.10/24" }]
        }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.kind, DeviceKind::Pc);
        assert!(device.interfaces[0].is_up());
        assert_eq!(device.primary_ip(), Some("10.0.1.10".parse().unwrap()));
    }
}
