//! Per-device forwarding state and the console narration of each hop.
//!
//! Switches learn the source MAC of every frame they receive against the
//! ingress port. When they forward, a known destination goes out of one port
//! and an unknown one is flooded. Routers narrate their longest-prefix match.

use std::collections::HashMap;

use netlab_topology::{Device, DeviceId, InterfaceId, MacAddr, Topology};

use crate::packet::Packet;
use crate::resolver::Hop;

/// MAC address table of one L2 forwarder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacTable {
    entries: HashMap<MacAddr, InterfaceId>,
}

impl MacTable {
    /// Record `mac` as reachable via `port`. Returns true if this changed
    /// the table.
    pub fn learn(&mut self, mac: MacAddr, port: &InterfaceId) -> bool {
        match self.entries.get(&mac) {
            Some(existing) if existing == port => false,
            _ => {
                self.entries.insert(mac, port.clone());
                true
            }
        }
    }

    pub fn lookup(&self, mac: &MacAddr) -> Option<&InterfaceId> {
        self.entries.get(mac)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Forwarding state for every device of one snapshot.
#[derive(Debug, Clone, Default)]
pub struct ForwardingState {
    mac_tables: HashMap<DeviceId, MacTable>,
}

impl ForwardingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mac_table(&self, device: &str) -> Option<&MacTable> {
        self.mac_tables.get(device)
    }

    pub fn clear(&mut self) {
        self.mac_tables.clear();
    }

    /// Console lines describing what `hop.from` does to send the packet
    /// across `hop`. Called before the packet's headers are rewritten.
    pub fn egress_narration(&self, topology: &Topology, hop: &Hop, packet: &Packet) -> Vec<String> {
        let Some(from) = topology.device(hop.from.as_str()) else {
            return Vec::new();
        };
        let to_label = label(topology, &hop.to);
        let mut lines = Vec::new();

        if from.kind.is_l2_forwarder() {
            let next_mac = peer_mac(topology, hop);
            match self.mac_tables.get(&from.id).and_then(|t| t.lookup(&next_mac)) {
                Some(port) => lines.push(format!(
                    "{}: {} found in MAC table on port {}, forwarding",
                    from.label, next_mac, port
                )),
                None => {
                    let flood = topology
                        .traversable_links(from.id.as_str())
                        .len()
                        .saturating_sub(1);
                    lines.push(format!(
                        "{}: {} unknown, flooding frame out {} port(s)",
                        from.label, next_mac, flood
                    ));
                }
            }
        } else if from.kind.is_router() || from.kind.is_firewall() {
            if let Some(dst) = packet.l3.dst_ip {
                lines.push(route_narration(from, dst, &hop.egress));
            }
        }

        lines.push(format!(
            "{} -> {} via {} ({} -> {}), TTL {}",
            from.label,
            to_label,
            hop.edge,
            hop.egress,
            hop.ingress,
            packet.l3.ttl
        ));
        lines
    }

    /// Learn on the receiving side of `hop`. Called after the header
    /// rewrite, so the frame's source MAC is the sender's egress port.
    pub fn ingress_learning(&mut self, topology: &Topology, hop: &Hop, packet: &Packet) -> Option<String> {
        let to = topology.device(hop.to.as_str())?;
        if !to.kind.is_l2_forwarder() {
            return None;
        }
        let table = self.mac_tables.entry(to.id.clone()).or_default();
        table.learn(packet.l2.src_mac, &hop.ingress).then(|| {
            format!(
                "{}: learned {} on port {}",
                to.label, packet.l2.src_mac, hop.ingress
            )
        })
    }
}

fn label(topology: &Topology, id: &DeviceId) -> String {
    topology
        .device(id.as_str())
        .map_or_else(|| id.to_string(), |d| d.label.clone())
}

/// MAC of the receiving port of a hop.
pub(crate) fn peer_mac(topology: &Topology, hop: &Hop) -> MacAddr {
    topology
        .device(hop.to.as_str())
        .and_then(|d| d.interface(hop.ingress.as_str()))
        .map_or_else(
            || MacAddr::derive(hop.to.as_str(), hop.ingress.as_str()),
            |i| i.effective_mac(&hop.to),
        )
}

/// MAC of the sending port of a hop.
pub(crate) fn local_mac(topology: &Topology, hop: &Hop) -> MacAddr {
    topology
        .device(hop.from.as_str())
        .and_then(|d| d.interface(hop.egress.as_str()))
        .map_or_else(
            || MacAddr::derive(hop.from.as_str(), hop.egress.as_str()),
            |i| i.effective_mac(&hop.from),
        )
}

fn route_narration(device: &Device, dst: std::net::Ipv4Addr, egress: &InterfaceId) -> String {
    match device.route_lookup(dst) {
        Some((prefix, Some(iface))) => format!(
            "{}: route lookup for {} matched connected {} on {}",
            device.label, dst, prefix, iface.id
        ),
        Some((prefix, None)) => format!(
            "{}: route lookup for {} matched static route {}, egress {}",
            device.label, dst, prefix, egress
        ),
        None => format!(
            "{}: no route lookup needed for {}, bridging out {}",
            device.label, dst, egress
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketId;
    use netlab_topology::{DeviceKind, Edge, Endpoint, Interface, LinkMedia};

    fn mac(last: u8) -> MacAddr {
        MacAddr([0x02, 0, 0, 0, 0, last])
    }

    fn topo() -> Topology {
        Topology::new(
            vec![
                Device::new("a", DeviceKind::Pc, "PC-A")
                    .with_interface(Interface::new("eth0", LinkMedia::Copper).with_mac(mac(1))),
                Device::new("sw", DeviceKind::SwitchL2, "SW1")
                    .with_interface(Interface::new("p0", LinkMedia::Copper).with_mac(mac(10)))
                    .with_interface(Interface::new("p1", LinkMedia::Copper).with_mac(mac(11))),
                Device::new("b", DeviceKind::Pc, "PC-B")
                    .with_interface(Interface::new("eth0", LinkMedia::Copper).with_mac(mac(2))),
            ],
            vec![
                Edge::new("e1", Endpoint::new("a", "eth0"), Endpoint::new("sw", "p0")),
                Edge::new("e2", Endpoint::new("sw", "p1"), Endpoint::new("b", "eth0")),
            ],
        )
    }

    fn hop(from: &str, to: &str, edge: &str, egress: &str, ingress: &str) -> Hop {
        Hop {
            from: from.into(),
            to: to.into(),
            edge: edge.into(),
            egress: egress.into(),
            ingress: ingress.into(),
        }
    }

    #[test]
    fn mac_table_learns_once() {
        let mut table = MacTable::default();
        let port = InterfaceId::from("p0");
        assert!(table.learn(mac(1), &port));
        assert!(!table.learn(mac(1), &port));
        assert!(table.learn(mac(1), &InterfaceId::from("p1")), "moves are learned");
        assert_eq!(table.lookup(&mac(1)).unwrap(), "p1");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn switch_learns_sender_on_ingress() {
        let topo = topo();
        let mut state = ForwardingState::new();
        let first = hop("a", "sw", "e1", "eth0", "p0");
        let mut pkt = Packet::echo_request(PacketId(1), mac(1), None, None, 64);
        pkt.traverse(local_mac(&topo, &first), peer_mac(&topo, &first));

        let line = state.ingress_learning(&topo, &first, &pkt).unwrap();
        assert!(line.contains("learned 02:00:00:00:00:01 on port p0"));
        assert!(state.ingress_learning(&topo, &first, &pkt).is_none());
        assert_eq!(state.mac_table("sw").unwrap().len(), 1);
    }

    #[test]
    fn switch_floods_unknown_then_forwards_known() {
        let topo = topo();
        let mut state = ForwardingState::new();
        let pkt = Packet::echo_request(PacketId(1), mac(10), None, None, 64);
        let out = hop("sw", "b", "e2", "p1", "eth0");

        let lines = state.egress_narration(&topo, &out, &pkt);
        assert!(lines[0].contains("flooding"));

        // b talks back through the switch: sw learns b's MAC on p1
        let back = hop("b", "sw", "e2", "eth0", "p1");
        let mut reply = Packet::echo_request(PacketId(2), mac(2), None, None, 64);
        reply.traverse(local_mac(&topo, &back), peer_mac(&topo, &back));
        state.ingress_learning(&topo, &back, &reply);

        let lines = state.egress_narration(&topo, &out, &pkt);
        assert!(lines[0].contains("found in MAC table on port p1"));
    }

    #[test]
    fn hosts_do_not_learn() {
        let topo = topo();
        let mut state = ForwardingState::new();
        let last = hop("sw", "b", "e2", "p1", "eth0");
        let pkt = Packet::echo_request(PacketId(1), mac(11), None, None, 64);
        assert!(state.ingress_learning(&topo, &last, &pkt).is_none());
        assert!(state.mac_table("b").is_none());
    }
}
