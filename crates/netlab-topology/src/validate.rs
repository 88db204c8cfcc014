//! Consistency checks over a snapshot.
//!
//! Issues are advisory. The engine reports them on the console and keeps
//! going; traversability rules alone decide whether traffic can flow.

use std::collections::HashMap;
use std::fmt;

use crate::device::LinkMedia;
use crate::edge::Endpoint;
use crate::id::{DeviceId, EdgeId, InterfaceId};
use crate::snapshot::Topology;

/// A problem found by [`Topology::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyIssue {
    /// An edge names a device that is not in the snapshot.
    UnknownDevice { edge: EdgeId, device: DeviceId },
    /// An edge names a port the device does not have.
    UnknownInterface {
        edge: EdgeId,
        device: DeviceId,
        interface: InterfaceId,
    },
    /// The port does not point back at the edge occupying it.
    AsymmetricBinding {
        edge: EdgeId,
        device: DeviceId,
        interface: InterfaceId,
        bound_to: Option<EdgeId>,
    },
    /// Two edges occupy the same port.
    PortReused {
        device: DeviceId,
        interface: InterfaceId,
        first: EdgeId,
        second: EdgeId,
    },
    /// An edge is flagged valid although its port media cannot interoperate.
    MediaMismatch {
        edge: EdgeId,
        source: LinkMedia,
        target: LinkMedia,
    },
    /// Powered devices draw more than the device's PoE budget.
    PoeOverBudget {
        device: DeviceId,
        draw_watts: f32,
        budget_watts: f32,
    },
}

impl fmt::Display for TopologyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyIssue::UnknownDevice { edge, device } => {
                write!(f, "link {edge} references unknown device {device}")
            }
            TopologyIssue::UnknownInterface { edge, device, interface } => {
                write!(f, "link {edge} references missing port {device}:{interface}")
            }
            TopologyIssue::AsymmetricBinding { edge, device, interface, bound_to } => match bound_to {
                Some(other) => write!(
                    f,
                    "port {device}:{interface} is bound to {other}, not to link {edge}"
                ),
                None => write!(f, "port {device}:{interface} does not record link {edge}"),
            },
            TopologyIssue::PortReused { device, interface, first, second } => write!(
                f,
                "port {device}:{interface} is used by both {first} and {second}"
            ),
            TopologyIssue::MediaMismatch { edge, source, target } => write!(
                f,
                "link {edge} joins incompatible media {source:?} and {target:?}"
            ),
            TopologyIssue::PoeOverBudget { device, draw_watts, budget_watts } => write!(
                f,
                "{device} supplies {draw_watts:.1} W of PoE but its budget is {budget_watts:.1} W"
            ),
        }
    }
}

impl Topology {
    /// Check port bindings, media and PoE budgets.
    pub fn validate(&self) -> Vec<TopologyIssue> {
        let mut issues = Vec::new();
        let mut occupied: HashMap<&Endpoint, &EdgeId> = HashMap::new();
        let mut poe_draw: HashMap<&DeviceId, f32> = HashMap::new();

        for edge in self.edges() {
            let mut media = Vec::with_capacity(2);

            for endpoint in edge.endpoints() {
                let Some(device) = self.device(endpoint.device.as_str()) else {
                    issues.push(TopologyIssue::UnknownDevice {
                        edge: edge.id.clone(),
                        device: endpoint.device.clone(),
                    });
                    continue;
                };
                let Some(interface) = device.interface(endpoint.interface.as_str()) else {
                    issues.push(TopologyIssue::UnknownInterface {
                        edge: edge.id.clone(),
                        device: endpoint.device.clone(),
                        interface: endpoint.interface.clone(),
                    });
                    continue;
                };
                media.push(interface.media);

                if interface.connected_edge_id.as_ref() != Some(&edge.id) {
                    issues.push(TopologyIssue::AsymmetricBinding {
                        edge: edge.id.clone(),
                        device: endpoint.device.clone(),
                        interface: endpoint.interface.clone(),
                        bound_to: interface.connected_edge_id.clone(),
                    });
                }

                if let Some(first) = occupied.insert(endpoint, &edge.id) {
                    issues.push(TopologyIssue::PortReused {
                        device: endpoint.device.clone(),
                        interface: endpoint.interface.clone(),
                        first: first.clone(),
                        second: edge.id.clone(),
                    });
                }
            }

            if let [source, target] = media[..] {
                if edge.valid && !source.is_compatible(target) {
                    issues.push(TopologyIssue::MediaMismatch {
                        edge: edge.id.clone(),
                        source,
                        target,
                    });
                }
            }

            if edge.valid {
                for (powered, supplier) in [(&edge.source, &edge.target), (&edge.target, &edge.source)] {
                    let draw = self
                        .interface(powered)
                        .filter(|i| i.media == LinkMedia::Copper)
                        .and_then(|i| i.poe_draw_watts);
                    if let Some(draw) = draw {
                        *poe_draw.entry(&supplier.device).or_default() += draw;
                    }
                }
            }
        }

        for device in self.devices() {
            let Some(&draw) = poe_draw.get(&device.id) else {
                continue;
            };
            let budget = device.hardware().poe_budget_watts;
            if draw > budget {
                issues.push(TopologyIssue::PoeOverBudget {
                    device: device.id.clone(),
                    draw_watts: draw,
                    budget_watts: budget,
                });
            }
        }

        if !issues.is_empty() {
            tracing::debug!(count = issues.len(), "topology validation found issues");
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceKind, Interface};
    use crate::edge::Edge;

    fn port(id: &str, edge: &str) -> Interface {
        Interface::new(id, LinkMedia::Copper).with_edge(edge)
    }

    #[test]
    fn consistent_topology_has_no_issues() {
        let topo = Topology::new(
            vec![
                Device::new("a", DeviceKind::Pc, "A").with_interface(port("eth0", "e1")),
                Device::new("b", DeviceKind::Pc, "B").with_interface(port("eth0", "e1")),
            ],
            vec![Edge::new("e1", Endpoint::new("a", "eth0"), Endpoint::new("b", "eth0"))],
        );
        assert!(topo.validate().is_empty());
    }

    #[test]
    fn detects_asymmetric_binding_and_missing_port() {
        let topo = Topology::new(
            vec![
                Device::new("a", DeviceKind::Pc, "A").with_interface(port("eth0", "other")),
                Device::new("b", DeviceKind::Pc, "B"),
            ],
            vec![Edge::new("e1", Endpoint::new("a", "eth0"), Endpoint::new("b", "eth0"))],
        );
        let issues = topo.validate();
        assert!(issues.iter().any(|i| matches!(i, TopologyIssue::AsymmetricBinding { .. })));
        assert!(issues.iter().any(|i| matches!(i, TopologyIssue::UnknownInterface { .. })));
    }

    #[test]
    fn detects_port_reuse() {
        let topo = Topology::new(
            vec![
                Device::new("a", DeviceKind::Pc, "A").with_interface(port("eth0", "e1")),
                Device::new("b", DeviceKind::Pc, "B").with_interface(port("eth0", "e1")),
                Device::new("c", DeviceKind::Pc, "C").with_interface(port("eth0", "e2")),
            ],
            vec![
                Edge::new("e1", Endpoint::new("a", "eth0"), Endpoint::new("b", "eth0")),
                Edge::new("e2", Endpoint::new("a", "eth0"), Endpoint::new("c", "eth0")),
            ],
        );
        assert!(topo
            .validate()
            .iter()
            .any(|i| matches!(i, TopologyIssue::PortReused { second, .. } if second == "e2")));
    }

    #[test]
    fn detects_media_mismatch_only_on_valid_edges() {
        let devices = vec![
            Device::new("a", DeviceKind::Router, "A").with_interface(port("gi0", "e1")),
            Device::new("b", DeviceKind::Router, "B")
                .with_interface(Interface::new("te0", LinkMedia::Fiber).with_edge("e1")),
        ];
        let edge = Edge::new("e1", Endpoint::new("a", "gi0"), Endpoint::new("b", "te0"));

        let flagged = Topology::new(devices.clone(), vec![edge.clone()]);
        assert!(flagged
            .validate()
            .iter()
            .any(|i| matches!(i, TopologyIssue::MediaMismatch { .. })));

        let marked_invalid = Topology::new(devices, vec![edge.invalid()]);
        assert!(marked_invalid.validate().is_empty());
    }

    #[test]
    fn detects_poe_over_budget() {
        let mut camera_port = port("eth0", "e1");
        camera_port.poe_draw_watts = Some(12.0);
        let topo = Topology::new(
            vec![
                Device::new("r", DeviceKind::Router, "R").with_interface(port("gi0", "e1")),
                Device::new("cam", DeviceKind::IotCamera, "Cam").with_interface(camera_port),
            ],
            vec![Edge::new("e1", Endpoint::new("r", "gi0"), Endpoint::new("cam", "eth0"))],
        );
        let issues = topo.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_string().contains("PoE"));
    }
}
