//! Fewest-hop path resolution over a topology snapshot.
//!
//! Breadth-first search over traversable links only. Neighbors are expanded
//! in edge-list order, so ties always resolve the same way for the same
//! snapshot.
//!
//! Forwarding rules applied while expanding a device:
//!
//! | device            | forwards when                                       |
//! |-------------------|-----------------------------------------------------|
//! | host/server/IoT   | only as the source; never carries transit traffic   |
//! | switch, AP, cloud | always (transparent, needs a live link)             |
//! | router, L3 switch | destination IP matches a connected subnet or route  |
//! | firewall          | ACL permits the destination (and a route, if it has |
//! |                   | addressed interfaces)                               |

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::Ipv4Addr;

use netlab_topology::{Device, DeviceId, EdgeId, InterfaceId, Topology};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Why no path could be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RouteFailure {
    #[error("no route: device {0} is not in the topology")]
    UnknownDevice(DeviceId),

    #[error("no route: source {0} has no interface that is up")]
    SourceDown(DeviceId),

    #[error("no route: target {0} is administratively down")]
    TargetDown(DeviceId),

    #[error("no route to host: no traversable path from {from} to {to}")]
    NoPath { from: DeviceId, to: DeviceId },

    #[error("no route to {} on {router}", display_ip(.destination))]
    NoRoute {
        router: DeviceId,
        destination: Option<Ipv4Addr>,
    },

    #[error("blocked by firewall {firewall}: ACL denies {destination}")]
    BlockedByAcl {
        firewall: DeviceId,
        destination: Ipv4Addr,
    },
}

fn display_ip(ip: &Option<Ipv4Addr>) -> String {
    ip.map_or_else(|| "destination without an address".to_string(), |ip| ip.to_string())
}

/// One directed traversal of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub from: DeviceId,
    pub to: DeviceId,
    pub edge: EdgeId,
    pub egress: InterfaceId,
    pub ingress: InterfaceId,
}

/// A resolved source-to-target path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    pub devices: Vec<DeviceId>,
    pub hops: Vec<Hop>,
}

impl ResolvedPath {
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }
}

/// Resolves paths over one snapshot.
pub struct PathResolver<'a> {
    topology: &'a Topology,
}

impl<'a> PathResolver<'a> {
    pub fn new(topology: &'a Topology) -> Self {
        Self { topology }
    }

    /// Find the fewest-hop path from `source` to `target`.
    pub fn resolve(&self, source: &str, target: &str) -> Result<ResolvedPath, RouteFailure> {
        let topo = self.topology;
        let src = topo
            .device(source)
            .ok_or_else(|| RouteFailure::UnknownDevice(source.into()))?;
        let dst = topo
            .device(target)
            .ok_or_else(|| RouteFailure::UnknownDevice(target.into()))?;

        if src.id == dst.id {
            return Ok(ResolvedPath {
                devices: vec![src.id.clone()],
                hops: Vec::new(),
            });
        }
        if !src.interfaces.is_empty() && !src.has_up_interface() {
            return Err(RouteFailure::SourceDown(src.id.clone()));
        }
        if !dst.interfaces.is_empty() && !dst.has_up_interface() {
            return Err(RouteFailure::TargetDown(dst.id.clone()));
        }

        let destination = dst.primary_ip();
        let mut visited: HashSet<&DeviceId> = HashSet::from([&src.id]);
        let mut parent: HashMap<&DeviceId, Hop> = HashMap::new();
        let mut queue: VecDeque<&Device> = VecDeque::from([src]);
        let mut refusal: Option<RouteFailure> = None;

        while let Some(current) = queue.pop_front() {
            if current.id == dst.id {
                break;
            }
            if current.id != src.id && current.kind.is_endpoint() {
                continue;
            }
            if let Err(reason) = forwarding_check(current, destination) {
                trace!(device = %current.id, %reason, "device refuses to forward");
                refusal.get_or_insert(reason);
                continue;
            }

            for link in topo.traversable_links(current.id.as_str()) {
                let Some(next) = topo.device(link.remote.device.as_str()) else {
                    continue;
                };
                if !visited.insert(&next.id) {
                    continue;
                }
                parent.insert(
                    &next.id,
                    Hop {
                        from: current.id.clone(),
                        to: next.id.clone(),
                        edge: link.edge.id.clone(),
                        egress: link.local.interface.clone(),
                        ingress: link.remote.interface.clone(),
                    },
                );
                queue.push_back(next);
            }
        }

        if !parent.contains_key(&dst.id) {
            let failure = refusal.unwrap_or_else(|| RouteFailure::NoPath {
                from: src.id.clone(),
                to: dst.id.clone(),
            });
            debug!(%source, %target, %failure, "path resolution failed");
            return Err(failure);
        }

        let mut hops = Vec::new();
        let mut cursor = &dst.id;
        while let Some(hop) = parent.get(cursor) {
            hops.push(hop.clone());
            cursor = &hop.from;
            if *cursor == src.id {
                break;
            }
        }
        hops.reverse();

        let mut devices = vec![src.id.clone()];
        devices.extend(hops.iter().map(|h| h.to.clone()));
        debug!(%source, %target, hops = hops.len(), "path resolved");

        Ok(ResolvedPath { devices, hops })
    }
}

/// Decide whether `device` may forward traffic toward `destination`.
fn forwarding_check(device: &Device, destination: Option<Ipv4Addr>) -> Result<(), RouteFailure> {
    let kind = device.kind;
    if kind.is_firewall() {
        if let Some(ip) = destination {
            if !device.acl_permits(ip) {
                return Err(RouteFailure::BlockedByAcl {
                    firewall: device.id.clone(),
                    destination: ip,
                });
            }
        }
        let routed = device.interfaces.iter().any(|i| i.ip.is_some());
        if !routed {
            return Ok(());
        }
    } else if !kind.is_router() {
        return Ok(());
    }

    match destination {
        Some(ip) if device.route_lookup(ip).is_some() => Ok(()),
        _ => Err(RouteFailure::NoRoute {
            router: device.id.clone(),
            destination,
        }),
    }
}
