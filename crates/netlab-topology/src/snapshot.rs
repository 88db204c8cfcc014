//! Immutable topology snapshot with indexed lookups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::device::{Device, Interface};
use crate::edge::{Edge, Endpoint};
use crate::error::{Error, Result};
use crate::id::{DeviceId, EdgeId};

/// Serialized form of a topology: the diagram store's node and edge lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyFile {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A link as seen from one of its devices.
#[derive(Debug, Clone, Copy)]
pub struct Link<'a> {
    pub edge: &'a Edge,
    pub local: &'a Endpoint,
    pub remote: &'a Endpoint,
}

/// A read-only copy of the diagram's devices and edges.
///
/// Input order is preserved: [`Topology::links_of`] yields edges in
/// edge-list order, which is what makes path resolution deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "TopologyFile", into = "TopologyFile")]
pub struct Topology {
    devices: Vec<Device>,
    edges: Vec<Edge>,
    device_index: HashMap<DeviceId, usize>,
    edge_index: HashMap<EdgeId, usize>,
    adjacency: HashMap<DeviceId, Vec<usize>>,
}

impl Topology {
    /// Build a snapshot. Later duplicates of an id shadow earlier ones in
    /// lookups but keep their place in iteration order.
    pub fn new(devices: Vec<Device>, edges: Vec<Edge>) -> Self {
        let device_index = devices
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        let edge_index = edges
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        let mut adjacency: HashMap<DeviceId, Vec<usize>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            adjacency.entry(edge.source.device.clone()).or_default().push(i);
            if edge.target.device != edge.source.device {
                adjacency.entry(edge.target.device.clone()).or_default().push(i);
            }
        }

        Self {
            devices,
            edges,
            device_index,
            edge_index,
            adjacency,
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.device_index.get(id).map(|&i| &self.devices[i])
    }

    pub fn contains_device(&self, id: &str) -> bool {
        self.device_index.contains_key(id)
    }

    /// Like [`Topology::device`] but reports a missing id as an error.
    pub fn require_device(&self, id: &str) -> Result<&Device> {
        self.device(id)
            .ok_or_else(|| Error::UnknownDevice(id.to_string()))
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|&i| &self.edges[i])
    }

    /// The interface an endpoint refers to.
    pub fn interface(&self, endpoint: &Endpoint) -> Option<&Interface> {
        self.device(endpoint.device.as_str())?
            .interface(endpoint.interface.as_str())
    }

    /// An edge carries traffic only if it is valid and both of its ports
    /// exist and are administratively up.
    pub fn is_traversable(&self, edge: &Edge) -> bool {
        edge.valid
            && edge
                .endpoints()
                .iter()
                .all(|ep| self.interface(ep).is_some_and(Interface::is_up))
    }

    /// Edges touching `device`, in edge-list order.
    pub fn links_of(&self, device: &str) -> Vec<Link<'_>> {
        let Some(indices) = self.adjacency.get(device) else {
            return Vec::new();
        };
        indices
            .iter()
            .filter_map(|&i| {
                let edge = &self.edges[i];
                Some(Link {
                    edge,
                    local: edge.endpoint_on(device)?,
                    remote: edge.far_end(device)?,
                })
            })
            .collect()
    }

    /// Traversable edges touching `device`, in edge-list order.
    pub fn traversable_links(&self, device: &str) -> Vec<Link<'_>> {
        self.links_of(device)
            .into_iter()
            .filter(|link| self.is_traversable(link.edge))
            .collect()
    }

    /// The first traversable edge joining two devices, in edge-list order.
    pub fn link_between(&self, from: &str, to: &str) -> Option<Link<'_>> {
        self.traversable_links(from)
            .into_iter()
            .find(|link| link.remote.device == to)
    }

    /// Flip the validity flag of an edge in this snapshot.
    pub fn set_edge_valid(&mut self, id: &str, valid: bool) -> Result<()> {
        let &index = self
            .edge_index
            .get(id)
            .ok_or_else(|| Error::UnknownEdge(id.to_string()))?;
        self.edges[index].valid = valid;
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<Device>, Vec<Edge>) {
        (self.devices, self.edges)
    }
}

impl From<TopologyFile> for Topology {
    fn from(file: TopologyFile) -> Self {
        Topology::new(file.devices, file.edges)
    }
}

impl From<Topology> for TopologyFile {
    fn from(topology: Topology) -> Self {
        let (devices, edges) = topology.into_parts();
        TopologyFile { devices, edges }
    }
}
