//! netlab Topology
//!
//! Passive data model for network diagrams: devices, their ports, and the
//! links between them.
//!
//! # Traversability
//!
//! A link carries traffic only when its validity flag is set and both of its
//! ports are administratively up. Invalid links (media or PoE mismatch)
//! remain part of the snapshot so they can still be drawn and reported.
//!
//! # Ownership
//!
//! The diagram store owns the live devices and edges. Consumers take a
//! [`Topology`] snapshot and read from it; nothing in this crate writes back
//! to the store.

mod addr;
mod device;
mod edge;
mod error;
mod hardware;
mod id;
mod snapshot;
mod validate;

pub use addr::{Ipv4Cidr, MacAddr};
pub use device::{AclAction, AclRule, AdminState, Device, DeviceKind, Interface, LinkMedia};
pub use edge::{Edge, Endpoint};
pub use error::{Error, Result};
pub use hardware::HardwareModel;
pub use id::{DeviceId, EdgeId, InterfaceId};
pub use snapshot::{Link, Topology, TopologyFile};
pub use validate::TopologyIssue;
