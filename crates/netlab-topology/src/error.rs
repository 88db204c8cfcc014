//! Error types for netlab-topology.

use thiserror::Error;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No device with this id exists in the snapshot.
    #[error("unknown device: {0}")]
    UnknownDevice(String),

    /// The device exists but has no interface with this id.
    #[error("device {device} has no interface {interface}")]
    UnknownInterface { device: String, interface: String },

    /// No edge with this id exists in the snapshot.
    #[error("unknown edge: {0}")]
    UnknownEdge(String),

    /// A MAC address could not be parsed.
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    /// An IPv4 address, mask or prefix could not be parsed.
    #[error("invalid IPv4 address or prefix: {0}")]
    InvalidAddress(String),
}
