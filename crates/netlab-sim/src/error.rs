//! Error types for netlab-sim.

use netlab_topology::DeviceId;
use thiserror::Error;

use crate::resolver::RouteFailure;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or running a simulation.
///
/// `execute_ping` never returns these directly; they are rendered into the
/// summary's error list.
#[derive(Debug, Error)]
pub enum Error {
    /// The source id is not in the current snapshot.
    #[error("source device {0} is not in the topology")]
    UnknownSource(DeviceId),

    /// The target id is not in the current snapshot.
    #[error("target device {0} is not in the topology")]
    UnknownTarget(DeviceId),

    /// Source and target name the same device.
    #[error("source and target are the same device ({0})")]
    SameEndpoints(DeviceId),

    /// The path resolver could not find a way through.
    #[error(transparent)]
    Route(#[from] RouteFailure),

    /// A packet was dropped in flight.
    #[error("packet dropped at {device}: {reason}")]
    Dropped { device: DeviceId, reason: String },

    /// Another run is already active.
    #[error("simulation already running")]
    AlreadyRunning,

    /// The run was cancelled by a reset or re-initialization.
    #[error("simulation reset")]
    Cancelled,

    /// The caller stopped awaiting the run before it finished.
    #[error("simulation abandoned before completion")]
    Abandoned,

    /// A configuration value could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Config { key: &'static str, value: String },

    /// Topology lookup or mutation error.
    #[error(transparent)]
    Topology(#[from] netlab_topology::Error),

    /// Reading a topology file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A topology file was not valid JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
