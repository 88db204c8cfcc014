//! Run bookkeeping: status, per-run record and the final summary.

use std::fmt;

use netlab_topology::DeviceId;
use serde::{Deserialize, Serialize};

use crate::packet::PacketId;
use crate::speed::SimulationSpeed;

/// Identifies one `execute_ping` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Lifecycle of a run.
///
/// `Idle -> Running -> {Completed | Failed}`; `reset()` or the next run
/// brings the simulator back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// The simulator's record of the current (or last) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub id: RunId,
    pub source: DeviceId,
    pub target: DeviceId,
    pub path: Vec<DeviceId>,
    /// Duration of each hop already taken, in milliseconds
    pub hop_durations_ms: Vec<u64>,
    pub status: RunStatus,
    pub errors: Vec<String>,
    /// Packets created so far in this run
    pub packets: Vec<PacketId>,
    pub ticks: u64,
}

impl SimulationRun {
    pub(crate) fn new(id: RunId, source: DeviceId, target: DeviceId) -> Self {
        Self {
            id,
            source,
            target,
            path: Vec::new(),
            hop_durations_ms: Vec::new(),
            status: RunStatus::Running,
            errors: Vec::new(),
            packets: Vec::new(),
            ticks: 0,
        }
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.hop_durations_ms.iter().sum()
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            success: self.status == RunStatus::Completed,
            path: self.path.clone(),
            total_latency_ms: self.total_latency_ms(),
            total_packets: self.packets.len() as u32,
            total_ticks: self.ticks,
            errors: self.errors.clone(),
        }
    }
}

/// Result of `execute_ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub success: bool,
    pub path: Vec<DeviceId>,
    pub total_latency_ms: u64,
    pub total_packets: u32,
    pub total_ticks: u64,
    pub errors: Vec<String>,
}

impl SimulationSummary {
    /// A failed summary for a run that never got going.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            path: Vec::new(),
            total_latency_ms: 0,
            total_packets: 0,
            total_ticks: 0,
            errors: vec![error.into()],
        }
    }
}

/// Point-in-time view of the simulator for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub is_running: bool,
    pub speed: SimulationSpeed,
    pub current_run: Option<SimulationRun>,
}

impl SimulationState {
    /// Status of the current run, or idle when there is none.
    pub fn status(&self) -> RunStatus {
        self.current_run
            .as_ref()
            .map_or(RunStatus::Idle, |run| run.status)
    }
}
