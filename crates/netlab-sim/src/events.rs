//! Events emitted by the simulator.
//!
//! Every visual consumer (packet animation, console, toasts, screen reader)
//! is driven by these and nothing else.

use std::fmt;
use std::str::FromStr;

use netlab_topology::{DeviceId, EdgeId};
use serde::{Deserialize, Serialize};

use crate::packet::{Packet, PacketId};
use crate::run::{RunId, SimulationSummary};

/// Event names subscribers register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "sim:start")]
    SimStart,
    #[serde(rename = "sim:tick")]
    SimTick,
    #[serde(rename = "sim:complete")]
    SimComplete,
    #[serde(rename = "sim:reset")]
    SimReset,
    #[serde(rename = "packet:move")]
    PacketMove,
    #[serde(rename = "packet:drop")]
    PacketDrop,
    #[serde(rename = "packet:arrive")]
    PacketArrive,
    #[serde(rename = "packet:inspect")]
    PacketInspect,
    #[serde(rename = "console:log")]
    ConsoleLog,
    #[serde(rename = "console:warn")]
    ConsoleWarn,
    #[serde(rename = "console:error")]
    ConsoleError,
    #[serde(rename = "announce")]
    Announce,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::SimStart,
        EventKind::SimTick,
        EventKind::SimComplete,
        EventKind::SimReset,
        EventKind::PacketMove,
        EventKind::PacketDrop,
        EventKind::PacketArrive,
        EventKind::PacketInspect,
        EventKind::ConsoleLog,
        EventKind::ConsoleWarn,
        EventKind::ConsoleError,
        EventKind::Announce,
    ];

    /// The wire name, e.g. `packet:move`.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SimStart => "sim:start",
            EventKind::SimTick => "sim:tick",
            EventKind::SimComplete => "sim:complete",
            EventKind::SimReset => "sim:reset",
            EventKind::PacketMove => "packet:move",
            EventKind::PacketDrop => "packet:drop",
            EventKind::PacketArrive => "packet:arrive",
            EventKind::PacketInspect => "packet:inspect",
            EventKind::ConsoleLog => "console:log",
            EventKind::ConsoleWarn => "console:warn",
            EventKind::ConsoleError => "console:error",
            EventKind::Announce => "announce",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown event name: {s}"))
    }
}

/// Severity of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

impl ConsoleLevel {
    pub fn kind(&self) -> EventKind {
        match self {
            ConsoleLevel::Log => EventKind::ConsoleLog,
            ConsoleLevel::Warn => EventKind::ConsoleWarn,
            ConsoleLevel::Error => EventKind::ConsoleError,
        }
    }
}

/// A buffered console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub message: String,
}

/// Events that occur during a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// A path was resolved and the run is under way
    #[serde(rename = "sim:start")]
    SimStart {
        run: RunId,
        source: DeviceId,
        target: DeviceId,
        path: Vec<DeviceId>,
    },

    /// Fixed-cadence heartbeat while a run is active
    #[serde(rename = "sim:tick")]
    SimTick { run: RunId, tick: u64 },

    /// Always the last event of a run
    #[serde(rename = "sim:complete")]
    SimComplete {
        run: RunId,
        summary: SimulationSummary,
    },

    /// The simulator was reset
    #[serde(rename = "sim:reset")]
    SimReset,

    /// A packet starts crossing a link
    #[serde(rename = "packet:move")]
    PacketMove {
        run: RunId,
        packet: PacketId,
        edge: EdgeId,
        from: DeviceId,
        to: DeviceId,
        hop: usize,
        duration_ms: u64,
    },

    /// A packet was discarded
    #[serde(rename = "packet:drop")]
    PacketDrop {
        run: RunId,
        packet: PacketId,
        device: DeviceId,
        edge: Option<EdgeId>,
        reason: String,
        explanation: String,
    },

    /// A packet reached its destination
    #[serde(rename = "packet:arrive")]
    PacketArrive {
        run: RunId,
        packet: PacketId,
        device: DeviceId,
        hops: u32,
    },

    /// Full header state, for the debug panel
    #[serde(rename = "packet:inspect")]
    PacketInspect {
        run: RunId,
        device: DeviceId,
        packet: Packet,
    },

    #[serde(rename = "console:log")]
    ConsoleLog { message: String },

    #[serde(rename = "console:warn")]
    ConsoleWarn { message: String },

    #[serde(rename = "console:error")]
    ConsoleError { message: String },

    /// Screen-reader announcement
    #[serde(rename = "announce")]
    Announce { message: String },
}

impl SimEvent {
    /// The name this event is dispatched under.
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::SimStart { .. } => EventKind::SimStart,
            SimEvent::SimTick { .. } => EventKind::SimTick,
            SimEvent::SimComplete { .. } => EventKind::SimComplete,
            SimEvent::SimReset => EventKind::SimReset,
            SimEvent::PacketMove { .. } => EventKind::PacketMove,
            SimEvent::PacketDrop { .. } => EventKind::PacketDrop,
            SimEvent::PacketArrive { .. } => EventKind::PacketArrive,
            SimEvent::PacketInspect { .. } => EventKind::PacketInspect,
            SimEvent::ConsoleLog { .. } => EventKind::ConsoleLog,
            SimEvent::ConsoleWarn { .. } => EventKind::ConsoleWarn,
            SimEvent::ConsoleError { .. } => EventKind::ConsoleError,
            SimEvent::Announce { .. } => EventKind::Announce,
        }
    }

    /// The packet this event is about, if any.
    pub fn packet_id(&self) -> Option<PacketId> {
        match self {
            SimEvent::PacketMove { packet, .. }
            | SimEvent::PacketDrop { packet, .. }
            | SimEvent::PacketArrive { packet, .. } => Some(*packet),
            SimEvent::PacketInspect { packet, .. } => Some(packet.id),
            _ => None,
        }
    }

    /// The run this event belongs to, if any.
    pub fn run(&self) -> Option<RunId> {
        match self {
            SimEvent::SimStart { run, .. }
            | SimEvent::SimTick { run, .. }
            | SimEvent::SimComplete { run, .. }
            | SimEvent::PacketMove { run, .. }
            | SimEvent::PacketDrop { run, .. }
            | SimEvent::PacketArrive { run, .. }
            | SimEvent::PacketInspect { run, .. } => Some(*run),
            _ => None,
        }
    }

    pub fn console(level: ConsoleLevel, message: String) -> Self {
        match level {
            ConsoleLevel::Log => SimEvent::ConsoleLog { message },
            ConsoleLevel::Warn => SimEvent::ConsoleWarn { message },
            ConsoleLevel::Error => SimEvent::ConsoleError { message },
        }
    }
}
