//! Simulation configuration.

use std::path::Path;
use std::str::FromStr;

use netlab_topology::Topology;

use crate::error::{Error, Result};
use crate::speed::SimulationSpeed;

/// Configuration for the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Hop duration at normal speed, in milliseconds
    pub base_hop_ms: u64,
    /// Interval between `sim:tick` events while a hop is in flight
    pub tick_ms: u64,
    /// TTL stamped on new packets
    pub initial_ttl: u8,
    /// Speed the simulator starts with
    pub default_speed: SimulationSpeed,
    /// Echo requests sent per ping run
    pub ping_count: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_hop_ms: 1000,
            tick_ms: 100,
            initial_ttl: 64,
            default_speed: SimulationSpeed::Normal,
            ping_count: 1,
        }
    }
}

impl SimulationConfig {
    /// Config for headless execution: instant hops, otherwise defaults.
    #[must_use]
    pub fn headless() -> Self {
        Self {
            default_speed: SimulationSpeed::Instant,
            ..Default::default()
        }
    }

    /// Create config from environment variables, falling back to defaults.
    ///
    /// Reads `NETLAB_HOP_MS`, `NETLAB_TICK_MS`, `NETLAB_TTL`, `NETLAB_SPEED`
    /// and `NETLAB_PING_COUNT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            base_hop_ms: parse_var(&lookup, "NETLAB_HOP_MS", defaults.base_hop_ms)?,
            tick_ms: parse_var(&lookup, "NETLAB_TICK_MS", defaults.tick_ms)?,
            initial_ttl: parse_var(&lookup, "NETLAB_TTL", defaults.initial_ttl)?,
            default_speed: parse_var(&lookup, "NETLAB_SPEED", defaults.default_speed)?,
            ping_count: parse_var(&lookup, "NETLAB_PING_COUNT", defaults.ping_count)?,
        })
    }

    #[must_use]
    pub fn with_base_hop_ms(mut self, ms: u64) -> Self {
        self.base_hop_ms = ms;
        self
    }

    #[must_use]
    pub fn with_tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.initial_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed: SimulationSpeed) -> Self {
        self.default_speed = speed;
        self
    }

    #[must_use]
    pub fn with_ping_count(mut self, count: u32) -> Self {
        self.ping_count = count.max(1);
        self
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config { key, value: raw }),
        None => Ok(default),
    }
}

/// Load a `{ "devices": [...], "edges": [...] }` topology file.
pub fn load_topology(path: &Path) -> Result<Topology> {
    let raw = std::fs::read_to_string(path)?;
    let topology: Topology = serde_json::from_str(&raw)?;
    tracing::debug!(
        path = %path.display(),
        devices = topology.device_count(),
        edges = topology.edges().len(),
        "loaded topology"
    );
    Ok(topology)
}
