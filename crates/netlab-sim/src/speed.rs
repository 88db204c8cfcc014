//! Animation speed for hop transitions.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How long each hop's transition lasts relative to the configured base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationSpeed {
    /// 0.5x speed
    Slow,
    /// Normal speed (1x)
    #[default]
    Normal,
    /// 2x speed
    Fast,
    /// Zero-duration hops, used for headless runs and tests
    Instant,
}

impl SimulationSpeed {
    /// Get the speed multiplier.
    pub fn multiplier(&self) -> f64 {
        match self {
            SimulationSpeed::Slow => 0.5,
            SimulationSpeed::Normal => 1.0,
            SimulationSpeed::Fast => 2.0,
            SimulationSpeed::Instant => f64::INFINITY,
        }
    }

    /// Milliseconds per hop at this speed.
    pub fn ms_per_hop(&self, base_ms: u64) -> u64 {
        match self {
            SimulationSpeed::Instant => 0,
            speed => (base_ms as f64 / speed.multiplier()) as u64,
        }
    }

    /// Per-hop duration at this speed.
    pub fn hop_duration(&self, base_ms: u64) -> Duration {
        Duration::from_millis(self.ms_per_hop(base_ms))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationSpeed::Slow => "slow",
            SimulationSpeed::Normal => "normal",
            SimulationSpeed::Fast => "fast",
            SimulationSpeed::Instant => "instant",
        }
    }
}

impl fmt::Display for SimulationSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationSpeed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(SimulationSpeed::Slow),
            "normal" => Ok(SimulationSpeed::Normal),
            "fast" => Ok(SimulationSpeed::Fast),
            "instant" => Ok(SimulationSpeed::Instant),
            _ => Err(Error::Config {
                key: "speed",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_multipliers() {
        assert_eq!(SimulationSpeed::Slow.multiplier(), 0.5);
        assert_eq!(SimulationSpeed::Normal.multiplier(), 1.0);
        assert_eq!(SimulationSpeed::Fast.multiplier(), 2.0);
        assert!(SimulationSpeed::Instant.multiplier().is_infinite());
    }

    #[test]
    fn hop_durations_scale_with_speed() {
        assert_eq!(SimulationSpeed::Slow.ms_per_hop(1000), 2000);
        assert_eq!(SimulationSpeed::Normal.ms_per_hop(1000), 1000);
        assert_eq!(SimulationSpeed::Fast.ms_per_hop(1000), 500);
        assert_eq!(SimulationSpeed::Instant.hop_duration(1000), Duration::ZERO);
    }

    #[test]
    fn parses_names() {
        assert_eq!("FAST".parse::<SimulationSpeed>().unwrap(), SimulationSpeed::Fast);
        assert_eq!(" instant ".parse::<SimulationSpeed>().unwrap(), SimulationSpeed::Instant);
        assert!("warp".parse::<SimulationSpeed>().is_err());
    }
}
