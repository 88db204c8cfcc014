//! Logging configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Directive used when neither `RUST_LOG` nor `NETLAB_LOG` is set.
pub const DEFAULT_DIRECTIVE: &str = "netlab_sim=info,netlab_cli=info,netlab_topology=warn";

/// Output layout of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per event, abbreviated fields
    #[default]
    Compact,
    /// Multi-line, human oriented
    Pretty,
    /// The fmt layer's default single-line layout
    Full,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Full => "full",
        })
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "full" => Ok(LogFormat::Full),
            _ => Err(Error::Format(s.to_string())),
        }
    }
}

/// Main logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is absent
    pub default_directive: String,
    pub format: LogFormat,
    /// Include the event's target (module path)
    pub with_target: bool,
    /// Colorize output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_DIRECTIVE.to_string(),
            format: LogFormat::default(),
            with_target: true,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Verbose output for local debugging.
    pub fn development() -> Self {
        Self {
            default_directive: "netlab_sim=debug,netlab_cli=debug,netlab_topology=debug".to_string(),
            format: LogFormat::Pretty,
            ..Default::default()
        }
    }

    /// Quiet, uncolored output for test binaries.
    pub fn test() -> Self {
        Self {
            default_directive: "warn".to_string(),
            ansi: false,
            ..Default::default()
        }
    }

    /// Read `NETLAB_LOG` (filter directive) and `NETLAB_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(directive) = lookup("NETLAB_LOG").filter(|d| !d.trim().is_empty()) {
            config.default_directive = directive;
        }
        if let Some(format) = lookup("NETLAB_LOG_FORMAT") {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}
