//! CLI modes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The nested command contexts, outermost first.
///
/// `User < Privileged < GlobalConfig < InterfaceConfig`; `exit` moves one
/// level out, `end` jumps from any configuration mode to privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CliMode {
    #[default]
    User,
    Privileged,
    GlobalConfig,
    InterfaceConfig,
}

impl CliMode {
    pub const ALL: [CliMode; 4] = [
        CliMode::User,
        CliMode::Privileged,
        CliMode::GlobalConfig,
        CliMode::InterfaceConfig,
    ];

    /// Text appended to the hostname in the prompt.
    pub fn prompt_suffix(&self) -> &'static str {
        match self {
            CliMode::User => ">",
            CliMode::Privileged => "#",
            CliMode::GlobalConfig => "(config)#",
            CliMode::InterfaceConfig => "(config-if)#",
        }
    }

    /// The mode `exit` returns to. `None` at the top level.
    pub fn parent(&self) -> Option<CliMode> {
        match self {
            CliMode::User => None,
            CliMode::Privileged => Some(CliMode::User),
            CliMode::GlobalConfig => Some(CliMode::Privileged),
            CliMode::InterfaceConfig => Some(CliMode::GlobalConfig),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, CliMode::GlobalConfig | CliMode::InterfaceConfig)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CliMode::User => "user EXEC",
            CliMode::Privileged => "privileged EXEC",
            CliMode::GlobalConfig => "global configuration",
            CliMode::InterfaceConfig => "interface configuration",
        }
    }
}

impl fmt::Display for CliMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
