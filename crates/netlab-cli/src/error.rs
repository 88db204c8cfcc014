//! Error types for netlab-cli.
//!
//! None of these escape [`process_command`](crate::process_command): each is
//! rendered as a single `% ...` output line.

use netlab_topology::DeviceId;
use thiserror::Error;

use crate::mode::CliMode;

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No command in any mode starts with this input.
    #[error("Invalid input detected: unknown command \"{0}\"")]
    UnknownCommand(String),

    /// The input abbreviates more than one command.
    #[error("Ambiguous command: \"{0}\"")]
    Ambiguous(String),

    /// The command needs more keywords or arguments.
    #[error("Incomplete command: \"{0}\"")]
    Incomplete(String),

    /// The command exists, but not in the current mode.
    #[error("\"{command}\" is not available in {mode} mode")]
    WrongMode { command: String, mode: CliMode },

    #[error("Invalid {what} \"{value}\"")]
    InvalidArgument { what: &'static str, value: String },

    #[error("Unexpected argument \"{0}\"")]
    UnexpectedArgument(String),

    #[error("Interface {0} does not exist on this device")]
    UnknownInterface(String),

    /// The device's hardware model has no command line.
    #[error("{device} ({model}) does not provide a command line")]
    Unsupported { device: DeviceId, model: String },

    /// State that should be impossible, e.g. interface mode without a
    /// selected interface.
    #[error("Internal error: {0}")]
    Inconsistent(&'static str),
}
