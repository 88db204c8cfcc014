//! netlab CLI
//!
//! A command-line emulator for the configurable devices of a topology.
//! Each device gets its own session state; commands are pure transitions
//! from one state to the next.
//!
//! # Architecture
//!
//! - **Modes**: user, privileged, global-config and interface-config,
//!   strictly nested
//! - **Command table**: static keyword sequences per mode, abbreviable to
//!   any unique prefix
//! - **Device store**: configuration changes leave the engine as patches
//!   through [`DeviceStore`]; the CLI never edits a device itself
//!
//! # Usage
//!
//! ```ignore
//! let mut sessions = CliSessions::new();
//! let mut store = PatchLog::default();
//!
//! sessions.execute(&router, "enable", &mut store)?;
//! sessions.execute(&router, "conf t", &mut store)?;
//! let state = sessions.execute(&router, "hostname EDGE-1", &mut store)?;
//! assert_eq!(state.prompt(), "EDGE-1(config)#");
//! ```

mod commands;
mod completion;
mod context;
mod error;
mod mode;
mod session;
mod state;

pub use commands::{commands_for, parse, process_command, Action, Args, CommandSpec, Parsed, COMMANDS};
pub use completion::{complete_line, get_completions};
pub use context::{CliContext, DevicePatch, DeviceStore, InterfacePatch, PatchLog};
pub use error::{Error, Result};
pub use mode::CliMode;
pub use session::CliSessions;
pub use state::{build_prompt, create_initial_cli_state, CliState, BANNER};
