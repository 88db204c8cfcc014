//! Per-device CLI session state.

use netlab_topology::InterfaceId;
use serde::{Deserialize, Serialize};

use crate::mode::CliMode;

/// Lines printed when a session opens.
pub const BANNER: [&str; 2] = [
    "netlab command line emulator",
    "Type \"help\" or \"?\" for the commands available in each mode.",
];

/// One device's CLI session.
///
/// Owned by a single caller; every command produces the next state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliState {
    pub hostname: String,
    pub mode: CliMode,
    /// Interface being configured, set in interface-config mode only
    pub selected_interface: Option<InterfaceId>,
    /// Append-only transcript
    pub output: Vec<String>,
    /// Append-only, most recent last
    pub history: Vec<String>,
}

impl CliState {
    /// The rendered prompt, e.g. `R1(config)#`.
    pub fn prompt(&self) -> String {
        build_prompt(self)
    }

    /// Recall a previous input line. `0` is the most recent.
    pub fn recall(&self, offset: usize) -> Option<&str> {
        let index = self.history.len().checked_sub(offset + 1)?;
        self.history.get(index).map(String::as_str)
    }

    /// Switch mode. The interface selection only survives in
    /// interface-config.
    pub(crate) fn enter(&mut self, mode: CliMode) {
        self.mode = mode;
        if mode != CliMode::InterfaceConfig {
            self.selected_interface = None;
        }
    }
}

/// Boot state: user mode, banner in the transcript, empty history.
pub fn create_initial_cli_state(hostname: &str) -> CliState {
    CliState {
        hostname: hostname.to_string(),
        mode: CliMode::User,
        selected_interface: None,
        output: BANNER.iter().map(|line| line.to_string()).collect(),
        history: Vec::new(),
    }
}

/// Render the prompt for a state: hostname plus the mode's suffix.
pub fn build_prompt(state: &CliState) -> String {
    format!("{}{}", state.hostname, state.mode.prompt_suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let state = create_initial_cli_state("R1");
        assert_eq!(state.mode, CliMode::User);
        assert_eq!(state.output.len(), BANNER.len());
        assert!(state.history.is_empty());
        assert_eq!(build_prompt(&state), "R1>");
    }

    #[test]
    fn prompts_per_mode() {
        let mut state = create_initial_cli_state("R1");
        let expected = ["R1>", "R1#", "R1(config)#", "R1(config-if)#"];
        for (mode, prompt) in CliMode::ALL.into_iter().zip(expected) {
            state.mode = mode;
            assert_eq!(state.prompt(), prompt);
        }
    }

    #[test]
    fn recall_counts_back_from_latest() {
        let mut state = create_initial_cli_state("R1");
        state.history = vec!["enable".into(), "conf t".into(), "hostname X".into()];
        assert_eq!(state.recall(0), Some("hostname X"));
        assert_eq!(state.recall(2), Some("enable"));
        assert_eq!(state.recall(3), None);
    }
}
