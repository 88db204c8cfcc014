//! Open CLI sessions, one per device.

use std::collections::HashMap;

use netlab_topology::{Device, DeviceId};
use tracing::{debug, info};

use crate::commands::process_command;
use crate::context::{CliContext, DeviceStore};
use crate::error::{Error, Result};
use crate::state::{create_initial_cli_state, CliState};

/// Registry of CLI sessions keyed by device.
///
/// Sessions are opened explicitly and live until closed; nothing is
/// persisted.
#[derive(Debug, Default)]
pub struct CliSessions {
    sessions: HashMap<DeviceId, CliState>,
}

impl CliSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or return the existing) session for a device.
    ///
    /// Fails when the device's hardware has no command line.
    pub fn open(&mut self, device: &Device) -> Result<&mut CliState> {
        let hardware = device.hardware();
        if !hardware.cli_capable {
            return Err(Error::Unsupported {
                device: device.id.clone(),
                model: hardware.name,
            });
        }

        Ok(self.sessions.entry(device.id.clone()).or_insert_with(|| {
            info!(device = %device.id, model = %hardware.name, "cli session opened");
            create_initial_cli_state(&device.label)
        }))
    }

    pub fn get(&self, device: &str) -> Option<&CliState> {
        self.sessions.get(device)
    }

    pub fn get_mut(&mut self, device: &str) -> Option<&mut CliState> {
        self.sessions.get_mut(device)
    }

    /// Drop a session, returning its final state.
    pub fn close(&mut self, device: &str) -> Option<CliState> {
        let state = self.sessions.remove(device)?;
        debug!(device, commands = state.history.len(), "cli session closed");
        Some(state)
    }

    /// Run one line in a device's session, opening it first if needed.
    pub fn execute(
        &mut self,
        device: &Device,
        input: &str,
        store: &mut dyn DeviceStore,
    ) -> Result<&CliState> {
        let slot = self.open(device)?;
        let mut context = CliContext::new(device, store);
        *slot = process_command(input, slot.clone(), &mut context);
        Ok(slot)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
