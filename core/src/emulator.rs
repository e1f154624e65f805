//! Scripted device emulator backing the [`Transport`] seam in tests.
//!
//! Real switches are slow, fragile, and not always on the bench, so most
//! tests drive the engine against a deterministic finite automaton instead:
//! a current state plus a `(state, exact command) → action` table. The same
//! command can yield different output depending on prior mutating commands
//! (a `dir` listing differs before and after a copy), which the script
//! models with state transitions.
//!
//! A lookup miss is a loud [`TransportError::Unscripted`] failure, never a
//! silent no-op, so tests fail immediately when the engine's synthesized
//! command text drifts from what the script expects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::TransportError;
use crate::transport::Transport;

/// What the emulator does when a scripted command arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Return the configured text; state unchanged.
    Emit { text: String },
    /// Move to the configured state; return an empty response.
    Transition { next: u32 },
    /// Return the configured text, then move to the configured state.
    EmitThenTransition { text: String, next: u32 },
}

/// One `(state, command) → action` script entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub state: u32,
    pub command: String,
    pub action: Action,
}

/// A complete emulator script, loadable from JSON for replay tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    pub entries: Vec<ScriptEntry>,
}

impl Script {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Scripted stand-in for a real device CLI.
///
/// States are non-negative integers; state 0 is initial and there is no
/// distinguished terminal state. Within one state each command maps to
/// exactly one action; re-adding a `(state, command)` pair replaces the
/// previous action.
#[derive(Debug, Default)]
pub struct DeviceEmulator {
    state: u32,
    table: HashMap<(u32, String), Action>,
}

impl DeviceEmulator {
    /// Create an emulator in state 0 with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an emulator from a complete script.
    pub fn from_script(script: Script) -> Self {
        let mut emulator = Self::new();
        for entry in script.entries {
            emulator.add(entry.state, entry.command, entry.action);
        }
        emulator
    }

    /// Script an action for `command` received in `state`.
    pub fn add(&mut self, state: u32, command: impl Into<String>, action: Action) {
        self.table.insert((state, command.into()), action);
    }

    /// Current automaton state.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Return to state 0 and clear the script.
    pub fn reset(&mut self) {
        self.state = 0;
        self.table.clear();
    }
}

#[async_trait::async_trait]
impl Transport for DeviceEmulator {
    async fn send(&mut self, command: &str) -> Result<String, TransportError> {
        let action = self
            .table
            .get(&(self.state, command.to_string()))
            .cloned()
            .ok_or_else(|| TransportError::Unscripted {
                state: self.state,
                command: command.to_string(),
            })?;

        match action {
            Action::Emit { text } => Ok(text),
            Action::Transition { next } => {
                self.state = next;
                Ok(String::new())
            }
            Action::EmitThenTransition { text, next } => {
                self.state = next;
                Ok(text)
            }
        }
    }
}
