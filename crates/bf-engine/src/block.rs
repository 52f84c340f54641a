use std::time::Duration;

use bf_core::VariableStore;

use crate::command::Command;

/// A command whose entry behavior is deferred by the slow-step delay. The
/// command is already active for observers; only its behavior is pending.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub index: usize,
    pub remaining: Duration,
}

/// An ordered list of commands forming one executable unit, plus the
/// execution state the engine tracks for it: the active command, one slot of
/// history (the previously active index, which loop commands consult to tell
/// re-entry from fresh entry), and a counter of fresh starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    commands: Vec<Command>,
    active_index: Option<usize>,
    previous_active_index: Option<usize>,
    execution_count: usize,
    pending: Option<PendingEntry>,
}

impl Block {
    pub fn new(name: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            name: name.into(),
            commands,
            active_index: None,
            previous_active_index: None,
            execution_count: 0,
            pending: None,
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn command(&self, index: usize) -> Option<&Command> {
        self.commands.get(index)
    }

    pub fn command_mut(&mut self, index: usize) -> Option<&mut Command> {
        self.commands.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The currently active command index, if the block is executing.
    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    /// The command active on the previous step. Loop commands compare this
    /// against their matching end-marker to detect re-entry.
    pub fn previous_active_index(&self) -> Option<usize> {
        self.previous_active_index
    }

    /// How many times the block has been started from its first command.
    pub fn execution_count(&self) -> usize {
        self.execution_count
    }

    pub fn is_executing(&self) -> bool {
        self.active_index.is_some()
    }

    pub fn pending(&self) -> Option<&PendingEntry> {
        self.pending.as_ref()
    }

    /// True if any command is missing required configuration.
    pub fn has_error(&self, variables: &VariableStore) -> bool {
        self.commands
            .iter()
            .any(|command| command.has_error(variables))
    }

    /// First runnable command at or after `start`, skipping disabled
    /// commands and comments.
    pub fn next_runnable_from(&self, start: usize) -> Option<usize> {
        (start..self.commands.len()).find(|&index| self.commands[index].is_runnable())
    }

    pub(crate) fn begin_execution(&mut self) {
        self.execution_count += 1;
    }

    pub(crate) fn activate(&mut self, index: usize) {
        self.previous_active_index = self.active_index;
        self.active_index = Some(index);
    }

    pub(crate) fn set_pending(&mut self, index: usize, delay: Duration) {
        self.pending = Some(PendingEntry {
            index,
            remaining: delay,
        });
    }

    pub(crate) fn pending_mut(&mut self) -> Option<&mut PendingEntry> {
        self.pending.as_mut()
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Terminal state: no active command, no pending entry. History and the
    /// execution counter are left alone. Idempotent.
    pub(crate) fn halt(&mut self) {
        self.active_index = None;
        self.pending = None;
    }
}
