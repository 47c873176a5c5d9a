//! Outbox of events and collaborator commands.
//!
//! State transitions only *produce* outbound work as data; the host drains
//! both queues after a successful call and owns delivery, ordering, and
//! retry. Failed operations never reach the outbox.

use otcbook_types::{Command, Event};

/// Pending notifications and collaborator commands.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Outbox {
    events: Vec<Event>,
    commands: Vec<Command>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn push_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Take all pending events, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Take all pending commands, leaving the queue empty.
    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Peek pending events without draining.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Peek pending commands without draining.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.commands.is_empty()
    }
}
