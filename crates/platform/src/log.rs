//! Append-only event log

use tracing::debug;

use crate::event::PlatformEvent;

#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<PlatformEvent>,
    sequence: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next event must carry
    pub fn next_sequence(&self) -> u64 {
        self.sequence + 1
    }

    /// Append an event; build it with [`EventLog::next_sequence`]
    pub fn append(&mut self, event: PlatformEvent) {
        self.sequence = event.sequence();
        self.events.push(event);
        debug!(sequence = self.sequence, "Event appended to log");
    }

    /// Events with a sequence number at or after `from_sequence`
    pub fn get_from(&self, from_sequence: u64) -> Vec<PlatformEvent> {
        // sequences start at 1 and increase by one
        let start = from_sequence.saturating_sub(1) as usize;
        self.events.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn events(&self) -> &[PlatformEvent] {
        &self.events
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
