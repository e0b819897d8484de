use heapless::Vec;

use crate::error::{CommandQueueFull, EncodingError};
use crate::protocol::encoding::encode_set_command;
use crate::protocol::MAX_PAYLOAD_LEN;

pub const SET_QUEUE_CAPACITY: usize = 16;

/// A property write waiting for the next set command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SetQueueEntry {
    pub key: u8,
    pub value: u8,
}

/// Pending writes, at most one per key.
#[derive(Debug, Default)]
pub struct SetQueue {
    entries: Vec<SetQueueEntry, SET_QUEUE_CAPACITY>,
}

impl SetQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write, replacing any queued value for the same key.
    pub fn set(&mut self, key: u8, value: u8) -> Result<(), CommandQueueFull> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.value = value;
            return Ok(());
        }
        self.entries
            .push(SetQueueEntry { key, value })
            .map_err(|_| CommandQueueFull)
    }

    /// Queue all of `writes` or none of them.
    pub fn set_all(&mut self, writes: &[(u8, u8)]) -> Result<(), CommandQueueFull> {
        let new_keys = writes
            .iter()
            .enumerate()
            .filter(|(i, (key, _))| {
                !self.contains(*key) && !writes[..*i].iter().any(|(k, _)| k == key)
            })
            .count();
        if self.entries.len() + new_keys > SET_QUEUE_CAPACITY {
            return Err(CommandQueueFull);
        }
        for (key, value) in writes {
            self.set(*key, *value)?;
        }
        Ok(())
    }

    pub fn contains(&self, key: u8) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn entries(&self) -> &[SetQueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialise everything queued into one set command and empty the queue.
    /// The queue is left alone if encoding fails.
    pub fn take_command(&mut self) -> Result<Vec<u8, MAX_PAYLOAD_LEN>, EncodingError> {
        let command = encode_set_command(self.entries.iter().map(|e| (e.key, e.value)))?;
        self.entries.clear();
        Ok(command)
    }
}
