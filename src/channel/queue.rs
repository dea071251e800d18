use crate::types::QueuedMessage;
use std::collections::VecDeque;
use uuid::Uuid;

/// Bounded FIFO of outbound messages produced while disconnected.
///
/// Inserting into a full queue evicts the oldest entry. The evicted message
/// is handed back to the caller, which decides how loudly to report it.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    buffer: VecDeque<QueuedMessage>,
    max_size: usize,
}

impl MessageQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(max_size.min(crate::types::MAX_QUEUE_SIZE)),
            max_size,
        }
    }

    /// Append at the tail, returning the entry evicted from the head if full
    pub fn enqueue(&mut self, message: QueuedMessage) -> Option<QueuedMessage> {
        // max_size==0 means "store nothing"
        if self.max_size == 0 {
            return Some(message);
        }

        let evicted = if self.buffer.len() >= self.max_size {
            self.buffer.pop_front()
        } else {
            None
        };
        self.buffer.push_back(message);
        evicted
    }

    /// Everything queued, oldest first. Nothing is removed.
    pub fn dequeue_all(&self) -> Vec<QueuedMessage> {
        self.buffer.iter().cloned().collect()
    }

    pub fn remove(&mut self, id: Uuid) -> Option<QueuedMessage> {
        let index = self.buffer.iter().position(|m| m.id == id)?;
        self.buffer.remove(index)
    }

    /// Empty the queue, returning how many entries were discarded
    pub fn clear(&mut self) -> usize {
        let discarded = self.buffer.len();
        self.buffer.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(crate::types::MAX_QUEUE_SIZE)
    }
}
