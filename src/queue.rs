//! The per-direction FIFO wait queue.
//!
//! Always accessed with the owning channel's lock already held.

use std::collections::VecDeque;

use crate::request::QueueEntry;

pub(crate) struct WaitQueue {
    entries: VecDeque<QueueEntry>,
}

impl WaitQueue {
    pub(crate) fn new() -> WaitQueue {
        WaitQueue {
            entries: VecDeque::new(),
        }
    }

    pub(crate) fn push_back(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    pub(crate) fn pop_front(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
