//! Fixed-capacity ring of recent interactions, mirroring a `deque(maxlen=10000)`.

use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::types::Interaction;

const DEFAULT_CAPACITY: usize = 10_000;

pub struct EventBuffer {
    inner: RwLock<VecDeque<Interaction>>,
    capacity: usize,
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Push an interaction, dropping the oldest buffered one on overflow
    /// rather than blocking the ingest path.
    pub fn push(&self, interaction: Interaction) {
        let mut buf = self.inner.write();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(interaction);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Interaction> {
        self.inner.read().iter().cloned().collect()
    }
}
