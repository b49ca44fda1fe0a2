use std::collections::VecDeque;

use super::snapshot::Snapshot;

const DEFAULT_WINDOW_SIZE: usize = 60;

/// Fixed-capacity rolling window of snapshots; the oldest is dropped on overflow.
#[derive(Debug, Clone)]
pub struct SnapshotWindow {
    capacity: usize,
    samples: VecDeque<Snapshot>,
}

impl SnapshotWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WINDOW_SIZE)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(snapshot);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.samples.back()
    }

    /// Iterates over the whole window, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Snapshot> + ExactSizeIterator {
        self.samples.iter()
    }

    /// The last `n` samples, oldest first. `None` when fewer than `n` are held.
    #[must_use]
    pub fn last_n(&self, n: usize) -> Option<Vec<&Snapshot>> {
        (n > 0 && self.samples.len() >= n)
            .then(|| self.samples.iter().skip(self.samples.len() - n).collect())
    }
}

impl Default for SnapshotWindow {
    fn default() -> Self {
        Self::new()
    }
}
