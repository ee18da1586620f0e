use crate::simulation_engine::directions::Direction;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Longest incoming-lane queue seen per direction while its light was red.
/// Values only ever grow during a run.
#[derive(Debug, Default)]
pub struct MaxQueueLengthTracker {
    maxima: [AtomicUsize; 4],
}

impl MaxQueueLengthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, direction: Direction, queue_length: usize) {
        self.maxima[direction.index()].fetch_max(queue_length, Ordering::Relaxed);
    }

    pub fn get(&self, direction: Direction) -> usize {
        self.maxima[direction.index()].load(Ordering::Relaxed)
    }
}
