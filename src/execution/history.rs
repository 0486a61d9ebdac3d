//! Bounded, newest-first log of past outcomes for display.

use std::collections::VecDeque;

use super::Outcome;

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Outcome>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity + 1), capacity }
    }

    /// Prepend, evicting the oldest entry past capacity.
    pub(crate) fn push(&mut self, outcome: Outcome) {
        self.entries.push_front(outcome);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Outcome> {
        self.entries.front()
    }

    pub fn get(&self, index: usize) -> Option<&Outcome> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<Outcome> {
        self.entries.iter().cloned().collect()
    }
}
