//! Deterministic task queue driven by explicit instants.
//!
//! The scheduler never reads the clock itself. Callers pass `now` to every
//! operation, which keeps debounce and deferral behaviour testable without
//! real time passing. The tokio driver in `host` feeds it from
//! `tokio::time::Instant`.

use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry<S, T> {
    deadline: Instant,
    sequence: u64,
    slot: Option<S>,
    task: T,
}

/// Single-threaded queue of delayed tasks.
///
/// Tasks scheduled with `debounce` share a slot: scheduling again in the same
/// slot replaces the pending task and restarts its delay. Tasks scheduled with
/// `defer` run once, independently of each other.
#[derive(Debug)]
pub struct Scheduler<S, T> {
    entries: Vec<Entry<S, T>>,
    next_sequence: u64,
}

impl<S, T> Default for Scheduler<S, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_sequence: 0,
        }
    }
}

impl<S: PartialEq, T> Scheduler<S, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` after `delay`, replacing any pending task in `slot`.
    ///
    /// Returns `true` when a pending task was replaced.
    pub fn debounce(&mut self, slot: S, delay: Duration, task: T, now: Instant) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.slot.as_ref() != Some(&slot));
        let replaced = self.entries.len() != before;

        self.push(Some(slot), now + delay, task);
        replaced
    }

    /// Schedule a one-shot `task` after `delay`
    pub fn defer(&mut self, delay: Duration, task: T, now: Instant) {
        self.push(None, now + delay, task);
    }

    fn push(&mut self, slot: Option<S>, deadline: Instant, task: T) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(Entry {
            deadline,
            sequence,
            slot,
            task,
        });
    }

    /// Remove and return every task due at `now`, earliest deadline first.
    ///
    /// Tasks with equal deadlines come out in scheduling order.
    pub fn run_due(&mut self, now: Instant) -> Vec<T> {
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|entry| entry.deadline <= now);
        self.entries = pending;

        due.sort_by_key(|entry| (entry.deadline, entry.sequence));
        due.into_iter().map(|entry| entry.task).collect()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.deadline).min()
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending task matching `predicate`, returning how many
    pub fn cancel_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|entry| !predicate(&entry.task));
        before - self.entries.len()
    }
}
