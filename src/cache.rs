//! FIFO memo of recent classifications keyed by landmark fingerprint.

use crate::{classifier::Classification, landmarks::Fingerprint};
use std::collections::{HashMap, VecDeque};

/// Bounded cache of classifications for near-static frames.
///
/// Eviction is strictly first-in first-out: a lookup hit does not refresh an
/// entry's position.
#[derive(Debug, Clone)]
pub struct LandmarkCache {
    capacity: usize,
    entries: HashMap<Fingerprint, Classification>,
    insertion_order: VecDeque<Fingerprint>,
    hits: u64,
    misses: u64,
}

impl LandmarkCache {
    /// Create a cache holding at most `capacity` entries (0 disables caching)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity + 1),
            insertion_order: VecDeque::with_capacity(capacity + 1),
            hits: 0,
            misses: 0,
        }
    }

    /// Exact-match lookup
    pub fn lookup(&mut self, fingerprint: &Fingerprint) -> Option<Classification> {
        let found = self.entries.get(fingerprint).copied();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Store a classification, evicting the oldest entry once over capacity.
    ///
    /// Re-inserting a present fingerprint replaces its value in place.
    pub fn insert(&mut self, fingerprint: Fingerprint, classification: Classification) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(fingerprint, classification).is_none() {
            self.insertion_order.push_back(fingerprint);
        }
        while self.insertion_order.len() > self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `(hits, misses)` since creation or the last clear
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
