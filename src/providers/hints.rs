//! Usage trackers that steer repeated upstream queries towards unseen data.
//!
//! These only diversify what we *ask* the upstreams for. The no-repeat
//! guarantee over what players see lives in the dispenser.

use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;
use std::hash::Hash;
use std::ops::RangeInclusive;

/// Remembers which hints (genre ids, search terms, ...) were already used
#[derive(Debug, Clone)]
pub struct HintTracker<T> {
    candidates: Vec<T>,
    used: HashSet<T>,
}

impl<T: Clone + Eq + Hash> HintTracker<T> {
    pub fn new(candidates: impl IntoIterator<Item = T>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
            used: HashSet::new(),
        }
    }

    /// Offer a random unused candidate. When every candidate has been used the
    /// tracker starts over. Returns `None` only for an empty candidate list.
    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<T> {
        let unused: Vec<&T> = self
            .candidates
            .iter()
            .filter(|c| !self.used.contains(*c))
            .collect();
        if let Some(choice) = unused.choose(rng) {
            return Some(T::clone(choice));
        }
        self.used.clear();
        self.candidates.choose(rng).cloned()
    }

    pub fn mark_used(&mut self, hint: T) {
        self.used.insert(hint);
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    pub fn reset(&mut self) {
        self.used.clear();
    }
}

/// Picks unused result pages, widening through successive page tiers
#[derive(Debug, Clone, Default)]
pub struct PageTracker {
    used: HashSet<u32>,
}

impl PageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random unused page from the first tier that still has one. Once every
    /// tier is exhausted the history is cleared and the first tier is reused.
    pub fn pick<R: Rng + ?Sized>(&mut self, tiers: &[RangeInclusive<u32>], rng: &mut R) -> u32 {
        for tier in tiers {
            if let Some(page) = self.unused_in(tier, rng) {
                return page;
            }
        }
        self.used.clear();
        tiers
            .first()
            .and_then(|tier| self.unused_in(tier, rng))
            .unwrap_or(1)
    }

    fn unused_in<R: Rng + ?Sized>(&self, tier: &RangeInclusive<u32>, rng: &mut R) -> Option<u32> {
        let available: Vec<u32> = tier.clone().filter(|p| !self.used.contains(p)).collect();
        available.choose(rng).copied()
    }

    pub fn mark_used(&mut self, page: u32) {
        self.used.insert(page);
    }

    pub fn is_used(&self, page: u32) -> bool {
        self.used.contains(&page)
    }

    pub fn reset(&mut self) {
        self.used.clear();
    }
}
