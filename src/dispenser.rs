use rand::seq::IndexedRandom;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

use crate::pool::PoolAssembler;
use crate::types::{Challenge, ChallengeMode, PoolStats};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispenseError {
    #[error("No challenges available")]
    NoChallengesAvailable,
}

/// One challenge handed to a player
#[derive(Debug, Clone, Serialize)]
pub struct Dispensed {
    pub challenge: Challenge,
    pub mode: ChallengeMode,
    pub stats: PoolStats,
}

/// Cheap handle telling whether a pool is currently being (re)assembled
#[derive(Debug, Clone)]
pub struct Readiness(Arc<watch::Sender<bool>>);

impl Default for Readiness {
    fn default() -> Self {
        let (tx, _) = watch::channel(false);
        Self(Arc::new(tx))
    }
}

impl Readiness {
    pub fn is_loading(&self) -> bool {
        *self.0.borrow()
    }

    /// Receiver notified whenever loading starts or stops
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.0.subscribe()
    }

    fn set_loading(&self, loading: bool) {
        self.0.send_replace(loading);
    }

    fn begin(&self) -> LoadingGuard {
        self.set_loading(true);
        LoadingGuard(self.clone())
    }
}

/// Marks the pool as loading until dropped, including when the
/// assembling future is cancelled
struct LoadingGuard(Readiness);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.set_loading(false);
    }
}

/// Hands out random challenges without repeats until the pool runs dry,
/// then assembles a fresh pool.
pub struct Dispenser {
    assembler: PoolAssembler,
    pool: Vec<Challenge>,
    dispensed: HashSet<String>,
    refills: u64,
    readiness: Readiness,
}

impl Dispenser {
    pub fn new(assembler: PoolAssembler) -> Self {
        Self {
            assembler,
            pool: Vec::new(),
            dispensed: HashSet::new(),
            refills: 0,
            readiness: Readiness::default(),
        }
    }

    /// Assemble the first pool for a new session
    pub async fn prime(&mut self) -> PoolStats {
        self.replace_pool().await;
        self.stats()
    }

    /// Throw away the current pool and assemble a new one
    pub async fn refill(&mut self) -> PoolStats {
        self.refills += 1;
        self.assembler.reset_hints();
        self.replace_pool().await;
        tracing::info!("Refill #{}: {} challenges", self.refills, self.pool.len());
        self.stats()
    }

    async fn replace_pool(&mut self) {
        let _loading = self.readiness.begin();
        // The old pool and its dispensed set stay intact until the new pool exists
        let pool = self.assembler.assemble().await;
        self.pool = pool;
        self.dispensed.clear();
    }

    pub async fn next(&mut self) -> Result<Dispensed, DispenseError> {
        if self.available().is_empty() {
            tracing::info!("Pool exhausted after {} challenges, refilling", self.dispensed.len());
            self.refill().await;
        }

        let mut rng = rand::rng();
        let challenge = self
            .available()
            .choose(&mut rng)
            .map(|c| (*c).clone())
            .ok_or(DispenseError::NoChallengesAvailable)?;
        self.dispensed.insert(challenge.key());

        Ok(Dispensed {
            mode: ChallengeMode::random(&mut rng),
            stats: self.stats(),
            challenge,
        })
    }

    fn available(&self) -> Vec<&Challenge> {
        self.pool
            .iter()
            .filter(|c| !self.dispensed.contains(&c.key()))
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats::from_pool(&self.pool, self.dispensed.len())
    }

    pub fn dispensed_titles(&self) -> &HashSet<String> {
        &self.dispensed
    }

    pub fn refill_count(&self) -> u64 {
        self.refills
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }
}
