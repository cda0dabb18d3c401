use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::cascade::SourceCascade;
use crate::providers::FetchHint;
use crate::types::{Challenge, ContentKind};

/// Default number of challenges in a freshly assembled pool
pub const POOL_SIZE: usize = 50;

/// Drop later items whose normalised title was already seen
pub fn dedupe_by_title(items: Vec<Challenge>) -> Vec<Challenge> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|c| seen.insert(c.key())).collect()
}

/// Uniformly shuffle and keep the first `size` items
pub fn shuffle_and_truncate<T, R: Rng + ?Sized>(mut items: Vec<T>, size: usize, rng: &mut R) -> Vec<T> {
    items.shuffle(rng);
    items.truncate(size);
    items
}

/// Trim an oversized pool to `size` by random sampling; smaller pools pass
/// through untouched.
pub fn resize_pool<R: Rng + ?Sized>(items: Vec<Challenge>, size: usize, rng: &mut R) -> Vec<Challenge> {
    if items.len() > size {
        shuffle_and_truncate(items, size, rng)
    } else {
        if items.len() < size {
            tracing::warn!("PoolUndersized: only {} of {} unique challenges", items.len(), size);
        }
        items
    }
}

/// Builds whole pools from one cascade per active content class
pub struct PoolAssembler {
    cascades: Vec<SourceCascade>,
    pool_size: usize,
}

impl PoolAssembler {
    pub fn new(cascades: Vec<SourceCascade>, pool_size: usize) -> Self {
        Self {
            cascades,
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn kinds(&self) -> Vec<ContentKind> {
        self.cascades.iter().map(|c| c.kind()).collect()
    }

    pub fn cascades(&self) -> &[SourceCascade] {
        &self.cascades
    }

    /// One round across every class. Classes are independent so they run
    /// concurrently; inside a cascade providers stay sequential.
    async fn round(&mut self, hint: FetchHint) -> Vec<Challenge> {
        let tasks = self.cascades.iter_mut().map(|c| c.resolve(hint));
        futures::future::join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    pub async fn assemble(&mut self) -> Vec<Challenge> {
        let mut candidates = self.round(FetchHint::Primary).await;

        if candidates.len() < self.pool_size {
            tracing::info!(
                "Only {} candidates, running a supplemental round",
                candidates.len()
            );
            candidates.extend(self.round(FetchHint::Supplemental).await);
        }

        let unique = dedupe_by_title(candidates);
        let mut rng = rand::rng();
        let mut pool = resize_pool(unique, self.pool_size, &mut rng);
        pool.shuffle(&mut rng);

        tracing::info!("Assembled pool of {} challenges", pool.len());
        pool
    }

    /// Forget upstream pages/genres/terms used so far
    pub fn reset_hints(&mut self) {
        for cascade in &mut self.cascades {
            cascade.reset_hints();
        }
    }
}
