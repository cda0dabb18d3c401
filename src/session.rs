use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::Instant;

use crate::countdown::{spawn_countdown, CountdownHandle};
use crate::dispenser::{DispenseError, Dispensed, Dispenser, Readiness};
use crate::protocol::ServerMessage;
use crate::types::{PoolStats, SessionId};

/// Pool counters plus whether a refill is in flight
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionStatus {
    pub loading: bool,
    #[serde(flatten)]
    pub stats: PoolStats,
}

/// One player's game: a private dispenser plus the round timer
pub struct GameSession {
    pub id: SessionId,
    dispenser: Mutex<Dispenser>,
    readiness: Readiness,
    /// Stats as of the last prime or draw, readable while a refill holds the dispenser
    snapshot: RwLock<PoolStats>,
    current: RwLock<Option<Dispensed>>,
    countdown: Mutex<Option<CountdownHandle>>,
    round_seconds: u32,
    last_active: std::sync::Mutex<Instant>,
}

impl GameSession {
    pub fn new(id: SessionId, dispenser: Dispenser, round_seconds: u32) -> Self {
        let readiness = dispenser.readiness();
        let snapshot = dispenser.stats();
        Self {
            id,
            dispenser: Mutex::new(dispenser),
            readiness,
            snapshot: RwLock::new(snapshot),
            current: RwLock::new(None),
            countdown: Mutex::new(None),
            round_seconds,
            last_active: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub async fn prime(&self) -> PoolStats {
        self.touch();
        let mut dispenser = self.dispenser.lock().await;
        let stats = dispenser.prime().await;
        *self.snapshot.write().await = stats;
        stats
    }

    /// Next challenge. Concurrent callers queue behind an in-flight refill.
    pub async fn next_challenge(&self) -> Result<Dispensed, DispenseError> {
        self.touch();
        let mut dispenser = self.dispenser.lock().await;
        let result = dispenser.next().await;
        *self.snapshot.write().await = dispenser.stats();
        drop(dispenser);

        let dispensed = result?;
        *self.current.write().await = Some(dispensed.clone());
        Ok(dispensed)
    }

    pub async fn current(&self) -> Option<Dispensed> {
        self.current.read().await.clone()
    }

    /// Start the countdown, replacing any running one
    pub async fn start_round(&self, tx: mpsc::UnboundedSender<ServerMessage>) -> u32 {
        self.touch();
        let handle = spawn_countdown(self.round_seconds, tx);
        if let Some(previous) = self.countdown.lock().await.replace(handle) {
            previous.cancel();
        }
        tracing::debug!("Session {} started a {}s round", self.id, self.round_seconds);
        self.round_seconds
    }

    /// Cancel the countdown. Returns false if none was running.
    pub async fn stop_round(&self) -> bool {
        match self.countdown.lock().await.take() {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.cancel();
                was_running
            }
            None => false,
        }
    }

    /// Stats as of the last completed prime or draw. Never waits on a refill.
    pub async fn stats(&self) -> PoolStats {
        *self.snapshot.read().await
    }

    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            loading: self.is_loading(),
            stats: self.stats().await,
        }
    }

    pub async fn refill_count(&self) -> u64 {
        self.dispenser.lock().await.refill_count()
    }

    /// Readable without waiting on the dispenser lock
    pub fn is_loading(&self) -> bool {
        self.readiness.is_loading()
    }

    /// Receiver that changes whenever a pool assembly starts or ends
    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.readiness.subscribe()
    }

    pub fn round_seconds(&self) -> u32 {
        self.round_seconds
    }

    fn touch(&self) {
        let mut last = self.last_active.lock().unwrap_or_else(|e| e.into_inner());
        *last = Instant::now();
    }

    /// Time since the last prime, draw or round start
    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }
}
