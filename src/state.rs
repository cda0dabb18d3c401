use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::cascade::SourceCascade;
use crate::config::{AppConfig, ProviderChoice};
use crate::dispenser::Dispenser;
use crate::pool::PoolAssembler;
use crate::providers::{ContentProvider, OmdbLookupProvider, TmdbDiscoverProvider, TvMazeProvider};
use crate::session::GameSession;
use crate::types::{ContentKind, SessionId};

/// How often the idle session sweep runs
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Builds a fresh, independent assembler for every new session
pub type AssemblerFactory = Arc<dyn Fn() -> PoolAssembler + Send + Sync>;

/// Connectivity of one configured upstream
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub kind: ContentKind,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<RwLock<HashMap<SessionId, Arc<GameSession>>>>,
    assembler_factory: AssemblerFactory,
}

fn remote_provider(
    choice: ProviderChoice,
    config: &AppConfig,
    client: &reqwest::Client,
) -> Option<Box<dyn ContentProvider>> {
    match choice {
        ProviderChoice::Tmdb => config.tmdb_api_key.as_ref().map(|key| {
            Box::new(TmdbDiscoverProvider::new(
                client.clone(),
                config.tmdb_base_url.clone(),
                key.clone(),
            )) as Box<dyn ContentProvider>
        }),
        ProviderChoice::Omdb => config.omdb_api_key.as_ref().map(|key| {
            Box::new(
                OmdbLookupProvider::new(client.clone(), config.omdb_base_url.clone(), key.clone())
                    .with_batch_size(config.omdb_batch_size)
                    .with_deadline(config.provider_timeout.mul_f64(0.8)),
            ) as Box<dyn ContentProvider>
        }),
        ProviderChoice::TvMaze => Some(Box::new(TvMazeProvider::new(
            client.clone(),
            config.tvmaze_base_url.clone(),
            config.tvmaze_country.clone(),
        ))),
    }
}

/// One cascade per active content class, wired from configuration.
/// Providers that need a missing API key are left out.
pub fn build_assembler(config: &AppConfig, client: &reqwest::Client) -> PoolAssembler {
    let cascades = config
        .content_kinds
        .iter()
        .map(|&kind| {
            let mut builder =
                SourceCascade::builder(kind, config.pool_size).timeout(config.provider_timeout);
            for &choice in config.providers_for(kind) {
                match remote_provider(choice, config, client) {
                    Some(provider) => builder = builder.provider(provider),
                    None => tracing::warn!("Skipping {}: no API key configured", choice),
                }
            }
            builder.build()
        })
        .collect();
    PoolAssembler::new(cascades, config.pool_size)
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });
        let wiring = config.clone();
        Self::with_factory(config, Arc::new(move || build_assembler(&wiring, &client)))
    }

    /// State whose sessions draw from `factory`-built assemblers
    pub fn with_factory(config: AppConfig, factory: AssemblerFactory) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            assembler_factory: factory,
        }
    }

    /// Register a new session with its own dispenser. The pool is not
    /// assembled yet; call `GameSession::prime`.
    pub async fn create_session(&self) -> Arc<GameSession> {
        let id = ulid::Ulid::new().to_string();
        let dispenser = Dispenser::new((self.assembler_factory)());
        let session = Arc::new(GameSession::new(
            id.clone(),
            dispenser,
            self.config.round_seconds,
        ));
        self.sessions.write().await.insert(id.clone(), session.clone());
        tracing::info!("Created session {}", id);
        session
    }

    pub async fn get_session(&self, id: &str) -> Option<Arc<GameSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        if let Some(session) = &removed {
            session.stop_round().await;
            tracing::info!("Removed session {}", id);
        }
        removed.is_some()
    }

    /// Drop sessions idle for longer than the configured timeout. Sessions
    /// still referenced by a live connection or request are kept.
    pub async fn expire_idle_sessions(&self) -> usize {
        let max_idle = self.config.session_idle_timeout;
        let expired: Vec<Arc<GameSession>> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<SessionId> = sessions
                .iter()
                .filter(|(_, s)| Arc::strong_count(s) == 1 && s.idle_for() >= max_idle)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            session.stop_round().await;
            tracing::info!("Expired idle session {}", session.id);
        }
        expired.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Probe every configured remote upstream
    pub async fn provider_health(&self) -> Vec<ProviderHealth> {
        let assembler = (self.assembler_factory)();
        let probes = assembler
            .cascades()
            .iter()
            .flat_map(|cascade| cascade.providers().iter())
            .map(|provider| async move {
                let result = tokio::time::timeout(self.config.provider_timeout, provider.health_check()).await;
                let error = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(_) => Some("health check timed out".to_string()),
                };
                ProviderHealth {
                    name: provider.name().to_string(),
                    kind: provider.kind(),
                    ok: error.is_none(),
                    error,
                }
            });
        futures::future::join_all(probes).await
    }
}

/// Spawn a background task that periodically expires idle sessions
pub fn spawn_session_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let expired = state.expire_idle_sessions().await;
            if expired > 0 {
                tracing::debug!("Session sweep removed {} idle sessions", expired);
            }
        }
    })
}
