use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::countdown::DEFAULT_ROUND_SECONDS;
use crate::pool::POOL_SIZE;
use crate::providers::{omdb, tmdb, tvmaze};
use crate::types::ContentKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("Provider '{provider}' cannot serve {kind} content")]
    ProviderKindMismatch {
        provider: ProviderChoice,
        kind: ContentKind,
    },

    #[error("CONTENT_KINDS must name at least one content kind")]
    NoContentKinds,
}

/// Remote upstreams that can be placed in a cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderChoice {
    Tmdb,
    Omdb,
    TvMaze,
}

impl ProviderChoice {
    pub fn kind(&self) -> ContentKind {
        match self {
            ProviderChoice::Tmdb | ProviderChoice::Omdb => ContentKind::Film,
            ProviderChoice::TvMaze => ContentKind::TvShow,
        }
    }
}

impl fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderChoice::Tmdb => "tmdb",
            ProviderChoice::Omdb => "omdb",
            ProviderChoice::TvMaze => "tvmaze",
        })
    }
}

impl FromStr for ProviderChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tmdb" => Ok(ProviderChoice::Tmdb),
            "omdb" => Ok(ProviderChoice::Omdb),
            "tvmaze" | "tv_maze" => Ok(ProviderChoice::TvMaze),
            other => Err(format!("Unknown provider '{}'", other)),
        }
    }
}

/// Server and content pipeline settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Target number of challenges per assembled pool
    pub pool_size: usize,
    /// Content classes that take part in the pool, in assembly order
    pub content_kinds: Vec<ContentKind>,
    /// Film cascade, highest rank first
    pub film_providers: Vec<ProviderChoice>,
    /// TV cascade, highest rank first
    pub tv_providers: Vec<ProviderChoice>,
    pub provider_timeout: Duration,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub omdb_api_key: Option<String>,
    pub omdb_base_url: String,
    pub omdb_batch_size: usize,
    pub tvmaze_base_url: String,
    pub tvmaze_country: String,
    pub round_seconds: u32,
    /// Sessions nobody holds are dropped after this long without activity
    pub session_idle_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            pool_size: POOL_SIZE,
            content_kinds: vec![ContentKind::Film, ContentKind::TvShow],
            film_providers: vec![ProviderChoice::Tmdb, ProviderChoice::Omdb],
            tv_providers: vec![ProviderChoice::TvMaze],
            provider_timeout: Duration::from_secs(5),
            tmdb_api_key: None,
            tmdb_base_url: tmdb::DEFAULT_BASE_URL.to_string(),
            omdb_api_key: None,
            omdb_base_url: omdb::DEFAULT_BASE_URL.to_string(),
            omdb_batch_size: omdb::DEFAULT_BATCH_SIZE,
            tvmaze_base_url: tvmaze::DEFAULT_BASE_URL.to_string(),
            tvmaze_country: tvmaze::DEFAULT_COUNTRY.to_string(),
            round_seconds: DEFAULT_ROUND_SECONDS,
            session_idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Trimmed value of `var`, or None when unset or blank
fn env_string(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_number<T: FromStr>(var: &str, default: T) -> T {
    match env_string(var) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparsable {}={}, using default", var, raw);
            default
        }),
        None => default,
    }
}

fn parse_list<T: FromStr<Err = String>>(var: &'static str, raw: &str) -> Result<Vec<T>, ConfigError> {
    let mut items = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let item = part
            .parse()
            .map_err(|reason| ConfigError::InvalidValue { var, reason })?;
        items.push(item);
    }
    Ok(items)
}

fn env_list<T: FromStr<Err = String>>(var: &'static str, default: Vec<T>) -> Result<Vec<T>, ConfigError> {
    match env_string(var) {
        Some(raw) => parse_list(var, &raw),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mut content_kinds = Vec::new();
        for kind in env_list("CONTENT_KINDS", defaults.content_kinds)? {
            if !content_kinds.contains(&kind) {
                content_kinds.push(kind);
            }
        }

        let config = Self {
            port: env_number("PORT", defaults.port),
            pool_size: env_number("POOL_SIZE", defaults.pool_size),
            content_kinds,
            film_providers: env_list("FILM_PROVIDERS", defaults.film_providers)?,
            tv_providers: env_list("TV_PROVIDERS", defaults.tv_providers)?,
            provider_timeout: Duration::from_secs(env_number(
                "PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout.as_secs(),
            )),
            tmdb_api_key: env_string("TMDB_API_KEY"),
            tmdb_base_url: env_string("TMDB_BASE_URL").unwrap_or(defaults.tmdb_base_url),
            omdb_api_key: env_string("OMDB_API_KEY"),
            omdb_base_url: env_string("OMDB_BASE_URL").unwrap_or(defaults.omdb_base_url),
            omdb_batch_size: env_number("OMDB_BATCH_SIZE", defaults.omdb_batch_size),
            tvmaze_base_url: env_string("TVMAZE_BASE_URL").unwrap_or(defaults.tvmaze_base_url),
            tvmaze_country: env_string("TVMAZE_COUNTRY").unwrap_or(defaults.tvmaze_country),
            round_seconds: env_number("ROUND_SECONDS", defaults.round_seconds),
            session_idle_timeout: Duration::from_secs(env_number(
                "SESSION_IDLE_SECS",
                defaults.session_idle_timeout.as_secs(),
            )),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_kinds.is_empty() {
            return Err(ConfigError::NoContentKinds);
        }
        let positive = [
            ("POOL_SIZE", self.pool_size as u64),
            ("ROUND_SECONDS", u64::from(self.round_seconds)),
            ("PROVIDER_TIMEOUT_SECS", self.provider_timeout.as_secs()),
            ("OMDB_BATCH_SIZE", self.omdb_batch_size as u64),
            ("SESSION_IDLE_SECS", self.session_idle_timeout.as_secs()),
        ];
        if let Some((var, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidValue {
                var,
                reason: "must be greater than zero".to_string(),
            });
        }
        let ranked = [
            (ContentKind::Film, &self.film_providers),
            (ContentKind::TvShow, &self.tv_providers),
        ];
        for (kind, providers) in ranked {
            if let Some(provider) = providers.iter().find(|p| p.kind() != kind) {
                return Err(ConfigError::ProviderKindMismatch {
                    provider: *provider,
                    kind,
                });
            }
        }
        Ok(())
    }

    /// Ranked providers for one content class
    pub fn providers_for(&self, kind: ContentKind) -> &[ProviderChoice] {
        match kind {
            ContentKind::Film => &self.film_providers,
            ContentKind::TvShow => &self.tv_providers,
        }
    }
}
