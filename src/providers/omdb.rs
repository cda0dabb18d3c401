use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

use super::{check_status, ContentProvider, FetchHint, ProviderError, ProviderResult};
use crate::types::{Challenge, ContentKind};

pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_BATCH_DEADLINE: Duration = Duration::from_secs(4);

const LOOKUP_TITLES: &[&str] = &[
    "The Godfather", "Casablanca", "Citizen Kane", "Gone with the Wind", "Lawrence of Arabia",
    "The Wizard of Oz", "Vertigo", "Psycho", "2001: A Space Odyssey", "Apocalypse Now",
    "Taxi Driver", "Goodfellas", "The Shawshank Redemption", "Pulp Fiction", "Fight Club",
    "The Matrix", "Inception", "Interstellar", "The Dark Knight", "Forrest Gump",
    "Titanic", "Avatar", "Jurassic Park", "Star Wars", "The Lord of the Rings",
    "Harry Potter", "The Lion King", "Toy Story", "Finding Nemo", "Up",
    "The Incredibles", "Monsters Inc", "Shrek", "Frozen", "Moana",
];

/// Exact-title lookups against OMDb for a shuffled batch of well-known films
pub struct OmdbLookupProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    batch_size: usize,
    pause: Duration,
    lookup_timeout: Duration,
    /// Lookups stop once this much of the batch has elapsed
    deadline: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LookupResponse {
    response: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl LookupResponse {
    fn into_challenge(self) -> Option<Challenge> {
        if self.response != "True" {
            return None;
        }
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        Some(
            Challenge::film(title, "Popular")
                .with_year(self.year)
                .with_provenance("OMDB API"),
        )
    }
}

impl OmdbLookupProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            pause: Duration::from_millis(100),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            deadline: DEFAULT_BATCH_DEADLINE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Keep the batch inside the caller's own timeout so finished lookups survive
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    fn pick_batch(&self) -> Vec<&'static str> {
        let mut titles = LOOKUP_TITLES.to_vec();
        titles.shuffle(&mut rand::rng());
        titles.truncate(self.batch_size);
        titles
    }

    async fn lookup(&self, title: &str) -> ProviderResult<Challenge> {
        let url = format!("{}/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("t", title), ("apikey", self.api_key.as_str())])
            .send()
            .await?;
        let body: LookupResponse = check_status(response)?.json().await?;
        let error = body.error.clone();
        body.into_challenge().ok_or_else(|| {
            ProviderError::Malformed(error.unwrap_or_else(|| "no match".to_string()))
        })
    }
}

#[async_trait]
impl ContentProvider for OmdbLookupProvider {
    async fn fetch(&mut self, _hint: FetchHint) -> ProviderResult<Vec<Challenge>> {
        let batch = self.pick_batch();
        let deadline = Instant::now() + self.deadline;
        let mut films = Vec::with_capacity(batch.len());

        for (i, title) in batch.iter().enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                tracing::debug!("OMDB batch deadline reached after {} lookups", i);
                break;
            }
            let timeout = self.lookup_timeout.min(left);
            // One failed lookup must not abort the batch
            match tokio::time::timeout(timeout, self.lookup(title)).await {
                Ok(Ok(film)) => films.push(film),
                Ok(Err(e)) => tracing::debug!("OMDB lookup for '{}' failed: {}", title, e),
                Err(_) => tracing::debug!(
                    "OMDB lookup for '{}' failed: {}",
                    title,
                    ProviderError::Timeout(timeout)
                ),
            }
        }

        tracing::info!("OMDB: {} of {} lookups succeeded", films.len(), batch.len());
        Ok(films)
    }

    fn name(&self) -> &str {
        "omdb"
    }

    fn kind(&self) -> ContentKind {
        ContentKind::Film
    }

    async fn health_check(&self) -> ProviderResult<()> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("OMDB_API_KEY".to_string()));
        }
        let url = format!("{}/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("t", "test"), ("apikey", self.api_key.as_str())])
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }
}
