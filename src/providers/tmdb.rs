use async_trait::async_trait;
use chrono::Datelike;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;
use std::ops::RangeInclusive;

use super::{check_status, ContentProvider, FetchHint, HintTracker, PageTracker, ProviderError, ProviderResult};
use crate::types::{Challenge, ContentKind};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

const PRIMARY_PAGE_TIERS: [RangeInclusive<u32>; 3] = [1..=100, 101..=200, 201..=300];
const SUPPLEMENTAL_PAGE_TIERS: [RangeInclusive<u32>; 3] = [101..=200, 201..=300, 301..=400];

const SORT_OPTIONS: &[&str] = &[
    "popularity.desc",
    "vote_average.desc",
    "revenue.desc",
    "release_date.desc",
    "vote_count.desc",
];

/// TMDB movie genre ids
const GENRES: &[u32] = &[
    28, 12, 16, 35, 80, 99, 18, 10751, 14, 36, 27, 10402, 9648, 10749, 878, 10770, 53, 10752, 37,
];

/// Popular films by page from TMDB's discover endpoint
pub struct TmdbDiscoverProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    pages: PageTracker,
    genres: HintTracker<u32>,
}

/// Everything needed for one discover request, chosen before any await
#[derive(Debug, Clone, PartialEq)]
struct DiscoverQuery {
    page: u32,
    genre: Option<u32>,
    year: i32,
    sort_by: &'static str,
    min_votes: u32,
    min_average: f32,
    category: &'static str,
}

impl DiscoverQuery {
    fn params(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", api_key.to_string()),
            ("language", "en-US".to_string()),
            ("page", self.page.to_string()),
            ("sort_by", self.sort_by.to_string()),
            ("include_adult", "false".to_string()),
            ("include_video", "false".to_string()),
            ("vote_count.gte", self.min_votes.to_string()),
            ("vote_average.gte", self.min_average.to_string()),
            ("year", self.year.to_string()),
        ];
        if let Some(genre) = self.genre {
            params.push(("with_genres", genre.to_string()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    #[serde(default)]
    results: Vec<DiscoverMovie>,
}

#[derive(Debug, Deserialize)]
struct DiscoverMovie {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
}

impl TmdbDiscoverProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            pages: PageTracker::new(),
            genres: HintTracker::new(GENRES.iter().copied()),
        }
    }

    fn plan<R: Rng + ?Sized>(&mut self, hint: FetchHint, this_year: i32, rng: &mut R) -> DiscoverQuery {
        match hint {
            FetchHint::Primary => {
                // A decade within the last century, then a year inside it
                let decade = rng.random_range(0..10);
                let year = this_year - decade * 10 - rng.random_range(0..10);
                DiscoverQuery {
                    page: self.pages.pick(&PRIMARY_PAGE_TIERS, rng),
                    genre: None,
                    year,
                    sort_by: SORT_OPTIONS.choose(rng).copied().unwrap_or("popularity.desc"),
                    min_votes: 50,
                    min_average: 5.5,
                    category: "Popular",
                }
            }
            FetchHint::Supplemental => DiscoverQuery {
                page: self.pages.pick(&SUPPLEMENTAL_PAGE_TIERS, rng),
                genre: self.genres.pick(rng),
                year: this_year - rng.random_range(0..50),
                sort_by: "vote_average.desc",
                min_votes: 30,
                min_average: 5.0,
                category: "Top Rated",
            },
        }
    }
}

fn to_challenges(response: DiscoverResponse, category: &str) -> Vec<Challenge> {
    response
        .results
        .into_iter()
        .filter_map(|movie| {
            let title = movie.title.filter(|t| !t.trim().is_empty())?;
            let year = movie
                .release_date
                .and_then(|d| d.get(..4).map(str::to_string));
            Some(
                Challenge::film(title, category)
                    .with_year(year)
                    .with_provenance("TMDB API"),
            )
        })
        .collect()
}

#[async_trait]
impl ContentProvider for TmdbDiscoverProvider {
    async fn fetch(&mut self, hint: FetchHint) -> ProviderResult<Vec<Challenge>> {
        let this_year = chrono::Utc::now().year();
        let query = {
            let mut rng = rand::rng();
            self.plan(hint, this_year, &mut rng)
        };
        tracing::debug!(
            "TMDB discover page {} genre {:?} year {} sort {}",
            query.page,
            query.genre,
            query.year,
            query.sort_by
        );

        let url = format!("{}/discover/movie", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&query.params(&self.api_key))
            .send()
            .await?;
        let body: DiscoverResponse = check_status(response)?.json().await?;

        // Only successful responses consume a page/genre
        self.pages.mark_used(query.page);
        if let Some(genre) = query.genre {
            self.genres.mark_used(genre);
        }

        Ok(to_challenges(body, query.category))
    }

    fn name(&self) -> &str {
        "tmdb"
    }

    fn kind(&self) -> ContentKind {
        ContentKind::Film
    }

    async fn health_check(&self) -> ProviderResult<()> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("TMDB_API_KEY".to_string()));
        }
        let url = format!("{}/configuration", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    fn reset_hints(&mut self) {
        self.pages.reset();
        self.genres.reset();
    }
}
