use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::ops::RangeInclusive;

use super::{check_status, ContentProvider, FetchHint, HintTracker, PageTracker, ProviderResult};
use crate::types::{Challenge, ContentKind};

pub const DEFAULT_BASE_URL: &str = "https://api.tvmaze.com";
pub const DEFAULT_COUNTRY: &str = "GB";

const PRIMARY_LIMIT: usize = 20;
const SUPPLEMENTAL_LIMIT: usize = 15;

const LISTING_PAGES: [RangeInclusive<u32>; 1] = [1..=50];
const SEARCH_PAGES: [RangeInclusive<u32>; 1] = [51..=150];

const REGIONAL_TERMS: &[&str] = &[
    "uk", "british", "england", "scotland", "wales", "northern ireland", "bbc", "itv",
    "channel4", "sky", "britain", "great britain", "uk comedy", "uk drama", "uk reality",
    "uk documentary",
];

const GENRE_TERMS: &[&str] = &[
    "drama", "comedy", "crime", "sci-fi", "reality", "documentary", "thriller", "action",
    "adventure", "mystery", "romance", "horror",
];

/// TV shows from TVMaze: today's schedule, show listings and searches
pub struct TvMazeProvider {
    client: reqwest::Client,
    base_url: String,
    country: String,
    pages: PageTracker,
    regional_terms: HintTracker<&'static str>,
    genre_terms: HintTracker<&'static str>,
}

/// One planned TVMaze request
#[derive(Debug, Clone, PartialEq)]
enum Lookup {
    Schedule { date: String },
    Listing { page: u32 },
    RegionalSearch { term: &'static str },
    GenreSearch { term: &'static str, page: u32 },
}

impl Lookup {
    fn path_and_query(&self, country: &str) -> (&'static str, Vec<(&'static str, String)>) {
        match self {
            Lookup::Schedule { date } => (
                "/schedule",
                vec![("country", country.to_string()), ("date", date.clone())],
            ),
            Lookup::Listing { page } => (
                "/shows",
                vec![("country", country.to_string()), ("page", page.to_string())],
            ),
            Lookup::RegionalSearch { term } => ("/search/shows", vec![("q", term.to_string())]),
            Lookup::GenreSearch { term, page } => (
                "/search/shows",
                vec![("q", term.to_string()), ("page", page.to_string())],
            ),
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Lookup::Schedule { .. } | Lookup::Listing { .. } => "UK Current",
            Lookup::RegionalSearch { .. } => "UK Search",
            Lookup::GenreSearch { .. } => "International",
        }
    }
}

/// Schedule and search entries wrap the show; listings return it bare
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Wrapped { show: Show },
    Bare(Show),
}

impl Entry {
    fn into_show(self) -> Show {
        match self {
            Entry::Wrapped { show } | Entry::Bare(show) => show,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Show {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    network: Option<Network>,
}

#[derive(Debug, Deserialize)]
struct Network {
    name: String,
}

impl TvMazeProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            country: country.into(),
            pages: PageTracker::new(),
            regional_terms: HintTracker::new(REGIONAL_TERMS.iter().copied()),
            genre_terms: HintTracker::new(GENRE_TERMS.iter().copied()),
        }
    }

    fn plan<R: Rng + ?Sized>(&mut self, hint: FetchHint, today: String, rng: &mut R) -> Lookup {
        match hint {
            FetchHint::Primary => match rng.random_range(0..3) {
                0 => Lookup::Schedule { date: today },
                1 => Lookup::Listing {
                    page: self.pages.pick(&LISTING_PAGES, rng),
                },
                _ => Lookup::RegionalSearch {
                    term: self.regional_terms.pick(rng).unwrap_or("uk"),
                },
            },
            FetchHint::Supplemental => Lookup::GenreSearch {
                term: self.genre_terms.pick(rng).unwrap_or("drama"),
                page: self.pages.pick(&SEARCH_PAGES, rng),
            },
        }
    }

    fn mark_used(&mut self, lookup: &Lookup) {
        match lookup {
            Lookup::Schedule { .. } => {}
            Lookup::Listing { page } => self.pages.mark_used(*page),
            Lookup::RegionalSearch { term } => self.regional_terms.mark_used(*term),
            Lookup::GenreSearch { term, page } => {
                self.genre_terms.mark_used(*term);
                self.pages.mark_used(*page);
            }
        }
    }
}

fn to_challenges(entries: Vec<Entry>, lookup: &Lookup) -> Vec<Challenge> {
    let english_only = matches!(lookup, Lookup::GenreSearch { .. });
    let (limit, default_network) = if english_only {
        (SUPPLEMENTAL_LIMIT, "Various")
    } else {
        (PRIMARY_LIMIT, "BBC")
    };

    entries
        .into_iter()
        .map(Entry::into_show)
        .filter(|show| !english_only || show.language.as_deref() == Some("English"))
        .filter_map(|show| {
            let name = show.name.filter(|n| !n.trim().is_empty())?;
            let network = show
                .network
                .map(|n| n.name)
                .unwrap_or_else(|| default_network.to_string());
            Some(
                Challenge::tv_show(name, lookup.category())
                    .with_network(network)
                    .with_provenance("TV Maze"),
            )
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl ContentProvider for TvMazeProvider {
    async fn fetch(&mut self, hint: FetchHint) -> ProviderResult<Vec<Challenge>> {
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let lookup = {
            let mut rng = rand::rng();
            self.plan(hint, today, &mut rng)
        };
        tracing::debug!("TVMaze lookup {:?}", lookup);

        let (path, query) = lookup.path_and_query(&self.country);
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(&query).send().await?;
        let entries: Vec<Entry> = check_status(response)?.json().await?;

        self.mark_used(&lookup);
        Ok(to_challenges(entries, &lookup))
    }

    fn name(&self) -> &str {
        "tvmaze"
    }

    fn kind(&self) -> ContentKind {
        ContentKind::TvShow
    }

    async fn health_check(&self) -> ProviderResult<()> {
        let url = format!("{}/search/shows", self.base_url);
        let response = self.client.get(&url).query(&[("q", "test")]).send().await?;
        check_status(response)?;
        Ok(())
    }

    fn reset_hints(&mut self) {
        self.pages.reset();
        self.regional_terms.reset();
        self.genre_terms.reset();
    }
}
