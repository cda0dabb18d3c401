use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque ID type for sessions (ULID string)
pub type SessionId = String;

/// Logical content class a challenge belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    Film,
    TvShow,
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Film => "Film",
            ContentKind::TvShow => "TV Show",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "film" | "films" | "movie" | "movies" => Ok(ContentKind::Film),
            "tv" | "tv_show" | "tvshow" | "tv_shows" | "show" | "shows" => Ok(ContentKind::TvShow),
            other => Err(format!("Unknown content kind '{}'", other)),
        }
    }
}

/// One nameable film or show to be acted out or drawn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Challenge {
    pub title: String,
    pub kind: ContentKind,
    /// Display tag such as "Popular" or "UK Current"
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// Broadcaster, only meaningful for TV shows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Which provider or backup list produced this item (diagnostic only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl Challenge {
    pub fn film(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: ContentKind::Film,
            category: category.into(),
            year: None,
            network: None,
            provenance: None,
        }
    }

    pub fn tv_show(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: ContentKind::TvShow,
            category: category.into(),
            year: None,
            network: None,
            provenance: None,
        }
    }

    pub fn with_year(mut self, year: Option<String>) -> Self {
        self.year = year.filter(|y| !y.trim().is_empty());
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }

    /// Deduplication key for this challenge
    pub fn key(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Lower-cased, trimmed title. Two challenges with the same key are duplicates.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// How the player has to present the challenge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeMode {
    Act,
    Draw,
}

impl ChallengeMode {
    /// Pick act or draw with equal probability
    pub fn random<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            ChallengeMode::Act
        } else {
            ChallengeMode::Draw
        }
    }
}

/// Counters shown next to the challenge card
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub used: usize,
    pub remaining: usize,
    pub films: usize,
    pub tv_shows: usize,
}

impl PoolStats {
    pub fn from_pool(pool: &[Challenge], used: usize) -> Self {
        let films = pool.iter().filter(|c| c.kind == ContentKind::Film).count();
        Self {
            total: pool.len(),
            used,
            remaining: pool.len().saturating_sub(used),
            films,
            tv_shows: pool.len() - films,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  The Matrix "), "the matrix");
        assert_eq!(normalize_title("ALIEN"), normalize_title("alien"));
    }

    #[test]
    fn test_content_kind_parsing() {
        assert_eq!("films".parse::<ContentKind>().unwrap(), ContentKind::Film);
        assert_eq!(" TV ".parse::<ContentKind>().unwrap(), ContentKind::TvShow);
        assert!("podcast".parse::<ContentKind>().is_err());
    }

    #[test]
    fn test_challenge_serialization() {
        let challenge = Challenge::tv_show("Doctor Who", "UK Current").with_network("BBC One");
        let json = serde_json::to_value(&challenge).unwrap();
        assert_eq!(json["kind"], "TV_SHOW");
        assert_eq!(json["network"], "BBC One");
        assert!(json.get("year").is_none());
    }

    #[test]
    fn test_blank_year_is_dropped() {
        let challenge = Challenge::film("Up", "Popular").with_year(Some(String::new()));
        assert!(challenge.year.is_none());
    }

    #[test]
    fn test_pool_stats() {
        let pool = vec![
            Challenge::film("Alien", "Classic"),
            Challenge::film("Heat", "Classic"),
            Challenge::tv_show("Luther", "UK"),
        ];
        let stats = PoolStats::from_pool(&pool, 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.remaining, 2);
        assert_eq!(stats.films, 2);
        assert_eq!(stats.tv_shows, 1);
    }
}
