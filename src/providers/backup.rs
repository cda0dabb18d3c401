//! Hard-coded catalogs that terminate every cascade.
//!
//! Each catalog holds well over 50 unique titles so a full pool can be built
//! even when every remote upstream is down.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use super::{ContentProvider, FetchHint, ProviderResult};
use crate::types::{Challenge, ContentKind};

const FILM_CATALOG: &[(&str, &[&str])] = &[
    (
        "Classic",
        &[
            "The Godfather", "Casablanca", "Citizen Kane", "Gone with the Wind",
            "Lawrence of Arabia", "The Wizard of Oz", "Vertigo", "Psycho",
            "2001: A Space Odyssey", "Apocalypse Now", "Taxi Driver", "Goodfellas",
            "The Shawshank Redemption", "Pulp Fiction", "Fight Club",
        ],
    ),
    (
        "Modern Blockbuster",
        &[
            "Black Panther", "Avengers: Endgame", "Spider-Man: No Way Home",
            "Top Gun: Maverick", "Dune", "No Time to Die", "The Batman", "Wonder Woman",
            "Aquaman", "Joker", "Parasite", "Nomadland", "The Shape of Water", "La La Land",
            "Mad Max: Fury Road", "The Revenant", "Birdman", "12 Years a Slave", "Argo",
        ],
    ),
    (
        "International",
        &[
            "Parasite", "Roma", "Crouching Tiger, Hidden Dragon", "Amélie",
            "Life Is Beautiful", "Cinema Paradiso", "The Seventh Seal", "La Dolce Vita",
            "Bicycle Thieves", "Rashomon", "Seven Samurai", "Spirited Away",
            "My Neighbor Totoro", "Princess Mononoke",
        ],
    ),
    (
        "Cult Classic",
        &[
            "The Rocky Horror Picture Show", "Donnie Darko", "The Big Lebowski",
            "Office Space", "Shaun of the Dead", "Hot Fuzz", "Scott Pilgrim vs. the World",
            "Kick-Ass", "Superbad", "The 40-Year-Old Virgin", "Bridesmaids", "Mean Girls",
            "Legally Blonde",
        ],
    ),
    (
        "Sci-Fi & Fantasy",
        &[
            "Blade Runner", "The Terminator", "Terminator 2: Judgment Day", "Aliens",
            "Alien", "Predator", "The Thing", "They Live", "Escape from New York",
            "Big Trouble in Little China", "The Fifth Element", "Total Recall", "RoboCop",
        ],
    ),
    (
        "Action & Adventure",
        &[
            "Die Hard", "Lethal Weapon", "Mad Max", "The Road Warrior",
            "Raiders of the Lost Ark", "Indiana Jones and the Temple of Doom",
            "Indiana Jones and the Last Crusade", "Mission: Impossible", "John Wick",
            "John Wick: Chapter 2",
        ],
    ),
    (
        "Comedy & Romance",
        &[
            "When Harry Met Sally", "Sleepless in Seattle", "You've Got Mail",
            "Notting Hill", "Love Actually", "Bridget Jones's Diary",
            "The Devil Wears Prada", "Mamma Mia!", "Chicago", "Moulin Rouge!",
            "The Greatest Showman", "La La Land", "The Artist",
        ],
    ),
    (
        "Horror & Thriller",
        &[
            "The Shining", "The Exorcist", "A Nightmare on Elm Street", "Friday the 13th",
            "Halloween", "Scream", "The Blair Witch Project", "The Ring", "The Conjuring",
            "It", "Get Out", "Us", "Nope", "Midsommar", "Hereditary", "The Witch",
        ],
    ),
    (
        "Animation & Family",
        &[
            "Toy Story", "Toy Story 2", "Toy Story 3", "Finding Nemo", "Finding Dory",
            "Monsters, Inc.", "Up", "Inside Out", "Soul", "Luca", "Turning Red",
            "The Incredibles", "Incredibles 2",
        ],
    ),
];

const UK_TV_CATALOG: &[(&str, &[&str])] = &[
    (
        "UK Classic",
        &[
            "Doctor Who", "EastEnders", "Coronation Street", "Emmerdale", "Hollyoaks",
            "Only Fools and Horses", "Fawlty Towers", "Blackadder", "Father Ted",
            "Black Books", "The IT Crowd", "Peep Show", "The Inbetweeners",
            "Gavin & Stacey", "The Office", "Extras",
        ],
    ),
    (
        "UK Entertainment",
        &[
            "The Great British Bake Off", "Strictly Come Dancing", "The X Factor",
            "Britain's Got Talent", "Match of the Day", "Top Gear", "The Apprentice",
            "Dragons' Den", "MasterChef", "The Graham Norton Show",
            "Have I Got News for You", "Mock the Week", "QI", "Never Mind the Buzzcocks",
            "Would I Lie to You?", "8 Out of 10 Cats", "The Voice UK", "Love Island",
            "I'm a Celebrity... Get Me Out of Here!", "Antiques Roadshow",
        ],
    ),
    (
        "UK Drama",
        &[
            "Line of Duty", "Bodyguard", "Killing Eve", "Normal People", "Peaky Blinders",
            "Sherlock", "Luther", "Broadchurch", "Happy Valley", "The Fall",
            "The Night Manager", "Vigil", "Casualty", "Silent Witness", "Downton Abbey",
        ],
    ),
    (
        "UK Comedy",
        &[
            "Fleabag", "This Country", "Derry Girls", "Ghosts", "Motherland",
            "Catastrophe", "Bad Education", "People Just Do Nothing", "Detectorists",
            "Inside No. 9", "The League of Gentlemen", "The Mighty Boosh", "The Thick of It",
        ],
    ),
    (
        "UK Factual",
        &["Planet Earth", "Blue Planet", "Frozen Planet", "Countryfile", "Gardeners' World"],
    ),
];

const STREAMING_TV_CATALOG: &[(&str, &[&str])] = &[
    (
        "Netflix",
        &[
            "Stranger Things", "The Crown", "Bridgerton", "Wednesday", "Squid Game",
            "Money Heist", "The Witcher", "Dark", "Ozark", "Narcos", "House of Cards",
            "Orange Is the New Black", "Russian Doll", "Dead to Me", "Grace and Frankie",
        ],
    ),
    (
        "Prime Video",
        &[
            "The Boys", "The Marvelous Mrs. Maisel", "Good Omens", "The Expanse",
            "Jack Ryan", "Reacher", "The Grand Tour", "Clarkson's Farm", "Invincible",
            "The Wheel of Time", "The Rings of Power", "Bosch",
        ],
    ),
    (
        "Disney+",
        &[
            "The Mandalorian", "Andor", "Loki", "WandaVision", "Hawkeye", "Moon Knight",
            "The Simpsons", "Bluey", "Gravity Falls", "The Owl House",
        ],
    ),
    (
        "HBO",
        &[
            "Game of Thrones", "House of the Dragon", "Succession", "The White Lotus",
            "Euphoria", "Westworld", "True Detective", "The Wire", "The Sopranos",
            "Curb Your Enthusiasm", "Veep", "Silicon Valley", "Barry",
        ],
    ),
    (
        "Hulu",
        &[
            "The Handmaid's Tale", "Only Murders in the Building", "The Bear",
            "Reservation Dogs", "Little Fires Everywhere", "The Great",
        ],
    ),
    (
        "Apple TV+",
        &[
            "Ted Lasso", "Severance", "The Morning Show", "Foundation", "For All Mankind",
            "Slow Horses", "Pachinko", "Bad Sisters", "Shrinking",
        ],
    ),
];

fn catalog_for(kind: ContentKind, hint: FetchHint) -> (&'static [(&'static str, &'static [&'static str])], &'static str) {
    match (kind, hint) {
        (ContentKind::Film, _) => (FILM_CATALOG, "Backup Film Catalog"),
        (ContentKind::TvShow, FetchHint::Primary) => (UK_TV_CATALOG, "Backup UK TV Catalog"),
        (ContentKind::TvShow, FetchHint::Supplemental) => {
            (STREAMING_TV_CATALOG, "Backup Streaming TV Catalog")
        }
    }
}

/// Shuffled, de-duplicated slice of the backup catalog for `kind`.
///
/// Never empty as long as `limit > 0`.
pub fn backup_for(kind: ContentKind, hint: FetchHint, limit: usize) -> Vec<Challenge> {
    let (catalog, provenance) = catalog_for(kind, hint);
    let mut seen = HashSet::new();
    let mut items: Vec<Challenge> = catalog
        .iter()
        .flat_map(|(category, titles)| titles.iter().map(move |t| (*category, *t)))
        .filter(|(_, title)| seen.insert(crate::types::normalize_title(title)))
        .map(|(category, title)| {
            let challenge = match kind {
                ContentKind::Film => Challenge::film(title, category),
                ContentKind::TvShow => {
                    let network = match hint {
                        FetchHint::Primary => "BBC/ITV",
                        FetchHint::Supplemental => "Various Streaming",
                    };
                    Challenge::tv_show(title, category).with_network(network)
                }
            };
            challenge.with_provenance(provenance)
        })
        .collect();

    items.shuffle(&mut rand::rng());
    items.truncate(limit.max(1));
    items
}

/// Terminal cascade step wrapping [`backup_for`]
#[derive(Debug, Clone)]
pub struct StaticBackupList {
    kind: ContentKind,
    limit: usize,
}

impl StaticBackupList {
    pub fn new(kind: ContentKind, limit: usize) -> Self {
        Self { kind, limit }
    }

    pub fn get(&self, hint: FetchHint) -> Vec<Challenge> {
        backup_for(self.kind, hint, self.limit)
    }
}

#[async_trait]
impl ContentProvider for StaticBackupList {
    async fn fetch(&mut self, hint: FetchHint) -> ProviderResult<Vec<Challenge>> {
        Ok(self.get(hint))
    }

    fn name(&self) -> &str {
        "backup"
    }

    fn kind(&self) -> ContentKind {
        self.kind
    }
}
