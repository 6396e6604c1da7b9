//! Immutable era reference data and era selection.
//!
//! Eras are static records; a session only ever stores an era id and looks
//! the record up here. Random selection sits behind [`EraPicker`] so tests
//! and replays can pin the sequence.

use serde::{Deserialize, Serialize};

/// A destination era. Selected once per era entry, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Era {
    pub id: &'static str,
    pub name: &'static str,
    /// Negative years are BCE.
    pub year: i32,
    pub location: &'static str,
    /// Narrative flavor used in arrival prompts.
    pub flavor: &'static str,
    pub key_events: &'static [&'static str],
    /// Whether the era belongs to the European/Western subset.
    pub european: bool,
}

impl Era {
    /// What the device display shows: `"1250 BCE | Egypt"`.
    pub fn display(&self) -> String {
        format!("{} | {}", year_display(self.year), self.location)
    }
}

/// Format a signed year for display.
pub fn year_display(year: i32) -> String {
    if year < 0 {
        format!("{} BCE", -year)
    } else {
        format!("{year} CE")
    }
}

/// Player-selectable era pool preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    European,
    Worldwide,
}

impl Region {
    pub fn parse(value: &str) -> Option<Region> {
        match value.trim().to_lowercase().as_str() {
            "european" | "europe" => Some(Region::European),
            "worldwide" | "global" | "world" => Some(Region::Worldwide),
            _ => None,
        }
    }
}

pub const CATALOGUE: &[Era] = &[
    Era {
        id: "ancient_egypt",
        name: "Ancient Egypt - Reign of Ramesses II",
        year: -1250,
        location: "Egypt",
        flavor: "The Nile floods on schedule, the temples rise, and the scribes hold the keys to every door.",
        key_events: &[
            "Construction of Abu Simbel",
            "The treaty with the Hittites",
            "The flood season ordering all of life",
        ],
        european: false,
    },
    Era {
        id: "classical_athens",
        name: "Classical Athens - The Golden Age",
        year: -450,
        location: "Greece",
        flavor: "Philosophy in the agora, democracy for the few, and a war with Sparta gathering offstage.",
        key_events: &[
            "The building of the Parthenon",
            "Pericles' citizenship law",
            "Socrates questioning in the marketplace",
        ],
        european: true,
    },
    Era {
        id: "han_dynasty",
        name: "Han Dynasty China - The Silk Road",
        year: 100,
        location: "China",
        flavor: "Caravans leave for the west, paper is newly invented, and the examination hall shapes every ambition.",
        key_events: &[
            "Cai Lun's paper-making",
            "Silk Road caravans to Parthia",
            "The Confucian civil service",
        ],
        european: false,
    },
    Era {
        id: "viking_age",
        name: "Viking Age Scandinavia",
        year: 900,
        location: "Scandinavia",
        flavor: "Longships in the fjord, law spoken at the Thing, and a reputation worth more than silver.",
        key_events: &[
            "Settlement of Iceland",
            "Raids and trade down the rivers",
            "The Thing assembly settling feuds",
        ],
        european: true,
    },
    Era {
        id: "medieval_plague",
        name: "Medieval Europe - The Black Death",
        year: 1348,
        location: "France",
        flavor: "Bells toll without pause, the guilds bury their masters, and the Church promises what medicine cannot.",
        key_events: &[
            "The pestilence reaching the ports",
            "Flagellant processions",
            "Labor scarce and wages rising",
        ],
        european: true,
    },
    Era {
        id: "aztec_empire",
        name: "Aztec Empire - Eve of Conquest",
        year: 1510,
        location: "Tenochtitlan (Mexico)",
        flavor: "A city on a lake larger than any in Europe, tribute flowing in, and omens troubling the priests.",
        key_events: &[
            "The flower wars",
            "Tribute from five hundred towns",
            "Strange signs over the lake",
        ],
        european: false,
    },
    Era {
        id: "mughal_india",
        name: "Mughal India - Akbar's Court",
        year: 1580,
        location: "India",
        flavor: "An emperor who debates every faith, workshops of miniature painters, and rank measured in horsemen.",
        key_events: &[
            "The Ibadat Khana religious debates",
            "The mansabdari ranking system",
            "Fatehpur Sikri rising from the rock",
        ],
        european: false,
    },
    Era {
        id: "american_revolution",
        name: "American Revolution - Boston",
        year: 1775,
        location: "Colonial America",
        flavor: "Committees meet by candlelight, loyalty is a dangerous guess, and the militia drills on the green.",
        key_events: &[
            "The siege of Boston",
            "Committees of correspondence",
            "Loyalists weighing exile",
        ],
        european: true,
    },
    Era {
        id: "industrial_britain",
        name: "Industrial Britain - Manchester",
        year: 1840,
        location: "Britain",
        flavor: "Steam and soot, twelve-hour shifts, and reformers counting the cost of progress.",
        key_events: &[
            "The factory system swallowing the villages",
            "Chartist petitions",
            "Union men meeting in back rooms",
        ],
        european: true,
    },
    Era {
        id: "civil_war",
        name: "American Civil War - Border States",
        year: 1863,
        location: "America",
        flavor: "Neighbors on opposite sides, armies foraging through, and freedom a word with teeth.",
        key_events: &[
            "Emancipation reshaping the war",
            "Border towns changing hands",
            "Contraband camps along the rivers",
        ],
        european: true,
    },
    Era {
        id: "indian_partition",
        name: "Partition of India - Punjab",
        year: 1947,
        location: "India",
        flavor: "A line drawn on a map, trains running in both directions, and old friendships under siege.",
        key_events: &[
            "The Radcliffe Line announced",
            "Columns of refugees on the Grand Trunk Road",
            "Mixed villages deciding overnight",
        ],
        european: false,
    },
    Era {
        id: "ww2_europe",
        name: "WW2 Europe - Occupied France",
        year: 1943,
        location: "France",
        flavor: "Ration cards and forged papers, a resistance built on trust, and collaboration a sliding scale.",
        key_events: &[
            "The occupation's paper regime",
            "Resistance networks and betrayals",
            "Allied bombers overhead at night",
        ],
        european: true,
    },
    Era {
        id: "ww2_pacific",
        name: "WW2 Pacific - Home Front",
        year: 1943,
        location: "American Home Front",
        flavor: "Victory gardens and blue stars in windows, shipyards running around the clock.",
        key_events: &[
            "War production doubling overnight",
            "Rationing and scrap drives",
            "Letters from the Pacific",
        ],
        european: true,
    },
    Era {
        id: "cold_war_germany",
        name: "Cold War - East Berlin",
        year: 1975,
        location: "East Germany",
        flavor: "Two languages for every thought, informers in every stairwell, and small freedoms traded carefully.",
        key_events: &[
            "The Wall a fact of life",
            "The informer economy",
            "Western radio after dark",
        ],
        european: true,
    },
];

/// Look up an era by id.
pub fn by_id(id: &str) -> Option<&'static Era> {
    CATALOGUE.iter().find(|era| era.id == id)
}

/// Chooses among eligible destination eras. The only randomness in era
/// sequencing lives behind this trait.
pub trait EraPicker {
    /// `candidates` is never empty.
    fn pick(&mut self, candidates: &[&'static Era]) -> &'static Era;
}

/// Uniform random picker for live play.
#[derive(Debug, Default)]
pub struct RandomEraPicker;

impl EraPicker for RandomEraPicker {
    fn pick(&mut self, candidates: &[&'static Era]) -> &'static Era {
        use rand::seq::SliceRandom;
        let mut rng = rand::thread_rng();
        candidates
            .choose(&mut rng)
            .copied()
            .unwrap_or(&CATALOGUE[0])
    }
}

/// Select the next era: region-filtered, excluding visited eras, falling back
/// to revisits when the pool is exhausted.
pub fn select_era(
    region: Region,
    visited: &[String],
    picker: &mut dyn EraPicker,
) -> &'static Era {
    let pool: Vec<&'static Era> = CATALOGUE
        .iter()
        .filter(|era| region == Region::Worldwide || era.european)
        .collect();
    let unvisited: Vec<&'static Era> = pool
        .iter()
        .copied()
        .filter(|era| !visited.iter().any(|v| v == era.id))
        .collect();
    let candidates = if unvisited.is_empty() { &pool } else { &unvisited };
    picker.pick(candidates)
}
