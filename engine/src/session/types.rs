//! Session state plus the closed action/event unions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::anchor::AnchorSet;
use crate::core::scoring::ScoreBreakdown;
use crate::core::types::{AnchorKind, AnchorLevel, Choice, Ending, JourneyPhase, Phase, Trend};
use crate::core::window::{DeviceState, IndicatorState, WindowState};
use crate::eras::{Era, Region, by_id};
use crate::items::Inventory;
use crate::outcome::TurnOutcome;
use crate::persist::{LeaderboardEntry, SaveSummary};

/// A turn where a single anchor moved hard enough to be worth remembering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefiningMoment {
    pub anchor: AnchorKind,
    pub delta: i32,
    pub turn: u32,
}

/// Summary of an era the player has already left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedEra {
    pub id: String,
    pub name: String,
    pub turns: u32,
}

/// The root aggregate, one per player game. Serializable as the save format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Stable player identifier used to scope saves, if the caller has one.
    pub user_id: Option<String>,
    pub player_name: Option<String>,
    pub region: Option<Region>,
    pub phase: Phase,
    pub era_id: Option<String>,
    pub total_turns: u32,
    pub turns_in_era: u32,
    pub visited: Vec<VisitedEra>,
    pub inventory: Inventory,
    pub anchors: AnchorSet,
    pub window: WindowState,
    pub pending_choices: Vec<Choice>,
    /// Narrative beats in order, append-only.
    pub history: Vec<String>,
    pub character_name: Option<String>,
    pub key_npcs: Vec<String>,
    pub wisdom_moments: Vec<String>,
    pub defining_moments: Vec<DefiningMoment>,
    /// Absent until the session reaches a terminal phase.
    pub ending: Option<Ending>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: None,
            player_name: None,
            region: None,
            phase: Phase::Connecting,
            era_id: None,
            total_turns: 0,
            turns_in_era: 0,
            visited: Vec::new(),
            inventory: Inventory::starting(),
            anchors: AnchorSet::new(),
            window: WindowState::closed(),
            pending_choices: Vec::new(),
            history: Vec::new(),
            character_name: None,
            key_npcs: Vec::new(),
            wisdom_moments: Vec::new(),
            defining_moments: Vec::new(),
            ending: None,
        }
    }

    /// Current era, resolved from the static catalogue.
    pub fn era(&self) -> Option<&'static Era> {
        self.era_id.as_deref().and_then(by_id)
    }

    /// Reset per-era state on entry. The window clock and the character's
    /// local identity start over; anchors are handled by the departure path.
    pub fn enter_era(&mut self, era: &Era) {
        self.era_id = Some(era.id.to_string());
        self.turns_in_era = 0;
        self.window = WindowState::closed();
        self.inventory.reset_for_new_era();
        self.character_name = None;
        self.key_npcs.clear();
        self.pending_choices.clear();
    }

    /// Fold the narrative side of a parsed outcome into the session.
    pub fn absorb_outcome(&mut self, outcome: &TurnOutcome) {
        self.history.push(outcome.narrative.clone());
        if let Some(name) = &outcome.character_name {
            self.character_name = Some(name.clone());
        }
        for npc in &outcome.key_npcs {
            if !self.key_npcs.contains(npc) {
                self.key_npcs.push(npc.clone());
            }
        }
        if let Some(wisdom) = &outcome.wisdom {
            self.wisdom_moments.push(wisdom.clone());
        }
    }

    /// Most recent narrative beats, oldest first.
    pub fn history_tail(&self, n: usize) -> Vec<String> {
        let start = self.history.len().saturating_sub(n);
        self.history[start..].to_vec()
    }

    /// Distinct eras seen, counting the one currently inhabited. Revisits
    /// after the era pool is exhausted do not count again.
    pub fn eras_visited(&self) -> u32 {
        let mut seen: HashSet<&str> = self.visited.iter().map(|v| v.id.as_str()).collect();
        if let Some(current) = &self.era_id {
            seen.insert(current.as_str());
        }
        seen.len() as u32
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Ended
    }
}

/// Inbound player actions. Closed union: every variant is matched
/// exhaustively against the per-phase legality table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Init { user_id: Option<String> },
    NewGame,
    Load { game_id: String },
    Resume,
    ListSaves,
    Leaderboard,
    SetName { name: String },
    SetRegion { region: String },
    EnterFirstEra,
    ContinueToNextEra,
    Choose { choice_id: String },
    ContinueToScore,
    Save,
}

/// Outbound events. Serialized with a `type` tag for the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Ready,
    Title {
        text: String,
    },
    SetupName,
    SetupRegion {
        options: Vec<String>,
    },
    IntroStory {
        paragraphs: Vec<String>,
    },
    IntroItems {
        items: Vec<String>,
    },
    IntroDevice,
    EraArrival {
        era_name: String,
        year_display: String,
        location: String,
        era_number: u32,
    },
    EraSummary {
        era_name: String,
        key_events: Vec<String>,
        turns_spent: u32,
    },
    Loading {
        message: String,
    },
    Narrative {
        text: String,
    },
    /// Incremental slice of a narrative; the transport layer may stream
    /// these instead of one `narrative` block.
    NarrativeChunk {
        text: String,
    },
    Choices {
        choices: Vec<Choice>,
        can_quit: bool,
        window_open: bool,
        can_stay_forever: bool,
    },
    DeviceStatus {
        device: DeviceState,
        indicator: IndicatorState,
        display: String,
    },
    WindowOpen {
        message: String,
    },
    WindowClosing {
        message: String,
    },
    WindowClosed,
    Departure {
        message: String,
    },
    StayingForever,
    JourneyProgress {
        belonging_level: AnchorLevel,
        belonging_trend: Trend,
        legacy_level: AnchorLevel,
        legacy_trend: Trend,
        freedom_level: AnchorLevel,
        freedom_trend: Trend,
        dominant: Option<AnchorKind>,
        journey_phase: JourneyPhase,
        can_stay: bool,
    },
    ProgressMilestone {
        anchor: AnchorKind,
        old_level: AnchorLevel,
        new_level: AnchorLevel,
        message: String,
    },
    HistoricalWisdom {
        insight: String,
    },
    FinalScore {
        #[serde(flatten)]
        score: ScoreBreakdown,
    },
    GameEnd,
    SaveList {
        saves: Vec<SaveSummary>,
    },
    Saved {
        game_id: String,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(id: &str) -> VisitedEra {
        VisitedEra {
            id: id.to_string(),
            name: id.to_string(),
            turns: 3,
        }
    }

    #[test]
    fn revisited_eras_count_once() {
        let mut session = Session::new("s");
        session.visited.push(visit("viking_age"));
        session.visited.push(visit("viking_age"));
        session.era_id = Some("viking_age".to_string());
        assert_eq!(session.eras_visited(), 1);

        session.visited.push(visit("han_dynasty"));
        assert_eq!(session.eras_visited(), 2);
    }

    #[test]
    fn current_era_counts_when_unvisited() {
        let mut session = Session::new("s");
        assert_eq!(session.eras_visited(), 0);
        session.era_id = Some("classical_athens".to_string());
        assert_eq!(session.eras_visited(), 1);
        session.visited.push(visit("classical_athens"));
        assert_eq!(session.eras_visited(), 1);
    }
}
