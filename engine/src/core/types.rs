//! Shared deterministic types for the engine core.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use serde::{Deserialize, Serialize};

/// One of the three hidden progress measures tracked per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    Belonging,
    Legacy,
    Freedom,
}

impl AnchorKind {
    /// Fixed order used everywhere anchors are iterated, so that derived
    /// events (milestones, progress snapshots) are emitted deterministically.
    pub const ORDER: [AnchorKind; 3] = [
        AnchorKind::Belonging,
        AnchorKind::Legacy,
        AnchorKind::Freedom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnchorKind::Belonging => "belonging",
            AnchorKind::Legacy => "legacy",
            AnchorKind::Freedom => "freedom",
        }
    }
}

/// Six-step qualitative banding of an anchor's numeric value.
///
/// Ordering matters: level comparisons drive stay-eligibility and milestone
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorLevel {
    None,
    Emerging,
    Growing,
    Strong,
    Arrived,
    Mastery,
}

impl AnchorLevel {
    /// Map a clamped anchor value onto its level band.
    pub fn from_value(value: u32) -> Self {
        match value {
            90.. => AnchorLevel::Mastery,
            80..90 => AnchorLevel::Arrived,
            60..80 => AnchorLevel::Strong,
            40..60 => AnchorLevel::Growing,
            20..40 => AnchorLevel::Emerging,
            _ => AnchorLevel::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnchorLevel::None => "none",
            AnchorLevel::Emerging => "emerging",
            AnchorLevel::Growing => "growing",
            AnchorLevel::Strong => "strong",
            AnchorLevel::Arrived => "arrived",
            AnchorLevel::Mastery => "mastery",
        }
    }
}

/// Direction of an anchor's recent movement, derived from its rolling history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Stable,
    Falling,
}

/// Coarse five-step summary of overall journey progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyPhase {
    Wandering,
    FindingFooting,
    BuildingRoots,
    ApproachingHome,
    Home,
}

/// Session lifecycle phase. Drives the per-phase action whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Connecting,
    Menu,
    SetupName,
    SetupRegion,
    /// Pre-era interlude: the opening story before the first era, and the
    /// between-era beat after each departure.
    Intro,
    Gameplay,
    WindowDecision,
    Ended,
}

/// How a session terminated. Exactly one variant is recorded once the phase
/// reaches [`Phase::Ended`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    /// Settled with all three anchors arrived.
    Complete,
    /// Settled with two anchors arrived.
    Balanced,
    Belonging,
    Legacy,
    Freedom,
    /// Settled without any anchor arrived.
    Searching,
    Quit,
    GameOver,
}

impl Ending {
    pub fn is_settled(self) -> bool {
        !matches!(self, Ending::Quit | Ending::GameOver)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Ending::Complete => "complete",
            Ending::Balanced => "balanced",
            Ending::Belonging => "belonging",
            Ending::Legacy => "legacy",
            Ending::Freedom => "freedom",
            Ending::Searching => "searching",
            Ending::Quit => "quit",
            Ending::GameOver => "game_over",
        }
    }
}

/// Qualitative band for a 1-20 dice roll, passed to the narrator so prose
/// severity tracks the roll without exposing the number to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuckBand {
    Unlucky,
    SlightlyUnlucky,
    Neutral,
    Lucky,
    VeryLucky,
}

impl LuckBand {
    pub fn from_roll(roll: u8) -> Self {
        match roll {
            0..=5 => LuckBand::Unlucky,
            6..=8 => LuckBand::SlightlyUnlucky,
            9..=12 => LuckBand::Neutral,
            13..=16 => LuckBand::Lucky,
            _ => LuckBand::VeryLucky,
        }
    }

    /// Prompt-facing description. Bad luck means complications, never dead ends.
    pub fn prompt_text(self) -> &'static str {
        match self {
            LuckBand::Unlucky => "UNLUCKY - complications arise, the approach hits obstacles",
            LuckBand::SlightlyUnlucky => "SLIGHTLY UNLUCKY - minor setbacks or delays",
            LuckBand::Neutral => "NEUTRAL - things go roughly as expected",
            LuckBand::Lucky => "LUCKY - things go better than expected",
            LuckBand::VeryLucky => "VERY LUCKY - unexpected good fortune, doors open",
        }
    }
}

/// A single offered choice: stable id (`A`..`C`, plus the reserved quit id)
/// and player-facing text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

impl Choice {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}
