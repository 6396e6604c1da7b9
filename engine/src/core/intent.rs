//! Choice intent detection.
//!
//! What a choice does is determined by its text, never by its position in the
//! list. This is the single source of truth for routing a submitted choice.

use std::sync::LazyLock;

use regex::RegexSet;

use crate::core::types::Choice;
use crate::core::window::WindowDecisionKind;

/// Reserved choice id that quits the session. Always legal during gameplay,
/// never part of the narrator-offered choice set.
pub const QUIT_CHOICE_ID: &str = "Q";

/// What a submitted choice actually does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceIntent {
    /// Activate the device and travel to a new era.
    LeaveEra,
    /// End the game by settling permanently.
    StayForever,
    /// Normal story progression.
    Continue,
}

static LEAVE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"activate.*time\s*machine",
        r"activate.*device",
        r"use.*time\s*machine",
        r"leave.*era.*behind",
        r"leave this era",
        r"travel.*new era",
        r"press.*device",
        r"time to leave",
        r"depart.*era",
    ])
    .expect("leave patterns should be valid regexes")
});

static STAY_FOREVER_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"stay.*forever",
        r"stay here forever",
        r"this is.*home now",
        r"this is my home",
        r"my home now",
        r"remain.*permanently",
        r"never leave",
        r"choose to stay.*forever",
        r"i choose to stay",
    ])
    .expect("stay patterns should be valid regexes")
});

/// Detect intent from the choice text. With the window closed every choice is
/// a story choice, whatever its wording.
pub fn detect(choice_text: &str, window_open: bool) -> ChoiceIntent {
    if !window_open || choice_text.is_empty() {
        return ChoiceIntent::Continue;
    }
    let lower = choice_text.to_lowercase();
    if LEAVE_PATTERNS.is_match(&lower) {
        ChoiceIntent::LeaveEra
    } else if STAY_FOREVER_PATTERNS.is_match(&lower) {
        ChoiceIntent::StayForever
    } else {
        ChoiceIntent::Continue
    }
}

/// Drop choices the player should not see. Safety layer for narrator output:
/// stay-forever offers disappear while the player is not eligible. The
/// decision comes from [`crate::core::window::evaluate`], the one gate.
pub fn filter_choices(choices: Vec<Choice>, decision: WindowDecisionKind) -> Vec<Choice> {
    if decision != WindowDecisionKind::OpenCanLeaveOnly {
        return choices;
    }
    choices
        .into_iter()
        .filter(|choice| detect(&choice.text, true) != ChoiceIntent::StayForever)
        .collect()
}
