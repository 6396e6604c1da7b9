//! Deterministic stand-ins for the randomness and narrator seams.
//!
//! Compiled for unit tests and for downstream crates via the `test-support`
//! feature (the replay tool pins luck and narration with these).

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};

use crate::core::types::Phase;
use crate::eras::{Era, EraPicker};
use crate::narrator::{NarrativeRequest, Narrator};
use crate::session::Session;
use crate::turn::Luck;

/// Luck that always returns the same values.
#[derive(Debug, Clone, Copy)]
pub struct FixedLuck {
    pub dice: u8,
    pub chance: f64,
}

impl FixedLuck {
    pub fn new(dice: u8, chance: f64) -> Self {
        Self { dice, chance }
    }
}

impl Luck for FixedLuck {
    fn dice(&mut self) -> u8 {
        self.dice
    }

    fn chance(&mut self) -> f64 {
        self.chance
    }
}

/// Luck that replays a scripted dice sequence, then repeats its last roll.
/// The chance value is fixed.
#[derive(Debug, Clone)]
pub struct SequenceLuck {
    rolls: VecDeque<u8>,
    last: u8,
    chance: f64,
}

impl SequenceLuck {
    pub fn new(rolls: Vec<u8>, chance: f64) -> Self {
        Self {
            rolls: rolls.into(),
            last: 10,
            chance,
        }
    }
}

impl Luck for SequenceLuck {
    fn dice(&mut self) -> u8 {
        if let Some(roll) = self.rolls.pop_front() {
            self.last = roll;
        }
        self.last
    }

    fn chance(&mut self) -> f64 {
        self.chance
    }
}

/// Narrator that replays scripted responses in order and errors once the
/// script runs out, which exercises the fallback path.
#[derive(Debug, Default)]
pub struct ScriptedNarrator {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedNarrator {
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Narrator for ScriptedNarrator {
    fn generate(&self, _request: &NarrativeRequest) -> Result<String> {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| anyhow!("narration script exhausted"))
    }
}

/// Picker that always takes the first candidate, making era sequences
/// deterministic.
#[derive(Debug, Default)]
pub struct FirstEraPicker;

impl EraPicker for FirstEraPicker {
    fn pick(&mut self, candidates: &[&'static Era]) -> &'static Era {
        candidates[0]
    }
}

/// A session dropped straight into `gameplay` in the given era, skipping the
/// setup phases.
pub fn session_in_gameplay(era_id: &str) -> Session {
    let mut session = Session::new("test-session");
    session.player_name = Some("Ada".to_string());
    session.region = Some(crate::eras::Region::Worldwide);
    session.phase = Phase::Gameplay;
    session.era_id = Some(era_id.to_string());
    session
}
