//! Per-turn resolution: fortune roll, narrative generation, outcome fold.
//!
//! All randomness the engine consumes flows through the [`Luck`] seam and all
//! narrative text through the [`Narrator`] capability, so a whole turn is
//! deterministic under test.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::warn;

use crate::config::GameConfig;
use crate::core::anchor::Milestone;
use crate::core::types::LuckBand;
use crate::core::window::{self, WindowTick};
use crate::items::parse_item_usage;
use crate::narrator::{NarrativeRequest, Narrator, PromptKind, fallback_text, generate_bounded};
use crate::outcome::{TurnOutcome, defining_moment, parse_outcome};
use crate::prompt::PromptEngine;
use crate::session::{DefiningMoment, Session};

/// Randomness seam: the fortune die and the window-opening chance roll.
pub trait Luck {
    /// Uniform roll in `1..=20`.
    fn dice(&mut self) -> u8;
    /// Uniform sample in `0.0..1.0`.
    fn chance(&mut self) -> f64;
}

/// Production [`Luck`] backed by the thread rng.
#[derive(Debug, Default)]
pub struct RandomLuck;

impl Luck for RandomLuck {
    fn dice(&mut self) -> u8 {
        rand::thread_rng().gen_range(1..=20)
    }

    fn chance(&mut self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// Shared collaborators handed to the session machine.
pub struct EngineDeps {
    pub config: GameConfig,
    pub narrator: Arc<dyn Narrator>,
    pub prompts: PromptEngine,
}

impl EngineDeps {
    pub fn new(config: GameConfig, narrator: Arc<dyn Narrator>) -> Self {
        Self {
            config,
            narrator,
            prompts: PromptEngine::new(),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.narrator_timeout_secs)
    }
}

/// Everything one resolved gameplay turn produced.
pub struct ResolvedTurn {
    pub outcome: TurnOutcome,
    pub milestones: Vec<Milestone>,
    pub roll: u8,
    pub band: LuckBand,
    pub window_tick: WindowTick,
    pub items_used: Vec<String>,
}

/// Ask the narrator, falling back to canned text on timeout, error, or a
/// response without usable choices. Never fails: a turn always resolves.
fn narrate(deps: &EngineDeps, kind: PromptKind, prompt: String) -> TurnOutcome {
    let request = NarrativeRequest {
        kind,
        prompt,
        timeout: deps.timeout(),
    };
    let raw = match generate_bounded(Arc::clone(&deps.narrator), request) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(kind = ?kind, error = %err, "narrator failed, using fallback");
            fallback_text(kind).to_string()
        }
    };
    let outcome = parse_outcome(&raw);
    let needs_choices = matches!(kind, PromptKind::Arrival | PromptKind::Turn);
    if needs_choices && outcome.choices.len() < 2 {
        warn!(kind = ?kind, "narrator response had no usable choices, using fallback");
        return parse_outcome(fallback_text(kind));
    }
    outcome
}

/// Resolve the arrival scene for the era the session just entered. Does not
/// count as a survived turn; the window clock starts at the first choice.
pub fn resolve_arrival(session: &mut Session, deps: &EngineDeps) -> Result<TurnOutcome> {
    let era = session.era().ok_or_else(|| anyhow::anyhow!("no era set"))?;
    let system = deps.prompts.render_system(session)?;
    let body = deps.prompts.render_arrival(session, era)?;
    let outcome = narrate(deps, PromptKind::Arrival, format!("{system}\n\n{body}"));
    session.absorb_outcome(&outcome);
    session.pending_choices = outcome.choices.clone();
    Ok(outcome)
}

/// Resolve one gameplay turn for a non-departure choice: roll fortune,
/// generate, fold the outcome into the session, then tick the window.
pub fn resolve_turn(
    session: &mut Session,
    choice_text: &str,
    deps: &EngineDeps,
    luck: &mut dyn Luck,
) -> Result<ResolvedTurn> {
    let era = session.era().ok_or_else(|| anyhow::anyhow!("no era set"))?;
    let roll = luck.dice();
    let band = LuckBand::from_roll(roll);

    let history_tail = session.history_tail(deps.config.history_turns);
    let system = deps.prompts.render_system(session)?;
    let body = deps
        .prompts
        .render_turn(session, era, choice_text, roll, band, &history_tail)?;
    let outcome = narrate(deps, PromptKind::Turn, format!("{system}\n\n{body}"));

    let milestones = session.anchors.apply(&outcome.deltas);
    session.absorb_outcome(&outcome);

    let items_used = parse_item_usage(&outcome.narrative, &session.inventory);
    for id in &items_used {
        session.inventory.record_use(id);
    }

    session.total_turns += 1;
    session.turns_in_era += 1;
    if let Some((anchor, delta)) = defining_moment(&outcome.deltas) {
        session.defining_moments.push(DefiningMoment {
            anchor,
            delta,
            turn: session.total_turns,
        });
    }

    let turns_in_era = session.turns_in_era;
    let window_tick = window::advance(
        &mut session.window,
        turns_in_era,
        &deps.config.window,
        &mut || luck.chance(),
    );

    session.pending_choices = outcome.choices.clone();
    Ok(ResolvedTurn {
        outcome,
        milestones,
        roll,
        band,
        window_tick,
        items_used,
    })
}

/// Generate the closing narrative for a settled or surrendered ending.
/// Falls back to canned text rather than failing the termination.
pub fn resolve_ending(session: &Session, deps: &EngineDeps, kind: PromptKind) -> String {
    let rendered = match kind {
        PromptKind::EndingStay => session
            .era()
            .ok_or_else(|| anyhow::anyhow!("no era set"))
            .and_then(|era| deps.prompts.render_ending_stay(session, era)),
        PromptKind::EndingQuit => deps.prompts.render_ending_quit(session),
        PromptKind::Arrival | PromptKind::Turn => {
            return fallback_text(kind).to_string();
        }
    };
    match rendered {
        Ok(prompt) => narrate(deps, kind, prompt).narrative,
        Err(err) => {
            warn!(kind = ?kind, error = %err, "ending prompt render failed, using fallback");
            fallback_text(kind).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AnchorKind;
    use crate::test_support::{FixedLuck, ScriptedNarrator, session_in_gameplay};

    fn deps_with(narrator: Arc<dyn Narrator>) -> EngineDeps {
        EngineDeps::new(GameConfig::default(), narrator)
    }

    #[test]
    fn turn_applies_deltas_and_advances_counters() {
        let mut session = session_in_gameplay("classical_athens");
        let narrator = Arc::new(ScriptedNarrator::with_responses(vec![
            "You argue in the agora and are heard.\n\n\
             [A] Press the point\n[B] Withdraw\n[C] Listen\n\
             <anchors>belonging[+3] legacy[+2] freedom[0]</anchors>"
                .to_string(),
        ]));
        let deps = deps_with(narrator);
        let mut luck = FixedLuck::new(10, 0.99);

        let resolved = resolve_turn(&mut session, "Speak up", &deps, &mut luck).expect("turn");
        assert_eq!(session.total_turns, 1);
        assert_eq!(session.turns_in_era, 1);
        assert_eq!(session.anchors.get(AnchorKind::Belonging).value, 3);
        assert_eq!(session.anchors.get(AnchorKind::Legacy).value, 2);
        assert_eq!(resolved.outcome.choices.len(), 3);
        assert_eq!(session.pending_choices.len(), 3);
        assert_eq!(resolved.window_tick, WindowTick::Unchanged);
    }

    #[test]
    fn narrator_failure_falls_back_and_still_counts_the_turn() {
        let mut session = session_in_gameplay("viking_age");
        // Empty script: every generate call errors.
        let narrator = Arc::new(ScriptedNarrator::default());
        let deps = deps_with(narrator);
        let mut luck = FixedLuck::new(10, 0.99);

        let resolved = resolve_turn(&mut session, "Explore", &deps, &mut luck).expect("turn");
        assert_eq!(session.total_turns, 1);
        assert!(!resolved.outcome.narrative.is_empty());
        assert!(resolved.outcome.choices.len() >= 2, "fallback carries choices");
        assert!(resolved.outcome.deltas.is_zero(), "fallback moves no anchors");
    }

    #[test]
    fn malformed_response_without_choices_uses_fallback() {
        let mut session = session_in_gameplay("han_dynasty");
        let narrator = Arc::new(ScriptedNarrator::with_responses(vec![
            "Prose with no options at all.".to_string(),
        ]));
        let deps = deps_with(narrator);
        let mut luck = FixedLuck::new(10, 0.99);

        let resolved = resolve_turn(&mut session, "Wander", &deps, &mut luck).expect("turn");
        assert!(resolved.outcome.choices.len() >= 2);
    }

    #[test]
    fn big_swing_records_a_defining_moment() {
        let mut session = session_in_gameplay("aztec_empire");
        let narrator = Arc::new(ScriptedNarrator::with_responses(vec![
            "The priests take notice.\n\n\
             [A] Accept\n[B] Refuse\n[C] Flee\n\
             <anchors>belonging[0] legacy[+15] freedom[-2]</anchors>"
                .to_string(),
        ]));
        let deps = deps_with(narrator);
        let mut luck = FixedLuck::new(10, 0.99);

        resolve_turn(&mut session, "Teach the calendar", &deps, &mut luck).expect("turn");
        assert_eq!(session.defining_moments.len(), 1);
        assert_eq!(session.defining_moments[0].anchor, AnchorKind::Legacy);
        assert_eq!(session.defining_moments[0].delta, 15);
    }

    #[test]
    fn window_opens_at_threshold_with_a_friendly_chance_roll() {
        let mut session = session_in_gameplay("industrial_britain");
        session.turns_in_era = GameConfig::default().window.open_threshold - 1;
        let narrator = Arc::new(ScriptedNarrator::default());
        let deps = deps_with(narrator);
        let mut luck = FixedLuck::new(10, 0.0);

        let resolved = resolve_turn(&mut session, "Keep working", &deps, &mut luck).expect("turn");
        assert_eq!(resolved.window_tick, WindowTick::Opened);
        assert!(session.window.open);
    }
}
