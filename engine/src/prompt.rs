//! Prompt construction for the narrative generator.
//!
//! Templates are embedded at compile time and rendered with minijinja. The
//! engine only ever sees qualitative anchor state (levels and trends), never
//! raw values, mirroring what the player is allowed to know.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::anchor::AnchorSet;
use crate::core::types::{AnchorKind, LuckBand};
use crate::core::window::WindowState;
use crate::eras::{Era, year_display};
use crate::session::Session;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const ARRIVAL_TEMPLATE: &str = include_str!("prompts/arrival.md");
const TURN_TEMPLATE: &str = include_str!("prompts/turn.md");
const ENDING_STAY_TEMPLATE: &str = include_str!("prompts/ending_stay.md");
const ENDING_QUIT_TEMPLATE: &str = include_str!("prompts/ending_quit.md");

/// Era fields exposed to templates.
#[derive(Debug, Clone, Serialize)]
struct EraContext {
    name: String,
    year_display: String,
    location: String,
    flavor: String,
    key_events: Vec<String>,
}

impl EraContext {
    fn from_era(era: &Era) -> Self {
        Self {
            name: era.name.to_string(),
            year_display: year_display(era.year),
            location: era.location.to_string(),
            flavor: era.flavor.to_string(),
            key_events: era.key_events.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

/// Qualitative anchor state for templates: level, trend, stay-eligibility.
#[derive(Debug, Clone, Serialize)]
struct AnchorContext {
    name: &'static str,
    level: &'static str,
    trend: String,
}

fn anchor_contexts(anchors: &AnchorSet) -> Vec<AnchorContext> {
    AnchorKind::ORDER
        .into_iter()
        .map(|kind| {
            let anchor = anchors.get(kind);
            AnchorContext {
                name: kind.as_str(),
                level: anchor.level().as_str(),
                trend: format!("{:?}", anchor.trend()).to_lowercase(),
            }
        })
        .collect()
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .expect("system template should be valid");
        env.add_template("arrival", ARRIVAL_TEMPLATE)
            .expect("arrival template should be valid");
        env.add_template("turn", TURN_TEMPLATE)
            .expect("turn template should be valid");
        env.add_template("ending_stay", ENDING_STAY_TEMPLATE)
            .expect("ending stay template should be valid");
        env.add_template("ending_quit", ENDING_QUIT_TEMPLATE)
            .expect("ending quit template should be valid");
        Self { env }
    }

    /// Standing instructions prepended to every request.
    pub fn render_system(&self, session: &Session) -> Result<String> {
        let template = self.env.get_template("system")?;
        let rendered = template.render(context! {
            player_name => session.player_name.as_deref().unwrap_or("the traveler"),
        })?;
        Ok(rendered)
    }

    pub fn render_arrival(&self, session: &Session, era: &Era) -> Result<String> {
        let template = self.env.get_template("arrival")?;
        let items: Vec<String> = session
            .inventory
            .items()
            .iter()
            .map(|item| item.name.clone())
            .collect();
        let rendered = template.render(context! {
            era => EraContext::from_era(era),
            player_name => session.player_name.as_deref().unwrap_or("the traveler"),
            first_era => session.visited.is_empty(),
            items => items,
        })?;
        Ok(rendered)
    }

    pub fn render_turn(
        &self,
        session: &Session,
        era: &Era,
        choice_text: &str,
        roll: u8,
        band: LuckBand,
        history_tail: &[String],
    ) -> Result<String> {
        let template = self.env.get_template("turn")?;
        let rendered = template.render(context! {
            era => EraContext::from_era(era),
            choice => choice_text,
            roll => roll,
            luck => band.prompt_text(),
            anchors => anchor_contexts(&session.anchors),
            can_stay => session.anchors.can_stay(),
            window_open => session.window.open,
            window_status => window_status(&session.window),
            history => history_tail,
            turns_in_era => session.turns_in_era,
        })?;
        Ok(rendered)
    }

    pub fn render_ending_stay(&self, session: &Session, era: &Era) -> Result<String> {
        let template = self.env.get_template("ending_stay")?;
        let arrived: Vec<&'static str> = session
            .anchors
            .arrived()
            .into_iter()
            .map(AnchorKind::as_str)
            .collect();
        let rendered = template.render(context! {
            era => EraContext::from_era(era),
            character_name => session.character_name.as_deref(),
            player_name => session.player_name.as_deref().unwrap_or("the traveler"),
            arrived => arrived,
            dominant => session.anchors.dominant().map(AnchorKind::as_str),
            key_npcs => &session.key_npcs,
            wisdom => &session.wisdom_moments,
        })?;
        Ok(rendered)
    }

    pub fn render_ending_quit(&self, session: &Session) -> Result<String> {
        let template = self.env.get_template("ending_quit")?;
        let visited: Vec<String> = session.visited.iter().map(|v| v.name.clone()).collect();
        let rendered = template.render(context! {
            player_name => session.player_name.as_deref().unwrap_or("the traveler"),
            visited => visited,
            total_turns => session.total_turns,
        })?;
        Ok(rendered)
    }
}

fn window_status(window: &WindowState) -> Option<String> {
    if window.open {
        Some(format!(
            "The travel window is OPEN ({} turns remain). Time compresses: turns are days, not weeks.",
            window.turns_remaining
        ))
    } else {
        None
    }
}
