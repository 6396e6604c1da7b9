//! Replay script format (TOML).
//!
//! A script pins every source of nondeterminism: the dice sequence, the
//! window chance, the narrator's responses, and the action stream. Replaying
//! the same script always yields the same transcript.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use everwhen::session::Action;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Fortune rolls consumed in order; the last one repeats when exhausted.
    #[serde(default)]
    pub dice: Vec<u8>,
    /// Fixed window chance in `[0, 1)`. 0.0 opens the window at the first
    /// eligible turn; 0.99 defers it to the forced cap.
    #[serde(default)]
    pub chance: f64,
    /// Scripted narrator responses, consumed in order. Once exhausted the
    /// engine falls back to canned text.
    #[serde(default)]
    pub narration: Vec<String>,
    pub actions: Vec<Action>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let script: Script =
            toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            bail!("script has no actions");
        }
        if !(0.0..1.0).contains(&self.chance) {
            bail!("chance must lie within 0..1, got {}", self.chance);
        }
        if let Some(roll) = self.dice.iter().copied().find(|r| !(1..=20).contains(r)) {
            bail!("dice rolls must lie within 1..=20, got {roll}");
        }
        Ok(())
    }
}

pub const EXAMPLE: &str = r#"# Replay script: setup, three turns, quit.
dice = [10, 14, 3]
chance = 0.99

narration = []

[[actions]]
type = "init"

[[actions]]
type = "new_game"

[[actions]]
type = "set_name"
name = "Ada"

[[actions]]
type = "set_region"
region = "worldwide"

[[actions]]
type = "enter_first_era"

[[actions]]
type = "choose"
choice_id = "A"

[[actions]]
type = "choose"
choice_id = "B"

[[actions]]
type = "choose"
choice_id = "Q"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_script_parses() {
        let script: Script = toml::from_str(EXAMPLE).expect("parse");
        script.validate().expect("validate");
        assert_eq!(script.actions.len(), 8);
        assert_eq!(script.dice, vec![10, 14, 3]);
    }

    #[test]
    fn out_of_range_dice_are_rejected() {
        let script = Script {
            dice: vec![0],
            chance: 0.5,
            narration: Vec::new(),
            actions: vec![Action::NewGame],
        };
        assert!(script.validate().is_err());
    }
}
