//! Script execution against the engine's synchronous surface.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use everwhen::config::{GameConfig, load_config};
use everwhen::session::{Session, handle_action};
use everwhen::test_support::{FirstEraPicker, ScriptedNarrator, SequenceLuck};
use everwhen::turn::EngineDeps;

use crate::script::Script;

/// Replay one script, printing each action's events as a JSON line and the
/// transcript digest at the end.
pub fn run_script(script_path: &Path, config_path: Option<&Path>, digest_only: bool) -> Result<()> {
    let script = Script::load(script_path)?;
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => GameConfig::default(),
    };
    let transcript = replay(&script, config)?;

    let mut hasher = Sha256::new();
    for line in &transcript {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hex::encode(hasher.finalize());

    if !digest_only {
        for line in &transcript {
            println!("{line}");
        }
    }
    println!("digest: {digest}");
    Ok(())
}

/// Run every action in order and return one JSON line per action.
fn replay(script: &Script, config: GameConfig) -> Result<Vec<String>> {
    let narrator = Arc::new(ScriptedNarrator::with_responses(script.narration.clone()));
    let deps = EngineDeps::new(config, narrator);
    let mut luck = SequenceLuck::new(script.dice.clone(), script.chance);
    let mut picker = FirstEraPicker;
    let mut session = Session::new("replay");

    let mut lines = Vec::with_capacity(script.actions.len());
    for (index, action) in script.actions.iter().enumerate() {
        let events = handle_action(&mut session, action, &deps, &mut luck, &mut picker);
        debug!(index, events = events.len(), "action replayed");
        let line = serde_json::to_string(&json!({
            "index": index,
            "action": action,
            "events": events,
        }))
        .context("serialize transcript line")?;
        lines.push(line);
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::EXAMPLE;

    fn example() -> Script {
        toml::from_str(EXAMPLE).expect("parse example")
    }

    #[test]
    fn replaying_the_same_script_is_deterministic() {
        let first = replay(&example(), GameConfig::default()).expect("replay");
        let second = replay(&example(), GameConfig::default()).expect("replay");
        assert_eq!(first, second);
    }

    #[test]
    fn transcript_has_one_line_per_action() {
        let script = example();
        let lines = replay(&script, GameConfig::default()).expect("replay");
        assert_eq!(lines.len(), script.actions.len());
        // The quit at the end produces a final score.
        let last: serde_json::Value =
            serde_json::from_str(lines.last().expect("line")).expect("json");
        let kinds: Vec<&str> = last["events"]
            .as_array()
            .expect("events")
            .iter()
            .filter_map(|e| e["type"].as_str())
            .collect();
        assert!(kinds.contains(&"final_score"));
        assert!(kinds.contains(&"game_end"));
    }

    #[test]
    fn scripted_narration_overrides_the_fallback() {
        let mut script = example();
        script.narration = vec![
            "A scripted arrival.\n\n[A] One\n[B] Two\n[C] Three\n\
             <anchors>belonging[+1] legacy[0] freedom[0]</anchors>"
                .to_string(),
        ];
        let lines = replay(&script, GameConfig::default()).expect("replay");
        let arrival: serde_json::Value =
            serde_json::from_str(&lines[4]).expect("json");
        let narrative = arrival["events"]
            .as_array()
            .expect("events")
            .iter()
            .find(|e| e["type"] == "narrative")
            .expect("narrative event");
        assert!(
            narrative["text"]
                .as_str()
                .expect("text")
                .contains("A scripted arrival")
        );
    }
}
