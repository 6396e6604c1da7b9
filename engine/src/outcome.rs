//! Structured outcome extraction from narrator responses.
//!
//! The narrator is instructed to append hidden tags after the prose:
//! `<anchors>belonging[+X] legacy[+X] freedom[+X]</anchors>`, plus optional
//! `<character_name>`, `<key_npc>` and `<wisdom>` tags, and to offer choices
//! as `[A] text` lines. This module parses all of that and strips the tags so
//! the player only ever sees clean prose.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::anchor::AnchorDeltas;
use crate::core::types::{AnchorKind, Choice};

/// Absolute delta at or above which a turn counts as a defining moment.
const DEFINING_MOMENT_THRESHOLD: i32 = 12;

/// The structured result of one narrated turn. Created fresh each turn,
/// folded into session state, then discarded (the narrative text survives in
/// history).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    /// Prose with all hidden tags and choice lines removed.
    pub narrative: String,
    pub deltas: AnchorDeltas,
    /// 2-3 offered choices. Empty means the response was malformed and the
    /// caller should substitute the fallback outcome.
    pub choices: Vec<Choice>,
    pub character_name: Option<String>,
    pub key_npcs: Vec<String>,
    pub wisdom: Option<String>,
}

static ANCHORS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<anchors>\s*belonging\[([+-]?\d+)\]\s*legacy\[([+-]?\d+)\]\s*freedom\[([+-]?\d+)\]\s*</anchors>",
    )
    .expect("anchors tag regex should be valid")
});

static CHARACTER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<character_name>\s*([^<]+?)\s*</character_name>")
        .expect("character name regex should be valid")
});

static KEY_NPC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<key_npc>\s*([^<]+?)\s*</key_npc>").expect("key npc regex should be valid")
});

static WISDOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<wisdom>\s*([^<]+?)\s*</wisdom>").expect("wisdom regex should be valid")
});

static ANY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<anchors>.*?</anchors>|<character_name>.*?</character_name>|<key_npc>.*?</key_npc>|<wisdom>.*?</wisdom>",
    )
    .expect("tag strip regex should be valid")
});

static CHOICE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\[([A-C])\]\s*(.+)$").expect("choice line regex should be valid")
});

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("blank run regex should be valid"));

/// Parse a raw narrator response. Never fails: missing tags default to zero
/// deltas and absent metadata; callers judge malformedness by the choice set.
pub fn parse_outcome(raw: &str) -> TurnOutcome {
    let deltas = parse_deltas(raw);
    let character_name = CHARACTER_NAME_RE
        .captures(raw)
        .map(|caps| caps[1].trim().to_string());
    let key_npcs: Vec<String> = KEY_NPC_RE
        .captures_iter(raw)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    let wisdom = WISDOM_RE.captures(raw).map(|caps| caps[1].trim().to_string());

    let stripped = strip_tags(raw);
    let choices = parse_choices(&stripped);
    let narrative = strip_choice_lines(&stripped);

    TurnOutcome {
        narrative,
        deltas,
        choices,
        character_name,
        key_npcs,
        wisdom,
    }
}

fn parse_deltas(raw: &str) -> AnchorDeltas {
    let Some(caps) = ANCHORS_RE.captures(raw) else {
        return AnchorDeltas::default();
    };
    let field = |idx: usize| caps[idx].parse::<i32>().unwrap_or(0);
    AnchorDeltas {
        belonging: field(1),
        legacy: field(2),
        freedom: field(3),
    }
}

/// Remove every hidden tag and collapse the whitespace left behind.
pub fn strip_tags(raw: &str) -> String {
    let without_tags = ANY_TAG_RE.replace_all(raw, "");
    BLANK_RUN_RE.replace_all(&without_tags, "\n\n").trim().to_string()
}

/// Extract `[A] text` choice lines, bold markers tolerated, capped at three.
fn parse_choices(text: &str) -> Vec<Choice> {
    let unbolded = text.replace("**", "");
    let mut choices = Vec::new();
    for line in unbolded.lines() {
        let Some(caps) = CHOICE_LINE_RE.captures(line.trim()) else {
            continue;
        };
        let text = caps[2].trim().to_string();
        if text.len() > 3 {
            choices.push(Choice::new(caps[1].to_uppercase(), text));
        }
        if choices.len() == 3 {
            break;
        }
    }
    choices
}

fn strip_choice_lines(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !CHOICE_LINE_RE.is_match(line.trim().trim_start_matches("**")))
        .collect();
    kept.join("\n").trim().to_string()
}

/// The single largest anchor shift this turn, if it clears the defining
/// moment threshold.
pub fn defining_moment(deltas: &AnchorDeltas) -> Option<(AnchorKind, i32)> {
    let largest = AnchorKind::ORDER
        .into_iter()
        .map(|kind| (kind, deltas.get(kind)))
        .max_by_key(|(_, delta)| delta.abs())?;
    (largest.1.abs() >= DEFINING_MOMENT_THRESHOLD).then_some(largest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
The baker's daughter watches you work the dough the old way.

[A] Teach her the trick with the steam
[B] Keep the method to yourself
[C] Ask about activating the device later

<character_name>Thomas the Stranger</character_name>
<key_npc>Mirela</key_npc>
<wisdom>respected_guild_secrecy</wisdom>
<anchors>belonging[+8] legacy[+12] freedom[-3]</anchors>";

    #[test]
    fn parses_deltas_names_and_wisdom() {
        let outcome = parse_outcome(SAMPLE);
        assert_eq!(
            outcome.deltas,
            AnchorDeltas {
                belonging: 8,
                legacy: 12,
                freedom: -3
            }
        );
        assert_eq!(outcome.character_name.as_deref(), Some("Thomas the Stranger"));
        assert_eq!(outcome.key_npcs, vec!["Mirela".to_string()]);
        assert_eq!(outcome.wisdom.as_deref(), Some("respected_guild_secrecy"));
    }

    #[test]
    fn choices_are_extracted_and_removed_from_prose() {
        let outcome = parse_outcome(SAMPLE);
        assert_eq!(outcome.choices.len(), 3);
        assert_eq!(outcome.choices[0].id, "A");
        assert_eq!(outcome.choices[1].text, "Keep the method to yourself");
        assert!(!outcome.narrative.contains("[A]"));
        assert!(!outcome.narrative.contains("<anchors>"));
        assert!(outcome.narrative.contains("baker's daughter"));
    }

    #[test]
    fn bold_choice_markers_still_match() {
        let raw = "Something happens.\n\n**[A]** Go left\n**[B]** Go right\n";
        let outcome = parse_outcome(raw);
        assert_eq!(outcome.choices.len(), 2);
        assert_eq!(outcome.choices[0].text, "Go left");
    }

    #[test]
    fn missing_tags_default_to_zero_and_empty() {
        let outcome = parse_outcome("Just prose, nothing else.");
        assert!(outcome.deltas.is_zero());
        assert!(outcome.choices.is_empty());
        assert!(outcome.character_name.is_none());
        assert!(outcome.key_npcs.is_empty());
        assert!(outcome.wisdom.is_none());
        assert_eq!(outcome.narrative, "Just prose, nothing else.");
    }

    #[test]
    fn defining_moment_requires_threshold() {
        assert_eq!(
            defining_moment(&AnchorDeltas {
                belonging: 8,
                legacy: 12,
                freedom: -3
            }),
            Some((AnchorKind::Legacy, 12))
        );
        assert_eq!(
            defining_moment(&AnchorDeltas {
                belonging: 5,
                legacy: -11,
                freedom: 3
            }),
            None
        );
    }
}
