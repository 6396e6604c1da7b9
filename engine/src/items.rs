//! The three modern items the player carries between eras.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A carried artifact. Consumables track remaining uses; durable items only
/// count how often they appeared in the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    /// `None` for durable items.
    pub uses: Option<u32>,
    pub times_used: u32,
    /// Whether the item has been shown to anyone in the current era.
    pub revealed: bool,
}

impl Item {
    pub fn uses_remaining(&self) -> Option<u32> {
        self.uses.map(|total| total.saturating_sub(self.times_used))
    }

    pub fn is_depleted(&self) -> bool {
        self.uses_remaining() == Some(0)
    }

    /// Record one use. Returns false if the item is already depleted.
    pub fn record_use(&mut self) -> bool {
        if self.is_depleted() {
            return false;
        }
        self.times_used += 1;
        self.revealed = true;
        true
    }
}

/// The player's fixed starting inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::starting()
    }
}

impl Inventory {
    pub fn starting() -> Self {
        let item = |id: &str, name: &str, description: &str, uses: Option<u32>| Item {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            uses,
            times_used: 0,
            revealed: false,
        };
        Self {
            items: vec![
                item(
                    "ibuprofen",
                    "Bottle of Ibuprofen",
                    "100 tablets of 200mg ibuprofen",
                    Some(100),
                ),
                item(
                    "knife",
                    "Swiss Army Knife",
                    "Compact folding knife with multiple tools",
                    None,
                ),
                item(
                    "phone_kit",
                    "Smartphone + Solar Charger",
                    "Modern smartphone with offline Wikipedia and solar charger",
                    None,
                ),
            ],
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn record_use(&mut self, id: &str) -> bool {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .is_some_and(Item::record_use)
    }

    /// New era: every item goes back into hiding.
    pub fn reset_for_new_era(&mut self) {
        for item in &mut self.items {
            item.revealed = false;
        }
    }

    /// Ids of items that ever appeared in the story.
    pub fn used_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.times_used > 0)
            .map(|item| item.id.clone())
            .collect()
    }
}

static USE_INDICATORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(use[ds]?|using|took out|take out|pulls? out|show(?:ed|ing|s)?|g[ai]ve|giving|consult(?:ed)?|check(?:ed)?|swallow|took|administer|cut(?:ting|s)?|light|lit|shine|shining)\b",
    )
    .expect("use indicator regex should be valid")
});

/// Detect item usage in a narrative. Heuristic: a recognizable part of the
/// item name within a short distance of a use verb.
pub fn parse_item_usage(narrative: &str, inventory: &Inventory) -> Vec<String> {
    let lower = narrative.to_lowercase();
    let mut used = Vec::new();
    for item in inventory.items() {
        if item.is_depleted() {
            continue;
        }
        let mentioned = item
            .name
            .to_lowercase()
            .split_whitespace()
            .filter(|part| part.len() >= 4)
            .any(|part| near_use_verb(&lower, part));
        if mentioned {
            used.push(item.id.clone());
        }
    }
    used
}

/// True if `token` appears within roughly one clause of a use verb.
fn near_use_verb(lower: &str, token: &str) -> bool {
    for m in USE_INDICATORS.find_iter(lower) {
        let window_start = m.start().saturating_sub(50);
        let window_end = (m.end() + 50).min(lower.len());
        if lower[window_start..window_end].contains(token) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumables_deplete_and_refuse_further_use() {
        let mut inv = Inventory::starting();
        for _ in 0..100 {
            assert!(inv.record_use("ibuprofen"));
        }
        assert!(!inv.record_use("ibuprofen"), "bottle is empty");
        let pills = inv.items().iter().find(|i| i.id == "ibuprofen").expect("item");
        assert!(pills.is_depleted());
        assert_eq!(pills.uses_remaining(), Some(0));
    }

    #[test]
    fn durable_items_never_deplete() {
        let mut inv = Inventory::starting();
        for _ in 0..500 {
            assert!(inv.record_use("knife"));
        }
        let knife = inv.items().iter().find(|i| i.id == "knife").expect("item");
        assert_eq!(knife.uses_remaining(), None);
        assert!(!knife.is_depleted());
    }

    #[test]
    fn era_reset_hides_items_again() {
        let mut inv = Inventory::starting();
        inv.record_use("phone_kit");
        assert!(inv.items().iter().any(|i| i.revealed));
        inv.reset_for_new_era();
        assert!(inv.items().iter().all(|i| !i.revealed));
        assert_eq!(inv.used_ids(), vec!["phone_kit".to_string()]);
    }

    #[test]
    fn usage_detection_needs_a_verb_near_the_name() {
        let inv = Inventory::starting();
        let used = parse_item_usage(
            "You quietly consult the smartphone under your cloak, checking the harvest dates.",
            &inv,
        );
        assert_eq!(used, vec!["phone_kit".to_string()]);

        let unused = parse_item_usage("The smith admires good knives in general.", &inv);
        assert!(unused.is_empty());
    }
}
