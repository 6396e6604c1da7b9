//! Fulfillment anchor tracking: values, levels, trends and milestones.
//!
//! Anchors are never shown to the player as numbers. The narrator reports
//! deltas through hidden tags; this module folds them into bounded values and
//! derives the qualitative state (level, trend, journey phase) that the rest
//! of the engine is allowed to see.

use serde::{Deserialize, Serialize};

use crate::core::types::{AnchorKind, AnchorLevel, Ending, JourneyPhase, Trend};

/// Upper bound for anchor values. Deltas are clamped, never rejected.
pub const MAX_VALUE: u32 = 100;

/// How many recent values each anchor retains for trend computation.
const HISTORY_WINDOW: usize = 4;

/// A single hidden progress measure with its rolling history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub value: u32,
    /// Rolling window of recent values, oldest first. Never empty.
    history: Vec<u32>,
    /// Last level reported through a milestone, cached to detect crossings.
    last_level: AnchorLevel,
}

impl Anchor {
    pub fn new(kind: AnchorKind) -> Self {
        Self {
            kind,
            value: 0,
            history: vec![0],
            last_level: AnchorLevel::None,
        }
    }

    pub fn level(&self) -> AnchorLevel {
        AnchorLevel::from_value(self.value)
    }

    /// Trend over the retained history window: current value against the
    /// oldest retained value. A tie is stable, so a zero-delta turn can
    /// never flip the trend.
    pub fn trend(&self) -> Trend {
        let oldest = self.history.first().copied().unwrap_or(self.value);
        match self.value.cmp(&oldest) {
            std::cmp::Ordering::Greater => Trend::Rising,
            std::cmp::Ordering::Equal => Trend::Stable,
            std::cmp::Ordering::Less => Trend::Falling,
        }
    }

    /// Apply a clamped delta and push the new value into the rolling history.
    /// Returns the delta actually applied after clamping.
    pub fn apply_delta(&mut self, delta: i32) -> i32 {
        let old = i64::from(self.value);
        let new = (old + i64::from(delta)).clamp(0, i64::from(MAX_VALUE)) as u32;
        self.value = new;
        self.push_history(new);
        (i64::from(new) - old) as i32
    }

    fn push_history(&mut self, value: u32) {
        self.history.push(value);
        if self.history.len() > HISTORY_WINDOW {
            self.history.remove(0);
        }
    }

    /// Emit a milestone if the level moved since the last check, then update
    /// the cache. At most one milestone per call, regardless of how many
    /// bands the value jumped.
    pub fn take_milestone(&mut self) -> Option<Milestone> {
        let level = self.level();
        if level == self.last_level {
            return None;
        }
        let milestone = Milestone {
            anchor: self.kind,
            old_level: self.last_level,
            new_level: level,
            message: milestone_message(self.kind, level),
        };
        self.last_level = level;
        Some(milestone)
    }

    /// Era transitions keep only a fraction of what was built. The history
    /// and level cache re-seed from the decayed value, so decay itself never
    /// produces a milestone or a trend.
    fn decay(&mut self, retention: f64) {
        self.value = (f64::from(self.value) * retention.clamp(0.0, 1.0)) as u32;
        self.history.clear();
        self.history.push(self.value);
        self.last_level = self.level();
    }
}

/// Signed per-anchor adjustments parsed from one narrator response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorDeltas {
    pub belonging: i32,
    pub legacy: i32,
    pub freedom: i32,
}

impl AnchorDeltas {
    pub fn get(&self, kind: AnchorKind) -> i32 {
        match kind {
            AnchorKind::Belonging => self.belonging,
            AnchorKind::Legacy => self.legacy,
            AnchorKind::Freedom => self.freedom,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.belonging == 0 && self.legacy == 0 && self.freedom == 0
    }
}

/// A detected level crossing on a single anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub anchor: AnchorKind,
    pub old_level: AnchorLevel,
    pub new_level: AnchorLevel,
    pub message: &'static str,
}

/// Per-anchor survival rates applied when the player departs for a new era.
/// Belonging resets hardest (you lose your people); freedom travels best.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionRates {
    pub belonging: f64,
    pub legacy: f64,
    pub freedom: f64,
}

impl Default for RetentionRates {
    fn default() -> Self {
        Self {
            belonging: 0.2,
            legacy: 0.5,
            freedom: 0.6,
        }
    }
}

impl RetentionRates {
    pub fn get(&self, kind: AnchorKind) -> f64 {
        match kind {
            AnchorKind::Belonging => self.belonging,
            AnchorKind::Legacy => self.legacy,
            AnchorKind::Freedom => self.freedom,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for kind in AnchorKind::ORDER {
            let rate = self.get(kind);
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!(
                    "retention rate for {} must be within 0..=1, got {rate}",
                    kind.as_str()
                ));
            }
        }
        Ok(())
    }
}

/// All three anchors for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorSet {
    belonging: Anchor,
    legacy: Anchor,
    freedom: Anchor,
}

impl Default for AnchorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl AnchorSet {
    pub fn new() -> Self {
        Self {
            belonging: Anchor::new(AnchorKind::Belonging),
            legacy: Anchor::new(AnchorKind::Legacy),
            freedom: Anchor::new(AnchorKind::Freedom),
        }
    }

    pub fn get(&self, kind: AnchorKind) -> &Anchor {
        match kind {
            AnchorKind::Belonging => &self.belonging,
            AnchorKind::Legacy => &self.legacy,
            AnchorKind::Freedom => &self.freedom,
        }
    }

    fn get_mut(&mut self, kind: AnchorKind) -> &mut Anchor {
        match kind {
            AnchorKind::Belonging => &mut self.belonging,
            AnchorKind::Legacy => &mut self.legacy,
            AnchorKind::Freedom => &mut self.freedom,
        }
    }

    /// Apply one turn's deltas to all anchors, then collect milestone
    /// crossings in the fixed [`AnchorKind::ORDER`].
    pub fn apply(&mut self, deltas: &AnchorDeltas) -> Vec<Milestone> {
        for kind in AnchorKind::ORDER {
            self.get_mut(kind).apply_delta(deltas.get(kind));
        }
        AnchorKind::ORDER
            .into_iter()
            .filter_map(|kind| self.get_mut(kind).take_milestone())
            .collect()
    }

    /// Staying forever is meaningful once any anchor has arrived.
    pub fn can_stay(&self) -> bool {
        AnchorKind::ORDER
            .into_iter()
            .any(|kind| self.get(kind).level() >= AnchorLevel::Arrived)
    }

    pub fn arrived(&self) -> Vec<AnchorKind> {
        AnchorKind::ORDER
            .into_iter()
            .filter(|&kind| self.get(kind).level() >= AnchorLevel::Arrived)
            .collect()
    }

    /// The anchor with the strictly highest value. Ties resolve to `None`
    /// rather than an arbitrary pick.
    pub fn dominant(&self) -> Option<AnchorKind> {
        let max = AnchorKind::ORDER
            .into_iter()
            .map(|kind| self.get(kind).value)
            .max()?;
        if max == 0 {
            return None;
        }
        let mut leaders = AnchorKind::ORDER
            .into_iter()
            .filter(|&kind| self.get(kind).value == max);
        let first = leaders.next()?;
        if leaders.next().is_some() {
            None
        } else {
            Some(first)
        }
    }

    /// Coarse journey summary from the count of anchors at or above the
    /// strong/growing bands, so it reflects overall rather than single-track
    /// progress.
    pub fn journey_phase(&self) -> JourneyPhase {
        if self.can_stay() {
            return JourneyPhase::Home;
        }
        let at_least = |floor: AnchorLevel| {
            AnchorKind::ORDER
                .into_iter()
                .filter(|&kind| self.get(kind).level() >= floor)
                .count()
        };
        if at_least(AnchorLevel::Strong) >= 2 {
            JourneyPhase::ApproachingHome
        } else if at_least(AnchorLevel::Strong) == 1 || at_least(AnchorLevel::Growing) >= 2 {
            JourneyPhase::BuildingRoots
        } else if at_least(AnchorLevel::Emerging) >= 1 {
            JourneyPhase::FindingFooting
        } else {
            JourneyPhase::Wandering
        }
    }

    /// Ending classification when the player settles.
    pub fn settled_ending(&self) -> Ending {
        let arrived = self.arrived();
        match arrived.len() {
            3 => Ending::Complete,
            2 => Ending::Balanced,
            1 => match arrived[0] {
                AnchorKind::Belonging => Ending::Belonging,
                AnchorKind::Legacy => Ending::Legacy,
                AnchorKind::Freedom => Ending::Freedom,
            },
            _ => Ending::Searching,
        }
    }

    /// Decay all anchors for a departure. Silent: emits no milestones.
    pub fn era_transition(&mut self, retention: &RetentionRates) {
        for kind in AnchorKind::ORDER {
            let rate = retention.get(kind);
            self.get_mut(kind).decay(rate);
        }
    }

    pub fn total_value(&self) -> u32 {
        AnchorKind::ORDER
            .into_iter()
            .map(|kind| self.get(kind).value)
            .sum()
    }

    /// Player-facing snapshot: levels and trends only, never raw numbers.
    pub fn progress(&self) -> JourneyProgress {
        let snap = |kind: AnchorKind| AnchorProgress {
            level: self.get(kind).level(),
            trend: self.get(kind).trend(),
        };
        JourneyProgress {
            belonging: snap(AnchorKind::Belonging),
            legacy: snap(AnchorKind::Legacy),
            freedom: snap(AnchorKind::Freedom),
            dominant: self.dominant(),
            journey_phase: self.journey_phase(),
            can_stay: self.can_stay(),
            arrived: self.arrived(),
        }
    }
}

/// Level and trend for a single anchor, safe to show the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnchorProgress {
    pub level: AnchorLevel,
    pub trend: Trend,
}

/// Qualitative progress snapshot emitted with each `journey_progress` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyProgress {
    pub belonging: AnchorProgress,
    pub legacy: AnchorProgress,
    pub freedom: AnchorProgress,
    pub dominant: Option<AnchorKind>,
    pub journey_phase: JourneyPhase,
    pub can_stay: bool,
    pub arrived: Vec<AnchorKind>,
}

/// Narrative hint shown when an anchor reaches a new band. Worded to suggest
/// progress without breaking immersion.
fn milestone_message(anchor: AnchorKind, level: AnchorLevel) -> &'static str {
    match (anchor, level) {
        (AnchorKind::Belonging, AnchorLevel::Emerging) => {
            "You sense the first threads of connection forming."
        }
        (AnchorKind::Belonging, AnchorLevel::Growing) => {
            "Familiar faces greet you now. This place knows you."
        }
        (AnchorKind::Belonging, AnchorLevel::Strong) => {
            "You matter to people here. They would miss you."
        }
        (AnchorKind::Belonging, AnchorLevel::Arrived) => {
            "This could be home. These could be your people."
        }
        (AnchorKind::Belonging, AnchorLevel::Mastery) => {
            "You belong here, completely and without doubt."
        }
        (AnchorKind::Legacy, AnchorLevel::Emerging) => {
            "Your actions are beginning to ripple outward."
        }
        (AnchorKind::Legacy, AnchorLevel::Growing) => {
            "What you've started here will outlast this moment."
        }
        (AnchorKind::Legacy, AnchorLevel::Strong) => {
            "Your mark on this place is becoming permanent."
        }
        (AnchorKind::Legacy, AnchorLevel::Arrived) => "You've built something that will endure.",
        (AnchorKind::Legacy, AnchorLevel::Mastery) => "Your legacy here is complete and lasting.",
        (AnchorKind::Freedom, AnchorLevel::Emerging) => {
            "You're learning to move through this world unbound."
        }
        (AnchorKind::Freedom, AnchorLevel::Growing) => {
            "The constraints of this era cannot hold you."
        }
        (AnchorKind::Freedom, AnchorLevel::Strong) => {
            "You've carved out true independence here."
        }
        (AnchorKind::Freedom, AnchorLevel::Arrived) => "You are free here, on your own terms.",
        (AnchorKind::Freedom, AnchorLevel::Mastery) => "Complete freedom is yours in this time.",
        (_, AnchorLevel::None) => "Something has shifted.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_are_clamped_into_range() {
        let mut anchor = Anchor::new(AnchorKind::Belonging);
        assert_eq!(anchor.apply_delta(150), 100);
        assert_eq!(anchor.value, MAX_VALUE);
        assert_eq!(anchor.apply_delta(-300), -100);
        assert_eq!(anchor.value, 0);
    }

    #[test]
    fn zero_delta_changes_neither_level_nor_trend() {
        let mut anchor = Anchor::new(AnchorKind::Legacy);
        anchor.apply_delta(45);
        let _ = anchor.take_milestone();
        let level = anchor.level();

        // Flush the history window with no-op turns.
        for _ in 0..5 {
            anchor.apply_delta(0);
        }
        assert_eq!(anchor.level(), level);
        assert_eq!(anchor.trend(), Trend::Stable);
        assert!(anchor.take_milestone().is_none());
    }

    #[test]
    fn trend_compares_against_oldest_retained_value() {
        let mut anchor = Anchor::new(AnchorKind::Freedom);
        anchor.apply_delta(10);
        assert_eq!(anchor.trend(), Trend::Rising);
        anchor.apply_delta(-4);
        // Still above the 0 at the window's start.
        assert_eq!(anchor.trend(), Trend::Rising);
        anchor.apply_delta(-4);
        anchor.apply_delta(-4);
        // Oldest retained value is now 10; current is below it.
        assert_eq!(anchor.trend(), Trend::Falling);
    }

    #[test]
    fn milestone_fires_once_per_transition() {
        let mut anchor = Anchor::new(AnchorKind::Belonging);
        anchor.apply_delta(25);
        let first = anchor.take_milestone().expect("crossing into emerging");
        assert_eq!(first.old_level, AnchorLevel::None);
        assert_eq!(first.new_level, AnchorLevel::Emerging);
        assert!(anchor.take_milestone().is_none(), "no repeat without change");

        anchor.apply_delta(-10);
        let down = anchor.take_milestone().expect("crossing back down");
        assert_eq!(down.new_level, AnchorLevel::None);
    }

    #[test]
    fn apply_emits_milestones_in_fixed_anchor_order() {
        let mut set = AnchorSet::new();
        let milestones = set.apply(&AnchorDeltas {
            belonging: 25,
            legacy: 45,
            freedom: 65,
        });
        let kinds: Vec<AnchorKind> = milestones.iter().map(|m| m.anchor).collect();
        assert_eq!(
            kinds,
            vec![AnchorKind::Belonging, AnchorKind::Legacy, AnchorKind::Freedom]
        );
    }

    #[test]
    fn eighty_point_jump_arrives_with_single_milestone() {
        let mut set = AnchorSet::new();
        let milestones = set.apply(&AnchorDeltas {
            belonging: 80,
            legacy: 0,
            freedom: 0,
        });
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].anchor, AnchorKind::Belonging);
        assert_eq!(milestones[0].new_level, AnchorLevel::Arrived);
        assert!(set.can_stay());
        assert_eq!(
            set.get(AnchorKind::Belonging).level(),
            AnchorLevel::Arrived
        );
    }

    #[test]
    fn can_stay_requires_arrived_or_mastery() {
        let mut set = AnchorSet::new();
        set.apply(&AnchorDeltas {
            belonging: 79,
            legacy: 79,
            freedom: 79,
        });
        assert!(!set.can_stay());
        set.apply(&AnchorDeltas {
            belonging: 0,
            legacy: 0,
            freedom: 1,
        });
        assert!(set.can_stay());
    }

    #[test]
    fn dominant_ties_resolve_to_none() {
        let mut set = AnchorSet::new();
        assert_eq!(set.dominant(), None, "all-zero set has no dominant anchor");
        set.apply(&AnchorDeltas {
            belonging: 30,
            legacy: 30,
            freedom: 10,
        });
        assert_eq!(set.dominant(), None);
        set.apply(&AnchorDeltas {
            belonging: 5,
            legacy: 0,
            freedom: 0,
        });
        assert_eq!(set.dominant(), Some(AnchorKind::Belonging));
    }

    #[test]
    fn journey_phase_tracks_anchor_counts() {
        let mut set = AnchorSet::new();
        assert_eq!(set.journey_phase(), JourneyPhase::Wandering);

        set.apply(&AnchorDeltas {
            belonging: 25,
            legacy: 0,
            freedom: 0,
        });
        assert_eq!(set.journey_phase(), JourneyPhase::FindingFooting);

        set.apply(&AnchorDeltas {
            belonging: 20,
            legacy: 45,
            freedom: 0,
        });
        assert_eq!(set.journey_phase(), JourneyPhase::BuildingRoots);

        set.apply(&AnchorDeltas {
            belonging: 20,
            legacy: 20,
            freedom: 0,
        });
        assert_eq!(set.journey_phase(), JourneyPhase::ApproachingHome);

        set.apply(&AnchorDeltas {
            belonging: 20,
            legacy: 0,
            freedom: 0,
        });
        assert_eq!(set.journey_phase(), JourneyPhase::Home);
    }

    #[test]
    fn era_transition_decays_silently() {
        let mut set = AnchorSet::new();
        set.apply(&AnchorDeltas {
            belonging: 80,
            legacy: 60,
            freedom: 50,
        });
        set.era_transition(&RetentionRates::default());

        assert_eq!(set.get(AnchorKind::Belonging).value, 16);
        assert_eq!(set.get(AnchorKind::Legacy).value, 30);
        assert_eq!(set.get(AnchorKind::Freedom).value, 30);

        // Decay re-seeds both history and the milestone cache.
        for kind in AnchorKind::ORDER {
            assert_eq!(set.get(kind).trend(), Trend::Stable);
        }
        let followup = set.apply(&AnchorDeltas::default());
        assert!(followup.is_empty(), "decay must not emit milestones");
    }

    #[test]
    fn settled_ending_matches_arrived_count() {
        let mut set = AnchorSet::new();
        assert_eq!(set.settled_ending(), Ending::Searching);
        set.apply(&AnchorDeltas {
            belonging: 0,
            legacy: 85,
            freedom: 0,
        });
        assert_eq!(set.settled_ending(), Ending::Legacy);
        set.apply(&AnchorDeltas {
            belonging: 85,
            legacy: 0,
            freedom: 0,
        });
        assert_eq!(set.settled_ending(), Ending::Balanced);
        set.apply(&AnchorDeltas {
            belonging: 0,
            legacy: 0,
            freedom: 85,
        });
        assert_eq!(set.settled_ending(), Ending::Complete);
    }
}
