//! Time machine window policy: when the exit opportunity opens, how long it
//! stays open, and what the device shows the player.
//!
//! All randomness enters through the caller-supplied chance closure, so the
//! policy is fully deterministic under test.

use serde::{Deserialize, Serialize};

/// Tunable window timing. Exposed as configuration rather than hard-coded;
/// `max_wait` guarantees a deterministic cap so no era is inescapable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowTuning {
    /// Turns that must pass in an era before the window may open.
    pub open_threshold: u32,
    /// Open probability at `open_threshold`, then one entry per extra turn
    /// waited. Turns beyond the table fall through to `max_wait`.
    pub open_probabilities: Vec<f64>,
    /// Turns-in-era at which the window opens unconditionally.
    pub max_wait: u32,
    /// Turns the window stays open before force-closing.
    pub duration: u32,
}

impl Default for WindowTuning {
    fn default() -> Self {
        Self {
            open_threshold: 7,
            open_probabilities: vec![0.30, 0.50, 0.75],
            max_wait: 10,
            duration: 3,
        }
    }
}

impl WindowTuning {
    pub fn validate(&self) -> Result<(), String> {
        if self.open_threshold == 0 {
            return Err("window open_threshold must be > 0".to_string());
        }
        if self.max_wait < self.open_threshold {
            return Err("window max_wait must be >= open_threshold".to_string());
        }
        if self.duration == 0 {
            return Err("window duration must be > 0".to_string());
        }
        if self
            .open_probabilities
            .iter()
            .any(|p| !(0.0..=1.0).contains(p))
        {
            return Err("window open_probabilities must lie within 0..=1".to_string());
        }
        Ok(())
    }
}

/// Per-era window state. Reset to closed on every era entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    pub open: bool,
    /// Turns left before forced closure. Zero while closed.
    pub turns_remaining: u32,
    /// Whether the opportunity already came and went this era.
    pub used: bool,
}

impl WindowState {
    pub fn closed() -> Self {
        Self {
            open: false,
            turns_remaining: 0,
            used: false,
        }
    }
}

impl Default for WindowState {
    fn default() -> Self {
        Self::closed()
    }
}

/// What the window did on this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTick {
    Unchanged,
    Opened,
    /// Still open, last turn before forced closure.
    Closing,
    /// Closed without a decision; the caller must depart the era.
    ForcedClosed,
}

/// The sole gate for offering departure and stay-forever choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowDecisionKind {
    NotOpen,
    OpenCanLeaveOnly,
    OpenCanStay,
}

/// Operational state of the device itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Dormant,
    Warming,
    Active,
    Cooldown,
}

/// What the player sees on the device indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorState {
    Dark,
    FaintPulse,
    SteadyGlow,
    BrightPulse,
}

/// Open probability for a given turns-in-era count. 1.0 at or past `max_wait`.
pub fn open_probability(turns_in_era: u32, tuning: &WindowTuning) -> f64 {
    if turns_in_era >= tuning.max_wait {
        return 1.0;
    }
    if turns_in_era < tuning.open_threshold {
        return 0.0;
    }
    let offset = (turns_in_era - tuning.open_threshold) as usize;
    tuning
        .open_probabilities
        .get(offset)
        .copied()
        .unwrap_or(1.0)
}

/// Advance the window by one resolved turn.
///
/// `chance` supplies a uniform value in `[0, 1)`; the window opens when the
/// drawn value falls below the scheduled probability. Once open, the window
/// counts down and force-closes after its configured duration. A window that
/// closed unused does not reopen in the same era.
pub fn advance(
    state: &mut WindowState,
    turns_in_era: u32,
    tuning: &WindowTuning,
    chance: &mut dyn FnMut() -> f64,
) -> WindowTick {
    if state.open {
        state.turns_remaining = state.turns_remaining.saturating_sub(1);
        if state.turns_remaining == 0 {
            state.open = false;
            state.used = true;
            return WindowTick::ForcedClosed;
        }
        if state.turns_remaining == 1 {
            return WindowTick::Closing;
        }
        return WindowTick::Unchanged;
    }

    if state.used || turns_in_era < tuning.open_threshold {
        return WindowTick::Unchanged;
    }

    let probability = open_probability(turns_in_era, tuning);
    if probability >= 1.0 || chance() < probability {
        state.open = true;
        state.turns_remaining = tuning.duration;
        return WindowTick::Opened;
    }
    WindowTick::Unchanged
}

/// Classify the window for choice gating. `open_can_stay` requires the anchor
/// tracker to report stay-eligibility; it is never offered otherwise.
pub fn evaluate(state: &WindowState, can_stay: bool) -> WindowDecisionKind {
    if !state.open {
        WindowDecisionKind::NotOpen
    } else if can_stay {
        WindowDecisionKind::OpenCanStay
    } else {
        WindowDecisionKind::OpenCanLeaveOnly
    }
}

/// Operational device state shown alongside the indicator.
pub fn device_state(state: &WindowState, turns_in_era: u32, tuning: &WindowTuning) -> DeviceState {
    if state.open {
        DeviceState::Active
    } else if state.used || turns_in_era < 2 {
        DeviceState::Cooldown
    } else if turns_in_era + 2 >= tuning.open_threshold {
        DeviceState::Warming
    } else {
        DeviceState::Dormant
    }
}

/// What the indicator light shows. The glow tracks the scheduled probability
/// for the *next* turn, hinting at an approaching window without a countdown.
pub fn indicator(state: &WindowState, turns_in_era: u32, tuning: &WindowTuning) -> IndicatorState {
    if state.open {
        return IndicatorState::BrightPulse;
    }
    if state.used {
        return IndicatorState::Dark;
    }
    let until_eligible = tuning.open_threshold.saturating_sub(turns_in_era);
    if until_eligible > 3 {
        return IndicatorState::Dark;
    }
    if until_eligible > 1 {
        return IndicatorState::FaintPulse;
    }
    let probability = open_probability(turns_in_era.max(tuning.open_threshold), tuning);
    if probability > 0.5 {
        IndicatorState::SteadyGlow
    } else if probability > 0.2 {
        IndicatorState::FaintPulse
    } else {
        IndicatorState::Dark
    }
}

/// Player-facing status line while the window is open.
pub fn status_line(state: &WindowState, tuning: &WindowTuning) -> Option<String> {
    if !state.open {
        return None;
    }
    if state.turns_remaining == tuning.duration {
        Some("The window has opened. You have time to decide.".to_string())
    } else if state.turns_remaining == 1 {
        Some("The window is closing. This is your last chance.".to_string())
    } else {
        Some(format!(
            "The window remains open. {} moments remain.",
            state.turns_remaining
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> WindowTuning {
        WindowTuning::default()
    }

    #[test]
    fn window_never_opens_before_threshold() {
        let mut state = WindowState::closed();
        let mut always = || 0.0;
        for turn in 1..tuning().open_threshold {
            assert_eq!(
                advance(&mut state, turn, &tuning(), &mut always),
                WindowTick::Unchanged
            );
            assert!(!state.open);
        }
    }

    #[test]
    fn window_opens_at_threshold_when_roll_succeeds() {
        let mut state = WindowState::closed();
        let mut lucky = || 0.0;
        let tick = advance(&mut state, tuning().open_threshold, &tuning(), &mut lucky);
        assert_eq!(tick, WindowTick::Opened);
        assert!(state.open);
        assert_eq!(state.turns_remaining, tuning().duration);
    }

    #[test]
    fn missed_rolls_force_open_by_max_wait() {
        let mut state = WindowState::closed();
        let mut unlucky = || 0.999;
        for turn in tuning().open_threshold..tuning().max_wait {
            assert_eq!(
                advance(&mut state, turn, &tuning(), &mut unlucky),
                WindowTick::Unchanged
            );
        }
        // The cap ignores the roll entirely.
        let tick = advance(&mut state, tuning().max_wait, &tuning(), &mut unlucky);
        assert_eq!(tick, WindowTick::Opened);
    }

    #[test]
    fn open_window_counts_down_and_force_closes() {
        let mut state = WindowState::closed();
        let mut chance = || 0.0;
        advance(&mut state, 7, &tuning(), &mut chance);

        assert_eq!(advance(&mut state, 8, &tuning(), &mut chance), WindowTick::Unchanged);
        assert_eq!(advance(&mut state, 9, &tuning(), &mut chance), WindowTick::Closing);
        assert_eq!(
            advance(&mut state, 10, &tuning(), &mut chance),
            WindowTick::ForcedClosed
        );
        assert!(!state.open);
        assert!(state.used);

        // Used this era: no reopening even past max_wait.
        assert_eq!(
            advance(&mut state, 20, &tuning(), &mut chance),
            WindowTick::Unchanged
        );
    }

    #[test]
    fn evaluate_never_offers_stay_without_eligibility() {
        let open = WindowState {
            open: true,
            turns_remaining: 2,
            used: false,
        };
        assert_eq!(evaluate(&open, false), WindowDecisionKind::OpenCanLeaveOnly);
        assert_eq!(evaluate(&open, true), WindowDecisionKind::OpenCanStay);
        assert_eq!(
            evaluate(&WindowState::closed(), true),
            WindowDecisionKind::NotOpen
        );
    }

    #[test]
    fn probability_table_falls_through_to_cap() {
        let t = tuning();
        assert_eq!(open_probability(6, &t), 0.0);
        assert_eq!(open_probability(7, &t), 0.30);
        assert_eq!(open_probability(8, &t), 0.50);
        assert_eq!(open_probability(9, &t), 0.75);
        assert_eq!(open_probability(10, &t), 1.0);
        assert_eq!(open_probability(25, &t), 1.0);
    }

    #[test]
    fn indicator_brightens_toward_the_window() {
        let t = tuning();
        let closed = WindowState::closed();
        assert_eq!(indicator(&closed, 1, &t), IndicatorState::Dark);
        assert_eq!(indicator(&closed, 5, &t), IndicatorState::FaintPulse);
        assert_eq!(indicator(&closed, 7, &t), IndicatorState::FaintPulse);
        assert_eq!(indicator(&closed, 8, &t), IndicatorState::FaintPulse);
        assert_eq!(indicator(&closed, 9, &t), IndicatorState::SteadyGlow);

        let open = WindowState {
            open: true,
            turns_remaining: 3,
            used: false,
        };
        assert_eq!(indicator(&open, 8, &t), IndicatorState::BrightPulse);
    }

    #[test]
    fn tuning_validation_rejects_inverted_bounds() {
        let mut t = WindowTuning::default();
        assert!(t.validate().is_ok());
        t.max_wait = 3;
        assert!(t.validate().is_err());
    }
}
