//! Final score computation. Pure, terminal-only, idempotent.

use serde::{Deserialize, Serialize};

use crate::core::anchor::AnchorSet;
use crate::core::types::{AnchorKind, Ending};

/// Points per turn survived.
const SURVIVAL_POINTS_PER_TURN: i64 = 10;
/// Points per distinct era visited.
const EXPLORATION_POINTS_PER_ERA: i64 = 50;

/// Immutable score breakdown computed once at the terminal phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub turns_survived: u32,
    pub eras_visited: u32,
    pub survival_points: i64,
    pub exploration_points: i64,
    pub belonging: u32,
    pub legacy: u32,
    pub freedom: u32,
    pub fulfillment_points: i64,
    pub ending: Ending,
    pub ending_bonus: i64,
    pub total: i64,
    /// Filled by the leaderboard collaborator, never by this module.
    pub rank: Option<u32>,
}

/// Bonus by ending kind: settling rewards what was built, quitting is
/// neutral, a game-over costs points.
pub fn ending_bonus(ending: Ending) -> i64 {
    match ending {
        Ending::Complete => 200,
        Ending::Balanced => 150,
        Ending::Belonging | Ending::Legacy | Ending::Freedom => 100,
        Ending::Searching => 50,
        Ending::Quit => 0,
        Ending::GameOver => -50,
    }
}

/// Compute the breakdown from terminal session facts. Calling this twice on
/// identical inputs yields identical output.
pub fn score(turns_survived: u32, eras_visited: u32, anchors: &AnchorSet, ending: Ending) -> ScoreBreakdown {
    let survival_points = i64::from(turns_survived) * SURVIVAL_POINTS_PER_TURN;
    let exploration_points = i64::from(eras_visited) * EXPLORATION_POINTS_PER_ERA;
    let belonging = anchors.get(AnchorKind::Belonging).value;
    let legacy = anchors.get(AnchorKind::Legacy).value;
    let freedom = anchors.get(AnchorKind::Freedom).value;
    let fulfillment_points = i64::from(belonging) + i64::from(legacy) + i64::from(freedom);
    let bonus = ending_bonus(ending);

    ScoreBreakdown {
        turns_survived,
        eras_visited,
        survival_points,
        exploration_points,
        belonging,
        legacy,
        freedom,
        fulfillment_points,
        ending,
        ending_bonus: bonus,
        total: survival_points + exploration_points + fulfillment_points + bonus,
        rank: None,
    }
}

impl ScoreBreakdown {
    /// One-line summary for leaderboard rows.
    pub fn blurb(&self, final_era: &str) -> String {
        match self.ending {
            Ending::Quit => format!("Quit in {final_era}"),
            Ending::GameOver => format!("Fell in {final_era}"),
            Ending::Complete => format!("Found happiness in {final_era}"),
            Ending::Balanced => format!("Found balance in {final_era}"),
            Ending::Belonging | Ending::Legacy | Ending::Freedom => {
                format!("Stayed in {final_era} ({})", self.ending.as_str())
            }
            Ending::Searching => format!("Settled in {final_era}"),
        }
    }
}
