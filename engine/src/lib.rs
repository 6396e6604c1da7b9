//! Turn-based narrative survival session engine.
//!
//! A player carries modern artifacts through a sequence of historical eras.
//! Each turn couples a player choice to a dice-influenced, externally narrated
//! outcome that shifts three hidden progress anchors. A periodic "window"
//! offers the chance to depart for a new era or, once an anchor has arrived,
//! to settle forever. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (anchors, window policy, choice
//!   intent, scoring). No I/O, fully testable in isolation.
//! - **[`persist`]** and [`config`]: Side-effecting filesystem operations.
//! - **[`narrator`]**: The external text-generation capability behind a trait,
//!   with a bounded timeout and a deterministic fallback.
//!
//! Orchestration lives in [`session`] (phase machine), [`turn`] (per-turn
//! resolution) and [`store`] (session registry with per-session serialization).

pub mod config;
pub mod core;
pub mod eras;
pub mod items;
pub mod logging;
pub mod narrator;
pub mod outcome;
pub mod persist;
pub mod prompt;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod turn;
