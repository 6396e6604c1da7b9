//! Session aggregate and its phase machine.
//!
//! [`Session`] is the root state for one player's game. [`handle_action`]
//! validates an inbound action against the current phase and returns the
//! outbound events it produced; it performs no network or storage I/O.

mod machine;
mod types;

pub use machine::{handle_action, resume_events};
pub use types::{Action, DefiningMoment, Event, Session, VisitedEra};
