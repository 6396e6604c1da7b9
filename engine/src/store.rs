//! Process-wide session registry with per-session serialization.
//!
//! One in-flight action per session: a second caller hitting the same
//! session while a turn is resolving gets [`StoreError::Busy`] instead of
//! interleaved mutation. Different sessions proceed in parallel.
//!
//! The store is also where persistence happens. Saves and leaderboard writes
//! run here at fixed checkpoints (after each resolved turn and at
//! termination) and are fire-and-forget: a failed write is logged, never
//! surfaced into the turn result.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, warn};

use crate::core::types::Phase;
use crate::eras::{EraPicker, RandomEraPicker};
use crate::persist::{LeaderboardEntry, Persist};
use crate::session::{Action, Event, Session, handle_action, resume_events};
use crate::turn::{EngineDeps, Luck, RandomLuck};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another action on the same session is still in flight.
    Busy,
    UnknownSession,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Busy => write!(f, "session is busy with another action"),
            StoreError::UnknownSession => write!(f, "unknown session"),
        }
    }
}

impl std::error::Error for StoreError {}

fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

/// Owned registry of live sessions.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    deps: EngineDeps,
    persist: Persist,
}

impl SessionStore {
    pub fn new(deps: EngineDeps) -> Self {
        let persist = Persist::new(&deps.config.data_dir, deps.config.leaderboard_size);
        Self {
            sessions: Mutex::new(HashMap::new()),
            deps,
            persist,
        }
    }

    /// Register a fresh session and return its id.
    pub fn create(&self) -> String {
        let id = new_session_id();
        let session = Session::new(id.clone());
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        debug!(session = %id, "session created");
        id
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// Dispatch an action with production randomness.
    pub fn dispatch(&self, id: &str, action: &Action) -> Result<Vec<Event>, StoreError> {
        self.dispatch_with(id, action, &mut RandomLuck, &mut RandomEraPicker)
    }

    /// Dispatch with injected randomness, for deterministic replay.
    pub fn dispatch_with(
        &self,
        id: &str,
        action: &Action,
        luck: &mut dyn Luck,
        picker: &mut dyn EraPicker,
    ) -> Result<Vec<Event>, StoreError> {
        let slot = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or(StoreError::UnknownSession)?;
        // The registry lock is already released; only this session is held
        // for the duration of the action.
        let mut session = slot.try_lock().map_err(|_| StoreError::Busy)?;

        let events = match action {
            Action::Save => self.save(&session),
            Action::Load { game_id } => self.load(&mut session, game_id),
            Action::Resume => self.resume(&mut session),
            Action::ListSaves => self.list_saves(&session),
            Action::Leaderboard => self.leaderboard(&session),
            _ => {
                let events = handle_action(&mut session, action, &self.deps, luck, picker);
                self.checkpoint(&session);
                events
            }
        };
        Ok(events)
    }

    /// Persist after turn-advancing actions and at termination. Failures are
    /// logged and swallowed: the in-memory session is already consistent.
    fn checkpoint(&self, session: &Session) {
        match session.phase {
            Phase::Gameplay | Phase::WindowDecision | Phase::Intro => {
                if session.total_turns > 0 {
                    if let Err(err) = self.persist.save_session(session) {
                        warn!(session = %session.id, error = %err, "save checkpoint failed");
                    }
                }
            }
            Phase::Ended => self.finalize(session),
            _ => {}
        }
    }

    /// Record the finished game on the leaderboard and drop its save.
    fn finalize(&self, session: &Session) {
        if let Some(ending) = session.ending {
            let score = crate::core::scoring::score(
                session.total_turns,
                session.eras_visited(),
                &session.anchors,
                ending,
            );
            let final_era = session
                .era()
                .map(|era| era.name.to_string())
                .or_else(|| session.visited.last().map(|v| v.name.clone()))
                .unwrap_or_else(|| "the stream of time".to_string());
            let entry = LeaderboardEntry {
                player_name: session
                    .player_name
                    .clone()
                    .unwrap_or_else(|| "Traveler".to_string()),
                blurb: score.blurb(&final_era),
                total: score.total,
                ending,
                eras_visited: session.eras_visited(),
                total_turns: session.total_turns,
                recorded_at: crate::persist::now_unix(),
            };
            match self.persist.record_score(entry) {
                Ok(rank) => debug!(session = %session.id, rank, "score recorded"),
                Err(err) => {
                    warn!(session = %session.id, error = %err, "leaderboard write failed");
                }
            }
        }
        if let Err(err) = self.persist.delete_save(&session.id) {
            warn!(session = %session.id, error = %err, "save cleanup failed");
        }
    }

    fn save(&self, session: &Session) -> Vec<Event> {
        match self.persist.save_session(session) {
            Ok(()) => vec![Event::Saved {
                game_id: session.id.clone(),
            }],
            Err(err) => {
                warn!(session = %session.id, error = %err, "explicit save failed");
                vec![Event::Error {
                    message: "save failed".to_string(),
                }]
            }
        }
    }

    /// Replace the live session with a saved one. Legal only from the menu,
    /// mirroring the machine's own phase discipline. The loaded game keeps
    /// the live session's id so the caller's handle stays valid.
    fn load(&self, session: &mut Session, game_id: &str) -> Vec<Event> {
        if session.phase != Phase::Menu {
            return vec![Event::Error {
                message: "load is only legal from the menu".to_string(),
            }];
        }
        match self.persist.load_session(game_id) {
            Ok(mut loaded) => {
                loaded.id = session.id.clone();
                *session = loaded;
                resume_events(session, &self.deps)
            }
            Err(err) => {
                warn!(game_id, error = %err, "load failed");
                vec![Event::Error {
                    message: format!("no save found for {game_id:?}"),
                }]
            }
        }
    }

    fn resume(&self, session: &mut Session) -> Vec<Event> {
        if session.phase != Phase::Menu {
            return vec![Event::Error {
                message: "resume is only legal from the menu".to_string(),
            }];
        }
        let latest = match self.persist.latest_save(session.user_id.as_deref()) {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                return vec![Event::Error {
                    message: "nothing to resume".to_string(),
                }];
            }
            Err(err) => {
                warn!(error = %err, "resume lookup failed");
                return vec![Event::Error {
                    message: "nothing to resume".to_string(),
                }];
            }
        };
        self.load(session, &latest.game_id)
    }

    fn list_saves(&self, session: &Session) -> Vec<Event> {
        match self.persist.list_saves(session.user_id.as_deref()) {
            Ok(saves) => vec![Event::SaveList { saves }],
            Err(err) => {
                warn!(error = %err, "save listing failed");
                vec![Event::Error {
                    message: "could not list saves".to_string(),
                }]
            }
        }
    }

    /// Read the leaderboard outside any session, for transports that expose
    /// it as a plain resource.
    pub fn top_scores(&self, limit: usize) -> anyhow::Result<Vec<LeaderboardEntry>> {
        self.persist.top_scores(limit)
    }

    fn leaderboard(&self, session: &Session) -> Vec<Event> {
        if session.phase != Phase::Menu {
            return vec![Event::Error {
                message: "leaderboard is only legal from the menu".to_string(),
            }];
        }
        match self.persist.top_scores(self.deps.config.leaderboard_size) {
            Ok(entries) => vec![Event::Leaderboard { entries }],
            Err(err) => {
                warn!(error = %err, "leaderboard read failed");
                vec![Event::Error {
                    message: "could not read leaderboard".to_string(),
                }]
            }
        }
    }
}
