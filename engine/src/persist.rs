//! Save files and the leaderboard, stored as JSON under the data directory.
//!
//! Writes are atomic (temp file + rename) and callers treat them as
//! fire-and-forget: a failed write is logged and never corrupts the
//! in-memory session.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::types::Ending;
use crate::session::Session;

/// One row in a save listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub game_id: String,
    pub user_id: Option<String>,
    pub player_name: Option<String>,
    pub era_name: Option<String>,
    pub total_turns: u32,
    pub saved_at: u64,
}

/// One leaderboard row, kept sorted by total descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    /// One-line summary of how the game ended, e.g. "Stayed in Han Dynasty".
    pub blurb: String,
    pub total: i64,
    pub ending: Ending,
    pub eras_visited: u32,
    pub total_turns: u32,
    pub recorded_at: u64,
}

/// On-disk save format: the session plus write metadata.
#[derive(Debug, Serialize, Deserialize)]
struct SaveFile {
    saved_at: u64,
    session: Session,
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// File-backed persistence collaborator.
#[derive(Debug, Clone)]
pub struct Persist {
    saves_dir: PathBuf,
    leaderboard_path: PathBuf,
    leaderboard_size: usize,
}

impl Persist {
    pub fn new(data_dir: &Path, leaderboard_size: usize) -> Self {
        Self {
            saves_dir: data_dir.join("saves"),
            leaderboard_path: data_dir.join("leaderboard.json"),
            leaderboard_size,
        }
    }

    fn save_path(&self, game_id: &str) -> PathBuf {
        self.saves_dir.join(format!("{game_id}.json"))
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        let file = SaveFile {
            saved_at: now_unix(),
            session: session.clone(),
        };
        let contents = serde_json::to_string_pretty(&file).context("serialize save")?;
        write_atomic(&self.save_path(&session.id), &contents)
    }

    pub fn load_session(&self, game_id: &str) -> Result<Session> {
        let path = self.save_path(game_id);
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read save {}", path.display()))?;
        let file: SaveFile = serde_json::from_str(&contents)
            .with_context(|| format!("parse save {}", path.display()))?;
        Ok(file.session)
    }

    pub fn delete_save(&self, game_id: &str) -> Result<()> {
        let path = self.save_path(game_id);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("delete save {}", path.display()))?;
        }
        Ok(())
    }

    /// List saves newest first, optionally scoped to one player identifier.
    /// Unreadable files are skipped with a warning rather than failing the
    /// whole listing.
    pub fn list_saves(&self, user_id: Option<&str>) -> Result<Vec<SaveSummary>> {
        if !self.saves_dir.exists() {
            return Ok(Vec::new());
        }
        let mut saves = Vec::new();
        for entry in fs::read_dir(&self.saves_dir)
            .with_context(|| format!("read saves dir {}", self.saves_dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let file: SaveFile = match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|c| serde_json::from_str(&c).map_err(anyhow::Error::from))
            {
                Ok(file) => file,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable save");
                    continue;
                }
            };
            if let Some(uid) = user_id {
                if file.session.user_id.as_deref() != Some(uid) {
                    continue;
                }
            }
            let era_name = file.session.era().map(|e| e.name.to_string());
            saves.push(SaveSummary {
                game_id: file.session.id.clone(),
                user_id: file.session.user_id.clone(),
                player_name: file.session.player_name.clone(),
                era_name,
                total_turns: file.session.total_turns,
                saved_at: file.saved_at,
            });
        }
        saves.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(saves)
    }

    /// The most recent save for a player, if any.
    pub fn latest_save(&self, user_id: Option<&str>) -> Result<Option<SaveSummary>> {
        Ok(self.list_saves(user_id)?.into_iter().next())
    }

    /// Insert a finished game into the leaderboard and return its 1-based
    /// rank. The stored table is truncated to the configured size, but the
    /// rank reflects the full ordering.
    pub fn record_score(&self, entry: LeaderboardEntry) -> Result<u32> {
        let mut entries = self.read_leaderboard()?;
        entries.push(entry.clone());
        entries.sort_by(|a, b| b.total.cmp(&a.total).then(a.recorded_at.cmp(&b.recorded_at)));
        let rank = entries
            .iter()
            .position(|e| e == &entry)
            .map(|i| i as u32 + 1)
            .unwrap_or(entries.len() as u32);
        entries.truncate(self.leaderboard_size);
        let contents = serde_json::to_string_pretty(&entries).context("serialize leaderboard")?;
        write_atomic(&self.leaderboard_path, &contents)?;
        Ok(rank)
    }

    pub fn top_scores(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut entries = self.read_leaderboard()?;
        entries.truncate(limit);
        Ok(entries)
    }

    fn read_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        if !self.leaderboard_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.leaderboard_path)
            .with_context(|| format!("read leaderboard {}", self.leaderboard_path.display()))?;
        let entries = serde_json::from_str(&contents)
            .with_context(|| format!("parse leaderboard {}", self.leaderboard_path.display()))?;
        Ok(entries)
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Phase;

    fn session(id: &str, user: Option<&str>) -> Session {
        let mut s = Session::new(id);
        s.user_id = user.map(str::to_string);
        s.player_name = Some("Ada".to_string());
        s.phase = Phase::Gameplay;
        s.era_id = Some("viking_age".to_string());
        s.total_turns = 4;
        s
    }

    #[test]
    fn save_load_round_trips_the_session() {
        let temp = tempfile::tempdir().expect("tempdir");
        let persist = Persist::new(temp.path(), 10);
        let s = session("g1", Some("u1"));
        persist.save_session(&s).expect("save");
        let loaded = persist.load_session("g1").expect("load");
        assert_eq!(loaded.id, "g1");
        assert_eq!(loaded.total_turns, 4);
        assert_eq!(loaded.era_id.as_deref(), Some("viking_age"));
    }

    #[test]
    fn list_saves_scopes_by_user() {
        let temp = tempfile::tempdir().expect("tempdir");
        let persist = Persist::new(temp.path(), 10);
        persist.save_session(&session("g1", Some("u1"))).expect("save");
        persist.save_session(&session("g2", Some("u2"))).expect("save");

        let all = persist.list_saves(None).expect("list");
        assert_eq!(all.len(), 2);
        let mine = persist.list_saves(Some("u1")).expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].game_id, "g1");
    }

    #[test]
    fn delete_is_idempotent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let persist = Persist::new(temp.path(), 10);
        persist.save_session(&session("g1", None)).expect("save");
        persist.delete_save("g1").expect("delete");
        persist.delete_save("g1").expect("delete again");
        assert!(persist.list_saves(None).expect("list").is_empty());
    }

    #[test]
    fn leaderboard_ranks_and_truncates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let persist = Persist::new(temp.path(), 2);
        let entry = |name: &str, total: i64, at: u64| LeaderboardEntry {
            player_name: name.to_string(),
            blurb: "Quit in Viking Age Scandinavia".to_string(),
            total,
            ending: Ending::Quit,
            eras_visited: 1,
            total_turns: 5,
            recorded_at: at,
        };
        assert_eq!(persist.record_score(entry("a", 100, 1)).expect("record"), 1);
        assert_eq!(persist.record_score(entry("b", 300, 2)).expect("record"), 1);
        // Third-best score ranks third even though only two rows are kept.
        assert_eq!(persist.record_score(entry("c", 50, 3)).expect("record"), 3);
        let top = persist.top_scores(10).expect("top");
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].player_name, "b");
    }
}
