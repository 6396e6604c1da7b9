//! Engine configuration (TOML).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::anchor::RetentionRates;
use crate::core::window::WindowTuning;

/// Top-level configuration.
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Travel window opening schedule.
    pub window: WindowTuning,

    /// Per-anchor carry-over ratio applied on era transitions.
    pub retention: RetentionRates,

    /// Wall-clock budget for a single narrative generation call.
    pub narrator_timeout_secs: u64,

    /// How many recent narrative beats are fed back into turn prompts.
    pub history_turns: usize,

    /// Entries retained on the leaderboard.
    pub leaderboard_size: usize,

    /// Root directory for saves and the leaderboard file.
    pub data_dir: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window: WindowTuning::default(),
            retention: RetentionRates::default(),
            narrator_timeout_secs: 60,
            history_turns: 3,
            leaderboard_size: 100,
            data_dir: PathBuf::from(".everwhen"),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        self.window.validate().map_err(|e| anyhow!(e))?;
        self.retention.validate().map_err(|e| anyhow!(e))?;
        if self.narrator_timeout_secs == 0 {
            return Err(anyhow!("narrator_timeout_secs must be > 0"));
        }
        if self.leaderboard_size == 0 {
            return Err(anyhow!("leaderboard_size must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GameConfig::default()`.
pub fn load_config(path: &Path) -> Result<GameConfig> {
    if !path.exists() {
        let cfg = GameConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GameConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &GameConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, GameConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = GameConfig::default();
        cfg.window.open_threshold = 5;
        cfg.window.max_wait = 8;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn invalid_config_is_rejected_on_write() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = GameConfig::default();
        cfg.narrator_timeout_secs = 0;
        assert!(write_config(&path, &cfg).is_err());
        assert!(!path.exists());
    }
}
