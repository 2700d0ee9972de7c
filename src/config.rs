//! Server configuration from TOML.
//!
//! `QUIZBANK_CONFIG_PATH` points at an optional TOML file; every field has
//! a default so the file may set only what it needs. On any read/parse
//! error the server logs the problem and runs with defaults.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
  /// Directory holding the bank file, the stats file, and attachments.
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  /// Quiz length used when a start request carries no count.
  #[serde(default = "default_quiz_len")]
  pub default_quiz_len: usize,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      default_quiz_len: default_quiz_len(),
    }
  }
}

fn default_data_dir() -> PathBuf {
  PathBuf::from("qb_data")
}

fn default_quiz_len() -> usize {
  10
}

impl AppConfig {
  pub fn bank_path(&self) -> PathBuf {
    self.data_dir.join("question_bank.json")
  }

  pub fn stats_path(&self) -> PathBuf {
    self.data_dir.join("stats.json")
  }

  pub fn attach_dir(&self) -> PathBuf {
    self.data_dir.join("attachments")
  }
}

/// Attempt to load `AppConfig` from QUIZBANK_CONFIG_PATH. On any
/// parsing/IO error, returns None and the caller falls back to defaults.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZBANK_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizbank_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizbank_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizbank_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_fill_missing_fields() {
    let cfg: AppConfig = toml::from_str("").unwrap();
    assert_eq!(cfg.data_dir, PathBuf::from("qb_data"));
    assert_eq!(cfg.default_quiz_len, 10);

    let cfg: AppConfig = toml::from_str("default_quiz_len = 25").unwrap();
    assert_eq!(cfg.default_quiz_len, 25);
    assert_eq!(cfg.bank_path(), PathBuf::from("qb_data/question_bank.json"));
    assert_eq!(cfg.stats_path(), PathBuf::from("qb_data/stats.json"));
    assert_eq!(cfg.attach_dir(), PathBuf::from("qb_data/attachments"));
  }
}
