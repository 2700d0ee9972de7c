//! Domain models used by the backend: questions, attachments, the answer
//! history, and the grading status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a question grades against the recorded history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionStatus {
  Unanswered,
  Correct,
  Incorrect,
}

/// One stored attachment descriptor. The backend hands `path` to the
/// rendering layer and never reads the bytes back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attachment {
  pub name: String,
  pub stored: String,
  pub path: String,
  pub mime: String,
}

/// A single bank entry.
///
/// `choices` keeps the canonical persisted order; the order shown during a
/// quiz is a per-session permutation. `answer` is graded by exact string
/// equality against the submitted choice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  /// Stable opaque identifier, assigned on load when missing.
  #[serde(default)] pub qid: String,
  /// Display ordinal, starts at 1. Zero means not yet assigned.
  #[serde(default)] pub id_num: u64,
  #[serde(default)] pub category: String,
  #[serde(default)] pub topic: String,
  pub question: String,
  #[serde(default)] pub choices: Vec<String>,
  #[serde(default)] pub answer: String,
  #[serde(default)] pub explanation: String,
  #[serde(default)] pub attachments: Vec<Attachment>,
}

impl Question {
  /// True when `answer` equals none of the choices, so the question can
  /// never be graded correct.
  pub fn answer_is_unmatchable(&self) -> bool {
    !self.choices.iter().any(|c| c == &self.answer)
  }
}

/// One immutable log record of a single answer submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attempt {
  pub qid: String,
  pub correct: bool,
  pub ts: DateTime<Utc>,
}

/// Whole-installation answer history (single profile).
///
/// `user_answers` holds only the last submission per question; earlier
/// submissions survive in `attempts`, which is append-only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnswerHistory {
  #[serde(default)] pub user_answers: HashMap<String, String>,
  #[serde(default)] pub attempts: Vec<Attempt>,
  #[serde(default)] pub flagged: Vec<String>,
}

impl AnswerHistory {
  pub fn is_flagged(&self, qid: &str) -> bool {
    self.flagged.iter().any(|f| f == qid)
  }
}
