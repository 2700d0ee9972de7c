//! Pool building: status classification, standard filtering, adaptive
//! priority ordering, and the final quiz-pool draw.
//!
//! Everything here is pure. All randomness goes through an explicit `Rng`
//! so callers (and tests) control the source.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{AnswerHistory, Question, QuestionStatus};

/// Classify a question against the recorded history.
///
/// `Unanswered` iff the question has no entry in `user_answers`; otherwise
/// the stored string is compared to `answer` exactly, case- and
/// whitespace-sensitive.
pub fn status_of(q: &Question, history: &AnswerHistory) -> QuestionStatus {
  match history.user_answers.get(&q.qid) {
    None => QuestionStatus::Unanswered,
    Some(sel) if *sel == q.answer => QuestionStatus::Correct,
    Some(_) => QuestionStatus::Incorrect,
  }
}

/// Filters for a standard quiz. `None` means no constraint (the wire
/// sentinel "All").
#[derive(Clone, Debug, Default)]
pub struct PoolFilter {
  pub category: Option<String>,
  pub topic: Option<String>,
  pub status: Option<QuestionStatus>,
}

impl PoolFilter {
  fn admits(&self, q: &Question, history: &AnswerHistory) -> bool {
    if let Some(cat) = &self.category {
      if q.category != *cat {
        return false;
      }
    }
    if let Some(topic) = &self.topic {
      if q.topic != *topic {
        return false;
      }
    }
    if let Some(status) = self.status {
      if status_of(q, history) != status {
        return false;
      }
    }
    true
  }
}

/// Questions passing all active filters, in bank order.
pub fn build_standard_pool(
  bank: &[Question],
  history: &AnswerHistory,
  filter: &PoolFilter,
) -> Vec<Question> {
  bank
    .iter()
    .filter(|q| filter.admits(q, history))
    .cloned()
    .collect()
}

/// The whole bank reordered by four static priority levels: incorrect,
/// then flagged, then unanswered, then the rest (answered correctly).
///
/// A flagged question keeps its classification bucket too; the first
/// bucket that emits it wins, so the result holds every bank question
/// exactly once. Bank order is preserved inside each bucket.
pub fn build_adaptive_pool(bank: &[Question], history: &AnswerHistory) -> Vec<Question> {
  let mut incorrect = Vec::new();
  let mut flagged = Vec::new();
  let mut unanswered = Vec::new();
  let mut rest = Vec::new();

  for q in bank {
    match status_of(q, history) {
      QuestionStatus::Incorrect => incorrect.push(q),
      QuestionStatus::Unanswered => unanswered.push(q),
      QuestionStatus::Correct => rest.push(q),
    }
    if history.is_flagged(&q.qid) {
      flagged.push(q);
    }
  }

  let mut pool = Vec::with_capacity(bank.len());
  let mut seen: HashSet<&str> = HashSet::with_capacity(bank.len());
  for q in incorrect
    .into_iter()
    .chain(flagged)
    .chain(unanswered)
    .chain(rest)
  {
    if seen.insert(q.qid.as_str()) {
      pool.push(q.clone());
    }
  }
  pool
}

/// Draw the final standard-mode pool from a candidate list.
///
/// With at most `n` candidates the list is returned as produced. With more,
/// exactly `n` distinct questions are drawn uniformly without replacement
/// and the selection comes back in random order.
pub fn draw_pool<R: Rng>(mut candidates: Vec<Question>, n: usize, rng: &mut R) -> Vec<Question> {
  if candidates.len() <= n {
    return candidates;
  }
  let (picked, _) = candidates.partial_shuffle(rng, n);
  picked.to_vec()
}

/// A fresh uniform permutation of a question's choices. Computed once per
/// session per question; the session caches the result.
pub fn shuffle_choices<R: Rng>(choices: &[String], rng: &mut R) -> Vec<String> {
  let mut order = choices.to_vec();
  order.shuffle(rng);
  order
}
