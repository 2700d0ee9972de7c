//! Quiz session state machine.
//!
//! Holds the pool snapshot, the cursor, the score, and the per-session
//! choice permutations. The session never touches storage or transport:
//! `submit` validates and grades, and the caller mirrors the result into
//! the answer history inside the same transition.

use std::collections::HashMap;

use rand::Rng;
use thiserror::Error;

use crate::domain::Question;
use crate::pool::shuffle_choices;

/// Derived lifecycle phase. `Complete` is a position, not a stored flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
  Idle,
  InProgress,
  Complete,
}

/// Precondition failures. None of these leave the session mutated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
  #[error("no matching questions")]
  EmptyPool,
  #[error("no quiz in progress")]
  NoActiveQuiz,
  #[error("quiz already complete")]
  QuizComplete,
  #[error("current question was already answered in this quiz")]
  AlreadyAnswered,
  #[error("a selection is required")]
  NoSelection,
  #[error("selection is not one of the current question's choices")]
  UnknownChoice,
  #[error("current question has not been answered yet")]
  NotSubmitted,
}

/// Result of grading one submission.
#[derive(Clone, Debug, PartialEq)]
pub struct Grade {
  pub qid: String,
  pub correct: bool,
  pub answer: String,
  pub explanation: String,
}

#[derive(Clone, Debug, Default)]
pub struct QuizSession {
  active: bool,
  pool: Vec<Question>,
  index: usize,
  score: usize,
  show_expl: bool,
  choice_order: HashMap<String, Vec<String>>,
  current_answers: HashMap<String, String>,
}

impl QuizSession {
  pub fn phase(&self) -> SessionPhase {
    if !self.active {
      SessionPhase::Idle
    } else if self.index >= self.pool.len() {
      SessionPhase::Complete
    } else {
      SessionPhase::InProgress
    }
  }

  pub fn pool_len(&self) -> usize {
    self.pool.len()
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn score(&self) -> usize {
    self.score
  }

  pub fn show_expl(&self) -> bool {
    self.show_expl
  }

  /// Take a quiz pool and move to the first question. A session that was
  /// already running is overwritten; an empty pool is rejected and the
  /// session keeps its previous state.
  pub fn start(&mut self, pool: Vec<Question>) -> Result<(), SessionError> {
    if pool.is_empty() {
      return Err(SessionError::EmptyPool);
    }
    self.active = true;
    self.pool = pool;
    self.index = 0;
    self.score = 0;
    self.show_expl = false;
    self.choice_order.clear();
    self.current_answers.clear();
    Ok(())
  }

  /// Leave the quiz. Pool, cursor and score go stale and are overwritten
  /// by the next `start`.
  pub fn end(&mut self) {
    self.active = false;
  }

  /// The question under the cursor, if the quiz is in progress.
  pub fn current(&self) -> Option<&Question> {
    match self.phase() {
      SessionPhase::InProgress => self.pool.get(self.index),
      _ => None,
    }
  }

  /// The selection already submitted for the current question, if any.
  pub fn current_answer(&self) -> Option<&str> {
    let q = self.current()?;
    self.current_answers.get(&q.qid).map(String::as_str)
  }

  /// Display order of the current question's choices. Shuffled on first
  /// visit, then stable for the rest of the session.
  pub fn current_choices<R: Rng>(&mut self, rng: &mut R) -> Option<Vec<String>> {
    let (qid, choices) = {
      let q = self.current()?;
      (q.qid.clone(), q.choices.clone())
    };
    let order = self
      .choice_order
      .entry(qid)
      .or_insert_with(|| shuffle_choices(&choices, rng));
    Some(order.clone())
  }

  /// Grade a submission for the current question.
  ///
  /// The selection must be non-empty and one of the displayed choices, and
  /// the question must not have been answered in this session. On success
  /// the session records the answer, bumps the score on a correct one, and
  /// switches to the feedback view; the cursor does not move.
  pub fn submit<R: Rng>(&mut self, selection: &str, rng: &mut R) -> Result<Grade, SessionError> {
    let (qid, answer, explanation) = match self.current() {
      Some(q) => (q.qid.clone(), q.answer.clone(), q.explanation.clone()),
      None => {
        return Err(match self.phase() {
          SessionPhase::Complete => SessionError::QuizComplete,
          _ => SessionError::NoActiveQuiz,
        })
      }
    };
    if self.current_answers.contains_key(&qid) {
      return Err(SessionError::AlreadyAnswered);
    }
    if selection.trim().is_empty() {
      return Err(SessionError::NoSelection);
    }
    // Shuffling is lazy, so force it here in case the caller submits
    // without having fetched the question view first. A question with no
    // choices can never pass the membership check.
    let order = self
      .current_choices(rng)
      .unwrap_or_default();
    if !order.iter().any(|c| c == selection) {
      return Err(SessionError::UnknownChoice);
    }

    let correct = selection == answer;
    self.current_answers.insert(qid.clone(), selection.to_string());
    if correct {
      self.score += 1;
    }
    self.show_expl = true;
    Ok(Grade {
      qid,
      correct,
      answer,
      explanation,
    })
  }

  /// Move past an answered question. Only legal while the feedback view is
  /// up, so every question is graded exactly once before the cursor moves.
  pub fn advance(&mut self) -> Result<SessionPhase, SessionError> {
    match self.phase() {
      SessionPhase::Idle => Err(SessionError::NoActiveQuiz),
      SessionPhase::Complete => Err(SessionError::QuizComplete),
      SessionPhase::InProgress => {
        if !self.show_expl {
          return Err(SessionError::NotSubmitted);
        }
        self.index += 1;
        self.show_expl = false;
        Ok(self.phase())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn q(qid: &str, answer: &str, wrong: &[&str]) -> Question {
    let mut choices: Vec<String> = vec![answer.into()];
    choices.extend(wrong.iter().map(|w| w.to_string()));
    Question {
      qid: qid.into(),
      id_num: 0,
      category: String::new(),
      topic: String::new(),
      question: format!("question {qid}"),
      choices,
      answer: answer.into(),
      explanation: "because".into(),
      attachments: Vec::new(),
    }
  }

  fn rng() -> StdRng {
    StdRng::seed_from_u64(99)
  }

  #[test]
  fn start_rejects_an_empty_pool() {
    let mut s = QuizSession::default();
    assert_eq!(s.start(Vec::new()), Err(SessionError::EmptyPool));
    assert_eq!(s.phase(), SessionPhase::Idle);
  }

  #[test]
  fn full_run_over_three_questions() {
    let mut s = QuizSession::default();
    let mut rng = rng();
    s.start(vec![q("a", "1", &["2"]), q("b", "1", &["2"]), q("c", "1", &["2"])])
      .unwrap();
    assert_eq!(s.phase(), SessionPhase::InProgress);

    // Answer a correctly, b wrong, c correctly.
    for (expected_correct, sel) in [(true, "1"), (false, "2"), (true, "1")] {
      let grade = s.submit(sel, &mut rng).unwrap();
      assert_eq!(grade.correct, expected_correct);
      assert!(s.show_expl());
      s.advance().unwrap();
    }

    assert_eq!(s.phase(), SessionPhase::Complete);
    assert_eq!(s.score(), 2);
    assert!(s.current().is_none());

    s.end();
    assert_eq!(s.phase(), SessionPhase::Idle);
  }

  #[test]
  fn score_only_moves_up_and_only_on_exact_matches() {
    let mut s = QuizSession::default();
    let mut rng = rng();
    let pool: Vec<Question> = (0..5).map(|i| q(&format!("q{i}"), "yes", &["no"])).collect();
    s.start(pool).unwrap();
    let mut last = 0;
    for i in 0..5 {
      let sel = if i % 2 == 0 { "yes" } else { "no" };
      let grade = s.submit(sel, &mut rng).unwrap();
      if grade.correct {
        assert_eq!(s.score(), last + 1);
      } else {
        assert_eq!(s.score(), last);
      }
      last = s.score();
      s.advance().unwrap();
    }
    assert_eq!(s.score(), 3);
  }

  #[test]
  fn choice_order_is_stable_and_a_bijection() {
    let mut s = QuizSession::default();
    let mut rng = rng();
    let wrong: Vec<String> = (0..8).map(|i| format!("w{i}")).collect();
    let wrong_refs: Vec<&str> = wrong.iter().map(String::as_str).collect();
    let question = q("a", "right", &wrong_refs);
    s.start(vec![question.clone()]).unwrap();

    let first = s.current_choices(&mut rng).unwrap();
    for _ in 0..10 {
      assert_eq!(s.current_choices(&mut rng).unwrap(), first);
    }
    let mut sorted_in = question.choices.clone();
    let mut sorted_out = first.clone();
    sorted_in.sort();
    sorted_out.sort();
    assert_eq!(sorted_in, sorted_out);
  }

  #[test]
  fn submit_rejections_leave_the_session_unmutated() {
    let mut s = QuizSession::default();
    let mut rng = rng();

    assert_eq!(s.submit("x", &mut rng), Err(SessionError::NoActiveQuiz));

    s.start(vec![q("a", "1", &["2"])]).unwrap();
    assert_eq!(s.submit("", &mut rng), Err(SessionError::NoSelection));
    assert_eq!(s.submit("not-a-choice", &mut rng), Err(SessionError::UnknownChoice));
    assert_eq!(s.score(), 0);
    assert!(!s.show_expl());
    assert!(s.current_answer().is_none());

    s.submit("1", &mut rng).unwrap();
    assert_eq!(s.submit("1", &mut rng), Err(SessionError::AlreadyAnswered));
    assert_eq!(s.score(), 1);

    s.advance().unwrap();
    assert_eq!(s.submit("1", &mut rng), Err(SessionError::QuizComplete));
  }

  #[test]
  fn question_without_choices_cannot_be_submitted() {
    let mut s = QuizSession::default();
    let mut rng = rng();
    let mut question = q("a", "1", &[]);
    question.choices.clear();
    s.start(vec![question]).unwrap();
    assert_eq!(s.current_choices(&mut rng).unwrap(), Vec::<String>::new());
    assert_eq!(s.submit("1", &mut rng), Err(SessionError::UnknownChoice));
  }

  #[test]
  fn advance_requires_a_submission_first() {
    let mut s = QuizSession::default();
    let mut rng = rng();
    s.start(vec![q("a", "1", &["2"]), q("b", "1", &["2"])]).unwrap();
    assert_eq!(s.advance(), Err(SessionError::NotSubmitted));
    s.submit("1", &mut rng).unwrap();
    assert_eq!(s.advance(), Ok(SessionPhase::InProgress));
    assert_eq!(s.index(), 1);
    s.submit("1", &mut rng).unwrap();
    assert_eq!(s.advance(), Ok(SessionPhase::Complete));
    assert_eq!(s.advance(), Err(SessionError::QuizComplete));
  }

  #[test]
  fn restart_resets_everything() {
    let mut s = QuizSession::default();
    let mut rng = rng();
    s.start(vec![q("a", "1", &["2"])]).unwrap();
    s.submit("1", &mut rng).unwrap();
    assert_eq!(s.score(), 1);

    s.start(vec![q("b", "1", &["2"])]).unwrap();
    assert_eq!(s.score(), 0);
    assert_eq!(s.index(), 0);
    assert!(!s.show_expl());
    assert!(s.current_answer().is_none());
    assert_eq!(s.current().unwrap().qid, "b");
  }
}
