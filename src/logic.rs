//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This is the only layer that composes the stores with the quiz session:
//! each function takes the locks it needs for one state transition (always
//! bank, then history, then quiz) and flushes history mutations before
//! returning. Handlers stay thin and map `OpError` onto their transport.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::{AnswerHistory, QuestionStatus};
use crate::pool::{build_adaptive_pool, build_standard_pool, draw_pool, status_of, PoolFilter};
use crate::protocol::{
  AnalyticsOut, AnalyticsRowOut, AnswerOut, CategoryStatsOut, FeedbackOut, FlagOut, QuestionOut,
  QuizMode, QuizViewOut, ReviewFilter, ReviewItemOut, StartQuizIn, ValidationWarningOut,
};
use crate::session::{QuizSession, SessionError, SessionPhase};
use crate::state::AppState;
use crate::store::StoreError;

/// Failures of one quiz/store operation, mapped by the transport layers.
#[derive(Debug, Error)]
pub enum OpError {
  #[error("{0}")]
  Session(#[from] SessionError),
  #[error("{0}")]
  Store(#[from] StoreError),
  #[error("unknown question: {0}")]
  UnknownQuestion(String),
  #[error("{0}")]
  BadRequest(String),
}

/// Map the wire filter value: absent or "All" means unconstrained, the
/// empty string is a real value (uncategorized questions).
fn text_filter(value: Option<String>) -> Option<String> {
  match value {
    Some(v) if v == "All" => None,
    other => other,
  }
}

fn status_filter(value: Option<String>) -> Result<Option<QuestionStatus>, OpError> {
  match value.as_deref() {
    None | Some("All") => Ok(None),
    Some("Correct") => Ok(Some(QuestionStatus::Correct)),
    Some("Incorrect") => Ok(Some(QuestionStatus::Incorrect)),
    Some("Unanswered") => Ok(Some(QuestionStatus::Unanswered)),
    Some(other) => Err(OpError::BadRequest(format!("unknown status filter: {other}"))),
  }
}

/// Snapshot the session for the client. Fetching the current question's
/// choices fixes their session order on first sight.
fn view_of(quiz: &mut QuizSession, history: &AnswerHistory) -> QuizViewOut {
  let phase = quiz.phase();
  let current = quiz.current().cloned();
  let choices = quiz
    .current_choices(&mut rand::thread_rng())
    .unwrap_or_default();

  let (question, feedback, flagged) = match current {
    Some(q) => {
      let feedback = if quiz.show_expl() {
        let selected = quiz.current_answer().unwrap_or_default().to_string();
        Some(FeedbackOut {
          correct: selected == q.answer,
          selected,
          answer: q.answer.clone(),
          explanation: q.explanation.clone(),
        })
      } else {
        None
      };
      let flagged = history.is_flagged(&q.qid);
      let question = QuestionOut {
        qid: q.qid,
        id_num: q.id_num,
        category: q.category,
        topic: q.topic,
        question: q.question,
        choices,
        attachments: q.attachments,
      };
      (Some(question), feedback, flagged)
    }
    None => (None, None, false),
  };

  QuizViewOut {
    active: phase != SessionPhase::Idle,
    complete: phase == SessionPhase::Complete,
    index: quiz.index(),
    total: quiz.pool_len(),
    score: quiz.score(),
    question,
    feedback,
    flagged,
  }
}

/// Build the candidate pool, draw the final one, and move the session to
/// the first question. An empty candidate pool is rejected and the session
/// keeps its previous state.
#[instrument(level = "info", skip(state, req), fields(mode = ?req.mode, count = req.count))]
pub async fn start_quiz(state: &AppState, req: StartQuizIn) -> Result<QuizViewOut, OpError> {
  let bank = state.bank.read().await;
  let history = state.history.read().await;

  let candidates = match req.mode {
    QuizMode::Standard => {
      let filter = PoolFilter {
        category: text_filter(req.category),
        topic: text_filter(req.topic),
        status: status_filter(req.status)?,
      };
      build_standard_pool(bank.questions(), history.history(), &filter)
    }
    QuizMode::Adaptive => build_adaptive_pool(bank.questions(), history.history()),
  };
  if candidates.is_empty() {
    return Err(SessionError::EmptyPool.into());
  }

  let pool = match req.mode {
    QuizMode::Standard => {
      let n = req.count.unwrap_or(state.cfg.default_quiz_len).max(1);
      draw_pool(candidates, n, &mut rand::thread_rng())
    }
    // Adaptive ordering is the point of the mode: a count only trims the
    // tail, it never reshuffles.
    QuizMode::Adaptive => {
      let mut pool = candidates;
      if let Some(n) = req.count {
        pool.truncate(n.max(1));
      }
      pool
    }
  };

  let mut quiz = state.quiz.write().await;
  quiz.start(pool)?;
  info!(target: "quiz", mode = ?req.mode, total = quiz.pool_len(), "Quiz started");
  Ok(view_of(&mut quiz, history.history()))
}

pub async fn quiz_view(state: &AppState) -> QuizViewOut {
  let history = state.history.read().await;
  let mut quiz = state.quiz.write().await;
  view_of(&mut quiz, history.history())
}

/// Grade one submission and mirror it into the history store. The history
/// flush happens inside the same lock scope, so the transition is atomic
/// for the single writer.
#[instrument(level = "info", skip(state, selection), fields(selection_len = selection.len()))]
pub async fn submit_answer(state: &AppState, selection: &str) -> Result<AnswerOut, OpError> {
  let mut history = state.history.write().await;
  let mut quiz = state.quiz.write().await;

  let grade = quiz.submit(selection, &mut rand::thread_rng())?;
  history.record_answer(&grade.qid, selection, grade.correct)?;
  info!(target: "quiz", qid = %grade.qid, correct = grade.correct, score = quiz.score(),
    "Answer submitted");

  Ok(AnswerOut {
    correct: grade.correct,
    score: quiz.score(),
    answer: grade.answer,
    explanation: grade.explanation,
  })
}

#[instrument(level = "info", skip(state))]
pub async fn next_question(state: &AppState) -> Result<QuizViewOut, OpError> {
  let history = state.history.read().await;
  let mut quiz = state.quiz.write().await;
  let phase = quiz.advance()?;
  if phase == SessionPhase::Complete {
    info!(target: "quiz", score = quiz.score(), total = quiz.pool_len(), "Quiz complete");
  }
  Ok(view_of(&mut quiz, history.history()))
}

#[instrument(level = "info", skip(state))]
pub async fn end_quiz(state: &AppState) -> QuizViewOut {
  let history = state.history.read().await;
  let mut quiz = state.quiz.write().await;
  quiz.end();
  info!(target: "quiz", "Quiz ended");
  view_of(&mut quiz, history.history())
}

/// Toggle the review flag on any bank question, in or out of a quiz.
#[instrument(level = "info", skip(state), fields(%qid))]
pub async fn toggle_flag(state: &AppState, qid: &str) -> Result<FlagOut, OpError> {
  let bank = state.bank.read().await;
  if !bank.contains(qid) {
    return Err(OpError::UnknownQuestion(qid.to_string()));
  }
  let mut history = state.history.write().await;
  let flagged = history.toggle_flag(qid)?;
  info!(target: "quiz", %qid, flagged, "Flag toggled");
  Ok(FlagOut {
    qid: qid.to_string(),
    flagged,
  })
}

/// Flagged and/or incorrectly-answered questions, in bank order.
pub async fn review_list(state: &AppState, filter: ReviewFilter) -> Vec<ReviewItemOut> {
  let bank = state.bank.read().await;
  let history = state.history.read().await;
  let history = history.history();

  let mut items = Vec::new();
  for q in bank.questions() {
    let status = status_of(q, history);
    let flagged = history.is_flagged(&q.qid);
    let incorrect = status == QuestionStatus::Incorrect;
    let show = match filter {
      ReviewFilter::Flagged => flagged,
      ReviewFilter::Incorrect => incorrect,
      ReviewFilter::FlaggedIncorrect => flagged || incorrect,
    };
    if show {
      items.push(ReviewItemOut {
        qid: q.qid.clone(),
        id_num: q.id_num,
        question: q.question.clone(),
        your_answer: history.user_answers.get(&q.qid).cloned(),
        answer: q.answer.clone(),
        explanation: q.explanation.clone(),
        status,
        flagged,
      });
    }
  }
  items
}

/// Per-question status rows plus per-category tallies and data warnings.
pub async fn analytics(state: &AppState) -> AnalyticsOut {
  let bank = state.bank.read().await;
  let history = state.history.read().await;
  let history = history.history();

  let mut rows = Vec::with_capacity(bank.questions().len());
  let mut categories: BTreeMap<String, CategoryStatsOut> = BTreeMap::new();
  for q in bank.questions() {
    let status = status_of(q, history);
    let flagged = history.is_flagged(&q.qid);
    rows.push(AnalyticsRowOut {
      id_num: q.id_num,
      category: q.category.clone(),
      topic: q.topic.clone(),
      status,
      flagged,
    });

    let entry = categories
      .entry(q.category.clone())
      .or_insert_with(|| CategoryStatsOut {
        category: q.category.clone(),
        total: 0,
        correct: 0,
        incorrect: 0,
        unanswered: 0,
        flagged: 0,
      });
    entry.total += 1;
    match status {
      QuestionStatus::Correct => entry.correct += 1,
      QuestionStatus::Incorrect => entry.incorrect += 1,
      QuestionStatus::Unanswered => entry.unanswered += 1,
    }
    if flagged {
      entry.flagged += 1;
    }
  }

  let warnings = bank
    .unmatchable_answers()
    .into_iter()
    .map(|q| ValidationWarningOut {
      qid: q.qid.clone(),
      id_num: q.id_num,
      message: "answer text matches none of the choices".to_string(),
    })
    .collect();

  AnalyticsOut {
    rows,
    categories: categories.into_values().collect(),
    warnings,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Question;

  fn question(qid: &str, answer: &str) -> Question {
    Question {
      qid: qid.into(),
      id_num: 1,
      category: String::new(),
      topic: String::new(),
      question: "q".into(),
      choices: vec![answer.into(), "other".into()],
      answer: answer.into(),
      explanation: String::new(),
      attachments: Vec::new(),
    }
  }

  #[test]
  fn wire_filters_map_the_all_sentinel_to_none() {
    assert_eq!(text_filter(None), None);
    assert_eq!(text_filter(Some("All".into())), None);
    assert_eq!(text_filter(Some("".into())), Some(String::new()));
    assert_eq!(text_filter(Some("math".into())), Some("math".into()));

    assert_eq!(status_filter(Some("All".into())).unwrap(), None);
    assert_eq!(
      status_filter(Some("Correct".into())).unwrap(),
      Some(QuestionStatus::Correct)
    );
    assert!(status_filter(Some("bogus".into())).is_err());
  }

  #[test]
  fn view_carries_feedback_only_after_a_submission() {
    let mut quiz = QuizSession::default();
    let history = AnswerHistory::default();
    quiz.start(vec![question("a", "right")]).unwrap();

    let view = view_of(&mut quiz, &history);
    assert!(view.active && !view.complete);
    assert!(view.feedback.is_none());
    let shown = view.question.unwrap();
    assert_eq!(shown.choices.len(), 2);

    quiz.submit("right", &mut rand::thread_rng()).unwrap();
    let view = view_of(&mut quiz, &history);
    let feedback = view.feedback.unwrap();
    assert!(feedback.correct);
    assert_eq!(feedback.selected, "right");

    quiz.advance().unwrap();
    let view = view_of(&mut quiz, &history);
    assert!(view.complete);
    assert!(view.question.is_none());
    assert_eq!(view.score, 1);
  }
}
