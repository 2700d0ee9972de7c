//! JSON-file-backed stores for the question bank and the answer history.
//!
//! Each store loads once at startup and rewrites its whole file on every
//! mutation. A missing or unreadable file is not an error: the store comes
//! up with its documented default shape and logs the problem. Save
//! failures are real errors and propagate to the caller.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{AnswerHistory, Attachment, Attempt, Question};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The question bank, kept in insertion order.
pub struct QuestionStore {
    path: PathBuf,
    bank: Vec<Question>,
}

impl QuestionStore {
    /// Load the bank from disk. Missing file means an empty bank; a file
    /// that does not parse is left alone on disk and the store starts
    /// empty. Records without a `qid` or `id_num` get one assigned, and a
    /// bank changed that way is flushed back once.
    pub fn load(path: PathBuf) -> Result<Self, StoreError> {
        let bank = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<Question>>(&raw) {
                Ok(bank) => bank,
                Err(e) => {
                    warn!(target: "quizbank_backend", path = %path.display(), error = %e,
                        "Question bank file is malformed; starting with an empty bank");
                    Vec::new()
                }
            },
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(target: "quizbank_backend", path = %path.display(), error = %e,
                        "Question bank file is unreadable; starting with an empty bank");
                }
                Vec::new()
            }
        };

        let mut store = Self { path, bank };
        if store.assign_missing_ids() > 0 {
            store.save()?;
        }
        Ok(store)
    }

    /// Give a fresh `qid` to records missing one, and the next display
    /// ordinal to records without an `id_num`, in load order. Returns the
    /// number of assignments made.
    fn assign_missing_ids(&mut self) -> usize {
        let mut next = self.bank.iter().map(|q| q.id_num).max().unwrap_or(0) + 1;
        let mut assigned = 0;
        for q in &mut self.bank {
            if q.qid.is_empty() {
                q.qid = Uuid::new_v4().to_string();
                assigned += 1;
            }
            if q.id_num == 0 {
                q.id_num = next;
                next += 1;
                assigned += 1;
            }
        }
        assigned
    }

    /// Rewrite the whole bank file.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.bank)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn questions(&self) -> &[Question] {
        &self.bank
    }

    pub fn get(&self, qid: &str) -> Option<&Question> {
        self.bank.iter().find(|q| q.qid == qid)
    }

    pub fn contains(&self, qid: &str) -> bool {
        self.get(qid).is_some()
    }

    /// Append one question, assigning identity, and flush.
    pub fn insert(&mut self, mut q: Question) -> Result<Question, StoreError> {
        if q.qid.is_empty() {
            q.qid = Uuid::new_v4().to_string();
        }
        q.id_num = self.bank.iter().map(|q| q.id_num).max().unwrap_or(0) + 1;
        self.bank.push(q.clone());
        self.save()?;
        Ok(q)
    }

    /// Append a batch (a bulk import), assigning identity in order, and
    /// flush once. Returns how many were added.
    pub fn extend(&mut self, questions: Vec<Question>) -> Result<usize, StoreError> {
        if questions.is_empty() {
            return Ok(0);
        }
        let added = questions.len();
        self.bank.extend(questions);
        self.assign_missing_ids();
        self.save()?;
        Ok(added)
    }

    /// Apply an edit to one question and flush. Returns the updated record,
    /// or None when the qid is unknown.
    pub fn update<F>(&mut self, qid: &str, edit: F) -> Result<Option<Question>, StoreError>
    where
        F: FnOnce(&mut Question),
    {
        let Some(q) = self.bank.iter_mut().find(|q| q.qid == qid) else {
            return Ok(None);
        };
        edit(q);
        let updated = q.clone();
        self.save()?;
        Ok(Some(updated))
    }

    /// Remove a question and flush. Its `id_num` is never reused. Returns
    /// false when the qid is unknown.
    pub fn remove(&mut self, qid: &str) -> Result<bool, StoreError> {
        let before = self.bank.len();
        self.bank.retain(|q| q.qid != qid);
        if self.bank.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Record a stored attachment on its question and flush.
    pub fn add_attachment(
        &mut self,
        qid: &str,
        attachment: Attachment,
    ) -> Result<Option<Question>, StoreError> {
        self.update(qid, |q| q.attachments.push(attachment))
    }

    /// Questions whose answer text matches none of their choices. They can
    /// never be graded correct, so surface them instead of failing writes.
    pub fn unmatchable_answers(&self) -> Vec<&Question> {
        self.bank
            .iter()
            .filter(|q| q.answer_is_unmatchable())
            .collect()
    }
}

/// The answer history: last answers, attempt log, and the flagged set.
pub struct HistoryStore {
    path: PathBuf,
    history: AnswerHistory,
}

impl HistoryStore {
    /// Load the history from disk, falling back to the default shape on a
    /// missing or malformed file.
    pub fn load(path: PathBuf) -> Self {
        let history = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<AnswerHistory>(&raw) {
                Ok(history) => history,
                Err(e) => {
                    warn!(target: "quizbank_backend", path = %path.display(), error = %e,
                        "History file is malformed; starting with an empty history");
                    AnswerHistory::default()
                }
            },
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(target: "quizbank_backend", path = %path.display(), error = %e,
                        "History file is unreadable; starting with an empty history");
                }
                AnswerHistory::default()
            }
        };
        Self { path, history }
    }

    /// Rewrite the whole history file.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.history)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn history(&self) -> &AnswerHistory {
        &self.history
    }

    /// Record one submission: overwrite the last answer for the question,
    /// append to the attempt log, and flush.
    pub fn record_answer(
        &mut self,
        qid: &str,
        selection: &str,
        correct: bool,
    ) -> Result<(), StoreError> {
        self.history
            .user_answers
            .insert(qid.to_string(), selection.to_string());
        self.history.attempts.push(Attempt {
            qid: qid.to_string(),
            correct,
            ts: Utc::now(),
        });
        self.save()
    }

    /// Toggle review-flag membership and flush. Returns the new state.
    pub fn toggle_flag(&mut self, qid: &str) -> Result<bool, StoreError> {
        let flagged = match self.history.flagged.iter().position(|f| f == qid) {
            Some(pos) => {
                self.history.flagged.remove(pos);
                false
            }
            None => {
                self.history.flagged.push(qid.to_string());
                true
            }
        };
        self.save()?;
        Ok(flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn question(text: &str, answer: &str) -> Question {
        Question {
            qid: String::new(),
            id_num: 0,
            category: "cat".into(),
            topic: "top".into(),
            question: text.into(),
            choices: vec![answer.into(), "other".into()],
            answer: answer.into(),
            explanation: String::new(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn missing_file_loads_an_empty_bank() {
        let dir = TempDir::new().unwrap();
        let store = QuestionStore::load(dir.path().join("bank.json")).unwrap();
        assert!(store.questions().is_empty());
    }

    #[test]
    fn malformed_file_loads_the_default_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bank.json");
        fs::write(&path, "{ not json").unwrap();
        let store = QuestionStore::load(path.clone()).unwrap();
        assert!(store.questions().is_empty());

        let stats = dir.path().join("stats.json");
        fs::write(&stats, "[]").unwrap();
        let history = HistoryStore::load(stats);
        assert!(history.history().attempts.is_empty());
        assert!(history.history().user_answers.is_empty());
    }

    #[test]
    fn insert_assigns_identity_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bank.json");
        let mut store = QuestionStore::load(path.clone()).unwrap();

        let a = store.insert(question("first", "x")).unwrap();
        let b = store.insert(question("second", "x")).unwrap();
        assert!(!a.qid.is_empty() && a.qid != b.qid);
        assert_eq!((a.id_num, b.id_num), (1, 2));

        let reloaded = QuestionStore::load(path).unwrap();
        assert_eq!(reloaded.questions().len(), 2);
        assert_eq!(reloaded.get(&a.qid).unwrap().question, "first");
    }

    #[test]
    fn id_numbers_are_never_reused_after_removal() {
        let dir = TempDir::new().unwrap();
        let mut store = QuestionStore::load(dir.path().join("bank.json")).unwrap();
        let a = store.insert(question("first", "x")).unwrap();
        let b = store.insert(question("second", "x")).unwrap();
        assert!(store.remove(&a.qid).unwrap());
        let c = store.insert(question("third", "x")).unwrap();
        assert_eq!(b.id_num, 2);
        assert_eq!(c.id_num, 3);
        assert!(!store.remove("unknown-qid").unwrap());
    }

    #[test]
    fn load_assigns_ids_to_legacy_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bank.json");
        fs::write(
            &path,
            r#"[
                {"question": "legacy one", "choices": ["a", "b"], "answer": "a"},
                {"qid": "keep-me", "id_num": 7, "question": "kept", "choices": [], "answer": ""},
                {"question": "legacy two", "choices": ["a"], "answer": "a"}
            ]"#,
        )
        .unwrap();

        let store = QuestionStore::load(path.clone()).unwrap();
        let bank = store.questions();
        assert!(!bank[0].qid.is_empty());
        assert_eq!(bank[1].qid, "keep-me");
        assert_eq!(bank[1].id_num, 7);
        assert_eq!(bank[0].id_num, 8);
        assert_eq!(bank[2].id_num, 9);

        // The assignment was flushed back.
        let reloaded = QuestionStore::load(path).unwrap();
        assert_eq!(reloaded.questions()[0].qid, bank[0].qid);
    }

    #[test]
    fn record_answer_overwrites_last_and_appends_attempts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let mut store = HistoryStore::load(path.clone());

        store.record_answer("q1", "wrong", false).unwrap();
        store.record_answer("q1", "right", true).unwrap();
        assert_eq!(store.history().user_answers.get("q1").unwrap(), "right");
        assert_eq!(store.history().attempts.len(), 2);
        assert!(!store.history().attempts[0].correct);

        let reloaded = HistoryStore::load(path);
        assert_eq!(reloaded.history().attempts.len(), 2);
    }

    #[test]
    fn flag_toggle_round_trips_back_to_the_original_state() {
        let dir = TempDir::new().unwrap();
        let mut store = HistoryStore::load(dir.path().join("stats.json"));
        assert!(store.toggle_flag("q1").unwrap());
        assert!(store.history().is_flagged("q1"));
        assert!(!store.toggle_flag("q1").unwrap());
        assert!(!store.history().is_flagged("q1"));
    }

    #[test]
    fn unmatchable_answers_are_reported() {
        let dir = TempDir::new().unwrap();
        let mut store = QuestionStore::load(dir.path().join("bank.json")).unwrap();
        store.insert(question("fine", "x")).unwrap();
        let mut broken = question("broken", "x");
        broken.answer = "not a choice".into();
        store.insert(broken).unwrap();

        let warnings = store.unmatchable_answers();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].question, "broken");
    }
}
