//! Application state: the two JSON-backed stores and the single quiz
//! session.
//!
//! The stores are loaded once at startup and mutated in place behind
//! RwLocks; every mutation flushes its whole file. One session exists per
//! process (single-profile model), so a handler holding the write locks
//! has the exclusive access one state transition needs.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::config::{load_config_from_env, AppConfig};
use crate::session::QuizSession;
use crate::store::{HistoryStore, QuestionStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub cfg: AppConfig,
    pub bank: Arc<RwLock<QuestionStore>>,
    pub history: Arc<RwLock<HistoryStore>>,
    pub quiz: Arc<RwLock<QuizSession>>,
}

impl AppState {
    /// Build state from env: load config, open both stores, start idle.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, StoreError> {
        let cfg = load_config_from_env().unwrap_or_default();

        let bank = QuestionStore::load(cfg.bank_path())?;
        let history = HistoryStore::load(cfg.stats_path());
        info!(target: "quizbank_backend",
            data_dir = %cfg.data_dir.display(),
            questions = bank.questions().len(),
            attempts = history.history().attempts.len(),
            flagged = history.history().flagged.len(),
            "Stores loaded");

        for q in bank.unmatchable_answers() {
            warn!(target: "quiz", qid = %q.qid, id_num = q.id_num,
                "Stored answer matches none of the choices; the question can never grade correct");
        }

        Ok(Self {
            cfg,
            bank: Arc::new(RwLock::new(bank)),
            history: Arc::new(RwLock::new(history)),
            quiz: Arc::new(RwLock::new(QuizSession::default())),
        })
    }
}
