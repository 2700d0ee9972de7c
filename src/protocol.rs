//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Attachment, Question, QuestionStatus};

/// How the quiz pool is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
    Standard,
    Adaptive,
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartQuiz {
        mode: QuizMode,
        category: Option<String>,
        topic: Option<String>,
        status: Option<String>,
        count: Option<usize>,
    },
    QuizState,
    SubmitAnswer {
        selection: String,
    },
    NextQuestion,
    ToggleFlag {
        qid: String,
    },
    EndQuiz,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    QuizState {
        view: QuizViewOut,
    },
    AnswerResult {
        correct: bool,
        score: usize,
        answer: String,
        explanation: String,
    },
    Flag {
        qid: String,
        flagged: bool,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

/// Quiz start request. Filter fields accept the sentinel "All" (or can be
/// omitted) to mean unconstrained; they only apply in standard mode.
#[derive(Debug, Deserialize)]
pub struct StartQuizIn {
    pub mode: QuizMode,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

/// The question currently in front of the user. `choices` comes back in
/// the session's shuffled order.
#[derive(Clone, Debug, Serialize)]
pub struct QuestionOut {
    pub qid: String,
    pub id_num: u64,
    pub category: String,
    pub topic: String,
    pub question: String,
    pub choices: Vec<String>,
    pub attachments: Vec<Attachment>,
}

/// Grading feedback, present once the current question was submitted.
#[derive(Clone, Debug, Serialize)]
pub struct FeedbackOut {
    pub correct: bool,
    pub selected: String,
    pub answer: String,
    pub explanation: String,
}

/// Snapshot of the quiz session for the client.
#[derive(Clone, Debug, Serialize)]
pub struct QuizViewOut {
    pub active: bool,
    pub complete: bool,
    pub index: usize,
    pub total: usize,
    pub score: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackOut>,
    pub flagged: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    pub selection: String,
}

#[derive(Serialize)]
pub struct AnswerOut {
    pub correct: bool,
    pub score: usize,
    pub answer: String,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct FlagIn {
    pub qid: String,
}

#[derive(Serialize)]
pub struct FlagOut {
    pub qid: String,
    pub flagged: bool,
}

/// Review page filter.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFilter {
    Flagged,
    Incorrect,
    #[default]
    FlaggedIncorrect,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub filter: ReviewFilter,
}

#[derive(Serialize)]
pub struct ReviewItemOut {
    pub qid: String,
    pub id_num: u64,
    pub question: String,
    pub your_answer: Option<String>,
    pub answer: String,
    pub explanation: String,
    pub status: QuestionStatus,
    pub flagged: bool,
}

#[derive(Serialize)]
pub struct AnalyticsRowOut {
    pub id_num: u64,
    pub category: String,
    pub topic: String,
    pub status: QuestionStatus,
    pub flagged: bool,
}

/// Per-category tallies for the performance view.
#[derive(Serialize)]
pub struct CategoryStatsOut {
    pub category: String,
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unanswered: usize,
    pub flagged: usize,
}

/// A question whose stored answer can never grade correct.
#[derive(Serialize)]
pub struct ValidationWarningOut {
    pub qid: String,
    pub id_num: u64,
    pub message: String,
}

#[derive(Serialize)]
pub struct AnalyticsOut {
    pub rows: Vec<AnalyticsRowOut>,
    pub categories: Vec<CategoryStatsOut>,
    pub warnings: Vec<ValidationWarningOut>,
}

/// Create/update payload for one question. Identity fields are managed by
/// the store and not accepted from the client.
#[derive(Debug, Deserialize)]
pub struct QuestionIn {
    pub question: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl QuestionIn {
    pub fn into_question(self) -> Question {
        Question {
            qid: String::new(),
            id_num: 0,
            category: self.category,
            topic: self.topic,
            question: self.question,
            choices: self.choices,
            answer: self.answer,
            explanation: self.explanation,
            attachments: Vec::new(),
        }
    }
}

/// Attachment upload; the bytes travel base64-encoded in JSON.
#[derive(Debug, Deserialize)]
pub struct AttachmentIn {
    pub name: String,
    pub mime: String,
    #[serde(rename = "dataBase64")]
    pub data_base64: String,
}

#[derive(Serialize)]
pub struct ImportOut {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
