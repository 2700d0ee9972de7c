//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic or the stores; each handler is instrumented and maps `OpError`
//! onto a status code plus a JSON error body.

use axum::{
  extract::{Path, Query, State},
  http::{header, StatusCode},
  response::IntoResponse,
  Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{info, instrument};

use crate::attach::store_attachment;
use crate::logic::{self, OpError};
use crate::protocol::*;
use crate::session::SessionError;
use crate::state::AppState;
use crate::transfer;

type ApiError = (StatusCode, Json<ErrorOut>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn error_response(status: StatusCode, message: impl ToString) -> ApiError {
  (
    status,
    Json(ErrorOut {
      error: message.to_string(),
    }),
  )
}

fn op_error(e: OpError) -> ApiError {
  let status = match &e {
    OpError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    OpError::UnknownQuestion(_) => StatusCode::NOT_FOUND,
    OpError::Session(SessionError::EmptyPool) => StatusCode::NOT_FOUND,
    OpError::Session(_) | OpError::BadRequest(_) => StatusCode::BAD_REQUEST,
  };
  error_response(status, e)
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

//
// Question bank administration
//

#[instrument(level = "info", skip(state))]
pub async fn http_list_questions(State(state): State<AppState>) -> impl IntoResponse {
  let bank = state.bank.read().await;
  Json(bank.questions().to_vec())
}

#[instrument(level = "info", skip(state, body), fields(question_len = body.question.len()))]
pub async fn http_create_question(
  State(state): State<AppState>,
  Json(body): Json<QuestionIn>,
) -> ApiResult<crate::domain::Question> {
  if body.question.trim().is_empty() {
    return Err(error_response(StatusCode::BAD_REQUEST, "question text is required"));
  }
  let mut bank = state.bank.write().await;
  let q = bank
    .insert(body.into_question())
    .map_err(|e| op_error(e.into()))?;
  info!(target: "quizbank_backend", qid = %q.qid, id_num = q.id_num, "Question created");
  Ok(Json(q))
}

#[instrument(level = "info", skip(state, body), fields(%qid))]
pub async fn http_update_question(
  State(state): State<AppState>,
  Path(qid): Path<String>,
  Json(body): Json<QuestionIn>,
) -> ApiResult<crate::domain::Question> {
  let mut bank = state.bank.write().await;
  let updated = bank
    .update(&qid, |q| {
      q.question = body.question;
      q.category = body.category;
      q.topic = body.topic;
      q.choices = body.choices;
      q.answer = body.answer;
      q.explanation = body.explanation;
    })
    .map_err(|e| op_error(e.into()))?;
  match updated {
    Some(q) => {
      info!(target: "quizbank_backend", %qid, "Question updated");
      Ok(Json(q))
    }
    None => Err(op_error(OpError::UnknownQuestion(qid))),
  }
}

#[instrument(level = "info", skip(state), fields(%qid))]
pub async fn http_delete_question(
  State(state): State<AppState>,
  Path(qid): Path<String>,
) -> ApiResult<serde_json::Value> {
  let mut bank = state.bank.write().await;
  let removed = bank.remove(&qid).map_err(|e| op_error(e.into()))?;
  if !removed {
    return Err(op_error(OpError::UnknownQuestion(qid)));
  }
  info!(target: "quizbank_backend", %qid, "Question removed");
  Ok(Json(serde_json::json!({ "removed": qid })))
}

#[instrument(level = "info", skip(state, body), fields(%qid, name = %body.name))]
pub async fn http_upload_attachment(
  State(state): State<AppState>,
  Path(qid): Path<String>,
  Json(body): Json<AttachmentIn>,
) -> ApiResult<crate::domain::Attachment> {
  let bytes = BASE64
    .decode(body.data_base64.as_bytes())
    .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("invalid base64 payload: {e}")))?;

  let mut bank = state.bank.write().await;
  if !bank.contains(&qid) {
    return Err(op_error(OpError::UnknownQuestion(qid)));
  }
  let descriptor = store_attachment(&state.cfg.attach_dir(), &qid, &bytes, &body.name, &body.mime)
    .map_err(|e| op_error(e.into()))?;
  bank
    .add_attachment(&qid, descriptor.clone())
    .map_err(|e| op_error(e.into()))?;
  info!(target: "quizbank_backend", %qid, stored = %descriptor.stored, bytes = bytes.len(),
    "Attachment stored");
  Ok(Json(descriptor))
}

//
// Quiz lifecycle
//

#[instrument(level = "info", skip(state, body))]
pub async fn http_start_quiz(
  State(state): State<AppState>,
  Json(body): Json<StartQuizIn>,
) -> ApiResult<QuizViewOut> {
  logic::start_quiz(&state, body).await.map(Json).map_err(op_error)
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_view(State(state): State<AppState>) -> Json<QuizViewOut> {
  Json(logic::quiz_view(&state).await)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_submit_answer(
  State(state): State<AppState>,
  Json(body): Json<SubmitIn>,
) -> ApiResult<AnswerOut> {
  logic::submit_answer(&state, &body.selection)
    .await
    .map(Json)
    .map_err(op_error)
}

#[instrument(level = "info", skip(state))]
pub async fn http_next_question(State(state): State<AppState>) -> ApiResult<QuizViewOut> {
  logic::next_question(&state).await.map(Json).map_err(op_error)
}

#[instrument(level = "info", skip(state))]
pub async fn http_end_quiz(State(state): State<AppState>) -> Json<QuizViewOut> {
  Json(logic::end_quiz(&state).await)
}

#[instrument(level = "info", skip(state, body), fields(%body.qid))]
pub async fn http_toggle_flag(
  State(state): State<AppState>,
  Json(body): Json<FlagIn>,
) -> ApiResult<FlagOut> {
  logic::toggle_flag(&state, &body.qid).await.map(Json).map_err(op_error)
}

//
// Reporting
//

#[instrument(level = "info", skip(state))]
pub async fn http_review(
  State(state): State<AppState>,
  Query(q): Query<ReviewQuery>,
) -> Json<Vec<ReviewItemOut>> {
  Json(logic::review_list(&state, q.filter).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_analytics(State(state): State<AppState>) -> Json<AnalyticsOut> {
  Json(logic::analytics(&state).await)
}

//
// Tabular import/export
//

#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_import_questions(
  State(state): State<AppState>,
  body: String,
) -> ApiResult<ImportOut> {
  let outcome = transfer::parse_questions_csv(body.as_bytes())
    .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("unreadable import file: {e}")))?;

  let mut bank = state.bank.write().await;
  let imported = bank
    .extend(outcome.questions)
    .map_err(|e| op_error(e.into()))?;
  info!(target: "quizbank_backend", imported, skipped = outcome.skipped, "Bank import finished");
  Ok(Json(ImportOut {
    imported,
    skipped: outcome.skipped,
  }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_export_bank(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
  let bank = state.bank.read().await;
  let csv = transfer::export_bank_csv(bank.questions()).map_err(|e| op_error(e.into()))?;
  Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv))
}

#[instrument(level = "info", skip(state))]
pub async fn http_export_attempts(
  State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
  let bank = state.bank.read().await;
  let history = state.history.read().await;
  let csv = transfer::export_attempts_csv(history.history(), bank.questions())
    .map_err(|e| op_error(e.into()))?;
  Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv))
}
