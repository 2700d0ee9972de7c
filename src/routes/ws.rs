//! WebSocket upgrade + message loop. Each client message is parsed as JSON
//! and forwarded to core logic. We reply with a single JSON message per
//! request.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage, StartQuizIn};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!(target: "quizbank_backend", "WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: AppState) {
    info!(target: "quizbank_backend", "WebSocket connected");
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(txt) => {
                // Parse, dispatch, serialize response.
                let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
                    Ok(incoming) => {
                        debug!(target: "quizbank_backend", "WS received: {:?}", &incoming);
                        handle_client_ws(incoming, &state).await
                    }
                    Err(e) => {
                        debug!(target: "quizbank_backend", payload = %trunc_for_log(&txt, 256),
                            "WS message did not parse");
                        ServerWsMessage::Error {
                            message: format!("Invalid JSON: {}", e),
                        }
                    }
                };

                let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
                    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) })
                        .to_string()
                });

                if let Err(e) = socket.send(Message::Text(out)).await {
                    error!(target: "quizbank_backend", error = %e, "WS send error");
                    break;
                }
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    info!(target: "quizbank_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
    match msg {
        ClientWsMessage::Ping => ServerWsMessage::Pong,

        ClientWsMessage::StartQuiz {
            mode,
            category,
            topic,
            status,
            count,
        } => {
            let req = StartQuizIn {
                mode,
                category,
                topic,
                status,
                count,
            };
            match logic::start_quiz(state, req).await {
                Ok(view) => ServerWsMessage::QuizState { view },
                Err(e) => ServerWsMessage::Error {
                    message: e.to_string(),
                },
            }
        }

        ClientWsMessage::QuizState => ServerWsMessage::QuizState {
            view: logic::quiz_view(state).await,
        },

        ClientWsMessage::SubmitAnswer { selection } => {
            match logic::submit_answer(state, &selection).await {
                Ok(result) => ServerWsMessage::AnswerResult {
                    correct: result.correct,
                    score: result.score,
                    answer: result.answer,
                    explanation: result.explanation,
                },
                Err(e) => ServerWsMessage::Error {
                    message: e.to_string(),
                },
            }
        }

        ClientWsMessage::NextQuestion => match logic::next_question(state).await {
            Ok(view) => ServerWsMessage::QuizState { view },
            Err(e) => ServerWsMessage::Error {
                message: e.to_string(),
            },
        },

        ClientWsMessage::ToggleFlag { qid } => match logic::toggle_flag(state, &qid).await {
            Ok(out) => ServerWsMessage::Flag {
                qid: out.qid,
                flagged: out.flagged,
            },
            Err(e) => ServerWsMessage::Error {
                message: e.to_string(),
            },
        },

        ClientWsMessage::EndQuiz => ServerWsMessage::QuizState {
            view: logic::end_quiz(state).await,
        },
    }
}
