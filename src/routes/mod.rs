//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS,
//! and HTTP tracing.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Stored attachments served read-only under `/attachments`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) - adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: AppState) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    let attachment_service = ServeDir::new(state.cfg.attach_dir());

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route(
            "/api/v1/questions",
            get(http::http_list_questions).post(http::http_create_question),
        )
        .route(
            "/api/v1/questions/:qid",
            put(http::http_update_question).delete(http::http_delete_question),
        )
        .route(
            "/api/v1/questions/:qid/attachments",
            post(http::http_upload_attachment),
        )
        .route("/api/v1/quiz", get(http::http_quiz_view))
        .route("/api/v1/quiz/start", post(http::http_start_quiz))
        .route("/api/v1/quiz/answer", post(http::http_submit_answer))
        .route("/api/v1/quiz/next", post(http::http_next_question))
        .route("/api/v1/quiz/end", post(http::http_end_quiz))
        .route("/api/v1/flag", post(http::http_toggle_flag))
        .route("/api/v1/review", get(http::http_review))
        .route("/api/v1/analytics", get(http::http_analytics))
        .route("/api/v1/import/questions", post(http::http_import_questions))
        .route("/api/v1/export/bank", get(http::http_export_bank))
        .route("/api/v1/export/attempts", get(http::http_export_attempts))
        // Attachment bytes for the rendering layer
        .nest_service("/attachments", attachment_service)
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
