use crate::error::ApiError;
use crate::message_payload::MessagePayload;
use crate::session_response::{CreatedSession, SessionResponse};
use crate::state::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use chatbot::{Attachment, Exchange};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn app(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/messages", post(send_message))
        .route("/sessions/:id/pdf", post(upload_pdf))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn create_session(State(state): State<Arc<AppState>>) -> Json<CreatedSession> {
    let session_id = state.create_session().await;
    Json(CreatedSession { session_id })
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.session(id).await?;
    Ok(Json(SessionResponse {
        session_id: id,
        messages: session.messages(),
        is_typing: session.is_typing(),
        attachment: session.attachment(),
    }))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MessagePayload>,
) -> Result<Json<Exchange>, ApiError> {
    let session = state.session(id).await?;

    // Run to completion even if the browser goes away, so the reply still lands in the transcript.
    let exchange = tokio::spawn(async move { session.send(&payload.text).await })
        .await
        .map_err(ApiError::internal)??;

    Ok(Json(exchange))
}

/// Starts parsing in the background and answers right away; the next message waits for it.
async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Attachment>, ApiError> {
    let session = state.session(id).await?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("document.pdf").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();

        let ticket = session.begin_attachment(&file_name, content_type.as_deref(), &bytes)?;
        let pending = Attachment::Parsing {
            file_name: file_name.clone(),
        };

        tokio::spawn(async move {
            session.finish_attachment(ticket, &file_name, bytes).await;
        });

        return Ok(Json(pending));
    }

    Err(ApiError::bad_request("multipart field `file` is missing"))
}

// Keeps axum's status (413 when over the upload limit) but answers in the JSON error shape.
fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}
