//! HTTP surface: PDF upload, chat, and follow-up suggestion endpoints
//!
//! Thin glue over [`IngestionPipeline`] and [`RetrievalService`]; every
//! failure maps to a JSON error body with the underlying message and no
//! partial-success signaling.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::embedding::OpenAiEmbedder;
use crate::error::DocQaError;
use crate::index::IndexStore;
use crate::ingest::{IngestionPipeline, TokenChunker};
use crate::llm::{OpenAiChatModel, OpenAiVisionModel};
use crate::router::QueryRouter;
use crate::service::{RetrievalOptions, RetrievalService};
use crate::types::{ChatAnswer, ChatRequest, FollowUpRequest, IngestResponse};

/// Shared application state: singletons built once at startup
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub service: Arc<RetrievalService>,
    upload_dir: PathBuf,
}

impl AppState {
    /// Construct every external client and wire the pipeline + service
    pub fn from_config(config: &Config, api_key: &str) -> Result<Self, DocQaError> {
        let embedder = Arc::new(OpenAiEmbedder::new(api_key, &config.embedding)?);
        let chat = Arc::new(OpenAiChatModel::new(api_key, &config.generation)?);
        let vision = Arc::new(OpenAiVisionModel::new(
            api_key,
            &config.generation,
            &config.vision,
        )?);
        let router = QueryRouter::new()
            .map_err(|e| DocQaError::other(format!("invalid routing pattern: {e}")))?;
        let index = Arc::new(IndexStore::new(&config.storage));

        let pipeline = IngestionPipeline::new(
            TokenChunker::new(config.chunking.max_tokens),
            embedder.clone(),
            index.clone(),
            config.storage.clone(),
            config.embedding.batch_size,
        );
        let service = RetrievalService::new(
            embedder,
            chat,
            vision,
            router,
            index,
            config.storage.images_index_path(),
            RetrievalOptions {
                top_k: config.search.top_k,
                answer_max_tokens: config.generation.answer_max_tokens,
                followup_max_tokens: config.generation.followup_max_tokens,
            },
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            service: Arc::new(service),
            upload_dir: config.storage.data_dir.clone(),
        })
    }
}

/// Build the axum application
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/process-pdf", post(process_pdf))
        .route("/chat", post(chat))
        .route("/generate-followup", post(generate_followup))
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    message: String,
}

type HandlerError = (StatusCode, Json<ErrorBody>);

async fn process_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, HandlerError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        if field.name() == Some("file") {
            upload = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(e.to_string()))?,
            );
            break;
        }
    }
    let Some(bytes) = upload else {
        return Err(bad_request("multipart field 'file' is required"));
    };

    // Stage the upload next to the data dir; the temp file is removed on drop
    let staged = stage_upload(&state.upload_dir, &bytes).map_err(internal_error)?;
    let response = state
        .pipeline
        .ingest_pdf(staged.path())
        .await
        .map_err(internal_error)?;

    Ok(Json(response))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatAnswer>, HandlerError> {
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let answer = state
        .service
        .answer(&request.question, &request.chat_context)
        .await
        .map_err(internal_error)?;
    Ok(Json(answer))
}

async fn generate_followup(
    State(state): State<AppState>,
    Json(request): Json<FollowUpRequest>,
) -> Result<Json<Vec<String>>, HandlerError> {
    let questions = state
        .service
        .suggest_followups(&request.current_text)
        .await
        .map_err(internal_error)?;
    Ok(Json(questions))
}

fn stage_upload(dir: &Path, bytes: &[u8]) -> Result<tempfile::NamedTempFile, DocQaError> {
    std::fs::create_dir_all(dir)?;
    let mut staged = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(".pdf")
        .tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    Ok(staged)
}

fn bad_request(message: impl Into<String>) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn internal_error(err: DocQaError) -> HandlerError {
    tracing::warn!(%err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: err.user_message(),
        }),
    )
}
