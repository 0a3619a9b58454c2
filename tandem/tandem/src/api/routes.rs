//! API routes

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tandem_agent::HybridAgent;
use tandem_core::{CodeKind, CodeVerdict, GenerationRequest, Turn};
use tracing::debug;

use super::error::ApiError;

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<HybridAgent>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub force_new: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub result: String,
    pub code: Option<String>,
    pub code_type: Option<CodeKind>,
}

#[derive(Debug, Deserialize)]
pub struct ClearCacheRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub success: bool,
    /// Whether a cached answer existed for the prompt
    pub invalidated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub ia_chat_online: bool,
    pub ia_code_online: bool,
    pub status: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaveCodeRequest {
    pub code: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveCodeResponse {
    pub success: bool,
    pub file_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub result: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub verdict: CodeVerdict,
    #[serde(default)]
    pub prompt: Option<String>,
    pub code: String,
}

/// Create all API routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Chat and cache
        .route("/chat", post(chat))
        .route("/clear_prompt_cache", post(clear_prompt_cache))

        // Health
        .route("/status", get(status))
        .route("/ping", get(ping))

        // Code
        .route("/save_code", post(save_code))
        .route("/code/feedback", post(code_feedback))

        // History
        .route("/chat/history", get(chat_history))
        .route("/chat/clear", post(clear_chat))

        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let Json(req) = payload?;
    debug!("Chat request ({} chars, force_new={})", req.message.chars().count(), req.force_new);

    let request = GenerationRequest::new(req.message).force_new(req.force_new);
    let result = state.agent.try_chat(request).await?;

    Ok(Json(ChatResponse {
        result: result.text,
        code: result.code,
        code_type: result.code_kind,
    }))
}

async fn clear_prompt_cache(
    State(state): State<AppState>,
    payload: Result<Json<ClearCacheRequest>, JsonRejection>,
) -> ApiResult<ClearCacheResponse> {
    let Json(req) = payload?;
    let invalidated = state.agent.clear_prompt_cache(&req.prompt).await?;

    Ok(Json(ClearCacheResponse {
        success: true,
        invalidated,
    }))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let report = state.agent.status().await;
    Json(StatusResponse {
        ia_chat_online: report.dialogue_online,
        ia_code_online: report.code_online,
        status: report.ready,
    })
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        result: "pong".to_string(),
    })
}

async fn save_code(
    State(state): State<AppState>,
    payload: Result<Json<SaveCodeRequest>, JsonRejection>,
) -> ApiResult<SaveCodeResponse> {
    let Json(req) = payload?;
    let path = state
        .agent
        .save_code(&req.code, req.filename.as_deref())
        .await?;

    Ok(Json(SaveCodeResponse {
        success: true,
        file_path: path.display().to_string(),
    }))
}

async fn code_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult<SuccessResponse> {
    let Json(req) = payload?;
    if req.verdict == CodeVerdict::Saved {
        return Err(ApiError::BadRequest(
            "use /api/save_code to save code".to_string(),
        ));
    }

    state
        .agent
        .record_feedback(req.verdict, req.prompt.as_deref(), &req.code)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn chat_history(State(state): State<AppState>) -> ApiResult<HistoryResponse> {
    let history = state.agent.history().await?;
    Ok(Json(HistoryResponse { history }))
}

async fn clear_chat(State(state): State<AppState>) -> ApiResult<SuccessResponse> {
    state.agent.clear_history().await?;
    Ok(Json(SuccessResponse { success: true }))
}
