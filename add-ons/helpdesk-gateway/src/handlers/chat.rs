//! Chat handler: validates the message, detects the intent, answers from the knowledge base
//! and appends the exchange to the conversation log before replying.
//!
//! `/classify` exposes the ranked candidate intents for the same input without logging.

use super::ApiError;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use helpdesk_core::{ConversationLogEntry, Prediction};
use serde::Deserialize;

const DEFAULT_TOP_K: usize = 3;
const MAX_TOP_K: usize = 10;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    k: Option<usize>,
}

/// `0.8765` -> `"87.65%"`
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// Rejects missing/empty messages and messages longer than `max_chars` characters.
fn validate_message(message: Option<String>, max_chars: usize) -> Result<String, ApiError> {
    let message = message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No message provided".to_string()))?;
    if message.chars().count() > max_chars {
        return Err(ApiError::BadRequest(format!(
            "Message too long. Maximum {} characters allowed.",
            max_chars
        )));
    }
    Ok(message)
}

/// POST /chat – `{"message": "..."}` -> `{"response", "intent", "confidence"?}`.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let message = match body {
        Ok(Json(req)) => req.message,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable chat request body");
            None
        }
    };
    let message = validate_message(message, state.config.max_message_chars)?;

    let reply = state.engine.reply(&message).await;

    let entry = ConversationLogEntry::now(&message, &reply.intent, &reply.response)
        .with_confidence(reply.confidence);
    if let Err(e) = state.log.append(&entry).await {
        tracing::error!(
            path = %state.log.path().display(),
            error = %e,
            "Error processing chat request: conversation log write failed"
        );
        return Err(ApiError::Internal);
    }

    tracing::info!(intent = %reply.intent, chars = message.chars().count(), "Chat handled");

    let mut result = serde_json::json!({
        "response": reply.response,
        "intent": reply.intent,
    });
    if let Some(confidence) = reply.confidence {
        result["confidence"] = serde_json::Value::String(format_confidence(confidence));
    }
    Ok(axum::Json(result))
}

/// POST /classify – `{"message": "...", "k": 3}` -> ranked candidate intents.
pub async fn classify(
    State(state): State<AppState>,
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let (message, k) = match body {
        Ok(Json(req)) => (req.message, req.k),
        Err(_) => (None, None),
    };
    let message = validate_message(message, state.config.max_message_chars)?;
    let k = k.unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_TOP_K);

    let ranking = state.engine.rank_intents(&message, k).await;
    let predictions: Vec<serde_json::Value> = ranking
        .predictions
        .iter()
        .map(|Prediction { intent, confidence }| {
            serde_json::json!({
                "intent": intent,
                "confidence": format_confidence(*confidence),
            })
        })
        .collect();

    Ok(axum::Json(serde_json::json!({
        "source": ranking.source,
        "predictions": predictions,
    })))
}
