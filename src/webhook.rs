//! Webhook endpoint and relay orchestrator.
//!
//! One inbound Chatwoot event per invocation: classify it, consult
//! Botpress when a reply is due, and drive the dependent Chatwoot calls
//! in order. Each step's success gates the next; the first failure
//! becomes the webhook response.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::attachment;
use crate::botpress::{BotReply, BotpressClient};
use crate::chatwoot::ChatwootClient;
use crate::error::{AttachmentFetchError, BridgeError};
use crate::rotation::AgentRotation;

/// Notice posted to the visitor before reassigning to a human.
const HANDOFF_NOTICE: &str = "Please wait while I connect you to a human agent";

/// Shared service state. Cloned per request; only the rotation cursor is
/// actually shared across invocations.
#[derive(Clone)]
pub struct AppState {
    pub chatwoot: ChatwootClient,
    pub botpress: BotpressClient,
    pub rotation: Arc<AgentRotation>,
    /// Plain client for fetching Botpress-hosted attachment blobs.
    pub http: reqwest::Client,
}

// ── Inbound event model ─────────────────────────────────────────────

/// Raw Chatwoot webhook payload, reduced to the fields the relay reads.
/// Everything is optional; classification decides what is required.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Top-level conversation id, as sent on resolution events.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub conversation: Option<Conversation>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub meta: ConversationMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationMeta {
    /// `Some` only when a human currently owns the conversation
    /// (JSON `null` deserializes to `None`).
    #[serde(default)]
    pub assignee: Option<serde_json::Value>,
}

/// Terminal outcome of one relay, minus errors.
#[derive(Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Success(&'static str),
    Ignored(&'static str),
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the service router. Route name `/botpress` is retained for
/// compatibility with existing Chatwoot webhook configurations.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/botpress", post(handle_webhook))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn handle_webhook(State(state): State<AppState>, body: String) -> Response {
    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(err) => return error_response(&err),
    };

    match relay(&state, event).await {
        Ok(RelayOutcome::Success(message)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "success", "message": message })),
        )
            .into_response(),
        Ok(RelayOutcome::Ignored(reason)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ignored", "reason": reason })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "webhook relay failed");
            error_response(&err)
        }
    }
}

fn error_response(err: &BridgeError) -> Response {
    (
        err.status_code(),
        Json(serde_json::json!({ "status": "error", "message": err.to_string() })),
    )
        .into_response()
}

/// Parse the raw body. Anything but a JSON object is malformed input,
/// reported as a client error.
fn parse_event(body: &str) -> Result<WebhookEvent, BridgeError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| BridgeError::MalformedInput)?;
    if !value.is_object() {
        return Err(BridgeError::MalformedInput);
    }
    serde_json::from_value(value).map_err(|_| BridgeError::MalformedInput)
}

// ── Relay orchestrator ──────────────────────────────────────────────

/// Drive one event through the state machine.
pub async fn relay(state: &AppState, event: WebhookEvent) -> Result<RelayOutcome, BridgeError> {
    // Resolution events short-circuit everything else: hand the
    // conversation back to the bot.
    if event.event.as_deref() == Some("conversation_resolved") {
        let conversation_id = event
            .id
            .or_else(|| event.conversation.as_ref().and_then(|c| c.id))
            .ok_or(BridgeError::MalformedInput)?;
        state
            .chatwoot
            .set_assignee(conversation_id, None)
            .await
            .map_err(BridgeError::platform("failed to reassign conversation to bot"))?;
        return Ok(RelayOutcome::Success("Conversation resolved"));
    }

    let conversation = event.conversation.unwrap_or_default();

    // Pending conversations are reopened best-effort; a failure here must
    // not abort the rest of the relay.
    if conversation.status.as_deref() == Some("pending") {
        if let Some(conversation_id) = conversation.id {
            if let Err(err) = state.chatwoot.set_status(conversation_id, "open").await {
                tracing::warn!(conversation_id, error = %err, "failed to reopen pending conversation");
            }
        }
    }

    // Only visitor messages on bot-owned conversations get a reply.
    let human_assigned = conversation.meta.assignee.is_some();
    if event.message_type.as_deref() != Some("incoming") || human_assigned {
        return Ok(RelayOutcome::Ignored("not an incoming message"));
    }

    let conversation_id = conversation.id.ok_or(BridgeError::MalformedInput)?;
    let content = event.content.unwrap_or_default();

    let reply = state.botpress.converse(conversation_id, &content).await?;
    match reply {
        BotReply::Empty => Err(BridgeError::EmptyReply),

        BotReply::Text(text) => {
            state
                .chatwoot
                .send_message(conversation_id, &text)
                .await
                .map_err(BridgeError::platform("failed to send message to chatwoot"))?;
            Ok(RelayOutcome::Success("Message processed successfully"))
        }

        BotReply::Handoff => {
            state
                .chatwoot
                .send_message(conversation_id, HANDOFF_NOTICE)
                .await
                .map_err(BridgeError::platform("failed to send handoff message"))?;

            // Notice is confirmed sent; now pick and assign an agent.
            let roster = state
                .chatwoot
                .list_inbox_members()
                .await
                .map_err(BridgeError::platform("failed to fetch inbox members"))?;
            let agent_id = state
                .rotation
                .next(&roster)
                .ok_or(BridgeError::NoAgentAvailable)?;
            state
                .chatwoot
                .set_assignee(conversation_id, Some(agent_id))
                .await
                .map_err(BridgeError::platform("failed to update conversation assignment"))?;
            tracing::info!(conversation_id, agent_id, "conversation handed off");
            Ok(RelayOutcome::Success("Handoff processed successfully"))
        }

        BotReply::Media { kind, url, title } => {
            tracing::info!(conversation_id, kind = kind.as_str(), ?title, "relaying attachment");
            let blob = attachment::fetch_to_temp(&state.http, &url).await?;
            let bytes = blob
                .bytes()
                .await
                .map_err(|e| BridgeError::AttachmentFetch(AttachmentFetchError::Io(e)))?;
            state
                .chatwoot
                .send_attachment(conversation_id, bytes, &blob.file_name, &blob.mime_type)
                .await
                .map_err(BridgeError::platform("failed to send attachment to chatwoot"))?;
            Ok(RelayOutcome::Success("Attachment sent successfully"))
        }
    }
}
