//! Botpress client — one converse call per incoming visitor message.
//!
//! Conversational state on the Botpress side is keyed by the Chatwoot
//! conversation id, so each conversation gets its own session.

use serde::Deserialize;

use crate::config::Config;
use crate::error::AutomationError;

/// Media kinds Botpress can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    File,
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::File => "file",
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Structured result of one converse call. Exactly one variant per reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotReply {
    Text(String),
    /// The bot asked for a human takeover (literal reply text "handoff").
    Handoff,
    Media {
        kind: MediaKind,
        url: String,
        title: Option<String>,
    },
    /// No usable response; the orchestrator treats this as a failure.
    Empty,
}

/// One element of the Botpress `responses` array.
#[derive(Debug, Deserialize)]
struct ResponseItem {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    video: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConverseResponse {
    #[serde(default)]
    responses: Vec<ResponseItem>,
}

/// Sentinel reply text that requests a human takeover.
const HANDOFF_SENTINEL: &str = "handoff";

/// Botpress converse-API client.
#[derive(Clone)]
pub struct BotpressClient {
    client: reqwest::Client,
    base_url: String,
    bot_id: String,
}

impl BotpressClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.botpress_base_url.clone(),
            bot_id: config.botpress_bot_id.clone(),
        }
    }

    /// Submit one conversation turn and classify the reply.
    pub async fn converse(
        &self,
        conversation_id: i64,
        text: &str,
    ) -> Result<BotReply, AutomationError> {
        let url = format!(
            "{}/api/v1/bots/{}/converse/{}",
            self.base_url, self.bot_id, conversation_id
        );

        let resp = self
            .client
            .post(url)
            .json(&serde_json::json!({ "type": "text", "text": text }))
            .send()
            .await
            .map_err(AutomationError::transport)?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AutomationError {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: ConverseResponse = resp.json().await.map_err(AutomationError::transport)?;
        let reply = classify_reply(&body);
        tracing::debug!(conversation_id, reply = ?reply_kind(&reply), "botpress replied");
        Ok(reply)
    }
}

fn reply_kind(reply: &BotReply) -> &'static str {
    match reply {
        BotReply::Text(_) => "text",
        BotReply::Handoff => "handoff",
        BotReply::Media { kind, .. } => kind.as_str(),
        BotReply::Empty => "empty",
    }
}

/// Classify the first response element into a `BotReply`. Only the first
/// element is consulted; no elements at all means `Empty`.
fn classify_reply(body: &ConverseResponse) -> BotReply {
    let Some(first) = body.responses.first() else {
        return BotReply::Empty;
    };

    let media = match first.kind.as_deref() {
        Some("file") => Some((MediaKind::File, first.file.as_ref())),
        Some("image") => Some((MediaKind::Image, first.image.as_ref())),
        Some("audio") => Some((MediaKind::Audio, first.audio.as_ref())),
        Some("video") => Some((MediaKind::Video, first.video.as_ref())),
        _ => None,
    };
    if let Some((kind, url)) = media {
        // A media type tag without its URL field is unusable.
        return match url {
            Some(url) => BotReply::Media {
                kind,
                url: url.clone(),
                title: first.title.clone(),
            },
            None => BotReply::Empty,
        };
    }

    match first.text.as_deref() {
        Some(HANDOFF_SENTINEL) => BotReply::Handoff,
        Some(text) if !text.is_empty() => BotReply::Text(text.to_string()),
        _ => BotReply::Empty,
    }
}
