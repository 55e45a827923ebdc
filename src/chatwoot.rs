//! Chatwoot client — typed operations against the conversation REST API.
//!
//! Two credential scopes, never mixed: the admin token covers status,
//! assignment and member listing; the bot token covers message send.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::Config;
use crate::error::PlatformError;

/// Header Chatwoot expects its API token in.
const TOKEN_HEADER: &str = "api_access_token";

/// One inbox member as reported by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    /// Reported but not filtered on; rotation is over the full roster.
    #[serde(default)]
    pub availability_status: Option<String>,
}

/// Platform echo of a created message.
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    #[serde(default)]
    pub id: Option<i64>,
}

#[derive(Deserialize)]
struct MembersEnvelope {
    #[serde(default)]
    payload: Vec<Member>,
}

/// Chatwoot REST client, scoped to one account.
#[derive(Clone)]
pub struct ChatwootClient {
    client: reqwest::Client,
    base_url: String,
    account_id: String,
    inbox_id: String,
    admin_token: SecretString,
    bot_token: SecretString,
}

impl ChatwootClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.chatwoot_base_url.clone(),
            account_id: config.chatwoot_account_id.clone(),
            inbox_id: config.chatwoot_inbox_id.clone(),
            admin_token: config.admin_token.clone(),
            bot_token: config.bot_token.clone(),
        }
    }

    fn conversation_url(&self, conversation_id: i64, suffix: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}/conversations/{}/{}",
            self.base_url, self.account_id, conversation_id, suffix
        )
    }

    /// Post an outgoing text message (bot scope).
    pub async fn send_message(
        &self,
        conversation_id: i64,
        text: &str,
    ) -> Result<(), PlatformError> {
        let body = serde_json::json!({
            "content": text,
            "message_type": "outgoing",
        });

        let resp = self
            .client
            .post(self.conversation_url(conversation_id, "messages"))
            .header(TOKEN_HEADER, self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(PlatformError::transport)?;

        check(resp).await?;
        tracing::info!(conversation_id, "sent text message to chatwoot");
        Ok(())
    }

    /// Post an outgoing multipart message carrying binary content (bot scope).
    pub async fn send_attachment(
        &self,
        conversation_id: i64,
        bytes: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> Result<SentMessage, PlatformError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| PlatformError {
                status: None,
                message: format!("invalid MIME type {mime_type}: {e}"),
            })?;

        let form = reqwest::multipart::Form::new()
            .text("message_type", "outgoing")
            .part("attachments[]", part);

        let resp = self
            .client
            .post(self.conversation_url(conversation_id, "messages"))
            .header(TOKEN_HEADER, self.bot_token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(PlatformError::transport)?;

        let resp = check(resp).await?;
        let message: SentMessage = resp.json().await.map_err(PlatformError::transport)?;
        tracing::info!(conversation_id, file_name, "sent attachment to chatwoot");
        Ok(message)
    }

    /// Transition conversation status (admin scope). Only used pending → open.
    pub async fn set_status(
        &self,
        conversation_id: i64,
        status: &str,
    ) -> Result<(), PlatformError> {
        let resp = self
            .client
            .post(self.conversation_url(conversation_id, "toggle_status"))
            .header(TOKEN_HEADER, self.admin_token.expose_secret())
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(PlatformError::transport)?;

        check(resp).await?;
        tracing::info!(conversation_id, status, "updated conversation status");
        Ok(())
    }

    /// Set the conversation assignee (admin scope). `None` clears human
    /// ownership, handing the conversation back to the bot.
    pub async fn set_assignee(
        &self,
        conversation_id: i64,
        agent_id: Option<i64>,
    ) -> Result<(), PlatformError> {
        let resp = self
            .client
            .post(self.conversation_url(conversation_id, "assignments"))
            .header(TOKEN_HEADER, self.admin_token.expose_secret())
            .json(&serde_json::json!({ "assignee_id": agent_id }))
            .send()
            .await
            .map_err(PlatformError::transport)?;

        check(resp).await?;
        tracing::info!(conversation_id, assignee = ?agent_id, "updated conversation assignee");
        Ok(())
    }

    /// List members of the configured inbox (admin scope), in platform order.
    pub async fn list_inbox_members(&self) -> Result<Vec<Member>, PlatformError> {
        let url = format!(
            "{}/api/v1/accounts/{}/inbox_members/{}",
            self.base_url, self.account_id, self.inbox_id
        );

        let resp = self
            .client
            .get(url)
            .header(TOKEN_HEADER, self.admin_token.expose_secret())
            .send()
            .await
            .map_err(PlatformError::transport)?;

        let resp = check(resp).await?;
        let envelope: MembersEnvelope = resp.json().await.map_err(PlatformError::transport)?;
        Ok(envelope.payload)
    }
}

/// Map non-2xx responses to `PlatformError` with the body as detail.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(PlatformError {
        status: Some(status.as_u16()),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String) -> ChatwootClient {
        ChatwootClient {
            client: reqwest::Client::new(),
            base_url,
            account_id: "7".into(),
            inbox_id: "3".into(),
            admin_token: SecretString::from("admin-token"),
            bot_token: SecretString::from("bot-token"),
        }
    }

    #[tokio::test]
    async fn send_message_posts_outgoing_with_bot_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/7/conversations/42/messages"))
            .and(header(TOKEN_HEADER, "bot-token"))
            .and(body_json(serde_json::json!({
                "content": "hello!",
                "message_type": "outgoing",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        client(server.uri()).send_message(42, "hello!").await.unwrap();
    }

    #[tokio::test]
    async fn send_message_maps_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client(server.uri())
            .send_message(42, "hi")
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(401));
        assert_eq!(err.message, "unauthorized");
    }

    #[tokio::test]
    async fn send_message_maps_transport_failure() {
        // Nothing listens here.
        let err = client("http://127.0.0.1:1".into())
            .send_message(42, "hi")
            .await
            .unwrap_err();
        assert_eq!(err.status, None);
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn set_status_uses_admin_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/7/conversations/42/toggle_status"))
            .and(header(TOKEN_HEADER, "admin-token"))
            .and(body_json(serde_json::json!({"status": "open"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(server.uri()).set_status(42, "open").await.unwrap();
    }

    #[tokio::test]
    async fn set_assignee_none_serializes_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/7/conversations/42/assignments"))
            .and(body_json(serde_json::json!({"assignee_id": null})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(server.uri()).set_assignee(42, None).await.unwrap();
    }

    #[tokio::test]
    async fn set_assignee_concrete_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/7/conversations/42/assignments"))
            .and(body_json(serde_json::json!({"assignee_id": 5})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(server.uri()).set_assignee(42, Some(5)).await.unwrap();
    }

    #[tokio::test]
    async fn list_inbox_members_parses_payload_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/7/inbox_members/3"))
            .and(header(TOKEN_HEADER, "admin-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "payload": [
                    {"id": 5, "name": "Ana", "availability_status": "online"},
                    {"id": 9, "name": "Bo", "availability_status": "offline"},
                ]
            })))
            .mount(&server)
            .await;

        let members = client(server.uri()).list_inbox_members().await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, 5);
        assert_eq!(members[1].availability_status.as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn list_inbox_members_empty_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"payload": []})))
            .mount(&server)
            .await;

        let members = client(server.uri()).list_inbox_members().await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn send_attachment_multipart_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/7/conversations/42/messages"))
            .and(header(TOKEN_HEADER, "bot-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 77})))
            .expect(1)
            .mount(&server)
            .await;

        let echo = client(server.uri())
            .send_attachment(42, b"\x89PNG".to_vec(), "y.png", "image/png")
            .await
            .unwrap();
        assert_eq!(echo.id, Some(77));
    }

    #[tokio::test]
    async fn send_attachment_rejects_bad_mime() {
        let err = client("http://127.0.0.1:1".into())
            .send_attachment(42, vec![1], "f.bin", "not a mime")
            .await
            .unwrap_err();
        assert!(err.message.contains("invalid MIME type"));
    }
}
