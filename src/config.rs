//! Environment configuration.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default listen port when `PORT` is unset.
const DEFAULT_PORT: u16 = 3100;

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chatwoot base URL, no trailing slash.
    pub chatwoot_base_url: String,
    pub chatwoot_account_id: String,
    /// Inbox whose members form the handoff roster.
    pub chatwoot_inbox_id: String,
    /// Admin-scoped token: status, assignment, member listing.
    pub admin_token: SecretString,
    /// Bot-scoped token: message send only.
    pub bot_token: SecretString,
    /// Botpress base URL, no trailing slash.
    pub botpress_base_url: String,
    pub botpress_bot_id: String,
    pub port: u16,
}

impl Config {
    /// Load from the environment. Missing required variables fail here,
    /// at startup, never per-request.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".into(),
                message: format!("not a valid port number: {raw}"),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            chatwoot_base_url: trim_base_url(required("CHATWOOT_BASE_URL")?),
            chatwoot_account_id: required("CHATWOOT_ACCOUNT_ID")?,
            chatwoot_inbox_id: required("CHATWOOT_INBOX_ID")?,
            admin_token: SecretString::from(required("CHATWOOT_ADMIN_API_TOKEN")?),
            bot_token: SecretString::from(required("CHATWOOT_BOT_API_TOKEN")?),
            botpress_base_url: trim_base_url(required("BOTPRESS_BASE_URL")?),
            botpress_bot_id: required("BOTPRESS_BOT_ID")?,
            port,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
