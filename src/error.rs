//! Error types for the bridge.

use axum::http::StatusCode;

/// Failure of a single Chatwoot API call. Carries the HTTP status when the
/// platform answered at all, `None` on transport failure.
#[derive(Debug, thiserror::Error)]
#[error("Chatwoot API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct PlatformError {
    pub status: Option<u16>,
    pub message: String,
}

impl PlatformError {
    pub fn transport(err: reqwest::Error) -> Self {
        Self {
            status: None,
            message: err.to_string(),
        }
    }
}

/// Failure of the Botpress converse call.
#[derive(Debug, thiserror::Error)]
#[error("Botpress API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct AutomationError {
    pub status: Option<u16>,
    pub message: String,
}

impl AutomationError {
    pub fn transport(err: reqwest::Error) -> Self {
        Self {
            status: None,
            message: err.to_string(),
        }
    }
}

/// Failure while fetching a Botpress-hosted blob for re-upload.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentFetchError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("temp spool failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal failure of one webhook relay. `Display` is the message returned
/// to the webhook caller.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid data format: expected a JSON object")]
    MalformedInput,

    #[error("{context}: {source}")]
    Platform {
        context: &'static str,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    Automation(#[from] AutomationError),

    #[error("failed to get botpress response")]
    EmptyReply,

    #[error("no available human agent found")]
    NoAgentAvailable,

    #[error("failed to download file from botpress")]
    AttachmentFetch(#[from] AttachmentFetchError),
}

impl BridgeError {
    /// HTTP status reported to the webhook caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::MalformedInput => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Attach a relay-step context to a platform failure.
    pub fn platform(context: &'static str) -> impl FnOnce(PlatformError) -> Self {
        move |source| BridgeError::Platform { context, source }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_is_client_error() {
        assert_eq!(
            BridgeError::MalformedInput.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn platform_error_is_server_error() {
        let err = BridgeError::platform("failed to send message to chatwoot")(PlatformError {
            status: Some(422),
            message: "unprocessable".into(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "failed to send message to chatwoot: Chatwoot API error (422): unprocessable"
        );
    }

    #[test]
    fn transport_error_omits_status() {
        let err = PlatformError {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Chatwoot API error: connection refused");
    }
}
