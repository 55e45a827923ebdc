//! Attachment download — spool a Botpress-hosted blob to a temp file so it
//! can be re-uploaded to Chatwoot.
//!
//! The temp file is removed when `FetchedBlob` drops, which covers every
//! exit path of the relay, including early error returns.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::error::AttachmentFetchError;

/// Fallback MIME type when the blob server sends no Content-Type.
const DEFAULT_MIME: &str = "application/octet-stream";

/// Fallback filename when the URL path has no usable last segment.
const DEFAULT_FILENAME: &str = "attachment";

/// A downloaded blob, spooled to a temp file.
pub struct FetchedBlob {
    file: NamedTempFile,
    pub file_name: String,
    pub mime_type: String,
}

impl FetchedBlob {
    /// Read the spooled bytes back for upload.
    pub async fn bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.file.path()).await
    }
}

/// Download `url` into a temp file. Non-2xx counts as failure; the caller
/// maps any error here to its attachment-fetch taxonomy.
pub async fn fetch_to_temp(
    client: &reqwest::Client,
    url: &str,
) -> Result<FetchedBlob, AttachmentFetchError> {
    let resp = client.get(url).send().await?.error_for_status()?;

    let mime_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_MIME)
        .to_string();
    let file_name = file_name_from_url(url);
    let bytes = resp.bytes().await?;

    let mut file = NamedTempFile::new()?;
    file.write_all(&bytes)?;
    file.flush()?;

    tracing::debug!(url, %file_name, %mime_type, size = bytes.len(), "downloaded attachment");
    Ok(FetchedBlob {
        file,
        file_name,
        mime_type,
    })
}

/// Derive an upload filename from the URL path's last segment, query string
/// stripped.
pub fn file_name_from_url(url: &str) -> String {
    let without_query = url.split_once('?').map_or(url, |(path, _)| path);
    let without_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    match without_scheme.trim_end_matches('/').split_once('/') {
        Some((_, path)) => {
            let name = path.rsplit('/').next().unwrap_or_default();
            if name.is_empty() {
                DEFAULT_FILENAME.to_string()
            } else {
                name.to_string()
            }
        }
        None => DEFAULT_FILENAME.to_string(),
    }
}
