//! Webhook delivery for finished contributions.
//!
//! Every contribution (a finished recording or an attached file) is
//! posted to the single configured endpoint as a multipart form: an
//! `attachment` part carrying the file bytes and a `metadata` part
//! carrying a JSON sidecar with contributor details. The webhook's server
//! side is a black box; this module only guarantees a well-formed request
//! and a human-readable account of any failure.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::Path;

use crate::config::ContributorConfig;

/// Contribution category, driving the webhook's downstream routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Audio,
    Image,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }

    /// Infers the category from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "wav" | "mp3" | "m4a" | "ogg" | "webm" | "flac" | "aac" => Some(Self::Audio),
            "jpg" | "jpeg" | "png" | "gif" | "heic" | "webp" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "audio" => Some(Self::Audio),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JSON sidecar sent alongside every attachment.
#[derive(Debug, Clone, Serialize)]
pub struct UploadMetadata {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub category: String,
    pub timestamp: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub contributor_name: String,
    pub department: String,
    pub message: String,
}

impl UploadMetadata {
    /// Builds the sidecar for one contribution, substituting placeholder
    /// values for unset contributor fields.
    pub fn new(
        category: FileCategory,
        file_name: &str,
        file_type: &str,
        file_size: u64,
        contributor: &ContributorConfig,
    ) -> Self {
        let name = if contributor.name.trim().is_empty() {
            "Anonymous".to_string()
        } else {
            contributor.name.clone()
        };
        let department = if contributor.department.trim().is_empty() {
            "Not specified".to_string()
        } else {
            contributor.department.clone()
        };

        Self {
            kind: "voice_capture",
            category: category.as_str().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            file_size,
            contributor_name: name,
            department,
            message: contributor.message.clone(),
        }
    }
}

/// Client for the single delivery endpoint.
pub struct WebhookClient {
    url: String,
    client: reqwest::Client,
}

impl WebhookClient {
    /// Creates a client for the configured endpoint.
    ///
    /// # Errors
    /// - If the URL is empty (not yet configured)
    pub fn new(url: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(anyhow!(
                "No webhook URL configured. Set [webhook] url in voicedrop.toml (run 'voicedrop config')."
            ));
        }
        Ok(Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Delivers one in-memory contribution.
    ///
    /// # Errors
    /// - If the request cannot be built or sent
    /// - If the webhook responds with a non-success status
    pub async fn send_bytes(&self, data: Vec<u8>, metadata: &UploadMetadata) -> Result<()> {
        let file_part = reqwest::multipart::Part::bytes(data)
            .file_name(metadata.file_name.clone())
            .mime_str(&metadata.file_type)
            .map_err(|e| anyhow!("Failed to create attachment part for upload: {e}"))?;

        let form = reqwest::multipart::Form::new()
            .part("attachment", file_part)
            .text("metadata", serde_json::to_string(metadata)?);

        tracing::debug!(
            "Webhook delivery: {} ({}, {} bytes) to {}",
            metadata.file_name,
            metadata.category,
            metadata.file_size,
            self.url
        );

        let response = match self.client.post(&self.url).multipart(form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let error_msg = if e.is_connect() {
                    "Failed to connect to the webhook server. Check your internet connection."
                        .to_string()
                } else if e.is_timeout() {
                    "Request to the webhook timed out. The server is not responding.".to_string()
                } else {
                    format!("Webhook network error: {e}")
                };
                return Err(anyhow!(error_msg));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let human_readable = match status.as_u16() {
                401 | 403 => {
                    "The webhook rejected the request. Check the configured URL and its access settings."
                        .to_string()
                }
                404 => "Webhook URL not found. Check [webhook] url in voicedrop.toml.".to_string(),
                413 => "The file is too large for the webhook to accept.".to_string(),
                429 => "Too many requests to the webhook. Please wait and try again.".to_string(),
                500 | 502 | 503 | 504 => {
                    "The webhook server is experiencing issues. Please try again later.".to_string()
                }
                _ => format!("Webhook error (status {status}): {error_body}"),
            };

            return Err(anyhow!(human_readable));
        }

        tracing::info!("Delivered {} to webhook", metadata.file_name);
        Ok(())
    }

    /// Delivers a file from disk.
    ///
    /// # Errors
    /// - If the file cannot be read
    /// - If delivery fails (see [`WebhookClient::send_bytes`])
    pub async fn send_file(&self, path: &Path, metadata: &UploadMetadata) -> Result<()> {
        let data =
            std::fs::read(path).map_err(|e| anyhow!("Failed to read {}: {e}", path.display()))?;
        self.send_bytes(data, metadata).await
    }
}

/// Guesses a MIME type from a file extension; attachments the webhook
/// can't classify are sent as octet streams.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        Some("aac") => "audio/aac",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn metadata_serializes_with_webhook_field_names() {
        let contributor = ContributorConfig {
            name: "Sarah Jones".to_string(),
            department: "Marketing".to_string(),
            message: "From the team".to_string(),
        };
        let metadata = UploadMetadata::new(
            FileCategory::Audio,
            "note.wav",
            "audio/wav",
            1024,
            &contributor,
        );

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["type"], "voice_capture");
        assert_eq!(value["category"], "audio");
        assert_eq!(value["file_name"], "note.wav");
        assert_eq!(value["file_type"], "audio/wav");
        assert_eq!(value["file_size"], 1024);
        assert_eq!(value["contributor_name"], "Sarah Jones");
        assert_eq!(value["department"], "Marketing");
        assert_eq!(value["message"], "From the team");
        assert!(value["timestamp"].as_str().is_some());
    }

    #[test]
    fn empty_contributor_fields_get_placeholders() {
        let metadata = UploadMetadata::new(
            FileCategory::Image,
            "photo.jpg",
            "image/jpeg",
            10,
            &ContributorConfig::default(),
        );
        assert_eq!(metadata.contributor_name, "Anonymous");
        assert_eq!(metadata.department, "Not specified");
        assert!(metadata.message.is_empty());
    }

    #[test]
    fn category_inferred_from_extension() {
        assert_eq!(
            FileCategory::from_path(&PathBuf::from("a.mp3")),
            Some(FileCategory::Audio)
        );
        assert_eq!(
            FileCategory::from_path(&PathBuf::from("b.HEIC")),
            Some(FileCategory::Image)
        );
        assert_eq!(FileCategory::from_path(&PathBuf::from("c.pdf")), None);
        assert_eq!(FileCategory::from_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn mime_guessing_covers_common_types() {
        assert_eq!(guess_mime(&PathBuf::from("x.wav")), "audio/wav");
        assert_eq!(guess_mime(&PathBuf::from("x.JPG")), "image/jpeg");
        assert_eq!(guess_mime(&PathBuf::from("x.bin")), "application/octet-stream");
    }

    #[test]
    fn client_requires_configured_url() {
        assert!(WebhookClient::new("").is_err());
        assert!(WebhookClient::new("   ").is_err());
        assert!(WebhookClient::new("https://example.com/hook").is_ok());
    }
}
