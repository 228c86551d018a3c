//! Upload an existing file to the webhook.
//!
//! Delivers a pre-existing audio or image file through the same pipeline
//! as live recordings, including the history entry.

use crate::config::VoicedropConfig;
use crate::history::HistoryStore;
use crate::upload::{guess_mime, FileCategory, UploadMetadata, WebhookClient};
use anyhow::anyhow;
use std::path::PathBuf;

/// Handles delivery of an existing file.
///
/// The category is inferred from the extension unless overridden.
///
/// # Errors
/// - If the file does not exist or its category cannot be determined
/// - If delivery fails
pub async fn handle_send(file: PathBuf, category: Option<String>) -> Result<(), anyhow::Error> {
    if !file.is_file() {
        return Err(anyhow!("File not found: {}", file.display()));
    }

    let category = match category {
        Some(value) => FileCategory::parse(&value)
            .ok_or_else(|| anyhow!("Unknown category '{value}'. Use \"audio\" or \"image\"."))?,
        None => FileCategory::from_path(&file).ok_or_else(|| {
            anyhow!(
                "Could not infer a category for {}. Pass --category audio|image.",
                file.display()
            )
        })?,
    };

    let config = VoicedropConfig::load_or_init()?;

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "attachment".to_string());
    let file_size = std::fs::metadata(&file)?.len();
    let metadata = UploadMetadata::new(
        category,
        &file_name,
        guess_mime(&file),
        file_size,
        &config.contributor,
    );

    tracing::info!(
        "Sending {} ({}, {} bytes) to webhook",
        file_name,
        category,
        file_size
    );

    let data_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".local")
        .join("share")
        .join("voicedrop");
    let mut history = HistoryStore::new(&data_dir)?;
    let entry_id = history.insert_pending(category.as_str(), &file_name, None)?;

    let client = WebhookClient::new(&config.webhook.url)?;
    match client.send_file(&file, &metadata).await {
        Ok(()) => {
            history.mark_complete(entry_id)?;
            println!("{} {} delivered", console::style("✓").green(), file_name);
            Ok(())
        }
        Err(e) => {
            history.mark_error(entry_id, &e.to_string())?;
            Err(e)
        }
    }
}
