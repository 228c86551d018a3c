//! Contribution history listing.
//!
//! Prints previous contributions with their webhook delivery status.

use crate::history::{HistoryStore, UploadStatus};
use console::style;

/// Displays the contribution history, most recent first.
///
/// # Errors
/// - If data directory cannot be determined
/// - If the history store fails to load entries
pub fn handle_history() -> Result<(), anyhow::Error> {
    tracing::info!("=== voicedrop history ===");

    let data_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".local")
        .join("share")
        .join("voicedrop");

    let mut store = HistoryStore::new(&data_dir)?;
    let entries = store.list()?;

    if entries.is_empty() {
        println!("No contributions yet. Run 'voicedrop' to record one.");
        return Ok(());
    }

    println!();
    for entry in &entries {
        let marker = match entry.status {
            UploadStatus::Complete => style("✓").green(),
            UploadStatus::Error => style("✗").red(),
            UploadStatus::Pending => style("…").yellow(),
        };

        let duration = entry
            .duration_secs
            .map(|d| format!(" {:.0}s", d))
            .unwrap_or_default();

        println!(
            "  {} {}  {} [{}]{}",
            marker,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.file_name,
            entry.category,
            duration
        );

        if let Some(error) = &entry.error {
            println!("      {}", style(error).dim());
        }
    }
    println!();
    println!("{} contributions", entries.len());

    Ok(())
}
