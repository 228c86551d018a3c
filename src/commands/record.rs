//! Audio capture and webhook delivery.
//!
//! Records audio with real-time frequency-bar visualization, backs the
//! finished recording up locally, logs it in history, and delivers it to
//! the configured webhook. Supports external finish triggers via SIGUSR1.

use crate::capture::visualizer::parse_color;
use crate::capture::{CaptureCommand, CaptureConfig, CaptureTui, Recorder};
use crate::config::VoicedropConfig;
use crate::history::HistoryStore;
use crate::ui::ErrorScreen;
use crate::upload::{FileCategory, UploadMetadata, WebhookClient};
use anyhow::anyhow;
use chrono::Local;
use ratatui::style::Color;
use std::fs;
use std::path::PathBuf;

const FALLBACK_ACCENT: Color = Color::Rgb(245, 158, 11);

/// Handles audio capture and webhook delivery.
///
/// Records with real-time visualization until the user finishes or
/// discards, then backs up, logs, and delivers the recording.
pub async fn handle_record(no_upload: bool, output: Option<PathBuf>) -> Result<(), anyhow::Error> {
    tracing::info!("=== voicedrop capture started ===");

    let config = match VoicedropConfig::load_or_init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            let error_message = format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/voicedrop/voicedrop.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, echo_cancellation={}, noise_suppression={}",
        config.audio.device,
        config.audio.sample_rate,
        config.audio.echo_cancellation,
        config.audio.noise_suppression
    );

    let capture_config = CaptureConfig {
        device: config.audio.device.clone(),
        sample_rate: config.audio.sample_rate,
        echo_cancellation: config.audio.echo_cancellation,
        noise_suppression: config.audio.noise_suppression,
    };

    let mut recorder = Recorder::new(capture_config);
    recorder.start().await;

    if let Some(err) = recorder.last_error() {
        let error_message = format!(
            "Recording Error:\n\n{err}\n\nPlease check your audio configuration and try again."
        );
        let mut error_screen = ErrorScreen::new()?;
        error_screen.show_error(&error_message)?;
        error_screen.cleanup()?;
        return Err(anyhow!("{err}"));
    }

    let accent = parse_color(&config.visualizer.accent_color).unwrap_or(FALLBACK_ACCENT);
    let mut tui =
        CaptureTui::new(accent).map_err(|e| anyhow!("Failed to initialize UI: {e}"))?;

    let term = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let term_clone = term.clone();
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, term_clone)
        .map_err(|e| anyhow!("Failed to register signal handler: {e}"))?;

    tracing::debug!(
        "Entering capture loop. Press 'Enter' to deliver or 'Escape'/'q' to discard."
    );
    let mut frame_count = 0u64;
    let mut should_deliver = false;

    loop {
        if term.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: finishing via external trigger");
            should_deliver = true;
            break;
        }

        match tui.handle_input() {
            Ok(CaptureCommand::Continue) => {
                frame_count += 1;
                if frame_count % 60 == 0 {
                    tracing::debug!("Recording: {}s elapsed", recorder.elapsed_seconds());
                }

                tui.render(&recorder)
                    .map_err(|e| anyhow!("Render failed: {e}"))?;
            }
            Ok(CaptureCommand::Finish) => {
                should_deliver = true;
                break;
            }
            Ok(CaptureCommand::Cancel) => {
                break;
            }
            Err(e) => {
                tracing::error!("Input handling error: {}", e);
                tui.cleanup().ok();
                return Err(anyhow!("Input handling error: {e}"));
            }
        }
    }

    tracing::debug!("Stopping recording...");
    let blob = recorder.stop().await;

    tui.cleanup()
        .map_err(|e| anyhow!("Cleanup failed: {e}"))?;

    if !should_deliver {
        tracing::info!("Recording discarded by user");
        println!("Recording discarded.");
        return Ok(());
    }

    let Some(blob) = blob else {
        println!("No audio captured.");
        return Ok(());
    };

    // Back the recording up locally before any delivery attempt
    let file_name = format!(
        "voicedrop-audio-{}.wav",
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let destination = match output {
        Some(path) => path,
        None => {
            let recordings_dir = dirs::home_dir()
                .ok_or_else(|| anyhow!("Could not determine home directory"))?
                .join(".local")
                .join("share")
                .join("voicedrop")
                .join("recordings");
            fs::create_dir_all(&recordings_dir)?;
            recordings_dir.join(&file_name)
        }
    };
    fs::write(&destination, &blob.data)?;
    tracing::info!(
        "Recording saved: {} ({} bytes)",
        destination.display(),
        blob.data.len()
    );

    let data_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".local")
        .join("share")
        .join("voicedrop");
    let mut history = HistoryStore::new(&data_dir)?;
    let entry_id = history.insert_pending("audio", &file_name, Some(blob.duration_secs as f64))?;

    if no_upload {
        println!(
            "{} Recording saved to {}",
            console::style("✓").green(),
            destination.display()
        );
        return Ok(());
    }

    let metadata = UploadMetadata::new(
        FileCategory::Audio,
        &file_name,
        blob.mime,
        blob.data.len() as u64,
        &config.contributor,
    );

    let delivery = match WebhookClient::new(&config.webhook.url) {
        Ok(client) => client.send_bytes(blob.data, &metadata).await,
        Err(e) => Err(e),
    };

    match delivery {
        Ok(()) => {
            history.mark_complete(entry_id)?;
            println!(
                "{} Recording delivered ({:.0}s, saved to {})",
                console::style("✓").green(),
                blob.duration_secs,
                destination.display()
            );
        }
        Err(e) => {
            tracing::warn!("Webhook delivery failed: {}", e);
            history.mark_error(entry_id, &e.to_string())?;
            eprintln!(
                "{} Delivery failed: {e}\nThe recording is kept at {}",
                console::style("✗").red(),
                destination.display()
            );
        }
    }

    tracing::info!("=== voicedrop capture exited ===");
    Ok(())
}
