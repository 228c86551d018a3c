//! Configuration file management for voicedrop.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `voicedrop list-devices`
    /// - device name from `voicedrop list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested capture sample rate in Hz (actual may differ based on device)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Request echo cancellation from the platform input pipeline
    #[serde(default = "default_true")]
    pub echo_cancellation: bool,
    /// Request noise suppression from the platform input pipeline
    #[serde(default = "default_true")]
    pub noise_suppression: bool,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_true() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

/// Visualization display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizerConfig {
    /// Bar color as a hex string, e.g. "#f59e0b"
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
}

fn default_accent_color() -> String {
    "#f59e0b".to_string()
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            accent_color: default_accent_color(),
        }
    }
}

/// Webhook delivery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// The single endpoint all contributions are delivered to
    #[serde(default)]
    pub url: String,
}

/// Contributor details attached to every delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContributorConfig {
    /// Contributor name sent with each upload ("Anonymous" if empty)
    #[serde(default)]
    pub name: String,
    /// Department or team ("Not specified" if empty)
    #[serde(default)]
    pub department: String,
    /// Optional written message accompanying each upload
    #[serde(default)]
    pub message: String,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoicedropConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub contributor: ContributorConfig,
}

impl VoicedropConfig {
    /// Loads configuration from the user's config directory, writing a
    /// default file first if none exists.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed
    pub fn load_or_init() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            let defaults = Self::default();
            defaults.save()?;
            tracing::info!("Created default config at {}", config_path.display());
            return Ok(defaults);
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: VoicedropConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Retrieves the path to the config file.
///
/// # Errors
/// - If the config directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
    let config_dir = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    let config_path = config_dir
        .join(".config")
        .join("voicedrop")
        .join("voicedrop.toml");

    std::fs::create_dir_all(config_path.parent().unwrap())?;

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_capture_constraints() {
        let config = VoicedropConfig::default();
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.sample_rate, 44100);
        assert!(config.audio.echo_cancellation);
        assert!(config.audio.noise_suppression);
        assert_eq!(config.visualizer.accent_color, "#f59e0b");
        assert!(config.webhook.url.is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: VoicedropConfig = toml::from_str(
            r#"
            [webhook]
            url = "https://example.com/webhook/voice"

            [contributor]
            name = "Sarah Jones"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.webhook.url, "https://example.com/webhook/voice");
        assert_eq!(parsed.contributor.name, "Sarah Jones");
        assert_eq!(parsed.audio.sample_rate, 44100);
        assert!(parsed.audio.noise_suppression);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = VoicedropConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: VoicedropConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.audio.sample_rate, config.audio.sample_rate);
        assert_eq!(parsed.visualizer.accent_color, config.visualizer.accent_color);
    }
}
