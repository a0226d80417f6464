/// Player configuration
use anyhow::{bail, Context, Result};
use poolside_client::{ClientConfig, DEFAULT_CATALOG_URL, DEFAULT_STREAM_URL};
use poolside_playback::{ResampleQuality, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "poolside.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PoolsideConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub audio: AudioSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiSettings {
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    #[serde(default = "default_catalog_timeout_secs")]
    pub catalog_timeout_secs: u64,

    /// Unset means track fetches never time out
    #[serde(default)]
    pub stream_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_buffer_ms")]
    pub buffer_ms: u32,

    #[serde(default)]
    pub resample_quality: ResampleQuality,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_volume")]
    pub volume: i32,

    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Fixed seed for random selection
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PoolsideConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; the default file is optional.
    /// `POOLSIDE_<SECTION>__<KEY>` variables override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("POOLSIDE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .context("Failed to parse configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be positive");
        }
        if self.audio.buffer_ms == 0 {
            bail!("audio.buffer_ms must be positive");
        }
        if self.playback.progress_interval_ms == 0 {
            bail!("playback.progress_interval_ms must be positive");
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            catalog_url: self.api.catalog_url.clone(),
            stream_url: self.api.stream_url.clone(),
            catalog_timeout: Duration::from_secs(self.api.catalog_timeout_secs),
            stream_timeout: self.api.stream_timeout_secs.map(Duration::from_secs),
            ..ClientConfig::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            volume: self.playback.volume,
            progress_interval: self.progress_interval(),
            resample_quality: self.audio.resample_quality,
            seed: self.playback.seed,
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.playback.progress_interval_ms)
    }

    /// Output buffer size in frames
    pub fn buffer_frames(&self) -> u32 {
        (u64::from(self.audio.sample_rate) * u64::from(self.audio.buffer_ms) / 1000) as u32
    }
}

// Default values
fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_stream_url() -> String {
    DEFAULT_STREAM_URL.to_string()
}

fn default_catalog_timeout_secs() -> u64 {
    10
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_buffer_ms() -> u32 {
    100
}

fn default_volume() -> i32 {
    100
}

fn default_progress_interval_ms() -> u64 {
    1000
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            stream_url: default_stream_url(),
            catalog_timeout_secs: default_catalog_timeout_secs(),
            stream_timeout_secs: None,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_ms: default_buffer_ms(),
            resample_quality: ResampleQuality::default(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            progress_interval_ms: default_progress_interval_ms(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = PoolsideConfig::from_toml("").unwrap();

        assert_eq!(config.api.catalog_url, DEFAULT_CATALOG_URL);
        assert_eq!(config.api.catalog_timeout_secs, 10);
        assert!(config.api.stream_timeout_secs.is_none());
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.buffer_frames(), 4410);
        assert_eq!(config.playback.volume, 100);
        assert_eq!(config.progress_interval(), Duration::from_secs(1));
    }

    #[test]
    fn file_values_override_defaults() {
        let config = PoolsideConfig::from_toml(
            r#"
            [api]
            stream_timeout_secs = 30

            [audio]
            sample_rate = 48000
            resample_quality = "high"

            [playback]
            volume = 80
            seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.client_config().stream_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.audio.resample_quality, ResampleQuality::High);
        assert_eq!(config.buffer_frames(), 4800);

        let session = config.session_config();
        assert_eq!(session.volume, 80);
        assert_eq!(session.seed, Some(42));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = PoolsideConfig::from_toml("[playback]\nprogress_interval_ms = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_quality_is_rejected() {
        let result = PoolsideConfig::from_toml("[audio]\nresample_quality = \"ultra\"\n");
        assert!(result.is_err());
    }
}
