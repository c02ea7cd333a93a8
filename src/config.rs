use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Engine policy knobs. Defaults are the production constants; a JSON
/// settings file and the `POSEPAL_SERVER_URL` environment variable can
/// override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub server_url: String,
    pub request_timeout_ms: u64,
    /// Network tick period for the streaming loop.
    pub frame_interval_ms: u64,
    /// Capture-refresh tick period for polling the frame source.
    pub refresh_interval_ms: u64,
    /// How long `just_detected` stays true after a rep signal.
    pub rep_display_window_ms: u64,
    pub frame_max_width: u32,
    pub frame_max_height: u32,
    pub jpeg_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_ms: 10_000,
            frame_interval_ms: 100,
            refresh_interval_ms: 33,
            rep_display_window_ms: 2_000,
            frame_max_width: 640,
            frame_max_height: 480,
            jpeg_quality: 70,
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut config: EngineConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("POSEPAL_SERVER_URL") {
            if !url.is_empty() {
                self.server_url = url;
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn rep_display_window(&self) -> Duration {
        Duration::from_millis(self.rep_display_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_policy_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.frame_interval_ms, 100);
        assert_eq!(config.rep_display_window_ms, 2_000);
        assert_eq!(config.frame_max_width, 640);
        assert_eq!(config.frame_max_height, 480);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server_url":"http://10.0.0.2:9000","frame_interval_ms":50}}"#
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server_url, "http://10.0.0.2:9000");
        assert_eq!(config.frame_interval_ms, 50);
        assert_eq!(config.refresh_interval_ms, 33);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(EngineConfig::from_file(file.path()).is_err());
    }
}
