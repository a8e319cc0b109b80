use std::path::{Path, PathBuf};
use std::time::Duration;

use markerview_capture::SourceConfig;
use markerview_common::ResourceBase;
use markerview_frame::{DEFAULT_MAX_DELTA_MS, FrameClock};
use markerview_render::RendererConfig;
use markerview_track::{ContextConfig, DetectionMode, MarkerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_base_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_camera_parameters_url() -> String {
    ContextConfig::default().camera_parameters_url
}

fn default_resize_delay_ms() -> u64 {
    2000
}

fn default_max_delta_ms() -> f64 {
    DEFAULT_MAX_DELTA_MS
}

/// Application configuration, read from YAML. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory all resource URLs are resolved against. A relative path is
    /// taken relative to the config file.
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    pub source: SourceConfig,
    #[serde(default = "default_camera_parameters_url")]
    pub camera_parameters_url: String,
    pub detection_mode: DetectionMode,
    pub marker: MarkerConfig,
    /// Recorded marker track for the replay detector. Without one a
    /// generated orbit is played.
    pub track_url: Option<String>,
    /// Delay between source readiness and the one-time layout pass.
    #[serde(default = "default_resize_delay_ms")]
    pub resize_delay_ms: u64,
    #[serde(default = "default_max_delta_ms")]
    pub max_delta_ms: f64,
    pub renderer: RendererConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            source: SourceConfig::default(),
            camera_parameters_url: default_camera_parameters_url(),
            detection_mode: DetectionMode::default(),
            marker: MarkerConfig::default(),
            track_url: None,
            resize_delay_ms: default_resize_delay_ms(),
            max_delta_ms: default_max_delta_ms(),
            renderer: RendererConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        if config.base_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.base_path = dir.join(&config.base_path);
            }
        }
        tracing::debug!(path = %path.display(), base = %config.base_path.display(), "config loaded");
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.renderer.width == 0 || self.renderer.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "renderer size {}x{} must be non-zero",
                self.renderer.width, self.renderer.height
            )));
        }
        match &self.source {
            SourceConfig::Webcam { width, height, .. } | SourceConfig::Synthetic { width, height }
                if *width == 0 || *height == 0 =>
            {
                return Err(ConfigError::Invalid(format!(
                    "{} source size {width}x{height} must be non-zero",
                    self.source.kind()
                )));
            }
            SourceConfig::Image { url } | SourceConfig::Video { url } if url.is_empty() => {
                return Err(ConfigError::Invalid(format!("{} source needs a url", self.source.kind())));
            }
            _ => {}
        }
        if !(self.max_delta_ms.is_finite() && self.max_delta_ms > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_delta_ms must be positive, got {}",
                self.max_delta_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.marker.min_confidence) {
            return Err(ConfigError::Invalid(format!(
                "marker.min_confidence must be within 0..=1, got {}",
                self.marker.min_confidence
            )));
        }
        Ok(())
    }

    pub fn resource_base(&self) -> ResourceBase {
        ResourceBase::new(&self.base_path)
    }

    /// Detection context settings. The detection canvas starts at the
    /// renderer's size.
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            camera_parameters_url: self.camera_parameters_url.clone(),
            detection_mode: self.detection_mode,
            canvas_size: self.renderer.size(),
        }
    }

    pub fn resize_delay(&self) -> Duration {
        Duration::from_millis(self.resize_delay_ms)
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::with_max_delta(self.max_delta_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markerview_track::ChangeMatrixMode;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = AppConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.source.kind(), "webcam");
        assert_eq!(config.camera_parameters_url, "data/camera_para.dat");
        assert_eq!(config.marker.pattern_url, "data/patt.hiro");
        assert_eq!(config.marker.change_matrix_mode, ChangeMatrixMode::CameraTransformMatrix);
        assert_eq!(config.resize_delay(), Duration::from_secs(2));
        assert_eq!(config.frame_clock().max_delta_ms(), 200.0);
    }

    #[test]
    fn parses_full_file() {
        let yaml = r#"
base_path: /srv/markers
source:
  kind: video
  url: data/videos/headtracking.gif
detection_mode: color_and_matrix
marker:
  pattern_url: data/patt.kanji
  change_matrix_mode: model_view_matrix
track_url: data/track.json
resize_delay_ms: 500
max_delta_ms: 100
renderer:
  width: 1280
  height: 720
  antialias: false
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.source.kind(), "video");
        assert_eq!(config.detection_mode, DetectionMode::ColorAndMatrix);
        assert_eq!(config.marker.pattern_url, "data/patt.kanji");
        assert_eq!(config.track_url.as_deref(), Some("data/track.json"));
        assert_eq!(config.resize_delay(), Duration::from_millis(500));
        assert_eq!(config.context_config().canvas_size.width, 1280);
        assert!(config.renderer.alpha);
    }

    #[test]
    fn rejects_zero_renderer_size() {
        let err = AppConfig::from_yaml_str("renderer:\n  width: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_source_size() {
        let err = AppConfig::from_yaml_str("source:\n  kind: synthetic\n  width: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_positive_max_delta() {
        assert!(AppConfig::from_yaml_str("max_delta_ms: 0\n").is_err());
        assert!(AppConfig::from_yaml_str("max_delta_ms: -5\n").is_err());
    }

    #[test]
    fn rejects_unknown_source_kind() {
        assert!(matches!(
            AppConfig::from_yaml_str("source:\n  kind: hologram\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_resolves_base_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markerview.yaml");
        std::fs::write(&path, "base_path: assets\n").unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.base_path, dir.path().join("assets"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppConfig::load(dir.path().join("nope.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn yaml_round_trip() {
        let config = AppConfig::default();
        let back = AppConfig::from_yaml_str(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
