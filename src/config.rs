use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::live::OVERLAY_CONFIDENCE;

const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_INPUT_SIZE: u32 = 192;
const DEFAULT_SEEK_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_OVERLAY_FPS: u32 = 24;

pub const KNOWN_BACKENDS: [&str; 2] = ["stub", "tract"];

#[derive(Debug, Deserialize, Default)]
struct ScorerConfigFile {
    backend: Option<BackendConfigFile>,
    video: Option<VideoConfigFile>,
    overlay: Option<OverlayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct BackendConfigFile {
    name: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    seek_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    confidence_threshold: Option<f32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub backend: BackendSettings,
    pub video: VideoSettings,
    pub overlay: OverlaySettings,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub name: String,
    pub model_path: Option<PathBuf>,
    /// Square model input side in pixels.
    pub input_size: u32,
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    /// How long to wait for a seek to report the updated position.
    pub seek_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OverlaySettings {
    pub confidence_threshold: f32,
    pub target_fps: u32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings {
                name: DEFAULT_BACKEND.to_string(),
                model_path: None,
                input_size: DEFAULT_INPUT_SIZE,
            },
            video: VideoSettings {
                seek_timeout: Duration::from_millis(DEFAULT_SEEK_TIMEOUT_MS),
            },
            overlay: OverlaySettings {
                confidence_threshold: OVERLAY_CONFIDENCE,
                target_fps: DEFAULT_OVERLAY_FPS,
            },
        }
    }
}

impl OverlaySettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.target_fps.max(1)))
    }
}

impl ScorerConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOVEMENT_SCORER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScorerConfigFile) -> Self {
        let defaults = Self::default();
        let backend = file.backend.unwrap_or_default();
        let video = file.video.unwrap_or_default();
        let overlay = file.overlay.unwrap_or_default();
        Self {
            backend: BackendSettings {
                name: backend.name.unwrap_or(defaults.backend.name),
                model_path: backend.model_path,
                input_size: backend.input_size.unwrap_or(defaults.backend.input_size),
            },
            video: VideoSettings {
                seek_timeout: video
                    .seek_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.video.seek_timeout),
            },
            overlay: OverlaySettings {
                confidence_threshold: overlay
                    .confidence_threshold
                    .unwrap_or(defaults.overlay.confidence_threshold),
                target_fps: overlay.target_fps.unwrap_or(defaults.overlay.target_fps),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(name) = std::env::var("MOVEMENT_SCORER_BACKEND") {
            if !name.trim().is_empty() {
                self.backend.name = name.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var("MOVEMENT_SCORER_MODEL") {
            if !path.trim().is_empty() {
                self.backend.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(timeout) = std::env::var("MOVEMENT_SCORER_SEEK_TIMEOUT_MS") {
            let millis: u64 = timeout.trim().parse().map_err(|_| {
                anyhow!("MOVEMENT_SCORER_SEEK_TIMEOUT_MS must be an integer number of milliseconds")
            })?;
            self.video.seek_timeout = Duration::from_millis(millis);
        }
        if let Ok(threshold) = std::env::var("MOVEMENT_SCORER_OVERLAY_THRESHOLD") {
            self.overlay.confidence_threshold = threshold.trim().parse().map_err(|_| {
                anyhow!("MOVEMENT_SCORER_OVERLAY_THRESHOLD must be a number between 0 and 1")
            })?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.backend.name = self.backend.name.to_lowercase();
        if !KNOWN_BACKENDS.contains(&self.backend.name.as_str()) {
            return Err(anyhow!(
                "unknown pose backend '{}' (expected one of: {})",
                self.backend.name,
                KNOWN_BACKENDS.join(", ")
            ));
        }
        if self.backend.name == "tract" && self.backend.model_path.is_none() {
            return Err(anyhow!("the tract backend requires backend.model_path"));
        }
        if self.backend.input_size == 0 {
            return Err(anyhow!("backend.input_size must be greater than zero"));
        }
        if self.video.seek_timeout.is_zero() {
            return Err(anyhow!("video.seek_timeout_ms must be greater than zero"));
        }
        let threshold = self.overlay.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "overlay.confidence_threshold must be within [0, 1], got {}",
                threshold
            ));
        }
        if self.overlay.target_fps == 0 {
            return Err(anyhow!("overlay.target_fps must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScorerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
