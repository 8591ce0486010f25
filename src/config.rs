//! Configuration management for the posture monitor

use crate::{
    alert::{AlertEngine, SuggestionTable},
    app::MonitorOptions,
    cache::LandmarkCache,
    capture::{CameraSettings, Resolution},
    classifier::{PostureClassifier, PostureThresholds},
    constants::{
        DEFAULT_ABSENCE_RESET_FRAMES, DEFAULT_ALERT_THRESHOLD, DEFAULT_BRIGHTNESS, DEFAULT_CACHE_CAPACITY,
        DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, DEFAULT_CONTRAST, DEFAULT_EXPORT_DIR, DEFAULT_FPS,
        DEFAULT_FRAME_INTERVAL_MS, DEFAULT_MAX_STORED_EVENTS, DEFAULT_RETENTION_DAYS, DEFAULT_SKIP_FRAMES, DEFAULT_SOUND_PERIOD_MS, DEFAULT_STALL_TIMEOUT_MS,
        MIN_SOUND_PERIOD_MS, PROCESSING_HEIGHT, PROCESSING_WIDTH,
    },
    scheduler::{AnalysisSession, SchedulerOptions},
    store::InMemoryStore,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera device and capture settings
    pub camera: CameraConfig,

    /// Frame scheduling and caching
    pub analysis: AnalysisConfig,

    /// Posture classification thresholds in degrees
    pub thresholds: PostureThresholds,

    /// Alert debounce and sound
    pub alerts: AlertConfig,

    /// Event export
    pub storage: StorageConfig,
}

/// Camera device and capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera index
    pub device_index: i32,

    /// Requested capture width
    pub width: u32,

    /// Requested capture height
    pub height: u32,

    /// Requested frame rate (15, 30 or 60)
    pub fps: u32,

    /// Added to every pixel channel (-255 to 255)
    pub brightness: f64,

    /// Multiplies every pixel channel
    pub contrast: f64,
}

/// Frame scheduling and caching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Width frames are normalized to before analysis
    pub processing_width: u32,

    /// Height frames are normalized to before analysis
    pub processing_height: u32,

    /// Frames skipped between two analyzed frames
    pub skip_frames: u32,

    /// Landmark cache entries
    pub cache_capacity: usize,

    /// Minimum delay between frames
    pub frame_interval_ms: u64,

    /// Capture/estimator latency budget (0 disables)
    pub stall_timeout_ms: u64,

    /// No-body analyzed frames before the alert is cleared (0 disables)
    pub absence_reset_frames: u32,
}

/// Alert debounce and sound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Consecutive bad-posture analyzed frames before alerting
    pub threshold_frames: u32,

    /// Play a sound while the alert is active
    pub sound_enabled: bool,

    /// Sound repeat period
    pub sound_period_ms: u64,

    /// Replacement suggestion lists per error kind
    pub suggestions: Option<SuggestionTable>,
}

/// Event storage and export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory export files are written to
    pub export_dir: PathBuf,

    /// Days recorded events are kept
    pub retention_days: i64,

    /// Most events held at once; the oldest are dropped first
    pub max_events: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_FPS,
            brightness: DEFAULT_BRIGHTNESS,
            contrast: DEFAULT_CONTRAST,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            processing_width: PROCESSING_WIDTH,
            processing_height: PROCESSING_HEIGHT,
            skip_frames: DEFAULT_SKIP_FRAMES,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            stall_timeout_ms: DEFAULT_STALL_TIMEOUT_MS,
            absence_reset_frames: DEFAULT_ABSENCE_RESET_FRAMES,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold_frames: DEFAULT_ALERT_THRESHOLD,
            sound_enabled: true,
            sound_period_ms: DEFAULT_SOUND_PERIOD_MS,
            suggestions: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            retention_days: DEFAULT_RETENTION_DAYS,
            max_events: DEFAULT_MAX_STORED_EVENTS,
        }
    }
}

impl CameraConfig {
    /// Settings record shared with the capture source
    #[must_use]
    pub fn settings(&self) -> CameraSettings {
        CameraSettings {
            resolution: Resolution::new(self.width, self.height),
            fps: self.fps,
            brightness: self.brightness,
            contrast: self.contrast,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Camera settings share their rules with runtime updates
        self.camera.settings().validate()?;

        if self.analysis.processing_width == 0 || self.analysis.processing_height == 0 {
            return Err(Error::ConfigError(
                "Processing resolution must be greater than 0".to_string(),
            ));
        }
        if self.analysis.cache_capacity == 0 {
            return Err(Error::ConfigError(
                "Cache capacity must be greater than 0".to_string(),
            ));
        }

        self.thresholds.validate()?;

        if self.alerts.threshold_frames == 0 {
            return Err(Error::ConfigError(
                "Alert threshold must be at least 1 frame".to_string(),
            ));
        }
        if self.alerts.sound_period_ms < MIN_SOUND_PERIOD_MS {
            return Err(Error::ConfigError(format!(
                "Sound period must be at least {MIN_SOUND_PERIOD_MS} ms"
            )));
        }
        if let Some(table) = &self.alerts.suggestions {
            table.validate()?;
        }

        if self.storage.retention_days < 1 {
            return Err(Error::ConfigError(
                "Event retention must be at least 1 day".to_string(),
            ));
        }
        if self.storage.max_events == 0 {
            return Err(Error::ConfigError(
                "Stored event limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Fresh analysis session from the thresholds, cache and alert sections
    #[must_use]
    pub fn analysis_session(&self) -> AnalysisSession {
        let suggestions = self.alerts.suggestions.clone().unwrap_or_default();
        AnalysisSession::new(
            PostureClassifier::new(self.thresholds),
            LandmarkCache::new(self.analysis.cache_capacity),
            AlertEngine::new(self.alerts.threshold_frames, suggestions),
        )
    }

    /// Empty event store with the storage section's limits
    #[must_use]
    pub fn event_store(&self) -> InMemoryStore {
        InMemoryStore::with_limits(
            &self.storage.export_dir,
            chrono::Duration::days(self.storage.retention_days),
            self.storage.max_events,
        )
    }

    #[must_use]
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            skip_frames: self.analysis.skip_frames,
            processing_width: self.analysis.processing_width,
            processing_height: self.analysis.processing_height,
            stall_timeout: self.stall_timeout(),
            absence_reset_frames: self.analysis.absence_reset_frames,
        }
    }

    #[must_use]
    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            device_index: self.camera.device_index,
            frame_interval: Duration::from_millis(self.analysis.frame_interval_ms),
            stall_timeout: self.stall_timeout(),
        }
    }

    #[must_use]
    pub fn sound_period(&self) -> Duration {
        Duration::from_millis(self.alerts.sound_period_ms)
    }

    fn stall_timeout(&self) -> Option<Duration> {
        (self.analysis.stall_timeout_ms > 0).then(|| Duration::from_millis(self.analysis.stall_timeout_ms))
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r"# Posture Monitor Configuration

# Camera device and capture settings
camera:
  device_index: 0
  width: 1280
  height: 720
  fps: 30
  brightness: 10.0
  contrast: 1.2

# Frame scheduling
analysis:
  processing_width: 640
  processing_height: 480
  skip_frames: 2
  cache_capacity: 5
  frame_interval_ms: 10
  stall_timeout_ms: 2000
  absence_reset_frames: 30

# Classification thresholds (degrees)
thresholds:
  spine_curved_below: 70.0
  spine_straight_above: 110.0
  neck_tilted_below: 60.0

# Alerting
alerts:
  threshold_frames: 10
  sound_enabled: true
  sound_period_ms: 2000
  # suggestions:
  #   neck_tilted:
  #     - Align your head with your spine

# Export
storage:
  export_dir: exports
  retention_days: 30
  max_events: 500000
";
