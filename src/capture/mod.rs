//! Capture sources and camera settings.
//!
//! The monitor pulls one frame per tick from a [`CaptureSource`]. Camera
//! settings are shared with the presentation side through a
//! [`SettingsHandle`], which always hands out a complete snapshot.

/// Replay of still images from a directory
pub mod image_sequence;

/// Live webcam capture through `OpenCV`
#[cfg(feature = "camera")]
pub mod opencv_camera;

use crate::{
    constants::{
        DEFAULT_BRIGHTNESS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, DEFAULT_CONTRAST, DEFAULT_FPS,
        RESOLUTION_PRESETS, SUPPORTED_FPS,
    },
    Error, Result,
};
use image::RgbImage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use image_sequence::ImageSequenceSource;

/// Capture resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Resolutions commonly supported by webcams
    pub fn presets() -> impl Iterator<Item = Self> {
        RESOLUTION_PRESETS.into_iter().map(|(w, h)| Self::new(w, h))
    }

    #[must_use]
    pub fn is_preset(&self) -> bool {
        Self::presets().any(|preset| preset == *self)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::InvalidInput(format!("Resolution must look like 1280x720, got {s}")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| Error::InvalidInput(format!("Bad resolution component {v}: {e}")))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

/// Capture and pre-adjustment settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub resolution: Resolution,
    pub fps: u32,
    pub brightness: f64,
    pub contrast: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::new(DEFAULT_CAPTURE_WIDTH, DEFAULT_CAPTURE_HEIGHT),
            fps: DEFAULT_FPS,
            brightness: DEFAULT_BRIGHTNESS,
            contrast: DEFAULT_CONTRAST,
        }
    }
}

impl CameraSettings {
    /// Reject settings no device can honour
    pub fn validate(&self) -> Result<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(Error::ConfigError(format!(
                "Resolution must be non-zero, got {}",
                self.resolution
            )));
        }
        if !SUPPORTED_FPS.contains(&self.fps) {
            return Err(Error::ConfigError(format!(
                "FPS must be one of {SUPPORTED_FPS:?}, got {}",
                self.fps
            )));
        }
        if !self.brightness.is_finite() || !(-255.0..=255.0).contains(&self.brightness) {
            return Err(Error::ConfigError(format!(
                "Brightness must be between -255 and 255, got {}",
                self.brightness
            )));
        }
        if !self.contrast.is_finite() || self.contrast < 0.0 {
            return Err(Error::ConfigError(format!(
                "Contrast must be a non-negative number, got {}",
                self.contrast
            )));
        }
        Ok(())
    }
}

/// Shared, atomically replaced camera settings.
///
/// Writers swap the whole record under a lock; readers take a `Copy`
/// snapshot, so a reader never sees half of an update.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<CameraSettings>>,
}

impl SettingsHandle {
    #[must_use]
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings
    #[must_use]
    pub fn snapshot(&self) -> CameraSettings {
        *self.inner.read()
    }

    /// Replace the settings after validating them
    pub fn replace(&self, settings: CameraSettings) -> Result<()> {
        settings.validate()?;
        *self.inner.write() = settings;
        Ok(())
    }

    /// Edit a copy of the settings and store it if it validates
    pub fn update<F>(&self, edit: F) -> Result<CameraSettings>
    where
        F: FnOnce(&mut CameraSettings),
    {
        let mut guard = self.inner.write();
        let mut next = *guard;
        edit(&mut next);
        next.validate()?;
        *guard = next;
        Ok(next)
    }
}

/// Source of raw frames (webcam, video, image replay)
pub trait CaptureSource: Send {
    /// Open the device at `device_index`
    fn open(&mut self, device_index: i32) -> Result<()>;

    /// Read the next frame; `Ok(None)` means end of stream
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Release the device. Safe to call repeatedly.
    fn release(&mut self);

    /// Apply resolution, frame rate, brightness and contrast.
    ///
    /// # Errors
    ///
    /// [`Error::Capture`] when the device rejects the requested settings.
    fn apply_settings(&mut self, settings: &CameraSettings) -> Result<()>;

    /// Whether the device is currently open
    fn is_open(&self) -> bool;
}
