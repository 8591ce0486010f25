use super::{CameraSettings, CaptureSource};
use crate::{Error, Result};
use image::RgbImage;
use log::{debug, info};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Capture source that replays the images of a directory in file-name order.
///
/// Useful for headless runs and for reproducing sessions without a camera.
/// The device index is ignored.
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    next: usize,
    looping: bool,
    open: bool,
}

impl ImageSequenceSource {
    /// Collect the images in `dir`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] if the directory holds no images.
    pub fn from_dir<P: AsRef<Path>>(dir: P, looping: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::Capture(format!("No images found in {}", dir.display())));
        }
        info!("Image sequence with {} frames from {}", files.len(), dir.display());

        Ok(Self::from_files(files, looping))
    }

    #[must_use]
    pub fn from_files(files: Vec<PathBuf>, looping: bool) -> Self {
        Self {
            files,
            next: 0,
            looping,
            open: false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl CaptureSource for ImageSequenceSource {
    fn open(&mut self, _device_index: i32) -> Result<()> {
        if self.files.is_empty() {
            return Err(Error::Capture("Image sequence is empty".to_string()));
        }
        self.next = 0;
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.open {
            return Err(Error::Capture("Image sequence is not open".to_string()));
        }
        if self.next >= self.files.len() {
            if !self.looping {
                return Ok(None);
            }
            self.next = 0;
        }

        let path = &self.files[self.next];
        self.next += 1;
        debug!("Reading frame {}", path.display());
        let frame = image::open(path)
            .map_err(|e| Error::Capture(format!("Failed to decode frame {}: {e}", path.display())))?
            .to_rgb8();
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.open = false;
    }

    fn apply_settings(&mut self, _settings: &CameraSettings) -> Result<()> {
        // Stills are resized by the scheduler; nothing to negotiate
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
