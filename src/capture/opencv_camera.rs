use super::{CameraSettings, CaptureSource};
use crate::{
    constants::MAX_PROBED_CAMERAS,
    utils::safe_cast::f64_to_u32,
    Error, Result,
};
use image::RgbImage;
use log::{info, warn};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};

/// Webcam capture through `OpenCV` `videoio`
#[derive(Default)]
pub struct OpenCvCamera {
    capture: Option<VideoCapture>,
}

impl OpenCvCamera {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn capture_mut(&mut self) -> Result<&mut VideoCapture> {
        self.capture
            .as_mut()
            .ok_or_else(|| Error::Capture("Camera is not open".to_string()))
    }
}

/// Indices of cameras that can be opened
#[must_use]
pub fn available_cameras() -> Vec<i32> {
    (0..MAX_PROBED_CAMERAS)
        .filter(|&index| {
            VideoCapture::new(index, videoio::CAP_ANY)
                .and_then(|mut cap| {
                    let opened = cap.is_opened()?;
                    cap.release()?;
                    Ok(opened)
                })
                .unwrap_or(false)
        })
        .collect()
}

impl CaptureSource for OpenCvCamera {
    fn open(&mut self, device_index: i32) -> Result<()> {
        info!("Opening camera {}", device_index);
        let mut cap = VideoCapture::new(device_index, videoio::CAP_ANY)?;
        if !cap.is_opened()? {
            return Err(Error::Capture(format!("Camera {device_index} is not available")));
        }

        // Keep latency low: only the newest frame matters
        if let Err(e) = cap.set(CAP_PROP_BUFFERSIZE, 1.0) {
            warn!("Could not shrink camera buffer: {e}");
        }
        self.capture = Some(cap);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let cap = self.capture_mut()?;
        let mut bgr = Mat::default();
        if !cap.read(&mut bgr)? || bgr.empty() {
            return Err(Error::Capture("Failed to capture frame".to_string()));
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let width = u32::try_from(rgb.cols()).map_err(|e| Error::Capture(format!("Bad frame width: {e}")))?;
        let height = u32::try_from(rgb.rows()).map_err(|e| Error::Capture(format!("Bad frame height: {e}")))?;
        let data = rgb.data_bytes()?.to_vec();

        RgbImage::from_raw(width, height, data)
            .map(Some)
            .ok_or_else(|| Error::Capture("Captured frame has unexpected layout".to_string()))
    }

    fn release(&mut self) {
        if let Some(mut cap) = self.capture.take() {
            if let Err(e) = cap.release() {
                warn!("Failed to release camera: {e}");
            }
        }
    }

    fn apply_settings(&mut self, settings: &CameraSettings) -> Result<()> {
        let cap = self.capture_mut()?;
        cap.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(settings.resolution.width))?;
        cap.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(settings.resolution.height))?;
        cap.set(videoio::CAP_PROP_FPS, f64::from(settings.fps))?;
        cap.set(videoio::CAP_PROP_BRIGHTNESS, settings.brightness)?;
        cap.set(videoio::CAP_PROP_CONTRAST, settings.contrast)?;

        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)?;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)?;
        if width == 0.0 || height == 0.0 {
            return Err(Error::Capture(format!(
                "Camera rejected resolution {}",
                settings.resolution
            )));
        }
        info!(
            "Camera configured: {}x{} @ {} fps (requested {})",
            f64_to_u32(width)?,
            f64_to_u32(height)?,
            settings.fps,
            settings.resolution
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.capture.is_some()
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        self.release();
    }
}
