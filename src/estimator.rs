//! Landmark estimator seam.
//!
//! Pose estimation itself happens outside this crate; an estimator only has to
//! turn a frame into a [`LandmarkSet`] or report that no body was found.

use crate::{landmarks::LandmarkSet, Error, Result};
use image::RgbImage;
use log::info;
use std::io::BufRead;
use std::path::Path;

/// Body-landmark detector
pub trait LandmarkEstimator: Send {
    /// Detect landmarks in `frame`.
    ///
    /// `Ok(None)` means no body was found. `Err` means the estimator itself
    /// failed and the session must stop.
    fn detect(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>>;
}

impl<E: LandmarkEstimator + ?Sized> LandmarkEstimator for Box<E> {
    fn detect(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>> {
        (**self).detect(frame)
    }
}

/// Replays landmark sets recorded from an earlier run.
///
/// The input is JSON lines: each line is either an object mapping joint names
/// to `{"x": .., "y": ..}` or `null` for a frame without a body. Blank lines
/// are skipped. The frame content is ignored.
#[derive(Debug, Clone)]
pub struct ReplayEstimator {
    frames: Vec<Option<LandmarkSet>>,
    next: usize,
    looping: bool,
}

impl ReplayEstimator {
    #[must_use]
    pub fn new(frames: Vec<Option<LandmarkSet>>, looping: bool) -> Self {
        Self {
            frames,
            next: 0,
            looping,
        }
    }

    /// Parse JSON lines from any reader
    pub fn from_reader<R: BufRead>(reader: R, looping: bool) -> Result<Self> {
        let mut frames = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame: Option<LandmarkSet> = serde_json::from_str(&line)
                .map_err(|e| Error::InvalidInput(format!("Landmark line {}: {e}", number + 1)))?;
            frames.push(frame);
        }
        Ok(Self::new(frames, looping))
    }

    /// Load a JSON-lines landmark recording
    pub fn from_file<P: AsRef<Path>>(path: P, looping: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let estimator = Self::from_reader(std::io::BufReader::new(file), looping)?;
        info!("Loaded {} landmark frames from {}", estimator.len(), path.display());
        Ok(estimator)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkEstimator for ReplayEstimator {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Option<LandmarkSet>> {
        if self.next >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Ok(None);
            }
            self.next = 0;
        }
        let frame = self.frames[self.next].clone();
        self.next += 1;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::LandmarkId;

    const RECORDING: &str = r#"{"nose":{"x":0.5,"y":0.3},"left_shoulder":{"x":0.4,"y":0.5}}

null
{"right_hip":{"x":0.55,"y":0.8}}
"#;

    #[test]
    fn test_replay_sequence() {
        let mut estimator = ReplayEstimator::from_reader(RECORDING.as_bytes(), false).unwrap();
        assert_eq!(estimator.len(), 3);

        let frame = RgbImage::new(1, 1);
        let first = estimator.detect(&frame).unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.get(LandmarkId::Nose).is_some());
        assert!(estimator.detect(&frame).unwrap().is_none());
        assert!(estimator.detect(&frame).unwrap().unwrap().get(LandmarkId::RightHip).is_some());
        // Exhausted
        assert!(estimator.detect(&frame).unwrap().is_none());
    }

    #[test]
    fn test_replay_looping() {
        let mut estimator = ReplayEstimator::from_reader(RECORDING.as_bytes(), true).unwrap();
        let frame = RgbImage::new(1, 1);
        for _ in 0..3 {
            estimator.detect(&frame).unwrap();
        }
        assert!(estimator.detect(&frame).unwrap().is_some());
    }

    #[test]
    fn test_bad_line_reports_position() {
        let err = ReplayEstimator::from_reader("null\n{not json}\n".as_bytes(), false).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
