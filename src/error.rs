//! Error types for the posture monitor library.

use crate::landmarks::LandmarkId;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "camera")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// CSV export failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Three points do not define an angle (zero-length ray or non-finite input)
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A joint required for classification was not reported by the estimator
    #[error("Missing landmark: {0}")]
    MissingLandmark(LandmarkId),

    /// Capture device could not be opened, configured or read
    #[error("Capture error: {0}")]
    Capture(String),

    /// Capture or estimator call exceeded its latency budget
    #[error("Stalled: {0}")]
    Stall(String),

    /// Landmark estimator failed
    #[error("Estimator error: {0}")]
    Estimator(String),

    /// Posture event storage or reporting failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Audible alert playback failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether this error is fatal to a monitoring session.
    ///
    /// Device, stall and estimator faults stop the session; everything else is
    /// recovered at the component boundary.
    #[must_use]
    pub fn stops_session(&self) -> bool {
        match self {
            #[cfg(feature = "camera")]
            Self::OpenCV(_) => true,
            Self::Capture(_) | Self::Stall(_) | Self::Estimator(_) => true,
            _ => false,
        }
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_fatal_classification() {
        assert!(Error::Capture("no device".into()).stops_session());
        assert!(Error::Stall("read took 5s".into()).stops_session());
        assert!(Error::Estimator("model crashed".into()).stops_session());
        assert!(!Error::Persistence("disk full".into()).stops_session());
        assert!(!Error::DegenerateGeometry("p1 == p2".into()).stops_session());
        assert!(!Error::MissingLandmark(LandmarkId::Nose).stops_session());
    }

    #[test]
    fn test_error_display() {
        let err = Error::MissingLandmark(LandmarkId::LeftHip);
        assert_eq!(err.to_string(), "Missing landmark: left_hip");
    }
}
