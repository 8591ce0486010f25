//! Posture classification from shoulder, hip and nose landmarks.
//!
//! Two angles are measured on every analyzed frame:
//! - `neck`: angle at the left shoulder between the nose and the right shoulder
//! - `spine`: angle at the left hip between the left shoulder and the right hip
//!
//! Thresholds are checked in a fixed order (spine before neck) and the first
//! match wins.

use crate::{
    constants::{NECK_TILTED_BELOW_DEG, SPINE_CURVED_BELOW_DEG, SPINE_STRAIGHT_ABOVE_DEG},
    geometry::{angle, Point2},
    landmarks::{LandmarkId, LandmarkSet},
    Error, Result,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a bad-posture verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SpineTooCurved,
    SpineTooStraight,
    NeckTilted,
}

impl ErrorKind {
    pub const ALL: [Self; 3] = [Self::SpineTooCurved, Self::SpineTooStraight, Self::NeckTilted];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpineTooCurved => "spine_too_curved",
            Self::SpineTooStraight => "spine_too_straight",
            Self::NeckTilted => "neck_tilted",
        }
    }

    /// Verdict label for this kind
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SpineTooCurved => "incorrect posture – spine too curved",
            Self::SpineTooStraight => "incorrect posture – spine too straight",
            Self::NeckTilted => "incorrect posture – neck tilted",
        }
    }

    /// Headline shown while the alert is active
    #[must_use]
    pub const fn alert_message(self) -> &'static str {
        match self {
            Self::SpineTooCurved => "Alert: spine too curved!",
            Self::SpineTooStraight => "Alert: spine too straight!",
            Self::NeckTilted => "Alert: neck tilted too far!",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output: a label and, for bad posture, its category.
///
/// `error_kind` is `None` exactly when the label is [`PostureVerdict::CORRECT_LABEL`];
/// the constructors are the only way to build a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostureVerdict {
    label: &'static str,
    error_kind: Option<ErrorKind>,
}

impl PostureVerdict {
    pub const CORRECT_LABEL: &'static str = "correct posture";

    #[must_use]
    pub const fn correct() -> Self {
        Self {
            label: Self::CORRECT_LABEL,
            error_kind: None,
        }
    }

    #[must_use]
    pub const fn incorrect(kind: ErrorKind) -> Self {
        Self {
            label: kind.label(),
            error_kind: Some(kind),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    #[must_use]
    pub const fn is_correct(&self) -> bool {
        self.error_kind.is_none()
    }
}

/// Body angles in degrees, each within `[0, 180]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AngleSet {
    pub neck: f64,
    pub spine: f64,
}

impl AngleSet {
    /// Named angles, for presenters and exporters
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [("neck", self.neck), ("spine", self.spine)].into_iter()
    }
}

/// Classification thresholds in degrees. All comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureThresholds {
    /// `spine < spine_curved_below` is too curved
    pub spine_curved_below: f64,
    /// `spine > spine_straight_above` is too straight
    pub spine_straight_above: f64,
    /// `neck < neck_tilted_below` is tilted
    pub neck_tilted_below: f64,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            spine_curved_below: SPINE_CURVED_BELOW_DEG,
            spine_straight_above: SPINE_STRAIGHT_ABOVE_DEG,
            neck_tilted_below: NECK_TILTED_BELOW_DEG,
        }
    }
}

impl PostureThresholds {
    /// Check ordering and range of the thresholds
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("spine_curved_below", self.spine_curved_below),
            ("spine_straight_above", self.spine_straight_above),
            ("neck_tilted_below", self.neck_tilted_below),
        ] {
            if !(0.0..=180.0).contains(&value) {
                return Err(Error::ConfigError(format!(
                    "Threshold {name} must be between 0 and 180 degrees, got {value}"
                )));
            }
        }
        if self.spine_curved_below >= self.spine_straight_above {
            return Err(Error::ConfigError(
                "spine_curved_below must be lower than spine_straight_above".to_string(),
            ));
        }
        Ok(())
    }

    /// Pure threshold classification; identical angles always give identical verdicts
    #[must_use]
    pub fn classify(&self, angles: &AngleSet) -> PostureVerdict {
        if angles.spine < self.spine_curved_below {
            PostureVerdict::incorrect(ErrorKind::SpineTooCurved)
        } else if angles.spine > self.spine_straight_above {
            PostureVerdict::incorrect(ErrorKind::SpineTooStraight)
        } else if angles.neck < self.neck_tilted_below {
            PostureVerdict::incorrect(ErrorKind::NeckTilted)
        } else {
            PostureVerdict::correct()
        }
    }
}

/// A verdict together with the angles it was derived from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub verdict: PostureVerdict,
    pub angles: AngleSet,
}

/// Turns landmark sets into verdicts and keeps the latest measured angles
#[derive(Debug, Clone, Default)]
pub struct PostureClassifier {
    thresholds: PostureThresholds,
    latest_angles: AngleSet,
}

impl PostureClassifier {
    #[must_use]
    pub fn new(thresholds: PostureThresholds) -> Self {
        Self {
            thresholds,
            latest_angles: AngleSet::default(),
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> &PostureThresholds {
        &self.thresholds
    }

    /// Angles from the most recent successful measurement
    #[must_use]
    pub fn latest_angles(&self) -> AngleSet {
        self.latest_angles
    }

    /// Measure neck and spine angles.
    ///
    /// # Errors
    ///
    /// [`Error::MissingLandmark`] if any of the five required joints is absent,
    /// [`Error::DegenerateGeometry`] if two of them coincide.
    pub fn measure(landmarks: &LandmarkSet) -> Result<AngleSet> {
        let nose = require(landmarks, LandmarkId::Nose)?;
        let left_shoulder = require(landmarks, LandmarkId::LeftShoulder)?;
        let right_shoulder = require(landmarks, LandmarkId::RightShoulder)?;
        let left_hip = require(landmarks, LandmarkId::LeftHip)?;
        let right_hip = require(landmarks, LandmarkId::RightHip)?;

        Ok(AngleSet {
            neck: angle(nose, left_shoulder, right_shoulder)?,
            spine: angle(left_shoulder, left_hip, right_hip)?,
        })
    }

    /// Classify one landmark set, propagating the reason on failure.
    ///
    /// Updates the latest-angles snapshot only on success.
    pub fn try_classify(&mut self, landmarks: &LandmarkSet) -> Result<Classification> {
        let angles = Self::measure(landmarks)?;
        self.latest_angles = angles;
        Ok(Classification {
            verdict: self.thresholds.classify(&angles),
            angles,
        })
    }

    /// Classify one frame's landmarks. `None` in, or any missing-joint or
    /// geometry fault, yields no verdict.
    pub fn classify(&mut self, landmarks: Option<&LandmarkSet>) -> Option<Classification> {
        let landmarks = landmarks?;
        match self.try_classify(landmarks) {
            Ok(classification) => Some(classification),
            Err(e) => {
                debug!("No verdict for frame: {e}");
                None
            }
        }
    }

    /// Forget the latest angles (used when a monitoring session ends)
    pub fn reset(&mut self) {
        self.latest_angles = AngleSet::default();
    }
}

fn require(landmarks: &LandmarkSet, id: LandmarkId) -> Result<Point2> {
    landmarks.get(id).ok_or(Error::MissingLandmark(id))
}
