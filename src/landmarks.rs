//! Body landmarks reported by the external pose estimator.

use crate::geometry::Point2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Body joints the monitor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkId {
    Nose,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftHip,
    RightHip,
}

impl LandmarkId {
    /// All known joints in index order
    pub const ALL: [Self; 9] = [
        Self::Nose,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftHip,
        Self::RightHip,
    ];

    /// Snake-case name used in logs and serialized landmark files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
        }
    }

    /// Map a 33-point BlazePose/MediaPipe index to a known joint
    #[must_use]
    pub const fn from_blazepose_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            7 => Some(Self::LeftEar),
            8 => Some(Self::RightEar),
            11 => Some(Self::LeftShoulder),
            12 => Some(Self::RightShoulder),
            13 => Some(Self::LeftElbow),
            14 => Some(Self::RightElbow),
            23 => Some(Self::LeftHip),
            24 => Some(Self::RightHip),
            _ => None,
        }
    }
}

impl fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named joint positions for one analyzed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: BTreeMap<LandmarkId, Point2>,
}

impl LandmarkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion
    #[must_use]
    pub fn with(mut self, id: LandmarkId, point: impl Into<Point2>) -> Self {
        self.points.insert(id, point.into());
        self
    }

    pub fn insert(&mut self, id: LandmarkId, point: Point2) {
        self.points.insert(id, point);
    }

    #[must_use]
    pub fn get(&self, id: LandmarkId) -> Option<Point2> {
        self.points.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkId, Point2)> + '_ {
        self.points.iter().map(|(id, p)| (*id, *p))
    }

    /// Build a set from a BlazePose landmark array (`[x, y, ...]` per index).
    /// Indices the monitor does not use are ignored.
    #[must_use]
    pub fn from_blazepose(landmarks: &[[f32; 3]]) -> Self {
        let mut set = Self::new();
        for (index, lm) in landmarks.iter().enumerate() {
            if let Some(id) = LandmarkId::from_blazepose_index(index) {
                set.insert(id, Point2::new(f64::from(lm[0]), f64::from(lm[1])));
            }
        }
        set
    }

    /// Cache key built from nose and both shoulders, or `None` if any is missing
    #[must_use]
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        let nose = self.get(LandmarkId::Nose)?;
        let left = self.get(LandmarkId::LeftShoulder)?;
        let right = self.get(LandmarkId::RightShoulder)?;
        Some(Fingerprint::from_points([nose, left, right]))
    }
}

impl FromIterator<(LandmarkId, Point2)> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = (LandmarkId, Point2)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Exact bit pattern of the nose and shoulder coordinates.
///
/// Two fingerprints are equal only when every selected coordinate is
/// bit-identical; there is no quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u64; 6]);

impl Fingerprint {
    #[must_use]
    pub fn from_points(points: [Point2; 3]) -> Self {
        let mut bits = [0u64; 6];
        for (i, p) in points.iter().enumerate() {
            bits[2 * i] = p.x.to_bits();
            bits[2 * i + 1] = p.y.to_bits();
        }
        Self(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper_body() -> LandmarkSet {
        LandmarkSet::new()
            .with(LandmarkId::Nose, (0.5, 0.3))
            .with(LandmarkId::LeftShoulder, (0.4, 0.5))
            .with(LandmarkId::RightShoulder, (0.6, 0.5))
    }

    #[test]
    fn test_fingerprint_requires_nose_and_shoulders() {
        assert!(upper_body().fingerprint().is_some());

        let no_nose = LandmarkSet::new()
            .with(LandmarkId::LeftShoulder, (0.4, 0.5))
            .with(LandmarkId::RightShoulder, (0.6, 0.5));
        assert!(no_nose.fingerprint().is_none());
    }

    #[test]
    fn test_fingerprint_ignores_hips() {
        let a = upper_body().with(LandmarkId::LeftHip, (0.45, 0.8));
        let b = upper_body().with(LandmarkId::LeftHip, (0.1, 0.9));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_exact() {
        let a = upper_body();
        let b = upper_body().with(LandmarkId::Nose, (0.5, 0.3 + 1e-12));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_from_blazepose() {
        let mut raw = vec![[0.0f32; 3]; 33];
        raw[0] = [0.5, 0.25, 0.0];
        raw[11] = [0.4, 0.5, 0.0];
        raw[24] = [0.55, 0.75, 0.0];

        let set = LandmarkSet::from_blazepose(&raw);
        assert_eq!(set.len(), LandmarkId::ALL.len());
        assert_eq!(set.get(LandmarkId::Nose), Some(Point2::new(0.5, 0.25)));
        assert_eq!(set.get(LandmarkId::RightHip), Some(Point2::new(f64::from(0.55f32), 0.75)));
    }

    #[test]
    fn test_serde_names() {
        let json = r#"{"nose":{"x":0.5,"y":0.3},"left_hip":{"x":0.45,"y":0.8}}"#;
        let set: LandmarkSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.get(LandmarkId::LeftHip), Some(Point2::new(0.45, 0.8)));
        assert_eq!(set.len(), 2);
    }
}
