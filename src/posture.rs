//! Posture classification from body landmarks.
//!
//! Two geometric measurements decide the verdict:
//! - shoulder tilt: vertical distance between the two shoulders
//! - forward lean: height of the shoulder midline above the nose
//!
//! Posture is bad when the shoulders are unlevel beyond tolerance or when
//! the nose has dropped below the shoulder midline beyond tolerance.

use crate::{
    constants::{DEFAULT_FORWARD_LEAN_THRESHOLD, DEFAULT_SHOULDER_TILT_THRESHOLD},
    error::Result,
    landmarks::{BodyPoint, LandmarkSet},
};
use std::fmt;

/// Binary posture classification for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostureVerdict {
    /// Acceptable posture
    #[default]
    Good,
    /// Unacceptable posture
    Bad,
}

impl PostureVerdict {
    /// Human-readable label shown on screen
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            PostureVerdict::Good => "Good Posture",
            PostureVerdict::Bad => "Bad Posture",
        }
    }

    /// True for [`PostureVerdict::Bad`]
    #[must_use]
    pub const fn is_bad(self) -> bool {
        matches!(self, PostureVerdict::Bad)
    }
}

impl fmt::Display for PostureVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tolerances applied by the classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureThresholds {
    /// Largest acceptable shoulder tilt
    pub shoulder_tilt: f64,
    /// Smallest acceptable forward lean (negative: nose below the shoulders)
    pub forward_lean: f64,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            shoulder_tilt: DEFAULT_SHOULDER_TILT_THRESHOLD,
            forward_lean: DEFAULT_FORWARD_LEAN_THRESHOLD,
        }
    }
}

/// Measurements the verdict is derived from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureMetrics {
    /// `|left_shoulder.y - right_shoulder.y|`
    pub shoulder_tilt: f64,
    /// `(left_shoulder.y + right_shoulder.y) / 2 - nose.y`
    pub forward_lean: f64,
}

impl PostureMetrics {
    /// Measure a landmark set
    ///
    /// # Errors
    ///
    /// Returns `MissingLandmark` if the nose or either shoulder is absent
    pub fn measure(landmarks: &LandmarkSet) -> Result<Self> {
        let left_shoulder = landmarks.require(BodyPoint::LeftShoulder)?;
        let right_shoulder = landmarks.require(BodyPoint::RightShoulder)?;
        let nose = landmarks.require(BodyPoint::Nose)?;

        Ok(Self {
            shoulder_tilt: (left_shoulder.y - right_shoulder.y).abs(),
            forward_lean: (left_shoulder.y + right_shoulder.y) / 2.0 - nose.y,
        })
    }

    /// Verdict for these measurements under `thresholds`
    #[must_use]
    pub fn verdict(&self, thresholds: &PostureThresholds) -> PostureVerdict {
        if self.shoulder_tilt > thresholds.shoulder_tilt || self.forward_lean < thresholds.forward_lean {
            PostureVerdict::Bad
        } else {
            PostureVerdict::Good
        }
    }
}

/// Stateless classifier holding its tolerances
#[derive(Debug, Clone, Copy, Default)]
pub struct PostureClassifier {
    thresholds: PostureThresholds,
}

impl PostureClassifier {
    /// Create a classifier with custom tolerances
    #[must_use]
    pub const fn new(thresholds: PostureThresholds) -> Self {
        Self { thresholds }
    }

    /// Tolerances in use
    #[must_use]
    pub const fn thresholds(&self) -> &PostureThresholds {
        &self.thresholds
    }

    /// Classify a landmark set
    ///
    /// # Errors
    ///
    /// Returns `MissingLandmark` if the nose or either shoulder is absent
    pub fn classify(&self, landmarks: &LandmarkSet) -> Result<PostureVerdict> {
        self.assess(landmarks).map(|(verdict, _)| verdict)
    }

    /// Classify a landmark set and return the measurements behind the verdict
    ///
    /// # Errors
    ///
    /// Returns `MissingLandmark` if the nose or either shoulder is absent
    pub fn assess(&self, landmarks: &LandmarkSet) -> Result<(PostureVerdict, PostureMetrics)> {
        let metrics = PostureMetrics::measure(landmarks)?;
        Ok((metrics.verdict(&self.thresholds), metrics))
    }
}

/// Classify with the default tolerances
///
/// # Errors
///
/// Returns `MissingLandmark` if the nose or either shoulder is absent
pub fn classify(landmarks: &LandmarkSet) -> Result<PostureVerdict> {
    PostureClassifier::default().classify(landmarks)
}
