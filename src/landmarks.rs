//! Named body landmarks and the landmark source seam.
//!
//! A [`LandmarkSet`] holds at most one normalized 2-D position per
//! [`BodyPoint`]. Coordinates are relative to the frame: `x` and `y` are
//! roughly in `[0, 1]`, the origin is the top-left corner and `y` grows
//! downward.

use crate::{
    constants::NUM_BODY_LANDMARKS,
    error::{Error, Result},
};
use opencv::core::Mat;
use std::fmt;

/// Body keypoints of the 33-point full-body pose topology, in model order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyPoint {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl BodyPoint {
    /// All points, indexed by their position in the model output
    pub const ALL: [BodyPoint; NUM_BODY_LANDMARKS] = [
        BodyPoint::Nose,
        BodyPoint::LeftEyeInner,
        BodyPoint::LeftEye,
        BodyPoint::LeftEyeOuter,
        BodyPoint::RightEyeInner,
        BodyPoint::RightEye,
        BodyPoint::RightEyeOuter,
        BodyPoint::LeftEar,
        BodyPoint::RightEar,
        BodyPoint::MouthLeft,
        BodyPoint::MouthRight,
        BodyPoint::LeftShoulder,
        BodyPoint::RightShoulder,
        BodyPoint::LeftElbow,
        BodyPoint::RightElbow,
        BodyPoint::LeftWrist,
        BodyPoint::RightWrist,
        BodyPoint::LeftPinky,
        BodyPoint::RightPinky,
        BodyPoint::LeftIndex,
        BodyPoint::RightIndex,
        BodyPoint::LeftThumb,
        BodyPoint::RightThumb,
        BodyPoint::LeftHip,
        BodyPoint::RightHip,
        BodyPoint::LeftKnee,
        BodyPoint::RightKnee,
        BodyPoint::LeftAnkle,
        BodyPoint::RightAnkle,
        BodyPoint::LeftHeel,
        BodyPoint::RightHeel,
        BodyPoint::LeftFootIndex,
        BodyPoint::RightFootIndex,
    ];

    /// Position of this point in the model output
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a point by its model output position
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Snake-case name, as used in logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            BodyPoint::Nose => "nose",
            BodyPoint::LeftEyeInner => "left_eye_inner",
            BodyPoint::LeftEye => "left_eye",
            BodyPoint::LeftEyeOuter => "left_eye_outer",
            BodyPoint::RightEyeInner => "right_eye_inner",
            BodyPoint::RightEye => "right_eye",
            BodyPoint::RightEyeOuter => "right_eye_outer",
            BodyPoint::LeftEar => "left_ear",
            BodyPoint::RightEar => "right_ear",
            BodyPoint::MouthLeft => "mouth_left",
            BodyPoint::MouthRight => "mouth_right",
            BodyPoint::LeftShoulder => "left_shoulder",
            BodyPoint::RightShoulder => "right_shoulder",
            BodyPoint::LeftElbow => "left_elbow",
            BodyPoint::RightElbow => "right_elbow",
            BodyPoint::LeftWrist => "left_wrist",
            BodyPoint::RightWrist => "right_wrist",
            BodyPoint::LeftPinky => "left_pinky",
            BodyPoint::RightPinky => "right_pinky",
            BodyPoint::LeftIndex => "left_index",
            BodyPoint::RightIndex => "right_index",
            BodyPoint::LeftThumb => "left_thumb",
            BodyPoint::RightThumb => "right_thumb",
            BodyPoint::LeftHip => "left_hip",
            BodyPoint::RightHip => "right_hip",
            BodyPoint::LeftKnee => "left_knee",
            BodyPoint::RightKnee => "right_knee",
            BodyPoint::LeftAnkle => "left_ankle",
            BodyPoint::RightAnkle => "right_ankle",
            BodyPoint::LeftHeel => "left_heel",
            BodyPoint::RightHeel => "right_heel",
            BodyPoint::LeftFootIndex => "left_foot_index",
            BodyPoint::RightFootIndex => "right_foot_index",
        }
    }
}

impl fmt::Display for BodyPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Skeleton edges drawn by the overlay
pub const POSE_CONNECTIONS: [(BodyPoint, BodyPoint); 35] = {
    use self::BodyPoint::*;
    [
        (Nose, LeftEyeInner),
        (LeftEyeInner, LeftEye),
        (LeftEye, LeftEyeOuter),
        (LeftEyeOuter, LeftEar),
        (Nose, RightEyeInner),
        (RightEyeInner, RightEye),
        (RightEye, RightEyeOuter),
        (RightEyeOuter, RightEar),
        (MouthLeft, MouthRight),
        (LeftShoulder, RightShoulder),
        (LeftShoulder, LeftElbow),
        (LeftElbow, LeftWrist),
        (LeftWrist, LeftPinky),
        (LeftWrist, LeftIndex),
        (LeftWrist, LeftThumb),
        (LeftPinky, LeftIndex),
        (RightShoulder, RightElbow),
        (RightElbow, RightWrist),
        (RightWrist, RightPinky),
        (RightWrist, RightIndex),
        (RightWrist, RightThumb),
        (RightPinky, RightIndex),
        (LeftShoulder, LeftHip),
        (RightShoulder, RightHip),
        (LeftHip, RightHip),
        (LeftHip, LeftKnee),
        (RightHip, RightKnee),
        (LeftKnee, LeftAnkle),
        (RightKnee, RightAnkle),
        (LeftAnkle, LeftHeel),
        (RightAnkle, RightHeel),
        (LeftHeel, LeftFootIndex),
        (RightHeel, RightFootIndex),
        (LeftAnkle, LeftFootIndex),
        (RightAnkle, RightFootIndex),
    ]
};

/// Normalized 2-D landmark position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Horizontal position, 0 at the left edge
    pub x: f64,
    /// Vertical position, 0 at the top edge
    pub y: f64,
}

impl Landmark {
    /// Create a landmark from normalized coordinates
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Immutable set of landmarks detected for one person in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Option<Landmark>; NUM_BODY_LANDMARKS],
}

impl LandmarkSet {
    /// Build a set from `(point, position)` pairs; later duplicates win
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (BodyPoint, Landmark)>,
    {
        let mut slots = [None; NUM_BODY_LANDMARKS];
        for (point, landmark) in points {
            slots[point.index()] = Some(landmark);
        }
        Self { points: slots }
    }

    /// Position of `point`, if the source produced it
    #[must_use]
    pub fn get(&self, point: BodyPoint) -> Option<Landmark> {
        self.points[point.index()]
    }

    /// Position of `point`, or [`Error::MissingLandmark`]
    ///
    /// # Errors
    ///
    /// Returns `MissingLandmark` if the point is absent from the set
    pub fn require(&self, point: BodyPoint) -> Result<Landmark> {
        self.get(point).ok_or(Error::MissingLandmark(point))
    }

    /// Number of points present
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    /// True when no point is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present points in model order
    pub fn iter(&self) -> impl Iterator<Item = (BodyPoint, Landmark)> + '_ {
        BodyPoint::ALL
            .iter()
            .zip(self.points.iter())
            .filter_map(|(point, slot)| slot.map(|landmark| (*point, landmark)))
    }
}

/// Maps an image frame to the landmarks of the person in it
pub trait LandmarkSource {
    /// Extract landmarks from a frame
    ///
    /// `Ok(None)` means no person was detected, which is a normal outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    fn extract(&mut self, frame: &Mat) -> Result<Option<LandmarkSet>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_point_indices_match_model_order() {
        assert_eq!(BodyPoint::Nose.index(), 0);
        assert_eq!(BodyPoint::LeftShoulder.index(), 11);
        assert_eq!(BodyPoint::RightShoulder.index(), 12);
        assert_eq!(BodyPoint::RightFootIndex.index(), NUM_BODY_LANDMARKS - 1);

        for (i, point) in BodyPoint::ALL.iter().enumerate() {
            assert_eq!(point.index(), i);
            assert_eq!(BodyPoint::from_index(i), Some(*point));
        }
        assert_eq!(BodyPoint::from_index(NUM_BODY_LANDMARKS), None);
    }

    #[test]
    fn test_landmark_set_lookup() {
        let set = LandmarkSet::from_points([
            (BodyPoint::Nose, Landmark::new(0.5, 0.3)),
            (BodyPoint::LeftShoulder, Landmark::new(0.6, 0.5)),
        ]);

        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert_eq!(set.get(BodyPoint::Nose), Some(Landmark::new(0.5, 0.3)));
        assert_eq!(set.get(BodyPoint::RightShoulder), None);

        match set.require(BodyPoint::RightShoulder) {
            Err(Error::MissingLandmark(point)) => assert_eq!(point, BodyPoint::RightShoulder),
            other => panic!("Expected MissingLandmark, got {other:?}"),
        }
    }

    #[test]
    fn test_landmark_set_iterates_in_model_order() {
        let set = LandmarkSet::from_points([
            (BodyPoint::RightShoulder, Landmark::new(0.4, 0.5)),
            (BodyPoint::Nose, Landmark::new(0.5, 0.3)),
        ]);

        let order: Vec<BodyPoint> = set.iter().map(|(point, _)| point).collect();
        assert_eq!(order, vec![BodyPoint::Nose, BodyPoint::RightShoulder]);
    }

    #[test]
    fn test_connections_reference_distinct_points() {
        for (a, b) in POSE_CONNECTIONS {
            assert_ne!(a, b);
        }
        assert!(POSE_CONNECTIONS.contains(&(BodyPoint::LeftShoulder, BodyPoint::RightShoulder)));
    }

    #[test]
    fn test_display_uses_snake_case() {
        assert_eq!(BodyPoint::LeftShoulder.to_string(), "left_shoulder");
        assert_eq!(BodyPoint::Nose.to_string(), "nose");
    }
}
