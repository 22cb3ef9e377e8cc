//! Skeleton and verdict overlay drawn onto frames.

use crate::{
    error::Result,
    landmarks::{Landmark, LandmarkSet, POSE_CONNECTIONS},
    posture::PostureVerdict,
};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};

/// Drawing capability used by the capture loop
pub trait Annotator {
    /// Return a copy of `frame` with the skeleton and verdict drawn on it
    ///
    /// # Errors
    ///
    /// Returns an error if a drawing operation fails
    fn annotate(&self, frame: &Mat, landmarks: Option<&LandmarkSet>, verdict: PostureVerdict) -> Result<Mat>;
}

/// BGR colour associated with a verdict
#[must_use]
pub fn verdict_color(verdict: PostureVerdict) -> Scalar {
    match verdict {
        PostureVerdict::Good => Scalar::new(0.0, 255.0, 0.0, 0.0),
        PostureVerdict::Bad => Scalar::new(0.0, 0.0, 255.0, 0.0),
    }
}

/// Map a normalized landmark to pixel coordinates of a `width` x `height` frame
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamped to the frame before the cast
pub fn to_pixel(landmark: Landmark, width: i32, height: i32) -> Point {
    let max_x = f64::from((width - 1).max(0));
    let max_y = f64::from((height - 1).max(0));
    let x = (landmark.x * f64::from(width)).clamp(0.0, max_x);
    let y = (landmark.y * f64::from(height)).clamp(0.0, max_y);
    Point::new(x as i32, y as i32)
}

/// `OpenCV` overlay: white skeleton lines, red joints, verdict label
#[derive(Debug, Clone, Copy)]
pub struct SkeletonOverlay {
    /// Anchor of the verdict label
    pub label_origin: Point,
    pub line_thickness: i32,
    pub joint_radius: i32,
}

impl Default for SkeletonOverlay {
    fn default() -> Self {
        Self {
            label_origin: Point::new(50, 50),
            line_thickness: 2,
            joint_radius: 4,
        }
    }
}

impl SkeletonOverlay {
    fn draw_skeleton(&self, canvas: &mut Mat, landmarks: &LandmarkSet) -> Result<()> {
        let (width, height) = (canvas.cols(), canvas.rows());

        for (from, to) in POSE_CONNECTIONS {
            if let (Some(a), Some(b)) = (landmarks.get(from), landmarks.get(to)) {
                imgproc::line(
                    canvas,
                    to_pixel(a, width, height),
                    to_pixel(b, width, height),
                    Scalar::new(255.0, 255.0, 255.0, 0.0),
                    self.line_thickness,
                    LINE_8,
                    0,
                )?;
            }
        }

        for (_, landmark) in landmarks.iter() {
            imgproc::circle(
                canvas,
                to_pixel(landmark, width, height),
                self.joint_radius,
                Scalar::new(0.0, 0.0, 255.0, 0.0),
                -1,
                LINE_8,
                0,
            )?;
        }

        Ok(())
    }
}

impl Annotator for SkeletonOverlay {
    fn annotate(&self, frame: &Mat, landmarks: Option<&LandmarkSet>, verdict: PostureVerdict) -> Result<Mat> {
        let mut canvas = frame.try_clone()?;

        if let Some(landmarks) = landmarks {
            self.draw_skeleton(&mut canvas, landmarks)?;
        }

        imgproc::put_text(
            &mut canvas,
            verdict.label(),
            self.label_origin,
            FONT_HERSHEY_SIMPLEX,
            1.0,
            verdict_color(verdict),
            3,
            LINE_8,
            false,
        )?;

        Ok(canvas)
    }
}
