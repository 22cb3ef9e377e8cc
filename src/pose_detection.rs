//! Full-body pose landmark detection with `ONNX` Runtime.
//!
//! The detector runs a single-person pose landmark model (BlazePose
//! topology, 33 points) on the whole frame. The model's first output holds
//! `LANDMARK_STRIDE` values per point in input pixel units; an optional
//! second output holds the pose presence score used to decide whether a
//! person is in view.

use crate::{
    constants::{LANDMARK_STRIDE, NUM_BODY_LANDMARKS},
    error::{Error, Result},
    landmarks::{BodyPoint, Landmark, LandmarkSet, LandmarkSource},
};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, GraphOptimizationLevel, LoggingLevel, Session, SessionBuilder, Value};
use std::path::Path;
use std::sync::Arc;

/// Pose landmark detector using `ONNX` Runtime
pub struct PoseDetector {
    session: Session,
    input_size: i32,
    presence_threshold: f32,
}

impl PoseDetector {
    /// Create a new detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The model has no inputs or outputs
    /// - The ONNX runtime environment cannot be created
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: i32, presence_threshold: f32) -> Result<Self> {
        let model_path = model_path.as_ref();
        info!("Initializing PoseDetector with model: {}", model_path.display());

        if input_size <= 0 {
            return Err(Error::InvalidInput(format!("Model input size must be positive, got {input_size}")));
        }
        if !model_path.exists() {
            return Err(Error::ModelError(format!("Pose model not found: {}", model_path.display())));
        }

        let environment = Arc::new(
            Environment::builder()
                .with_name("pose_detector")
                .with_log_level(LoggingLevel::Warning)
                .build()?,
        );

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Model has no outputs".to_string()));
        }
        debug!(
            "Pose model inputs: {:?}, outputs: {:?}",
            session.inputs.iter().map(|i| &i.name).collect::<Vec<_>>(),
            session.outputs.iter().map(|o| &o.name).collect::<Vec<_>>()
        );

        Ok(Self {
            session,
            input_size,
            presence_threshold,
        })
    }

    /// Resize, convert BGR to RGB and scale to `[0, 1]`, in NHWC layout
    #[allow(clippy::cast_sign_loss)] // Input size checked positive in `new`
    fn preprocess(&self, frame: &Mat) -> Result<Array4<f32>> {
        let size = self.input_size as usize;
        let channels = 3;

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let mut data = Vec::with_capacity(size * size * channels);
        for row in 0..self.input_size {
            for col in 0..self.input_size {
                let pixel = float_image.at_2d::<Vec3f>(row, col)?;
                data.extend_from_slice(&[pixel[0], pixel[1], pixel[2]]);
            }
        }

        Array4::from_shape_vec((1, size, size, channels), data)
            .map_err(|e| Error::ModelDataFormatError(format!("Failed to create array: {e}")))
    }

    /// Run the model and flatten every output tensor
    fn forward(&self, input: Array4<f32>) -> Result<Vec<Vec<f32>>> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;

        let mut flattened = Vec::with_capacity(outputs.len());
        for output in &outputs {
            let tensor = output.try_extract::<f32>()?;
            let view = tensor.view();
            flattened.push(view.iter().copied().collect());
        }

        if flattened.is_empty() {
            return Err(Error::ModelOutputError("No output from model".to_string()));
        }
        Ok(flattened)
    }
}

impl LandmarkSource for PoseDetector {
    fn extract(&mut self, frame: &Mat) -> Result<Option<LandmarkSet>> {
        let input = self.preprocess(frame)?;
        let outputs = self.forward(input)?;

        let presence = outputs.get(1).and_then(|scores| scores.first().copied());
        decode_landmarks(&outputs[0], presence, self.input_size, self.presence_threshold)
    }
}

/// Decode raw model output into a landmark set
///
/// `raw` holds `LANDMARK_STRIDE` values per point, x and y first, in input
/// pixels. Points beyond the end of `raw` are left absent. Returns
/// `Ok(None)` when `presence` is below `threshold`.
///
/// # Errors
///
/// Returns `ModelOutputError` if `raw` does not hold a single complete point
/// or the input size is not positive
pub fn decode_landmarks(
    raw: &[f32],
    presence: Option<f32>,
    input_size: i32,
    threshold: f32,
) -> Result<Option<LandmarkSet>> {
    if input_size <= 0 {
        return Err(Error::ModelOutputError(format!("Invalid input size {input_size}")));
    }
    if raw.len() < LANDMARK_STRIDE {
        return Err(Error::ModelOutputError(format!(
            "Expected at least {LANDMARK_STRIDE} landmark values, got {}",
            raw.len()
        )));
    }

    if let Some(score) = presence {
        if score < threshold {
            debug!("No person in frame (presence {:.3})", score);
            return Ok(None);
        }
    }

    let scale = f64::from(input_size);
    let count = (raw.len() / LANDMARK_STRIDE).min(NUM_BODY_LANDMARKS);
    let points = (0..count).filter_map(|i| {
        let offset = i * LANDMARK_STRIDE;
        let (x, y) = (raw[offset], raw[offset + 1]);
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let point = BodyPoint::from_index(i)?;
        Some((point, Landmark::new(f64::from(x) / scale, f64::from(y) / scale)))
    });

    Ok(Some(LandmarkSet::from_points(points)))
}
