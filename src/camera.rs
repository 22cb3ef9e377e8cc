//! Camera device access.
//!
//! [`CameraBackend`] is the seam the capture session drives; the `OpenCV`
//! implementation wraps `VideoCapture`. The handle is a separate value so
//! the session can own it exclusively and drop it on close.

use crate::error::{Error, Result};
use log::{debug, info, warn};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};
use serde::{Deserialize, Serialize};

/// Opens, reads and releases camera devices
pub trait CameraBackend {
    /// Open device handle type
    type Handle;

    /// Open the device at `index`
    ///
    /// # Errors
    ///
    /// Returns `CameraUnavailable` if the device cannot be opened
    fn open(&mut self, index: i32) -> Result<Self::Handle>;

    /// Read one frame
    ///
    /// # Errors
    ///
    /// Returns `CameraUnavailable` if the device produced no frame
    fn read(&mut self, handle: &mut Self::Handle) -> Result<Mat>;

    /// Release the device
    fn close(&mut self, handle: Self::Handle);
}

/// `OpenCV` capture API used to open the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureApi {
    /// Let `OpenCV` pick
    #[default]
    Any,
    /// DirectShow (Windows)
    Dshow,
    /// Media Foundation (Windows)
    Msmf,
    /// Video4Linux2
    V4l2,
    /// AVFoundation (macOS)
    Avfoundation,
}

impl CaptureApi {
    /// `OpenCV` API preference constant
    #[must_use]
    pub const fn api_preference(self) -> i32 {
        match self {
            CaptureApi::Any => videoio::CAP_ANY,
            CaptureApi::Dshow => videoio::CAP_DSHOW,
            CaptureApi::Msmf => videoio::CAP_MSMF,
            CaptureApi::V4l2 => videoio::CAP_V4L2,
            CaptureApi::Avfoundation => videoio::CAP_AVFOUNDATION,
        }
    }
}

/// Webcam access through `OpenCV` `VideoCapture`
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvCamera {
    api: CaptureApi,
}

impl OpenCvCamera {
    /// Create a backend using the given capture API
    #[must_use]
    pub const fn new(api: CaptureApi) -> Self {
        Self { api }
    }
}

impl CameraBackend for OpenCvCamera {
    type Handle = VideoCapture;

    fn open(&mut self, index: i32) -> Result<VideoCapture> {
        info!("Opening camera {} ({:?})", index, self.api);
        let mut capture = VideoCapture::new(index, self.api.api_preference())?;

        if !capture.is_opened()? {
            return Err(Error::CameraUnavailable(format!("Failed to open camera {index}")));
        }

        // Reduce buffer size for lower latency
        if let Err(e) = capture.set(CAP_PROP_BUFFERSIZE, 1.0) {
            debug!("Camera {} ignored buffer size request: {}", index, e);
        }

        Ok(capture)
    }

    fn read(&mut self, handle: &mut VideoCapture) -> Result<Mat> {
        let mut frame = Mat::default();
        if !handle.read(&mut frame)? || frame.empty() {
            return Err(Error::CameraUnavailable("Camera returned no frame".to_string()));
        }
        Ok(frame)
    }

    fn close(&mut self, mut handle: VideoCapture) {
        if let Err(e) = handle.release() {
            warn!("Failed to release camera: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_api_mapping() {
        assert_eq!(CaptureApi::Any.api_preference(), videoio::CAP_ANY);
        assert_eq!(CaptureApi::Dshow.api_preference(), videoio::CAP_DSHOW);
        assert_eq!(CaptureApi::V4l2.api_preference(), videoio::CAP_V4L2);
        assert_eq!(CaptureApi::default(), CaptureApi::Any);
    }

    #[test]
    fn test_capture_api_serde_names() {
        let api: CaptureApi = serde_yaml::from_str("dshow").unwrap();
        assert_eq!(api, CaptureApi::Dshow);
        assert_eq!(serde_yaml::to_string(&CaptureApi::Avfoundation).unwrap().trim(), "avfoundation");
    }
}
