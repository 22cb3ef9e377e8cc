//! Error handling tests for all modules

use posture_guard::{
    alert::{AlertWorker, CommandSpeaker, Speaker},
    error::{AppError, Result},
    landmarks::{BodyPoint, LandmarkSet},
    pose_detection::{decode_landmarks, PoseDetector},
    posture::classify,
};

#[test]
fn test_error_messages() {
    let cases = [
        (AppError::MissingLandmark(BodyPoint::Nose), "Missing landmark: nose"),
        (AppError::CameraPermissionDenied(1), "Camera permission denied for device 1"),
        (AppError::CameraUnavailable("no frame".to_string()), "Camera unavailable: no frame"),
        (AppError::Speech("queue full".to_string()), "Speech error: queue full"),
        (AppError::ConfigError("bad".to_string()), "Configuration error: bad"),
    ];

    for (error, expected) in cases {
        assert_eq!(error.to_string(), expected);
    }
}

#[test]
fn test_io_errors_convert() {
    fn open_missing() -> Result<String> {
        Ok(std::fs::read_to_string("/nonexistent/posture.yaml")?)
    }

    assert!(matches!(open_missing(), Err(AppError::Io(_))));
}

#[test]
fn test_empty_landmark_set_reports_first_missing_point() {
    match classify(&LandmarkSet::from_points(std::iter::empty())) {
        Err(AppError::MissingLandmark(point)) => assert_eq!(point, BodyPoint::LeftShoulder),
        other => panic!("Expected MissingLandmark, got {other:?}"),
    }
}

#[test]
fn test_detector_construction_errors() {
    match PoseDetector::new("model.onnx", 0, 0.5) {
        Err(AppError::InvalidInput(msg)) => assert!(msg.contains("input size")),
        Err(e) => panic!("Expected InvalidInput, got {e}"),
        Ok(_) => panic!("Expected InvalidInput"),
    }

    match PoseDetector::new("/nonexistent/pose.onnx", 256, 0.5) {
        Err(AppError::ModelError(msg)) => assert!(msg.contains("/nonexistent/pose.onnx")),
        Err(e) => panic!("Expected ModelError, got {e}"),
        Ok(_) => panic!("Expected ModelError"),
    }
}

#[test]
fn test_decode_rejects_malformed_output() {
    assert!(matches!(
        decode_landmarks(&[], None, 256, 0.5),
        Err(AppError::ModelOutputError(_))
    ));
    assert!(matches!(
        decode_landmarks(&[1.0, 2.0, 3.0], Some(0.9), 256, 0.5),
        Err(AppError::ModelOutputError(_))
    ));
    assert!(matches!(
        decode_landmarks(&[0.0; 10], None, -1, 0.5),
        Err(AppError::ModelOutputError(_))
    ));
}

#[test]
fn test_speech_program_failures() {
    let missing = CommandSpeaker::new("posture-guard-no-such-synthesizer", Vec::new());
    assert!(matches!(missing.speak("hello"), Err(AppError::Speech(_))));

    // Worker accepts the utterance and counts the failure
    let worker = AlertWorker::start(missing, 2).unwrap();
    assert!(worker.speak("hello").is_ok());
    worker.flush().unwrap();
    let metrics = worker.metrics();
    assert_eq!(metrics.failed, 1);
    assert_eq!(metrics.spoken, 0);
    worker.shutdown();
}
