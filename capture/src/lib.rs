//! Media capture for the verification flow.
//!
//! The platform's camera and microphone are reached through the
//! [`CaptureDevice`] / [`MediaStream`] / [`MediaRecorder`] traits. The
//! [`MediaCaptureController`] owns at most one live [`CaptureSession`] and
//! drives the `Idle → CameraActive → Recording → CameraActive → Idle` cycle.

pub mod controller;
pub mod device;
pub mod encoding;
pub mod error;
pub mod file_device;

pub use controller::{CaptureSession, CaptureState, MediaCaptureController, StopHandle};
pub use device::{
    CaptureDevice, FacingMode, MediaConstraints, MediaRecorder, MediaStream, PermissionState,
    VideoConstraints,
};
pub use encoding::{select_encoding, RecorderSettings, ENCODING_LADDER};
pub use error::CaptureError;
pub use file_device::ImageFileDevice;
