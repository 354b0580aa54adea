//! Platform media-device boundary.
//!
//! Implementations wrap whatever the host offers (browser media devices,
//! V4L2, a file on disk). Only [`CaptureDevice::open_stream`] is async;
//! frame reads and recorder control are immediate.

use async_trait::async_trait;
use image::DynamicImage;

use crate::encoding::RecorderSettings;
use crate::error::CaptureError;

/// Result of a non-prompting permission query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Asking would show a prompt.
    Prompt,
    /// The platform cannot answer without prompting.
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
    pub max_frame_rate: Option<u32>,
}

/// What to request from the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: Option<VideoConstraints>,
    pub audio: bool,
}

impl MediaConstraints {
    /// Front camera for a still selfie.
    pub fn selfie() -> Self {
        Self {
            video: Some(VideoConstraints {
                ideal_width: 640,
                ideal_height: 480,
                facing: FacingMode::User,
                max_frame_rate: None,
            }),
            audio: false,
        }
    }

    /// Rear camera for photographing an identity document.
    pub fn document() -> Self {
        Self {
            video: Some(VideoConstraints {
                ideal_width: 1280,
                ideal_height: 720,
                facing: FacingMode::Environment,
                max_frame_rate: None,
            }),
            audio: false,
        }
    }

    /// Front camera plus microphone at a deliberately small size for video
    /// evidence.
    pub fn video_evidence() -> Self {
        Self {
            video: Some(VideoConstraints {
                ideal_width: 320,
                ideal_height: 240,
                facing: FacingMode::User,
                max_frame_rate: Some(15),
            }),
            audio: true,
        }
    }
}

/// A capture device able to open live streams.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Human-readable name of this device.
    fn name(&self) -> &str;

    /// Query permission without prompting.
    async fn query_permission(&self) -> PermissionState {
        PermissionState::Unknown
    }

    /// Acquire a live stream satisfying `constraints`.
    async fn open_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError>;

    /// Whether the recorder can produce `mime`.
    fn supports_encoding(&self, mime: &str) -> bool;
}

/// A live audio/video stream bound to the preview.
pub trait MediaStream: Send {
    /// The frame currently shown in the preview.
    fn current_frame(&self) -> Result<DynamicImage, CaptureError>;

    /// Attach a recorder to this stream.
    fn create_recorder(
        &mut self,
        settings: &RecorderSettings,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError>;

    /// Stop every track. Must be idempotent.
    fn stop_tracks(&mut self);

    fn is_active(&self) -> bool;
}

/// Encodes the stream into chunks.
pub trait MediaRecorder: Send {
    /// The MIME type actually produced.
    fn mime(&self) -> &str;

    /// Chunks encoded since the previous call.
    fn drain(&mut self) -> Vec<Vec<u8>>;

    /// Stop encoding and return every chunk not yet drained.
    fn finish(&mut self) -> Vec<Vec<u8>>;
}
