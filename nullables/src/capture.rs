//! Nullable camera: serves a fixed frame and records fake media.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use idgate_capture::{
    CaptureDevice, CaptureError, MediaConstraints, MediaRecorder, MediaStream, PermissionState,
    RecorderSettings,
};
use image::{DynamicImage, Rgb, RgbImage};

use crate::lock;

struct DeviceState {
    frame: DynamicImage,
    permission: PermissionState,
    supported: Vec<String>,
    next_error: Option<CaptureError>,
    opened: usize,
    active: usize,
    last_constraints: Option<MediaConstraints>,
    chunk: Vec<u8>,
}

/// A test camera. Clones share state, so a test can keep one handle for
/// assertions while the flow owns another.
#[derive(Clone)]
pub struct NullCaptureDevice {
    state: Arc<Mutex<DeviceState>>,
}

/// A 640×480 gradient, stable across runs.
pub fn test_frame() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(640, 480, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

impl NullCaptureDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                frame: test_frame(),
                permission: PermissionState::Granted,
                supported: vec!["video/webm;codecs=vp8,opus".into(), "video/webm".into()],
                next_error: None,
                opened: 0,
                active: 0,
                last_constraints: None,
                chunk: vec![0x1A, 0x45, 0xDF, 0xA3],
            })),
        }
    }

    /// Serve `frame` from now on.
    pub fn set_frame(&self, frame: DynamicImage) {
        lock(&self.state).frame = frame;
    }

    pub fn set_permission(&self, permission: PermissionState) {
        lock(&self.state).permission = permission;
    }

    /// Restrict the encodings the recorder accepts.
    pub fn set_supported_encodings(&self, mimes: &[&str]) {
        lock(&self.state).supported = mimes.iter().map(|m| m.to_string()).collect();
    }

    /// Make the next `open_stream` fail with `error`.
    pub fn fail_next_open(&self, error: CaptureError) {
        lock(&self.state).next_error = Some(error);
    }

    /// Total streams opened.
    pub fn open_count(&self) -> usize {
        lock(&self.state).opened
    }

    /// Streams opened and not yet stopped.
    pub fn active_streams(&self) -> usize {
        lock(&self.state).active
    }

    pub fn last_constraints(&self) -> Option<MediaConstraints> {
        lock(&self.state).last_constraints.clone()
    }
}

impl Default for NullCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for NullCaptureDevice {
    fn name(&self) -> &str {
        "null-camera"
    }

    async fn query_permission(&self) -> PermissionState {
        lock(&self.state).permission
    }

    async fn open_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        let mut state = lock(&self.state);
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        state.opened += 1;
        state.active += 1;
        state.last_constraints = Some(constraints.clone());
        Ok(Box::new(NullStream {
            state: Arc::clone(&self.state),
            active: true,
        }))
    }

    fn supports_encoding(&self, mime: &str) -> bool {
        lock(&self.state).supported.iter().any(|m| m == mime)
    }
}

struct NullStream {
    state: Arc<Mutex<DeviceState>>,
    active: bool,
}

impl MediaStream for NullStream {
    fn current_frame(&self) -> Result<DynamicImage, CaptureError> {
        if !self.active {
            return Err(CaptureError::NoActiveCamera);
        }
        Ok(lock(&self.state).frame.clone())
    }

    fn create_recorder(
        &mut self,
        settings: &RecorderSettings,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError> {
        Ok(Box::new(NullRecorder {
            mime: settings.mime.clone().unwrap_or_else(|| "video/webm".into()),
            chunk: lock(&self.state).chunk.clone(),
        }))
    }

    fn stop_tracks(&mut self) {
        if self.active {
            self.active = false;
            let mut state = lock(&self.state);
            state.active = state.active.saturating_sub(1);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for NullStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

struct NullRecorder {
    mime: String,
    chunk: Vec<u8>,
}

impl MediaRecorder for NullRecorder {
    fn mime(&self) -> &str {
        &self.mime
    }

    fn drain(&mut self) -> Vec<Vec<u8>> {
        vec![self.chunk.clone()]
    }

    fn finish(&mut self) -> Vec<Vec<u8>> {
        vec![self.chunk.clone()]
    }
}
