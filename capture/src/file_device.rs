//! A capture device backed by an image on disk.
//!
//! Used for headless verification runs: every frame of the "preview" is the
//! same decoded image. Recording is not available.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;

use crate::device::{CaptureDevice, MediaConstraints, MediaRecorder, MediaStream, PermissionState};
use crate::encoding::RecorderSettings;
use crate::error::CaptureError;

pub struct ImageFileDevice {
    name: String,
    frame: Arc<DynamicImage>,
}

impl ImageFileDevice {
    /// Decode `path` once and serve it as the camera frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let frame = image::open(&path).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                CaptureError::DeviceNotFound
            }
            other => CaptureError::Frame(format!("{}: {other}", path.display())),
        })?;
        debug!(path = %path.display(), width = frame.width(), height = frame.height(), "image device ready");
        Ok(Self {
            name: format!("file:{}", path.display()),
            frame: Arc::new(frame),
        })
    }

    pub fn from_image(name: impl Into<String>, frame: DynamicImage) -> Self {
        Self {
            name: name.into(),
            frame: Arc::new(frame),
        }
    }
}

#[async_trait]
impl CaptureDevice for ImageFileDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    async fn open_stream(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, CaptureError> {
        if constraints.video.is_none() {
            return Err(CaptureError::ConstraintsUnsatisfiable(
                "an image device only provides video".into(),
            ));
        }
        Ok(Box::new(ImageStream {
            frame: Arc::clone(&self.frame),
            active: true,
        }))
    }

    fn supports_encoding(&self, _mime: &str) -> bool {
        false
    }
}

struct ImageStream {
    frame: Arc<DynamicImage>,
    active: bool,
}

impl MediaStream for ImageStream {
    fn current_frame(&self) -> Result<DynamicImage, CaptureError> {
        if !self.active {
            return Err(CaptureError::NoActiveCamera);
        }
        Ok(DynamicImage::clone(&self.frame))
    }

    fn create_recorder(
        &mut self,
        _settings: &RecorderSettings,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError> {
        Err(CaptureError::NotSupported(
            "an image device cannot record video".into(),
        ))
    }

    fn stop_tracks(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
