use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera or microphone permission was denied")]
    PermissionDenied,

    #[error("no capture device found")]
    DeviceNotFound,

    #[error("capture device is busy")]
    DeviceBusy,

    #[error("device cannot satisfy the requested constraints: {0}")]
    ConstraintsUnsatisfiable(String),

    #[error("capture is not supported: {0}")]
    NotSupported(String),

    #[error("camera is not active")]
    NoActiveCamera,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("recording produced no media")]
    EmptyRecording,

    #[error("frame capture failed: {0}")]
    Frame(String),
}

impl CaptureError {
    /// Map a platform media error name (as raised by `getUserMedia` and
    /// friends) onto the capture taxonomy.
    pub fn from_platform(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => Self::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => Self::DeviceNotFound,
            "NotReadableError" | "TrackStartError" | "AbortError" => Self::DeviceBusy,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                Self::ConstraintsUnsatisfiable(message.to_string())
            }
            _ => Self::NotSupported(format!("{name}: {message}")),
        }
    }

    /// Actionable text to show the applicant.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Allow camera access in your browser or device settings, then try again."
            }
            Self::DeviceNotFound => "Connect a camera, or switch to uploading photos instead.",
            Self::DeviceBusy => "Close other applications that are using the camera, then retry.",
            Self::ConstraintsUnsatisfiable(_) => {
                "Your camera does not support the required resolution. Try another camera."
            }
            Self::NotSupported(_) => {
                "This device cannot capture media here. Try a different browser or device."
            }
            Self::NoActiveCamera => "Start the camera first.",
            Self::AlreadyRecording => "A recording is already running.",
            Self::NotRecording => "Start a recording first.",
            Self::EmptyRecording => "Nothing was recorded. Please record again.",
            Self::Frame(_) => "The photo could not be taken. Please try again.",
        }
    }
}
