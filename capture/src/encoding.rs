//! Recorder encoding selection.
//!
//! Video evidence travels over e-mail-sized channels, so recordings target a
//! very small bitrate, resolution and frame rate. Codecs are tried in order
//! and the first one the device supports wins.

use crate::device::CaptureDevice;

/// Preferred encodings, best first.
pub const ENCODING_LADDER: &[&str] = &[
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4;codecs=avc1,mp4a",
    "video/mp4",
];

/// Target parameters handed to the recorder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecorderSettings {
    /// `None` leaves the choice to the platform.
    pub mime: Option<String>,
    pub video_bits_per_second: u32,
    pub audio_bits_per_second: u32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// How often the recorder flushes a chunk.
    pub timeslice_ms: u32,
}

impl RecorderSettings {
    pub fn low_bandwidth(mime: Option<String>) -> Self {
        Self {
            mime,
            video_bits_per_second: 250_000,
            audio_bits_per_second: 32_000,
            width: 320,
            height: 240,
            frame_rate: 15,
            timeslice_ms: 1_000,
        }
    }
}

/// First entry of `ladder` the device supports.
pub fn select_encoding<'a>(device: &dyn CaptureDevice, ladder: &[&'a str]) -> Option<&'a str> {
    ladder.iter().copied().find(|mime| device.supports_encoding(mime))
}
