//! Capture lifecycle controller.
//!
//! The controller owns the single active [`CaptureSession`]. Dropping the
//! session (explicit stop, controller drop, or an error path unwinding it)
//! always stops the stream's tracks.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use idgate_types::{EncodedImage, VideoArtifact};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tokio::sync::Notify;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::device::{CaptureDevice, MediaConstraints, MediaRecorder, MediaStream, PermissionState};
use crate::encoding::{select_encoding, RecorderSettings, ENCODING_LADDER};
use crate::error::CaptureError;

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    CameraActive,
    Recording,
}

/// Requests a manual stop of the running recording.
///
/// A stop issued before anyone awaits the recording is remembered.
#[derive(Clone, Debug)]
pub struct StopHandle(Arc<Notify>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.notify_one();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StopReason {
    Manual,
    Ceiling,
}

struct Recording {
    recorder: Box<dyn MediaRecorder>,
    chunks: Vec<Vec<u8>>,
    started: Instant,
    max: Duration,
    elapsed_secs: u32,
    stop: Arc<Notify>,
}

/// An open stream plus its optional recorder.
pub struct CaptureSession {
    stream: Box<dyn MediaStream>,
    recording: Option<Recording>,
    opened: Instant,
}

impl CaptureSession {
    fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            stream,
            recording: None,
            opened: Instant::now(),
        }
    }

    fn release(&mut self) {
        if let Some(mut recording) = self.recording.take() {
            let dropped: usize = recording.recorder.finish().iter().map(Vec::len).sum();
            debug!(dropped_bytes = dropped, "discarding unfinished recording");
        }
        if self.stream.is_active() {
            self.stream.stop_tracks();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Drives one capture device through preview, still capture and recording.
pub struct MediaCaptureController {
    device: Arc<dyn CaptureDevice>,
    session: Option<CaptureSession>,
    probe_permission: bool,
}

impl MediaCaptureController {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            session: None,
            probe_permission: true,
        }
    }

    /// Enable or disable the non-prompting permission probe before opening
    /// a stream.
    pub fn with_permission_probe(mut self, probe: bool) -> Self {
        self.probe_permission = probe;
        self
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    pub fn state(&self) -> CaptureState {
        match &self.session {
            None => CaptureState::Idle,
            Some(s) if s.recording.is_some() => CaptureState::Recording,
            Some(_) => CaptureState::CameraActive,
        }
    }

    /// Acquire the device and start the live preview.
    ///
    /// Only one session may be open; call [`stop_camera`](Self::stop_camera)
    /// before starting another.
    pub async fn start_camera(&mut self, constraints: &MediaConstraints) -> Result<(), CaptureError> {
        if self.session.is_some() {
            return Err(CaptureError::DeviceBusy);
        }
        if self.probe_permission
            && self.device.query_permission().await == PermissionState::Denied
        {
            warn!(device = self.device.name(), "camera permission denied by probe");
            return Err(CaptureError::PermissionDenied);
        }

        let stream = self.device.open_stream(constraints).await.map_err(|e| {
            warn!(device = self.device.name(), error = %e, "failed to open capture stream");
            e
        })?;
        self.session = Some(CaptureSession::new(stream));
        info!(device = self.device.name(), audio = constraints.audio, "camera started");
        Ok(())
    }

    /// Release the device. Returns whether a session was open.
    pub fn stop_camera(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                info!(
                    device = self.device.name(),
                    open_for_ms = session.opened.elapsed().as_millis() as u64,
                    "camera stopped"
                );
                drop(session);
                true
            }
            None => false,
        }
    }

    /// Draw the current preview frame into a `width`×`height` raster and
    /// encode it as PNG.
    pub fn capture_still_frame(&self, width: u32, height: u32) -> Result<EncodedImage, CaptureError> {
        let session = self.session.as_ref().ok_or(CaptureError::NoActiveCamera)?;
        let frame = session.stream.current_frame()?;
        let raster = frame.resize_exact(width, height, FilterType::Triangle);
        let bytes = encode_png(&raster)?;
        debug!(width, height, bytes = bytes.len(), "still frame captured");
        Ok(EncodedImage::png(bytes))
    }

    /// Start recording with a hard ceiling of `max`.
    pub fn start_timed_recording(&mut self, max: Duration) -> Result<StopHandle, CaptureError> {
        let session = self.session.as_mut().ok_or(CaptureError::NoActiveCamera)?;
        if session.recording.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let mime = select_encoding(self.device.as_ref(), ENCODING_LADDER);
        if mime.is_none() {
            warn!(device = self.device.name(), "no preferred encoding supported, using platform default");
        }
        let settings = RecorderSettings::low_bandwidth(mime.map(str::to_string));
        let recorder = session.stream.create_recorder(&settings)?;
        let stop = Arc::new(Notify::new());
        session.recording = Some(Recording {
            recorder,
            chunks: Vec::new(),
            started: Instant::now(),
            max,
            elapsed_secs: 0,
            stop: Arc::clone(&stop),
        });
        info!(mime = ?settings.mime, max_secs = max.as_secs_f64(), "recording started");
        Ok(StopHandle(stop))
    }

    /// Whole seconds counted by the recording countdown so far.
    pub fn recording_elapsed(&self) -> Option<u32> {
        self.session
            .as_ref()
            .and_then(|s| s.recording.as_ref())
            .map(|r| r.elapsed_secs)
    }

    /// Run the countdown until the ceiling or a manual stop, then assemble
    /// the video. The camera stays active afterwards.
    pub async fn await_recording(&mut self) -> Result<VideoArtifact, CaptureError> {
        let session = self.session.as_mut().ok_or(CaptureError::NoActiveCamera)?;
        let recording = session.recording.as_mut().ok_or(CaptureError::NotRecording)?;

        let deadline = recording.started + recording.max;
        let stop = Arc::clone(&recording.stop);
        let mut ticker = interval_at(recording.started + COUNTDOWN_TICK, COUNTDOWN_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;
                _ = stop.notified() => break StopReason::Manual,
                _ = sleep_until(deadline) => break StopReason::Ceiling,
                _ = ticker.tick() => {
                    recording.elapsed_secs += 1;
                    let fresh = recording.recorder.drain();
                    debug!(
                        elapsed_secs = recording.elapsed_secs,
                        chunks = fresh.len(),
                        "recording tick"
                    );
                    recording.chunks.extend(fresh);
                }
            }
        };
        self.finish_recording(reason)
    }

    /// Stop the running recording now.
    pub fn stop_recording(&mut self) -> Result<VideoArtifact, CaptureError> {
        self.finish_recording(StopReason::Manual)
    }

    fn finish_recording(&mut self, reason: StopReason) -> Result<VideoArtifact, CaptureError> {
        let session = self.session.as_mut().ok_or(CaptureError::NoActiveCamera)?;
        let mut recording = session.recording.take().ok_or(CaptureError::NotRecording)?;

        recording.chunks.extend(recording.recorder.finish());
        let duration = match reason {
            StopReason::Ceiling => recording.max,
            StopReason::Manual => recording.started.elapsed().min(recording.max),
        };
        let bytes = recording.chunks.concat();
        if bytes.is_empty() {
            warn!(?reason, "recording stopped without any media");
            return Err(CaptureError::EmptyRecording);
        }

        info!(
            ?reason,
            duration_ms = duration.as_millis() as u64,
            bytes = bytes.len(),
            "recording stopped"
        );
        Ok(VideoArtifact {
            mime: recording.recorder.mime().to_string(),
            bytes,
            duration,
        })
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CaptureError::Frame(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeDevice {
        permission: PermissionState,
        open_error: Option<CaptureError>,
        supported: Vec<&'static str>,
        stopped: Arc<AtomicUsize>,
    }

    impl FakeDevice {
        fn new() -> Self {
            Self {
                permission: PermissionState::Granted,
                open_error: None,
                supported: vec!["video/webm;codecs=vp8,opus"],
                stopped: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CaptureDevice for FakeDevice {
        fn name(&self) -> &str {
            "fake"
        }

        async fn query_permission(&self) -> PermissionState {
            self.permission
        }

        async fn open_stream(
            &self,
            _constraints: &MediaConstraints,
        ) -> Result<Box<dyn MediaStream>, CaptureError> {
            if let Some(err) = &self.open_error {
                return Err(err.clone());
            }
            Ok(Box::new(FakeStream {
                active: true,
                stopped: Arc::clone(&self.stopped),
            }))
        }

        fn supports_encoding(&self, mime: &str) -> bool {
            self.supported.contains(&mime)
        }
    }

    struct FakeStream {
        active: bool,
        stopped: Arc<AtomicUsize>,
    }

    impl MediaStream for FakeStream {
        fn current_frame(&self) -> Result<DynamicImage, CaptureError> {
            Ok(DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
                Rgb([(x * 4) as u8, (y * 5) as u8, 90])
            })))
        }

        fn create_recorder(
            &mut self,
            settings: &RecorderSettings,
        ) -> Result<Box<dyn MediaRecorder>, CaptureError> {
            Ok(Box::new(FakeRecorder {
                mime: settings.mime.clone().unwrap_or_else(|| "video/webm".into()),
            }))
        }

        fn stop_tracks(&mut self) {
            if self.active {
                self.active = false;
                self.stopped.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct FakeRecorder {
        mime: String,
    }

    impl MediaRecorder for FakeRecorder {
        fn mime(&self) -> &str {
            &self.mime
        }

        fn drain(&mut self) -> Vec<Vec<u8>> {
            vec![vec![1u8; 10]]
        }

        fn finish(&mut self) -> Vec<Vec<u8>> {
            vec![vec![2u8; 5]]
        }
    }

    fn controller(device: FakeDevice) -> MediaCaptureController {
        MediaCaptureController::new(Arc::new(device))
    }

    #[tokio::test]
    async fn start_and_stop_cycle_states() {
        let device = FakeDevice::new();
        let stopped = Arc::clone(&device.stopped);
        let mut ctl = controller(device);
        assert_eq!(ctl.state(), CaptureState::Idle);

        ctl.start_camera(&MediaConstraints::selfie()).await.unwrap();
        assert_eq!(ctl.state(), CaptureState::CameraActive);

        assert!(ctl.stop_camera());
        assert_eq!(ctl.state(), CaptureState::Idle);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);

        // idempotent
        assert!(!ctl.stop_camera());
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_start_is_busy() {
        let mut ctl = controller(FakeDevice::new());
        ctl.start_camera(&MediaConstraints::selfie()).await.unwrap();
        let err = ctl.start_camera(&MediaConstraints::selfie()).await.unwrap_err();
        assert_eq!(err, CaptureError::DeviceBusy);
        assert_eq!(ctl.state(), CaptureState::CameraActive);
    }

    #[tokio::test]
    async fn permission_probe_short_circuits() {
        let mut device = FakeDevice::new();
        device.permission = PermissionState::Denied;
        let mut ctl = controller(device);
        let err = ctl.start_camera(&MediaConstraints::selfie()).await.unwrap_err();
        assert_eq!(err, CaptureError::PermissionDenied);
        assert_eq!(ctl.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn probe_can_be_disabled() {
        let mut device = FakeDevice::new();
        device.permission = PermissionState::Denied;
        let mut ctl = controller(device).with_permission_probe(false);
        ctl.start_camera(&MediaConstraints::selfie()).await.unwrap();
        assert_eq!(ctl.state(), CaptureState::CameraActive);
    }

    #[tokio::test]
    async fn open_failure_leaves_controller_idle() {
        let mut device = FakeDevice::new();
        device.open_error = Some(CaptureError::DeviceNotFound);
        let mut ctl = controller(device);
        let err = ctl.start_camera(&MediaConstraints::document()).await.unwrap_err();
        assert_eq!(err, CaptureError::DeviceNotFound);
        assert_eq!(ctl.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn still_frame_has_requested_size_and_is_deterministic() {
        let mut ctl = controller(FakeDevice::new());
        ctl.start_camera(&MediaConstraints::selfie()).await.unwrap();
        let a = ctl.capture_still_frame(320, 240).unwrap();
        let b = ctl.capture_still_frame(320, 240).unwrap();
        assert_eq!(a, b);

        let decoded = image::load_from_memory(a.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
    }

    #[test]
    fn still_frame_without_camera_fails() {
        let ctl = controller(FakeDevice::new());
        assert_eq!(
            ctl.capture_still_frame(320, 240).unwrap_err(),
            CaptureError::NoActiveCamera
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recording_auto_stops_at_ceiling() {
        let mut ctl = controller(FakeDevice::new());
        ctl.start_camera(&MediaConstraints::video_evidence()).await.unwrap();
        let _stop = ctl.start_timed_recording(Duration::from_secs(7)).unwrap();
        assert_eq!(ctl.state(), CaptureState::Recording);

        let video = ctl.await_recording().await.unwrap();
        assert_eq!(video.duration, Duration::from_secs(7));
        assert_eq!(video.mime, "video/webm;codecs=vp8,opus");
        assert!(!video.bytes.is_empty());
        assert_eq!(ctl.state(), CaptureState::CameraActive);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_stop_yields_shorter_duration() {
        let mut ctl = controller(FakeDevice::new());
        ctl.start_camera(&MediaConstraints::video_evidence()).await.unwrap();
        let stop = ctl.start_timed_recording(Duration::from_secs(7)).unwrap();

        let stopper = async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            stop.stop();
        };
        let (video, ()) = tokio::join!(ctl.await_recording(), stopper);
        let video = video.unwrap();
        assert_eq!(video.duration, Duration::from_secs(3));
        // at least two ticks of 10 bytes plus the final 5-byte chunk
        assert!(video.bytes.len() >= 25);
        assert_eq!(ctl.state(), CaptureState::CameraActive);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_issued_before_await_is_honoured() {
        let mut ctl = controller(FakeDevice::new());
        ctl.start_camera(&MediaConstraints::video_evidence()).await.unwrap();
        let stop = ctl.start_timed_recording(Duration::from_secs(7)).unwrap();
        stop.stop();
        let video = ctl.await_recording().await.unwrap();
        assert_eq!(video.duration, Duration::ZERO);
    }

    #[tokio::test]
    async fn recording_falls_back_to_platform_default() {
        let mut device = FakeDevice::new();
        device.supported.clear();
        let mut ctl = controller(device);
        ctl.start_camera(&MediaConstraints::video_evidence()).await.unwrap();
        ctl.start_timed_recording(Duration::from_secs(7)).unwrap();
        let video = ctl.stop_recording().unwrap();
        assert_eq!(video.mime, "video/webm");
    }

    #[tokio::test]
    async fn recording_requires_camera_and_is_exclusive() {
        let mut ctl = controller(FakeDevice::new());
        assert_eq!(
            ctl.start_timed_recording(Duration::from_secs(7)).unwrap_err(),
            CaptureError::NoActiveCamera
        );
        ctl.start_camera(&MediaConstraints::video_evidence()).await.unwrap();
        ctl.start_timed_recording(Duration::from_secs(7)).unwrap();
        assert_eq!(
            ctl.start_timed_recording(Duration::from_secs(7)).unwrap_err(),
            CaptureError::AlreadyRecording
        );
    }

    #[tokio::test]
    async fn stopping_camera_mid_recording_releases_device() {
        let device = FakeDevice::new();
        let stopped = Arc::clone(&device.stopped);
        let mut ctl = controller(device);
        ctl.start_camera(&MediaConstraints::video_evidence()).await.unwrap();
        ctl.start_timed_recording(Duration::from_secs(7)).unwrap();
        assert!(ctl.stop_camera());
        assert_eq!(ctl.state(), CaptureState::Idle);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.stop_recording().unwrap_err(), CaptureError::NoActiveCamera);
    }

    #[tokio::test]
    async fn dropping_controller_releases_device() {
        let device = FakeDevice::new();
        let stopped = Arc::clone(&device.stopped);
        {
            let mut ctl = controller(device);
            ctl.start_camera(&MediaConstraints::selfie()).await.unwrap();
        }
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }
}
