//! The verification flow state machine.
//!
//! [`VerificationFlow`] owns the session, the capture controller and the
//! external collaborators. Every mutation of the session goes through here,
//! and the session is replaced wholesale on each update.

use std::sync::Arc;

use chrono::Utc;
use idgate_capture::{
    CaptureDevice, CaptureState, MediaCaptureController, MediaConstraints, StopHandle,
};
use idgate_delivery::{
    session_attachments, Attachment, DeliveryReceipt, SubmissionChannel, SubmissionPayload,
};
use idgate_facematch::{FaceComparator, FaceMatchError, FaceMatchOrchestrator};
use idgate_preprocess::{compress_with, enhance_with_size, validate_upload, CompressionOptions};
use idgate_types::{
    ArtifactId, DocumentArtifact, DocumentMode, DocumentSide, EncodedImage, FlowVariant,
    LiveEvidence, MatchResult, PersonalInfo, SessionError, Step, StepDescriptor,
    VerificationSession, VideoArtifact,
};
use tracing::{debug, info, warn};

use crate::config::GateConfig;
use crate::error::FlowError;
use crate::events::FlowEvent;
use crate::validation::{diagnose, ValidationIssue, ValidationRules};

/// Raster size for a camera-captured document side.
pub const DOCUMENT_CAPTURE_SIZE: (u32, u32) = (400, 300);

/// Raster size for the live still, before enhancement.
pub const LIVE_CAPTURE_SIZE: (u32, u32) = (320, 240);

/// Inputs for one comparison attempt, detached from the flow so the call
/// can run while the flow keeps handling input.
#[derive(Clone, Debug)]
pub struct ComparisonRequest {
    pub artifact: ArtifactId,
    pub document: EncodedImage,
    pub live: EncodedImage,
}

/// What happened to a finished comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum ComparisonOutcome {
    Applied(MatchResult),
    /// The live evidence changed while the comparison ran.
    Discarded {
        result_for: ArtifactId,
        current: Option<ArtifactId>,
    },
}

pub struct VerificationFlow {
    config: GateConfig,
    rules: ValidationRules,
    step: Step,
    session: VerificationSession,
    capture: MediaCaptureController,
    orchestrator: FaceMatchOrchestrator,
    channel: Arc<dyn SubmissionChannel>,
    events: Vec<FlowEvent>,
}

impl VerificationFlow {
    pub fn new(
        config: GateConfig,
        device: Arc<dyn CaptureDevice>,
        comparator: Arc<dyn FaceComparator>,
        channel: Arc<dyn SubmissionChannel>,
    ) -> Result<Self, FlowError> {
        config.validate()?;
        let capture =
            MediaCaptureController::new(device).with_permission_probe(config.permission_probe);
        let orchestrator =
            FaceMatchOrchestrator::new(comparator).with_timeout(config.comparator_timeout());
        info!(
            variant = ?config.variant,
            document_mode = %config.document_mode,
            device = capture.device_name(),
            comparator = orchestrator.comparator_name(),
            channel = channel.name(),
            "verification flow ready"
        );
        Ok(Self {
            rules: ValidationRules::from_config(&config),
            session: VerificationSession::new(config.document_mode),
            step: Step::PersonalInfo,
            config,
            capture,
            orchestrator,
            channel,
            events: Vec::new(),
        })
    }

    /// Replace the validation rules (e.g. to pin the reference date).
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn session(&self) -> &VerificationSession {
        &self.session
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn variant(&self) -> FlowVariant {
        self.config.variant
    }

    pub fn steps(&self) -> [StepDescriptor; 4] {
        self.config.variant.steps()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Whole seconds recorded so far, while a recording runs.
    pub fn recording_elapsed(&self) -> Option<u32> {
        self.capture.recording_elapsed()
    }

    pub fn diagnose(&self, step: Step) -> Vec<ValidationIssue> {
        diagnose(&self.session, step, &self.rules)
    }

    pub fn is_step_valid(&self, step: Step) -> bool {
        self.diagnose(step).is_empty()
    }

    /// Take all events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<FlowEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Move to the next step if the current one validates.
    pub fn advance(&mut self) -> Result<Step, FlowError> {
        let next = self.step.next().ok_or(FlowError::AtFinalStep)?;
        let issues = self.diagnose(self.step);
        if !issues.is_empty() {
            debug!(step = %self.step, issues = issues.len(), "advance refused");
            return Err(FlowError::ValidationFailed {
                step: self.step,
                issues,
            });
        }
        self.enter(next);
        Ok(next)
    }

    /// Move back one step. Never validated.
    pub fn retreat(&mut self) -> Result<Step, FlowError> {
        let prev = self.step.prev().ok_or(FlowError::AtFirstStep)?;
        self.enter(prev);
        Ok(prev)
    }

    /// Jump to `target`: always allowed backwards, forwards only when every
    /// earlier step validates.
    pub fn select_step(&mut self, target: Step) -> Result<Step, FlowError> {
        if target > self.step {
            if let Some(blocking) = target.predecessors().find(|s| !self.is_step_valid(*s)) {
                return Err(FlowError::StepLocked { target, blocking });
            }
        }
        self.enter(target);
        Ok(target)
    }

    fn enter(&mut self, target: Step) {
        if target == self.step {
            return;
        }
        self.release_camera();
        let from = self.step;
        self.step = target;
        info!(%from, to = %target, "step changed");
        self.events.push(FlowEvent::StepChanged { from, to: target });

        // Each visit to the live step needs a fresh comparison.
        if target == Step::LiveEvidence && self.session.live().is_some() {
            self.clear_match_result();
        }
    }

    fn require_step(&self, expected: Step) -> Result<(), FlowError> {
        if self.step != expected {
            return Err(FlowError::WrongStep {
                expected,
                current: self.step,
            });
        }
        Ok(())
    }

    fn require_variant(&self, variant: FlowVariant) -> Result<(), FlowError> {
        if self.config.variant != variant {
            return Err(FlowError::WrongVariant(self.config.variant));
        }
        Ok(())
    }

    fn clear_match_result(&mut self) {
        if self.session.match_result().is_some() {
            self.session = self.session.without_match_result();
            debug!("match result cleared");
            self.events.push(FlowEvent::MatchCleared);
        }
    }

    // ── Step 1 ───────────────────────────────────────────────────────────

    /// Replace the personal information. Allowed at any step.
    pub fn update_personal_info(&mut self, personal: PersonalInfo) {
        self.session = self.session.with_personal_info(personal);
    }

    // ── Step 2 ───────────────────────────────────────────────────────────

    pub fn set_document_mode(&mut self, mode: DocumentMode) -> Result<(), FlowError> {
        self.require_step(Step::Documents)?;
        if mode == self.session.document_mode() {
            return Ok(());
        }
        self.release_camera();
        let had_match = self.session.match_result().is_some();
        self.session = self.session.with_document_mode(mode);
        info!(%mode, "document mode changed");
        self.events.push(FlowEvent::DocumentModeChanged { mode });
        if had_match {
            self.events.push(FlowEvent::MatchCleared);
        }
        Ok(())
    }

    /// Validate a selected file and store it as one document side.
    pub fn upload_document(
        &mut self,
        side: DocumentSide,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<(), FlowError> {
        self.require_step(Step::Documents)?;
        if self.session.document_mode() != DocumentMode::Upload {
            return Err(SessionError::ModeMismatch {
                expected: self.session.document_mode(),
                found: DocumentMode::Upload,
            }
            .into());
        }
        let file = validate_upload(file_name, mime, bytes).map_err(|e| {
            warn!(%side, file_name, error = %e, "upload rejected");
            e
        })?;
        self.store_document(side, DocumentArtifact::Uploaded(file))
    }

    pub fn remove_document(&mut self, side: DocumentSide) -> Result<(), FlowError> {
        self.require_step(Step::Documents)?;
        if self.session.document(side).is_none() {
            return Ok(());
        }
        let had_match = self.session.match_result().is_some();
        self.session = self.session.without_document(side);
        self.events.push(FlowEvent::DocumentRemoved { side });
        if had_match && self.session.match_result().is_none() {
            self.events.push(FlowEvent::MatchCleared);
        }
        Ok(())
    }

    /// Photograph one document side with the running camera, then stop it.
    pub fn capture_document(&mut self, side: DocumentSide) -> Result<(), FlowError> {
        self.require_step(Step::Documents)?;
        if self.session.document_mode() != DocumentMode::Capture {
            return Err(SessionError::ModeMismatch {
                expected: self.session.document_mode(),
                found: DocumentMode::Capture,
            }
            .into());
        }
        let (w, h) = DOCUMENT_CAPTURE_SIZE;
        let image = self.capture.capture_still_frame(w, h)?;
        self.release_camera();
        self.store_document(side, DocumentArtifact::Captured(image))
    }

    fn store_document(&mut self, side: DocumentSide, artifact: DocumentArtifact) -> Result<(), FlowError> {
        let mode = artifact.mode();
        let had_match = self.session.match_result().is_some();
        self.session = self.session.with_document(side, artifact)?;
        info!(%side, %mode, "document stored");
        self.events.push(FlowEvent::DocumentStored { side, mode });
        if had_match && self.session.match_result().is_none() {
            self.events.push(FlowEvent::MatchCleared);
        }
        Ok(())
    }

    // ── Camera ───────────────────────────────────────────────────────────

    /// Start the camera for the current step. In the live step a started
    /// camera also drops any earlier match result; a failed start leaves the
    /// session as it was.
    pub async fn start_camera(&mut self) -> Result<(), FlowError> {
        let constraints = match (self.step, self.config.variant) {
            (Step::Documents, _) => MediaConstraints::document(),
            (Step::LiveEvidence, FlowVariant::StillPhoto) => MediaConstraints::selfie(),
            (Step::LiveEvidence, FlowVariant::Video) => MediaConstraints::video_evidence(),
            (step, _) => return Err(FlowError::CameraNotUsed(step)),
        };
        self.capture.start_camera(&constraints).await?;
        if self.step == Step::LiveEvidence {
            self.clear_match_result();
        }
        self.events.push(FlowEvent::CameraStarted { step: self.step });
        Ok(())
    }

    /// Stop the camera. Returns whether it was running.
    pub fn stop_camera(&mut self) -> bool {
        self.release_camera()
    }

    fn release_camera(&mut self) -> bool {
        let stopped = self.capture.stop_camera();
        if stopped {
            self.events.push(FlowEvent::CameraStopped);
        }
        stopped
    }

    // ── Step 3: still photo ──────────────────────────────────────────────

    /// Take the live still, enhance it and make it the current evidence.
    /// The camera is stopped afterwards.
    pub fn capture_live_photo(&mut self) -> Result<ArtifactId, FlowError> {
        self.require_step(Step::LiveEvidence)?;
        self.require_variant(FlowVariant::StillPhoto)?;
        let (w, h) = LIVE_CAPTURE_SIZE;
        let raw = self.capture.capture_still_frame(w, h)?;
        self.release_camera();
        let enhanced = enhance_with_size(&raw, self.config.enhance_size)?;
        let had_match = self.session.match_result().is_some();
        self.session = self.session.with_live_still(enhanced);
        let artifact = self.session.live_id().ok_or(FlowError::NoLiveEvidence)?;
        info!(%artifact, "live photo captured");
        if had_match {
            self.events.push(FlowEvent::MatchCleared);
        }
        self.events.push(FlowEvent::LiveCaptured { artifact });
        Ok(artifact)
    }

    /// Gather the inputs for comparing the current still against the front
    /// of the document.
    pub fn prepare_comparison(&mut self) -> Result<ComparisonRequest, FlowError> {
        self.require_step(Step::LiveEvidence)?;
        self.require_variant(FlowVariant::StillPhoto)?;
        let (artifact, live) = match self.session.live() {
            Some(LiveEvidence::Still { id, image }) => (*id, image.clone()),
            Some(LiveEvidence::Video { .. }) => return Err(SessionError::NotAStillImage.into()),
            None => return Err(FlowError::NoLiveEvidence),
        };
        let front = self.session.document(DocumentSide::Front).ok_or_else(|| {
            FlowError::ValidationFailed {
                step: Step::Documents,
                issues: vec![ValidationIssue::MissingDocument(DocumentSide::Front)],
            }
        })?;
        let document = enhance_with_size(front.image(), self.config.enhance_size)?;
        self.clear_match_result();
        self.events.push(FlowEvent::ComparisonStarted { artifact });
        Ok(ComparisonRequest {
            artifact,
            document,
            live,
        })
    }

    /// A handle for running comparisons outside the flow.
    pub fn orchestrator(&self) -> FaceMatchOrchestrator {
        self.orchestrator.clone()
    }

    /// Fold a finished comparison back into the session. Results for
    /// evidence that has since been replaced are discarded.
    pub fn apply_comparison(
        &mut self,
        artifact: ArtifactId,
        outcome: Result<MatchResult, FaceMatchError>,
    ) -> Result<ComparisonOutcome, FlowError> {
        let current = self.session.live_id();
        if current != Some(artifact) {
            warn!(result_for = %artifact, ?current, "discarding stale comparison");
            self.events.push(FlowEvent::StaleResultDiscarded {
                result_for: artifact,
                current,
            });
            return Ok(ComparisonOutcome::Discarded {
                result_for: artifact,
                current,
            });
        }

        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                warn!(%artifact, %error, "face comparison failed");
                self.events.push(FlowEvent::ComparisonFailed {
                    artifact,
                    error: error.clone(),
                });
                return Err(error.into());
            }
        };

        match self.session.with_match_result(result.clone()) {
            Ok(next) => self.session = next,
            Err(SessionError::StaleMatchResult { result_for, current }) => {
                self.events.push(FlowEvent::StaleResultDiscarded { result_for, current });
                return Ok(ComparisonOutcome::Discarded { result_for, current });
            }
            Err(e) => return Err(e.into()),
        }

        if result.verdict_disagrees() {
            self.events.push(FlowEvent::VerdictDisagreement {
                artifact,
                score: result.score(),
                verdict: result.verdict(),
            });
        }
        let score = result.score();
        if result.is_match() {
            info!(%artifact, score, "face match accepted");
            self.events.push(FlowEvent::MatchAccepted { artifact, score });
        } else {
            info!(%artifact, score, "face match rejected");
            self.events.push(FlowEvent::MatchRejected { artifact, score });
        }
        Ok(ComparisonOutcome::Applied(result))
    }

    /// Compare the current still against the document and record the result.
    pub async fn verify_live_photo(&mut self) -> Result<ComparisonOutcome, FlowError> {
        let request = self.prepare_comparison()?;
        let orchestrator = self.orchestrator.clone();
        let outcome = orchestrator
            .compare(request.artifact, &request.document, &request.live)
            .await;
        self.apply_comparison(request.artifact, outcome)
    }

    /// Capture the live still and compare it in one go.
    pub async fn capture_and_verify(&mut self) -> Result<ComparisonOutcome, FlowError> {
        self.capture_live_photo()?;
        self.verify_live_photo().await
    }

    /// Throw away the live evidence and restart the camera for another try.
    pub async fn retake_live_evidence(&mut self) -> Result<(), FlowError> {
        self.require_step(Step::LiveEvidence)?;
        if self.session.live().is_some() {
            let had_match = self.session.match_result().is_some();
            self.session = self.session.without_live();
            if had_match {
                self.events.push(FlowEvent::MatchCleared);
            }
            self.events.push(FlowEvent::LiveDiscarded);
        }
        self.release_camera();
        self.start_camera().await
    }

    // ── Step 3: video ────────────────────────────────────────────────────

    /// Begin recording from the running camera. The returned handle stops
    /// the recording early.
    pub fn start_video_recording(&mut self) -> Result<StopHandle, FlowError> {
        self.require_step(Step::LiveEvidence)?;
        self.require_variant(FlowVariant::Video)?;
        Ok(self.capture.start_timed_recording(self.config.video_max())?)
    }

    /// Wait until the recording ends (ceiling or stop handle) and store it.
    pub async fn finish_video_recording(&mut self) -> Result<ArtifactId, FlowError> {
        let video = self.capture.await_recording().await?;
        self.store_video(video)
    }

    /// Stop the recording now and store it.
    pub fn stop_video_recording(&mut self) -> Result<ArtifactId, FlowError> {
        let video = self.capture.stop_recording()?;
        self.store_video(video)
    }

    fn store_video(&mut self, video: VideoArtifact) -> Result<ArtifactId, FlowError> {
        self.release_camera();
        let duration = video.duration;
        self.session = self.session.with_live_video(video);
        let artifact = self.session.live_id().ok_or(FlowError::NoLiveEvidence)?;
        info!(%artifact, duration_ms = duration.as_millis() as u64, "video stored");
        self.events.push(FlowEvent::VideoRecorded { artifact, duration });
        Ok(artifact)
    }

    // ── Step 4 ───────────────────────────────────────────────────────────

    /// Deliver the session. On success the session is discarded and the flow
    /// starts over; on failure everything is kept for another attempt.
    pub async fn submit(&mut self) -> Result<DeliveryReceipt, FlowError> {
        self.require_step(Step::Review)?;
        let issues = self.diagnose(Step::Review);
        if !issues.is_empty() {
            return Err(FlowError::ValidationFailed {
                step: Step::Review,
                issues,
            });
        }

        let attachments = self.transport_attachments()?;
        let payload = SubmissionPayload::assemble(&self.session, attachments, Utc::now())?;
        match self.channel.deliver(&payload).await {
            Ok(receipt) => {
                info!(channel = %receipt.channel, bytes = receipt.bytes, "submission accepted");
                self.events.push(FlowEvent::Submitted {
                    receipt: receipt.clone(),
                });
                self.reset();
                Ok(receipt)
            }
            Err(error) => {
                warn!(%error, "submission failed");
                self.events.push(FlowEvent::SubmissionFailed {
                    error: error.clone(),
                });
                Err(error.into())
            }
        }
    }

    /// Attachments with document images compressed for delivery.
    fn transport_attachments(&self) -> Result<Vec<Attachment>, FlowError> {
        let options = CompressionOptions {
            max_dimension: self.config.transport_max_dimension,
            ..CompressionOptions::default()
        };
        let target = self.config.transport_target_bytes;
        session_attachments(&self.session, |side, image| -> Result<EncodedImage, FlowError> {
            let compressed = compress_with(image, target, &options)?;
            debug!(
                %side,
                quality = compressed.quality,
                bytes = compressed.image.len(),
                "document compressed for transport"
            );
            Ok(compressed.image)
        })
    }

    fn reset(&mut self) {
        self.release_camera();
        self.session = VerificationSession::new(self.config.document_mode);
        let from = self.step;
        self.step = Step::PersonalInfo;
        if from != self.step {
            self.events.push(FlowEvent::StepChanged {
                from,
                to: self.step,
            });
        }
    }
}
