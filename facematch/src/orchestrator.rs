//! Runs one comparison attempt at a time and turns verdicts into
//! [`MatchResult`]s.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use idgate_types::{ArtifactId, EncodedImage, MatchResult};
use tracing::{info, warn};

use crate::comparator::FaceComparator;
use crate::error::FaceMatchError;

const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared handle to a comparator. Clones share the in-flight slot, so at most
/// one attempt runs across all clones.
#[derive(Clone)]
pub struct FaceMatchOrchestrator {
    comparator: Arc<dyn FaceComparator>,
    timeout: Duration,
    in_flight: Arc<Mutex<Option<ArtifactId>>>,
}

/// Clears the in-flight slot when the attempt ends, however it ends.
struct AttemptGuard {
    slot: Arc<Mutex<Option<ArtifactId>>>,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        *lock(&self.slot) = None;
    }
}

fn lock(slot: &Mutex<Option<ArtifactId>>) -> MutexGuard<'_, Option<ArtifactId>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FaceMatchOrchestrator {
    pub fn new(comparator: Arc<dyn FaceComparator>) -> Self {
        Self {
            comparator,
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn comparator_name(&self) -> &str {
        self.comparator.name()
    }

    /// The artifact whose comparison is currently running, if any.
    pub fn in_flight(&self) -> Option<ArtifactId> {
        *lock(&self.in_flight)
    }

    /// Compare `document` against the live still identified by `artifact`.
    ///
    /// Inputs are checked before any call is made. The comparator's verdict
    /// is combined with the local threshold; a disagreement between the two
    /// is logged but not an error.
    pub async fn compare(
        &self,
        artifact: ArtifactId,
        document: &EncodedImage,
        live: &EncodedImage,
    ) -> Result<MatchResult, FaceMatchError> {
        check_input("document", document)?;
        check_input("live", live)?;
        let _guard = self.begin(artifact)?;

        info!(%artifact, comparator = self.comparator.name(), "face comparison started");
        let verdict = tokio::time::timeout(self.timeout, self.comparator.compare(document, live))
            .await
            .map_err(|_| {
                FaceMatchError::Transport(format!(
                    "comparison timed out after {}s",
                    self.timeout.as_secs_f64()
                ))
            })??;

        let result = MatchResult::decide(
            artifact,
            verdict.similarity,
            verdict.is_match,
            verdict.method.unwrap_or_default(),
        );
        if result.verdict_disagrees() {
            warn!(
                %artifact,
                score = result.score(),
                verdict = result.verdict(),
                "comparator verdict disagrees with score threshold"
            );
        }
        info!(
            %artifact,
            score = result.score(),
            is_match = result.is_match(),
            method = result.method(),
            "face comparison finished"
        );
        Ok(result)
    }

    fn begin(&self, artifact: ArtifactId) -> Result<AttemptGuard, FaceMatchError> {
        let mut slot = lock(&self.in_flight);
        if let Some(running) = *slot {
            return Err(FaceMatchError::AttemptInProgress(running));
        }
        *slot = Some(artifact);
        Ok(AttemptGuard {
            slot: Arc::clone(&self.in_flight),
        })
    }
}

fn check_input(label: &str, image: &EncodedImage) -> Result<(), FaceMatchError> {
    if image.is_empty() {
        return Err(FaceMatchError::InvalidInput(format!("{label} image is empty")));
    }
    idgate_preprocess::decode(image)
        .map(|_| ())
        .map_err(|e| FaceMatchError::InvalidInput(format!("{label} image: {e}")))
}
