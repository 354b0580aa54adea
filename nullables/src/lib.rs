//! Nullable collaborators for deterministic testing.
//!
//! Every external boundary of the verification flow (camera, face
//! comparator, submission channel) has a stand-in here that:
//! - Returns scripted, deterministic answers
//! - Records what it was asked to do
//! - Never touches hardware or the network
//!
//! Usage: hand these to `VerificationFlow` in place of the real devices and
//! clients.

pub mod capture;
pub mod channel;
pub mod comparator;

pub use capture::NullCaptureDevice;
pub use channel::NullSubmissionChannel;
pub use comparator::NullComparator;

use std::sync::{Mutex, MutexGuard};

/// Lock, ignoring poisoning from a panicked test thread.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
