//! The guided verification flow.
//!
//! [`VerificationFlow`] walks an applicant through four steps (personal
//! information, identity document, live evidence, review) and refuses to
//! move forward until the current step validates. Validation itself lives in
//! [`validation`] and is a pure function of the session.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod validation;

pub use config::GateConfig;
pub use controller::{ComparisonOutcome, ComparisonRequest, VerificationFlow};
pub use error::FlowError;
pub use events::FlowEvent;
pub use validation::{diagnose, is_step_valid, ValidationIssue, ValidationRules};
