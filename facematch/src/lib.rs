//! Face matching between the document photo and the live still.
//!
//! The comparator itself is remote. [`FaceComparator`] is the boundary,
//! [`HttpFaceComparator`] speaks the comparison service's JSON contract, and
//! [`FaceMatchOrchestrator`] validates inputs, bounds the call in time and
//! turns the raw verdict into a [`MatchResult`](idgate_types::MatchResult).

pub mod client;
pub mod comparator;
pub mod error;
pub mod orchestrator;

pub use client::HttpFaceComparator;
pub use comparator::{ComparatorVerdict, FaceComparator};
pub use error::FaceMatchError;
pub use orchestrator::FaceMatchOrchestrator;
