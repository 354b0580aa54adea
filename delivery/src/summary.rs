//! Plain-text summary for the back office.

use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use idgate_types::{MatchResult, PersonalInfo};
use idgate_utils::format_duration;

use crate::payload::{Attachment, AttachmentKind};

const NOT_PROVIDED: &str = "Not provided";

fn or_missing(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_PROVIDED
    } else {
        value
    }
}

/// Render the human-readable summary that accompanies a submission.
pub fn render_summary(
    personal: &PersonalInfo,
    match_result: Option<&MatchResult>,
    video_duration: Option<Duration>,
    attachments: &[Attachment],
    submitted_at: DateTime<Utc>,
) -> String {
    let has = |kind| attachments.iter().any(|a: &Attachment| a.kind == kind);
    let provided = |kind| if has(kind) { "Provided" } else { NOT_PROVIDED };

    // Writing to a String cannot fail.
    let mut out = String::new();
    let _ = writeln!(out, "New Identity Verification Request");
    let _ = writeln!(out);
    let _ = writeln!(out, "Personal Information");
    let _ = writeln!(out, "  Full Name: {}", or_missing(&personal.full_name));
    let _ = writeln!(out, "  Email: {}", or_missing(&personal.email));
    let _ = writeln!(out, "  Phone: {}", or_missing(&personal.phone));
    let _ = writeln!(out, "  Region: {}", or_missing(&personal.region));
    let _ = writeln!(out);
    let _ = writeln!(out, "License Information");
    let _ = writeln!(out, "  License Number: {}", or_missing(&personal.government_id));
    let _ = writeln!(out, "  Date of Birth: {}", or_missing(&personal.date_of_birth));
    let _ = writeln!(
        out,
        "  Blood Type: {}",
        or_missing(personal.blood_type.as_deref().unwrap_or(""))
    );
    if let Some(national_id) = personal.national_id.as_deref() {
        let _ = writeln!(out, "  National ID: {}", or_missing(national_id));
    }

    if let Some(result) = match_result {
        let _ = writeln!(out);
        let _ = writeln!(out, "Face Verification Results");
        let _ = writeln!(
            out,
            "  Verification {}",
            if result.is_match() { "PASSED" } else { "FAILED" }
        );
        let _ = writeln!(out, "  Match Percentage: {}%", result.score());
        let _ = writeln!(out, "  Method: {}", result.method());
        let _ = writeln!(
            out,
            "  Status: {}",
            if result.is_match() { "Identity Verified" } else { "Identity Not Verified" }
        );
    }
    if let Some(duration) = video_duration {
        let _ = writeln!(out);
        let _ = writeln!(out, "Video Verification");
        let _ = writeln!(out, "  Duration: {}", format_duration(duration));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Attached Files");
    let _ = writeln!(out, "  Front ID Image: {}", provided(AttachmentKind::FrontId));
    let _ = writeln!(out, "  Back ID Image: {}", provided(AttachmentKind::BackId));
    let _ = writeln!(
        out,
        "  Selfie Image: {}",
        if has(AttachmentKind::Selfie) { "Captured" } else { NOT_PROVIDED }
    );
    if has(AttachmentKind::Video) {
        let _ = writeln!(out, "  Video: Recorded");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Submission Details");
    let _ = writeln!(out, "  Submitted on: {}", submitted_at.to_rfc3339());
    out
}
