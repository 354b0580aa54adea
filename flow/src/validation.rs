//! Step gating rules.
//!
//! [`diagnose`] lists everything that keeps a step from being complete;
//! [`is_step_valid`] is its emptiness check. Both are pure functions of the
//! session and the rules, with no stored state.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use idgate_types::{
    DocumentSide, FlowVariant, LiveEvidence, PersonalField, PersonalInfo, Step, StepPredicate,
    VerificationSession, MATCH_THRESHOLD,
};
use idgate_utils::format_duration;
use regex::Regex;

use crate::config::GateConfig;

/// Letters, with inner spaces, hyphens and apostrophes.
static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}[\p{L}\s'\-]*$").expect("name regex is valid"));

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9(][0-9\s().\-]*$").expect("phone regex is valid"));

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Alphanumeric groups joined by single separators.
static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(?:[\s/\-][A-Za-z0-9]+)*$").expect("identifier regex is valid")
});

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

/// Parameters the predicates depend on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationRules {
    pub variant: FlowVariant,
    pub video_min: Duration,
    pub video_max: Duration,
    /// Reference date for the date-of-birth check; today (UTC) when unset.
    pub today: Option<NaiveDate>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            variant: FlowVariant::StillPhoto,
            video_min: Duration::from_secs(5),
            video_max: Duration::from_secs(7),
            today: None,
        }
    }
}

impl ValidationRules {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            variant: config.variant,
            video_min: config.video_min(),
            video_max: config.video_max(),
            today: None,
        }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// One reason a step is not complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField(PersonalField),
    MalformedField(PersonalField),
    DateOfBirthInFuture,
    MissingDocument(DocumentSide),
    MissingLiveEvidence,
    /// Evidence of the other variant's kind is attached.
    WrongEvidenceKind { expected: FlowVariant },
    /// No comparison has been accepted for the current still.
    MatchPending,
    MatchRejected { score: u8 },
    VideoTooShort { duration: Duration, min: Duration },
    VideoTooLong { duration: Duration, max: Duration },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::MalformedField(field) => write!(f, "{field} is not valid"),
            Self::DateOfBirthInFuture => f.write_str("date of birth is in the future"),
            Self::MissingDocument(side) => write!(f, "{side} of the document is missing"),
            Self::MissingLiveEvidence => f.write_str("live evidence is missing"),
            Self::WrongEvidenceKind { expected } => {
                write!(f, "live evidence does not match the {expected:?} flow")
            }
            Self::MatchPending => f.write_str("face match has not been verified"),
            Self::MatchRejected { score } => write!(
                f,
                "face match failed at {score}% (minimum required: {MATCH_THRESHOLD}%)"
            ),
            Self::VideoTooShort { duration, min } => write!(
                f,
                "video is {}, below the minimum duration of {}",
                format_duration(*duration),
                format_duration(*min)
            ),
            Self::VideoTooLong { duration, max } => write!(
                f,
                "video is {}, above the maximum duration of {}",
                format_duration(*duration),
                format_duration(*max)
            ),
        }
    }
}

/// Everything that keeps `step` from being complete. Empty means valid.
///
/// The check is the predicate the variant's descriptor assigns to `step`.
pub fn diagnose(
    session: &VerificationSession,
    step: Step,
    rules: &ValidationRules,
) -> Vec<ValidationIssue> {
    match rules.variant.descriptor(step).predicate {
        StepPredicate::PersonalInfoComplete => personal_issues(session.personal(), rules),
        StepPredicate::DocumentsPresent => document_issues(session),
        StepPredicate::FaceMatched => face_match_issues(session),
        StepPredicate::VideoWithinBounds => video_issues(session, rules),
        StepPredicate::AllPreviousValid => step
            .predecessors()
            .flat_map(|prior| diagnose(session, prior, rules))
            .collect(),
    }
}

pub fn is_step_valid(session: &VerificationSession, step: Step, rules: &ValidationRules) -> bool {
    diagnose(session, step, rules).is_empty()
}

fn personal_issues(personal: &PersonalInfo, rules: &ValidationRules) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for field in PersonalField::REQUIRED {
        let value = personal.value(field).trim();
        if value.is_empty() {
            issues.push(ValidationIssue::MissingField(field));
            continue;
        }
        let well_formed = match field {
            PersonalField::FullName => NAME_REGEX.is_match(value),
            PersonalField::Phone => {
                let digits = value.chars().filter(char::is_ascii_digit).count();
                PHONE_REGEX.is_match(value) && PHONE_DIGITS.contains(&digits)
            }
            PersonalField::Email => EMAIL_REGEX.is_match(value),
            PersonalField::GovernmentId => IDENTIFIER_REGEX.is_match(value),
            PersonalField::DateOfBirth => match parse_date(value) {
                Some(dob) => {
                    if dob > rules.today() {
                        issues.push(ValidationIssue::DateOfBirthInFuture);
                    }
                    true
                }
                None => false,
            },
            _ => true,
        };
        if !well_formed {
            issues.push(ValidationIssue::MalformedField(field));
        }
    }

    if let Some(national_id) = personal.national_id.as_deref().map(str::trim) {
        if !national_id.is_empty() && !IDENTIFIER_REGEX.is_match(national_id) {
            issues.push(ValidationIssue::MalformedField(PersonalField::NationalId));
        }
    }
    issues
}

/// Strict `YYYY-MM-DD`.
fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn document_issues(session: &VerificationSession) -> Vec<ValidationIssue> {
    DocumentSide::BOTH
        .into_iter()
        .filter(|side| {
            session
                .document(*side)
                .map_or(true, |doc| doc.mode() != session.document_mode())
        })
        .map(ValidationIssue::MissingDocument)
        .collect()
}

fn face_match_issues(session: &VerificationSession) -> Vec<ValidationIssue> {
    let id = match session.live() {
        None => return vec![ValidationIssue::MissingLiveEvidence],
        Some(LiveEvidence::Still { id, .. }) => *id,
        Some(LiveEvidence::Video { .. }) => {
            return vec![ValidationIssue::WrongEvidenceKind {
                expected: FlowVariant::StillPhoto,
            }]
        }
    };
    match session.match_result() {
        Some(result) if result.artifact() == id => {
            if result.is_match() && result.score() >= MATCH_THRESHOLD {
                Vec::new()
            } else {
                vec![ValidationIssue::MatchRejected {
                    score: result.score(),
                }]
            }
        }
        _ => vec![ValidationIssue::MatchPending],
    }
}

fn video_issues(session: &VerificationSession, rules: &ValidationRules) -> Vec<ValidationIssue> {
    let video = match session.live() {
        None => return vec![ValidationIssue::MissingLiveEvidence],
        Some(LiveEvidence::Video { video, .. }) => video,
        Some(LiveEvidence::Still { .. }) => {
            return vec![ValidationIssue::WrongEvidenceKind {
                expected: FlowVariant::Video,
            }]
        }
    };
    if video.duration < rules.video_min {
        vec![ValidationIssue::VideoTooShort {
            duration: video.duration,
            min: rules.video_min,
        }]
    } else if video.duration > rules.video_max {
        vec![ValidationIssue::VideoTooLong {
            duration: video.duration,
            max: rules.video_max,
        }]
    } else {
        Vec::new()
    }
}
