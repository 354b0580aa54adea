//! The submission payload and its attachments.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use idgate_types::{
    DocumentSide, EncodedImage, LiveEvidence, MatchResult, VerificationSession, VideoArtifact,
};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;
use crate::summary::render_summary;

/// What an attachment shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    FrontId,
    BackId,
    Selfie,
    Video,
}

impl AttachmentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::FrontId => "front_id",
            Self::BackId => "back_id",
            Self::Selfie => "selfie",
            Self::Video => "video",
        }
    }

    pub fn for_side(side: DocumentSide) -> Self {
        match side {
            DocumentSide::Front => Self::FrontId,
            DocumentSide::Back => Self::BackId,
        }
    }
}

/// `<prefix>_<Full_Name>.<ext>`, whitespace runs in the name collapsed to `_`.
pub fn attachment_name(kind: AttachmentKind, full_name: &str, extension: &str) -> String {
    let mut name = String::with_capacity(full_name.len());
    let mut in_space = false;
    for c in full_name.chars() {
        if c.is_whitespace() {
            if !in_space {
                name.push('_');
            }
            in_space = true;
        } else {
            name.push(c);
            in_space = false;
        }
    }
    format!("{}_{}.{}", kind.prefix(), name, extension)
}

/// One file sent with the submission. `content` is plain base64, without a
/// data-URL prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub filename: String,
    pub content_type: String,
    pub content: String,
}

impl Attachment {
    pub fn image(kind: AttachmentKind, full_name: &str, image: &EncodedImage) -> Self {
        Self {
            kind,
            filename: attachment_name(kind, full_name, image.mime().extension()),
            content_type: image.mime().as_str().to_string(),
            content: image.to_base64(),
        }
    }

    pub fn video(full_name: &str, video: &VideoArtifact) -> Self {
        let content_type = video
            .mime
            .split(';')
            .next()
            .unwrap_or(&video.mime)
            .trim()
            .to_string();
        Self {
            kind: AttachmentKind::Video,
            filename: attachment_name(AttachmentKind::Video, full_name, video.extension()),
            content_type,
            content: STANDARD.encode(&video.bytes),
        }
    }
}

/// Attachments for every artifact in the session.
///
/// `document` maps each stored document image to the image that is sent;
/// live evidence goes out as stored.
pub fn session_attachments<E>(
    session: &VerificationSession,
    mut document: impl FnMut(DocumentSide, &EncodedImage) -> Result<EncodedImage, E>,
) -> Result<Vec<Attachment>, E> {
    let name = &session.personal().full_name;
    let mut attachments = Vec::new();
    for side in DocumentSide::BOTH {
        if let Some(doc) = session.document(side) {
            let image = document(side, doc.image())?;
            attachments.push(Attachment::image(AttachmentKind::for_side(side), name, &image));
        }
    }
    match session.live() {
        Some(LiveEvidence::Still { image, .. }) => {
            attachments.push(Attachment::image(AttachmentKind::Selfie, name, image));
        }
        Some(LiveEvidence::Video { video, .. }) => attachments.push(Attachment::video(name, video)),
        None => {}
    }
    Ok(attachments)
}

/// Everything the back office receives for one applicant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub region: String,
    pub government_id: String,
    pub date_of_birth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    pub match_result: Option<MatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_duration_secs: Option<f64>,
    pub attachments: Vec<Attachment>,
    pub subject: String,
    pub summary: String,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionPayload {
    /// Build the payload for `session`. Name, email and phone must be present.
    pub fn assemble(
        session: &VerificationSession,
        attachments: Vec<Attachment>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, DeliveryError> {
        let personal = session.personal();
        if [&personal.full_name, &personal.email, &personal.phone]
            .iter()
            .any(|v| v.trim().is_empty())
        {
            return Err(DeliveryError::IncompletePayload(
                "Name, email, and phone are required".to_string(),
            ));
        }

        let video_duration = session.live().and_then(LiveEvidence::video).map(|v| v.duration);
        let summary = render_summary(
            personal,
            session.match_result(),
            video_duration,
            &attachments,
            submitted_at,
        );
        Ok(Self {
            full_name: personal.full_name.clone(),
            phone: personal.phone.clone(),
            email: personal.email.clone(),
            region: personal.region.clone(),
            government_id: personal.government_id.clone(),
            date_of_birth: personal.date_of_birth.clone(),
            blood_type: personal.blood_type.clone(),
            national_id: personal.national_id.clone(),
            match_result: session.match_result().cloned(),
            video_duration_secs: video_duration.map(|d| d.as_secs_f64()),
            attachments,
            subject: format!("New Identity Verification - {}", personal.full_name),
            summary,
            submitted_at,
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>, DeliveryError> {
        serde_json::to_vec(self).map_err(|e| DeliveryError::Serialize(e.to_string()))
    }

    pub fn attachment(&self, kind: AttachmentKind) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.kind == kind)
    }
}
