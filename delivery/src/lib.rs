//! Submission delivery.
//!
//! A completed session is flattened into a [`SubmissionPayload`] (personal
//! fields, base64 attachments, the match result and a plain-text summary for
//! the back office) and handed to a [`SubmissionChannel`].

pub mod channel;
pub mod client;
pub mod error;
pub mod payload;
pub mod summary;

pub use channel::{DeliveryReceipt, SubmissionChannel};
pub use client::HttpDeliveryChannel;
pub use error::{DeliveryError, DeliveryFailure};
pub use payload::{
    attachment_name, session_attachments, Attachment, AttachmentKind, SubmissionPayload,
};
pub use summary::render_summary;
