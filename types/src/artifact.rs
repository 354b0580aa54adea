//! Document and live-evidence artifacts held by a verification session.
//!
//! Artifacts only ever live in memory. Images carry their encoding so they can
//! be forwarded to the comparator or the delivery channel without re-sniffing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Identifies one live-evidence capture within a session.
///
/// Ids increase monotonically per session, so a face-match attempt keyed to
/// an id can be recognised as stale once a newer capture exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactId(u64);

impl ArtifactId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "live#{}", self.0)
    }
}

/// Image encodings accepted anywhere in the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    Png,
    Jpeg,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// File extension used for attachments.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Parse a declared MIME type. `image/jpg` is accepted as a JPEG alias.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Detect the encoding from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_MAGIC) {
            Some(Self::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoded still image (PNG or JPEG bytes).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    mime: ImageMime,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime: ImageMime, bytes: Vec<u8>) -> Self {
        Self { mime, bytes }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(ImageMime::Png, bytes)
    }

    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(ImageMime::Jpeg, bytes)
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Base64 body without any data-URL prefix.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<body>` form expected by the comparator.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime.as_str(), self.to_base64())
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A document image that arrived as a file upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub image: EncodedImage,
}

/// Which face of the identity document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSide {
    Front,
    Back,
}

impl DocumentSide {
    pub const BOTH: [DocumentSide; 2] = [DocumentSide::Front, DocumentSide::Back];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
        }
    }
}

impl fmt::Display for DocumentSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How document images are collected. Session-global.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    #[default]
    Upload,
    Capture,
}

impl fmt::Display for DocumentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::Capture => f.write_str("capture"),
        }
    }
}

/// One side of the identity document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentArtifact {
    Uploaded(UploadedFile),
    Captured(EncodedImage),
}

impl DocumentArtifact {
    pub fn image(&self) -> &EncodedImage {
        match self {
            Self::Uploaded(file) => &file.image,
            Self::Captured(image) => image,
        }
    }

    /// The document mode this artifact belongs to.
    pub fn mode(&self) -> DocumentMode {
        match self {
            Self::Uploaded(_) => DocumentMode::Upload,
            Self::Captured(_) => DocumentMode::Capture,
        }
    }
}

/// A short recorded video with the duration measured by the recorder.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoArtifact {
    pub mime: String,
    pub bytes: Vec<u8>,
    pub duration: Duration,
}

impl VideoArtifact {
    /// File extension derived from the container in the MIME type.
    pub fn extension(&self) -> &'static str {
        if self.mime.starts_with("video/mp4") {
            "mp4"
        } else {
            "webm"
        }
    }
}

impl fmt::Debug for VideoArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoArtifact")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .field("duration", &self.duration)
            .finish()
    }
}

/// Live evidence of the applicant: an enhanced still, or a timed video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiveEvidence {
    Still { id: ArtifactId, image: EncodedImage },
    Video { id: ArtifactId, video: VideoArtifact },
}

impl LiveEvidence {
    pub fn id(&self) -> ArtifactId {
        match self {
            Self::Still { id, .. } | Self::Video { id, .. } => *id,
        }
    }

    pub fn still(&self) -> Option<&EncodedImage> {
        match self {
            Self::Still { image, .. } => Some(image),
            Self::Video { .. } => None,
        }
    }

    pub fn video(&self) -> Option<&VideoArtifact> {
        match self {
            Self::Video { video, .. } => Some(video),
            Self::Still { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_recognises_png_and_jpeg() {
        assert_eq!(ImageMime::sniff(PNG_MAGIC), Some(ImageMime::Png));
        assert_eq!(ImageMime::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::sniff(b"GIF89a"), None);
        assert_eq!(ImageMime::sniff(&[]), None);
    }

    #[test]
    fn jpg_alias_is_accepted() {
        assert_eq!(ImageMime::from_mime("image/jpg"), Some(ImageMime::Jpeg));
        assert_eq!(ImageMime::from_mime("IMAGE/PNG"), Some(ImageMime::Png));
        assert_eq!(ImageMime::from_mime("image/gif"), None);
    }

    #[test]
    fn data_url_carries_mime_and_base64_body() {
        let image = EncodedImage::jpeg(vec![0xFF, 0xD8, 0xFF, 1, 2, 3]);
        let url = image.to_data_url();
        let body = url
            .strip_prefix("data:image/jpeg;base64,")
            .expect("jpeg data URL prefix");
        assert_eq!(STANDARD.decode(body).unwrap(), image.bytes());
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let image = EncodedImage::png(vec![7; 4096]);
        let rendered = format!("{image:?}");
        assert!(rendered.contains("len: 4096"));
        assert!(rendered.len() < 80);
    }

    #[test]
    fn video_extension_follows_container() {
        let mut video = VideoArtifact {
            mime: "video/webm;codecs=vp9,opus".into(),
            bytes: vec![],
            duration: Duration::from_secs(6),
        };
        assert_eq!(video.extension(), "webm");
        video.mime = "video/mp4".into();
        assert_eq!(video.extension(), "mp4");
    }
}
