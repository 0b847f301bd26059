//! Media attachment and upload descriptors.

use serde::{Deserialize, Serialize};

/// Document extensions the platform accepts verbatim as a file type;
/// everything else is uploaded as an opaque stream.
const PASSTHROUGH_FILE_EXTENSIONS: &[&str] = &["doc", "xls", "ppt", "pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    File,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::File => "file",
        }
    }

    /// Wire message type. Video rides the platform's `media` message type.
    pub fn msg_type(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "media",
            Self::File => "file",
        }
    }
}

/// Raw bytes plus declared metadata for a resolved attachment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub filename: String,
    pub duration_ms: Option<u64>,
}

/// Multipart upload descriptor handed to the transport for media frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub file_type: String,
    pub filename: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub duration_ms: Option<u64>,
}

impl MediaUpload {
    /// Applies the platform's upload file-type rules: audio must be opus,
    /// video must be mp4, known document extensions pass through, anything
    /// else is a stream. Images carry their declared media type.
    pub fn from_attachment(kind: MediaKind, attachment: ResolvedAttachment) -> Self {
        let file_type = match kind {
            MediaKind::Image => "message".to_string(),
            MediaKind::Audio => "opus".to_string(),
            MediaKind::Video => "mp4".to_string(),
            MediaKind::File => {
                let extension = attachment
                    .filename
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_ascii_lowercase());
                match extension {
                    Some(ext) if PASSTHROUGH_FILE_EXTENSIONS.contains(&ext.as_str()) => ext,
                    _ => "stream".to_string(),
                }
            }
        };
        Self {
            kind,
            file_type,
            filename: attachment.filename,
            media_type: attachment.media_type,
            bytes: attachment.bytes,
            duration_ms: attachment.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(filename: &str) -> ResolvedAttachment {
        ResolvedAttachment {
            bytes: vec![1, 2, 3],
            media_type: "application/octet-stream".to_string(),
            filename: filename.to_string(),
            duration_ms: None,
        }
    }

    #[test]
    fn upload_file_type_follows_platform_rules() {
        let audio = MediaUpload::from_attachment(MediaKind::Audio, attachment("note.wav"));
        assert_eq!(audio.file_type, "opus");

        let video = MediaUpload::from_attachment(MediaKind::Video, attachment("clip.mov"));
        assert_eq!(video.file_type, "mp4");

        let pdf = MediaUpload::from_attachment(MediaKind::File, attachment("report.PDF"));
        assert_eq!(pdf.file_type, "pdf");

        let other = MediaUpload::from_attachment(MediaKind::File, attachment("archive.tar.zst"));
        assert_eq!(other.file_type, "stream");

        let bare = MediaUpload::from_attachment(MediaKind::File, attachment("README"));
        assert_eq!(bare.file_type, "stream");
    }

    #[test]
    fn video_rides_the_media_msg_type() {
        assert_eq!(MediaKind::Video.msg_type(), "media");
        assert_eq!(MediaKind::Image.msg_type(), "image");
    }
}
