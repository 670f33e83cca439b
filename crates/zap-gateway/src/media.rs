use std::path::Path;

use zap_core::MediaKind;

/// Pick the upload path and mime type for a file, by extension.
///
/// Anything unrecognized ships as a document, which the service accepts for
/// arbitrary payloads.
pub fn classify_media(path: &Path) -> (MediaKind, &'static str) {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => (MediaKind::Image, "image/jpeg"),
        "png" => (MediaKind::Image, "image/png"),
        "gif" => (MediaKind::Image, "image/gif"),
        "webp" => (MediaKind::Image, "image/webp"),
        "mp4" => (MediaKind::Video, "video/mp4"),
        "mkv" => (MediaKind::Video, "video/x-matroska"),
        "webm" => (MediaKind::Video, "video/webm"),
        "mp3" => (MediaKind::Audio, "audio/mpeg"),
        "ogg" | "opus" => (MediaKind::Audio, "audio/ogg"),
        "m4a" => (MediaKind::Audio, "audio/mp4"),
        "wav" => (MediaKind::Audio, "audio/wav"),
        "pdf" => (MediaKind::Document, "application/pdf"),
        _ => (MediaKind::Document, "application/octet-stream"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_extensions() {
        assert_eq!(
            classify_media(Path::new("/tmp/photo.JPG")),
            (MediaKind::Image, "image/jpeg")
        );
        assert_eq!(
            classify_media(Path::new("clip.mp4")),
            (MediaKind::Video, "video/mp4")
        );
        assert_eq!(
            classify_media(Path::new("note.opus")),
            (MediaKind::Audio, "audio/ogg")
        );
        assert_eq!(
            classify_media(Path::new("contract.pdf")),
            (MediaKind::Document, "application/pdf")
        );
    }

    #[test]
    fn unknown_extension_falls_back_to_document() {
        let (kind, mime) = classify_media(Path::new("data.bin"));
        assert_eq!(kind, MediaKind::Document);
        assert_eq!(mime, "application/octet-stream");

        let (kind, _) = classify_media(Path::new("no-extension"));
        assert_eq!(kind, MediaKind::Document);
    }
}
