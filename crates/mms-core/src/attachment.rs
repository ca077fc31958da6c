//! The Encode task's attachment model: content-type sniffing and SMIL
//! layout synthesis.

use std::path::{Path, PathBuf};

/// One file the caller wants attached to an outgoing message, before
/// the Encode task has materialised it into the encode directory.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub path: PathBuf,
    /// `None` asks the Encode task to guess from content/extension.
    pub content_type: Option<String>,
    pub content_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Text,
    Image,
    Smil,
    Other,
}

/// Guesses a content-type when the caller didn't supply one, by
/// extension first and magic bytes second.
pub fn sniff_content_type(path: &Path, head: &[u8]) -> String {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        match ext.as_str() {
            "txt" => return "text/plain".to_string(),
            "html" | "htm" => return "text/html".to_string(),
            "smil" => return "application/smil".to_string(),
            "jpg" | "jpeg" => return "image/jpeg".to_string(),
            "png" => return "image/png".to_string(),
            "gif" => return "image/gif".to_string(),
            _ => {}
        }
    }
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg".to_string();
    }
    if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png".to_string();
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return "image/gif".to_string();
    }
    if looks_like_text(head) {
        if looks_like_smil(head) {
            return "application/smil".to_string();
        }
        return "text/plain".to_string();
    }
    "application/octet-stream".to_string()
}

fn looks_like_text(head: &[u8]) -> bool {
    !head.is_empty() && head.iter().take(512).all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..0x7F).contains(&b) || b >= 0x80)
}

/// The guesser calls the content SMIL when it would otherwise be
/// classified `text/*` and looks like an XML document rooted at
/// `<smil>`.
fn looks_like_smil(head: &[u8]) -> bool {
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    let trimmed = trimmed.strip_prefix("<?xml").map(|rest| rest.splitn(2, "?>").nth(1).unwrap_or("").trim_start()).unwrap_or(trimmed);
    trimmed.starts_with("<smil")
}

pub fn media_kind(content_type: &str) -> MediaKind {
    let base = content_type.split(';').next().unwrap_or("").trim();
    if base.eq_ignore_ascii_case("application/smil") {
        MediaKind::Smil
    } else if base.starts_with("text/") {
        MediaKind::Text
    } else if base.starts_with("image/") {
        MediaKind::Image
    } else {
        MediaKind::Other
    }
}

/// A part that has already been materialised into the encode
/// directory, ready for SMIL synthesis and PDU assembly.
#[derive(Debug, Clone)]
pub struct EncodedPart {
    pub content_type: String,
    pub content_id: String,
    pub content_location: String,
    pub path: PathBuf,
    pub resizable: bool,
}

/// Synthesises a two-region (text, media) SMIL document describing a
/// single `par` per non-SMIL part, referencing each by
/// content-location.
pub fn synthesise_smil(parts: &[EncodedPart]) -> String {
    let mut pars = String::new();
    for p in parts {
        let region = match media_kind(&p.content_type) {
            MediaKind::Text => "Text",
            MediaKind::Image => "Image",
            _ => continue,
        };
        let tag = match media_kind(&p.content_type) {
            MediaKind::Text => "text",
            MediaKind::Image => "img",
            _ => continue,
        };
        pars.push_str(&format!(
            "  <par dur=\"5s\">\n    <{tag} region=\"{region}\" src=\"{}\"/>\n  </par>\n",
            p.content_location
        ));
    }
    format!(
        "<smil>\n<head>\n  <layout>\n    <root-layout width=\"160\" height=\"120\"/>\n    <region id=\"Image\" top=\"0\" left=\"0\" width=\"160\" height=\"90\"/>\n    <region id=\"Text\" top=\"90\" left=\"0\" width=\"160\" height=\"30\"/>\n  </layout>\n</head>\n<body>\n{pars}</body>\n</smil>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_jpeg_by_magic_bytes() {
        assert_eq!(sniff_content_type(Path::new("attachment"), &[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
    }

    #[test]
    fn extension_takes_precedence_over_content() {
        assert_eq!(sniff_content_type(Path::new("a.png"), &[0xFF, 0xD8, 0xFF]), "image/png");
    }

    #[test]
    fn unrecognised_binary_falls_back_to_octet_stream() {
        assert_eq!(sniff_content_type(Path::new("blob"), &[0x00, 0x01, 0x02, 0xFF]), "application/octet-stream");
    }

    #[test]
    fn xml_smil_root_is_detected_from_content() {
        let body = b"<?xml version=\"1.0\"?>\n<smil><head/><body/></smil>";
        assert_eq!(sniff_content_type(Path::new("noext"), body), "application/smil");
    }

    #[test]
    fn synthesised_smil_references_every_part_by_location() {
        let parts = vec![
            EncodedPart {
                content_type: "text/plain; charset=utf-8".to_string(),
                content_id: "<text1>".to_string(),
                content_location: "text1.txt".to_string(),
                path: PathBuf::from("/tmp/text1.txt"),
                resizable: false,
            },
            EncodedPart {
                content_type: "image/jpeg".to_string(),
                content_id: "<img1>".to_string(),
                content_location: "img1.jpg".to_string(),
                path: PathBuf::from("/tmp/img1.jpg"),
                resizable: true,
            },
        ];
        let smil = synthesise_smil(&parts);
        assert!(smil.contains("text1.txt"));
        assert!(smil.contains("img1.jpg"));
        assert!(smil.starts_with("<smil>"));
    }
}
