//! The decoded message / part model and the on-disk
//! layout and de-duplication rules the Decode task
//! relies on.

use std::path::{Path, PathBuf};

use mms_codec::enums::{MessageClass, Priority};

/// A fully decoded, on-disk MMS message record.
#[derive(Debug, Clone)]
pub struct Message {
    /// Local record id (also the name of its directory under `msg/`).
    pub id: String,
    /// MMSC-assigned Message-ID, when known (absent for a draft).
    pub message_id: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: Option<String>,
    pub class: MessageClass,
    pub priority: Priority,
    pub date: Option<u64>,
    pub read_report_requested: bool,
    /// `<root>/msg/<id>/`
    pub message_dir: PathBuf,
    /// `<message_dir>/parts/`
    pub parts_dir: PathBuf,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartFlags {
    pub smil: bool,
    pub resizable: bool,
}

impl PartFlags {
    pub const NONE: Self = Self { smil: false, resizable: false };
}

#[derive(Debug, Clone)]
pub struct Part {
    /// MIME type with parameters, e.g. `text/plain; charset=utf-8`.
    pub content_type: String,
    /// Unique within the message, bracketed (e.g. `<part1>`).
    pub content_id: String,
    pub content_location: Option<String>,
    /// Absolute path to the decoded, ready-to-read file.
    pub path: PathBuf,
    /// Set when the on-disk file is still in its originally transmitted
    /// (e.g. Content-Transfer-Encoding applied) form; `None` once
    /// decoded to final bytes.
    pub original_encoded_path: Option<PathBuf>,
    pub flags: PartFlags,
}

impl Message {
    pub fn dir_for(root: &Path, id: &str) -> PathBuf {
        root.join("msg").join(id)
    }

    pub fn new(root: &Path, id: impl Into<String>) -> Self {
        let id = id.into();
        let message_dir = Self::dir_for(root, &id);
        let parts_dir = message_dir.join("parts");
        Self {
            id,
            message_id: None,
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            subject: None,
            class: MessageClass::Personal,
            priority: Priority::Normal,
            date: None,
            read_report_requested: false,
            message_dir,
            parts_dir,
            parts: Vec::new(),
        }
    }
}

/// Characters forbidden in part filenames on at least one common
/// filesystem; replaced with `_`.
const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', '[', ']', '/', '\\'];

/// Sanitises a proposed filename by replacing filesystem-unsafe
/// characters, then de-duplicates against `taken` by prefixing `_`
/// until the name is unique. Mutates `taken` with the chosen name.
pub fn dedupe_filename(proposed: &str, taken: &mut std::collections::HashSet<String>) -> String {
    let mut sanitised: String = proposed
        .chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    if sanitised.is_empty() {
        sanitised = "_".to_string();
    }
    let mut candidate = sanitised.clone();
    while taken.contains(&candidate) {
        candidate = format!("_{candidate}");
    }
    taken.insert(candidate.clone());
    candidate
}

/// De-duplicates a Content-ID the same way, but operating on the
/// unbracketed id (the caller re-adds `<...>` if it wants the
/// bracketed form for the `Message`/header representation).
pub fn dedupe_content_id(proposed: &str, taken: &mut std::collections::HashSet<String>) -> String {
    dedupe_filename(proposed, taken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn message_directory_layout_matches_invariants() {
        let root = Path::new("/var/lib/mms");
        let msg = Message::new(root, "42");
        assert_eq!(msg.message_dir, Path::new("/var/lib/mms/msg/42"));
        assert_eq!(msg.parts_dir, Path::new("/var/lib/mms/msg/42/parts"));
    }

    #[test]
    fn colliding_names_get_underscore_prefixed() {
        let mut taken = HashSet::new();
        assert_eq!(dedupe_filename("photo.jpg", &mut taken), "photo.jpg");
        assert_eq!(dedupe_filename("photo.jpg", &mut taken), "_photo.jpg");
        assert_eq!(dedupe_filename("photo.jpg", &mut taken), "__photo.jpg");
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        let mut taken = HashSet::new();
        assert_eq!(dedupe_filename("a/b<c>[d]\\e", &mut taken), "a_b_c__d__e");
    }

    #[test]
    fn content_ids_dedupe_independently_of_filenames() {
        let mut file_names = HashSet::new();
        let mut content_ids = HashSet::new();
        assert_eq!(dedupe_filename("smil", &mut file_names), "smil");
        assert_eq!(dedupe_content_id("smil", &mut content_ids), "smil");
        assert_eq!(dedupe_content_id("smil", &mut content_ids), "_smil");
    }
}
