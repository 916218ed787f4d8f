//! Listing results: files and folders one level below a prefix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse file category used by clients to pick icons and previews.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MimeClass {
    Image,
    Video,
    Audio,
    Text,
    Document,
    Archive,
    Code,
    Other,
}

impl MimeClass {
    /// Classify from the stored content type, falling back to the key's extension.
    pub fn classify(content_type: Option<&str>, key: &str) -> Self {
        if let Some(class) = content_type.and_then(Self::from_content_type) {
            return class;
        }
        Self::from_extension(key)
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let (top, sub) = essence.split_once('/')?;
        let class = match (top, sub) {
            ("image", _) => Self::Image,
            ("video", _) => Self::Video,
            ("audio", _) => Self::Audio,
            ("text", "html" | "css" | "javascript" | "x-python" | "x-rust") => Self::Code,
            ("text", _) => Self::Text,
            ("application", "pdf" | "msword" | "rtf") => Self::Document,
            ("application", sub) if sub.starts_with("vnd.openxmlformats") => Self::Document,
            ("application", sub) if sub.starts_with("vnd.oasis.opendocument") => Self::Document,
            ("application", "zip" | "gzip" | "x-tar" | "x-7z-compressed" | "x-rar-compressed") => {
                Self::Archive
            }
            ("application", "json" | "javascript" | "xml" | "x-sh" | "toml" | "yaml") => Self::Code,
            // Generic types carry no information; let the extension decide.
            ("application", "octet-stream") => return None,
            _ => Self::Other,
        };
        Some(class)
    }

    fn from_extension(key: &str) -> Self {
        let Some((_, ext)) = key.rsplit_once('.') else {
            return Self::Other;
        };
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" | "ico" | "heic" => Self::Image,
            "mp4" | "mov" | "mkv" | "webm" | "avi" => Self::Video,
            "mp3" | "wav" | "flac" | "ogg" | "m4a" => Self::Audio,
            "txt" | "md" | "csv" | "log" => Self::Text,
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "odt" | "rtf" => {
                Self::Document
            }
            "zip" | "gz" | "tgz" | "tar" | "7z" | "rar" | "bz2" | "xz" => Self::Archive,
            "rs" | "js" | "ts" | "py" | "go" | "java" | "c" | "h" | "cpp" | "html" | "css"
            | "json" | "toml" | "yaml" | "yml" | "xml" | "sh" => Self::Code,
            _ => Self::Other,
        }
    }
}

/// A stored object directly inside the listed folder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub key: String,
    pub display_name: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub mime_class: MimeClass,
}

/// A folder directly inside the listed folder. `key` ends in `/`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub key: String,
    pub display_name: String,
}

/// One child of a listed folder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    File(FileEntry),
    Folder(FolderEntry),
}

impl Entry {
    pub fn key(&self) -> &str {
        match self {
            Entry::File(file) => &file.key,
            Entry::Folder(folder) => &folder.key,
        }
    }
}

/// Immediate children of one prefix, each group already ordered.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub prefix: String,
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
}

impl Listing {
    /// Flatten into tree-node order: folders first, then files.
    pub fn into_entries(self) -> Vec<Entry> {
        self.folders
            .into_iter()
            .map(Entry::Folder)
            .chain(self.files.into_iter().map(Entry::File))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_wins_over_extension() {
        assert_eq!(
            MimeClass::classify(Some("image/png"), "notes.txt"),
            MimeClass::Image
        );
        assert_eq!(
            MimeClass::classify(Some("application/pdf; charset=binary"), "x"),
            MimeClass::Document
        );
    }

    #[test]
    fn octet_stream_falls_back_to_extension() {
        assert_eq!(
            MimeClass::classify(Some("application/octet-stream"), "a/b/song.MP3"),
            MimeClass::Audio
        );
        assert_eq!(MimeClass::classify(None, "Makefile"), MimeClass::Other);
        assert_eq!(MimeClass::classify(None, "src/main.rs"), MimeClass::Code);
    }

    #[test]
    fn entries_serialize_with_type_tag() {
        let entry = Entry::Folder(FolderEntry {
            key: "docs/".into(),
            display_name: "docs".into(),
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "folder");
        assert_eq!(json["displayName"], "docs");
    }
}
