//! Key and path conventions used to emulate folders on a flat key space.
//!
//! A folder has no object of its own. It exists when a zero-byte marker whose
//! key ends in [`SEPARATOR`] exists, or when any key starts with the folder
//! path. The root folder is the empty prefix.

/// Path separator shared by every key.
pub const SEPARATOR: char = '/';

/// Longest key accepted by the backing stores.
pub const MAX_KEY_LEN: usize = 1024;

/// Content type written on folder markers.
pub const FOLDER_MARKER_CONTENT_TYPE: &str = "application/x-directory";

/// Reasons a key is rejected by [`validate_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyViolation {
    Empty,
    TooLong,
    LeadingSeparator,
    ParentSegment,
    ForbiddenCharacter,
}

impl std::fmt::Display for KeyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            KeyViolation::Empty => "key must not be empty",
            KeyViolation::TooLong => "key exceeds 1024 bytes",
            KeyViolation::LeadingSeparator => "key must not start with `/`",
            KeyViolation::ParentSegment => "key must not contain `..` segments",
            KeyViolation::ForbiddenCharacter => "key contains control characters or `\\`",
        };
        f.write_str(reason)
    }
}

/// Reject keys that would be ambiguous or unsafe once mapped onto storage.
pub fn validate_key(key: &str) -> Result<(), KeyViolation> {
    if key.is_empty() {
        return Err(KeyViolation::Empty);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(KeyViolation::TooLong);
    }
    if key.starts_with(SEPARATOR) {
        return Err(KeyViolation::LeadingSeparator);
    }
    if key.split(SEPARATOR).any(|segment| segment == "..") {
        return Err(KeyViolation::ParentSegment);
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return Err(KeyViolation::ForbiddenCharacter);
    }
    Ok(())
}

/// True when the key names a folder (marker or prefix).
pub fn is_folder(key: &str) -> bool {
    key.ends_with(SEPARATOR)
}

/// Ensure a folder prefix ends in exactly one separator. The root stays empty.
pub fn normalize_folder(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}{SEPARATOR}")
    }
}

/// Last path segment. Folder keys keep their trailing separator (`a/b/` -> `b/`).
pub fn basename(key: &str) -> &str {
    let body = key.strip_suffix(SEPARATOR).unwrap_or(key);
    match body.rfind(SEPARATOR) {
        Some(pos) => &key[pos + 1..],
        None => key,
    }
}

/// Name shown to users: the basename without a trailing separator.
pub fn display_name(key: &str) -> &str {
    let name = basename(key);
    name.strip_suffix(SEPARATOR).unwrap_or(name)
}

/// Suffix substitution: `new_prefix + (key - old_prefix)`.
pub fn rebase(key: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    key.strip_prefix(old_prefix)
        .map(|suffix| format!("{new_prefix}{suffix}"))
}

/// True when `path` equals the trash prefix or lies anywhere beneath it.
pub fn is_trash_path(path: &str, trash_prefix: &str) -> bool {
    let trash = normalize_folder(trash_prefix);
    if trash.is_empty() {
        return false;
    }
    let bare = trash.trim_end_matches(SEPARATOR);
    path == bare || path.starts_with(&trash)
}
