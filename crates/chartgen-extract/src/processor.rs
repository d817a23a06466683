//! Value processing: classification plus the externalization policy
//!
//! [`ValueProcessor::process`] turns one raw string into a [`ProcessedValue`]:
//! the detected kind, whether it should leave the values tree, a deterministic
//! external path, a canonical rendition and a checksum of that rendition.
//!
//! # Path naming
//!
//! ```text
//! <files_dir>/<source id segments>/<field key>
//! ```
//!
//! A field key that is already a valid file name is used verbatim, which is
//! the name a volume mount gives the key: `configmap/shop/app` + `nginx.conf`
//! gives `files/configmap/shop/app/nginx.conf` and `settings` gives
//! `files/configmap/shop/app/settings`. Distinct keys therefore never share a
//! path.
//!
//! Any other key or segment is rewritten: characters outside
//! `[A-Za-z0-9._-]` become `-` and `~` plus the first 8 hex digits of the
//! SHA-256 of the original is added before the extension. `~` never occurs
//! in a verbatim name, so a rewritten name cannot collide with one. Rewritten
//! field keys without an extension get the extension of the detected kind
//! (`a b:c` as JSON gives `a-b-c~<hash>.json`, `my notes.md` gives
//! `my-notes~<hash>.md`).

use std::borrow::Cow;

use chartgen_core::GeneratorConfig;
use chartgen_core::config::{DEFAULT_FILES_DIR, DEFAULT_THRESHOLD};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::classifier::{ValueKind, classify};

/// The externalization decision for one raw value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedValue {
    /// Identifier of the resource the value came from
    pub source_id: String,
    /// Field key within that resource
    pub field_key: String,
    /// Detected structural kind
    pub kind: ValueKind,
    /// Whether the value should be stored as a separate file
    pub externalize: bool,
    /// Deterministic path of the external file
    pub path: String,
    /// Canonical rendition (pretty-printed for JSON and XML)
    pub content: String,
    /// SHA-256 (hex) of `content`
    pub checksum: String,
    /// Size of the raw input in bytes
    pub raw_size: usize,
}

/// Applies classification, formatting and the size threshold
#[derive(Debug, Clone)]
pub struct ValueProcessor {
    threshold: usize,
    files_dir: String,
}

impl Default for ValueProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ValueProcessor {
    /// Values of `threshold` bytes or more are externalized
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            files_dir: DEFAULT_FILES_DIR.to_string(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.threshold).with_files_dir(&config.files_dir)
    }

    pub fn with_files_dir(mut self, files_dir: impl Into<String>) -> Self {
        self.files_dir = files_dir.into().trim_matches('/').to_string();
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn files_dir(&self) -> &str {
        &self.files_dir
    }

    /// Classify, format and checksum a raw value
    pub fn process(&self, source_id: &str, field_key: &str, raw: &str) -> ProcessedValue {
        let kind = classify(raw);
        let content = format_value(kind, raw);
        let checksum = checksum(&content);

        ProcessedValue {
            source_id: source_id.to_string(),
            field_key: field_key.to_string(),
            kind,
            externalize: raw.len() >= self.threshold,
            path: self.external_path(source_id, field_key, kind),
            content,
            checksum,
            raw_size: raw.len(),
        }
    }

    /// Same as [`process`](Self::process) but always marks the value for
    /// externalization, for callers whose policy is not size-based
    pub fn process_forced(&self, source_id: &str, field_key: &str, raw: &str) -> ProcessedValue {
        ProcessedValue {
            externalize: true,
            ..self.process(source_id, field_key, raw)
        }
    }

    /// External path for a field of a resource.
    ///
    /// Depends only on its arguments, so unchanged input yields unchanged
    /// paths across runs, and distinct field keys of one source never share
    /// a path.
    pub fn external_path(&self, source_id: &str, field_key: &str, kind: ValueKind) -> String {
        let mut segments: Vec<String> = Vec::new();
        if !self.files_dir.is_empty() {
            segments.push(self.files_dir.clone());
        }
        segments.extend(
            source_id
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| path_segment(s).into_owned()),
        );
        segments.push(file_name(field_key, kind));
        segments.join("/")
    }
}

/// File name for a field key
fn file_name(field_key: &str, kind: ValueKind) -> String {
    if is_valid_name(field_key) {
        return field_key.to_string();
    }

    let sanitized = sanitize(field_key);
    let tag = name_tag(field_key);
    match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{}~{}.{}", stem, tag, ext)
        }
        _ => format!("{}~{}.{}", sanitized, tag, kind.extension()),
    }
}

/// A directory segment usable as is, or its sanitized form tagged with a
/// hash of the original
fn path_segment(segment: &str) -> Cow<'_, str> {
    if is_valid_name(segment) {
        Cow::Borrowed(segment)
    } else {
        Cow::Owned(format!("{}~{}", sanitize(segment), name_tag(segment)))
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_name_char) && !name.chars().all(|c| c == '.')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn sanitize(name: &str) -> String {
    name.chars().map(|c| if is_name_char(c) { c } else { '-' }).collect()
}

/// First 8 hex digits of the SHA-256 of a name
fn name_tag(name: &str) -> String {
    let mut digest = checksum(name);
    digest.truncate(8);
    digest
}

/// Canonical rendition of a value; raw content is kept when it cannot be
/// reformatted
fn format_value(kind: ValueKind, raw: &str) -> String {
    let formatted = match kind {
        ValueKind::Json => format_json(raw),
        ValueKind::Xml => format_xml(raw),
        ValueKind::PlainText | ValueKind::Binary => None,
    };
    formatted.unwrap_or_else(|| raw.to_string())
}

fn format_json(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// Re-indented XML. Whitespace-only text between elements is dropped; all
/// other text is kept byte for byte, so the checksum still certifies it.
fn format_xml(raw: &str) -> Option<String> {
    let mut reader = Reader::from_str(raw.trim());
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Text(text)) if text.iter().all(u8::is_ascii_whitespace) => continue,
            Ok(event) => writer.write_event(event).ok()?,
            Err(_) => return None,
        }
    }

    String::from_utf8(writer.into_inner()).ok()
}

/// SHA-256 of content, lowercase hex
pub fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
