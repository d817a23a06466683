//! External file accumulation
//!
//! Collects every externalized value of a generation run, keyed by path.
//! Adding the same path twice is a no-op when the content checksum matches
//! (two resources may share a config fragment) and a conflict otherwise.
//!
//! # Template references
//!
//! Externalized files are read back at render time with the chart's Files
//! API. The snippet helpers produce that text:
//!
//! ```rust
//! use chartgen_extract::accumulator::{file_reference, file_reference_with_fallback};
//!
//! assert_eq!(
//!     file_reference("files/configmap/shop/app/settings.json"),
//!     r#"{{ .Files.Get "files/configmap/shop/app/settings.json" }}"#
//! );
//! assert_eq!(
//!     file_reference_with_fallback("files/motd.txt", "welcome"),
//!     r#"{{ .Files.Get "files/motd.txt" | default "welcome" }}"#
//! );
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::classifier::ValueKind;
use crate::error::{ExtractError, Result};
use crate::processor::{ProcessedValue, checksum};

/// A value materialized as a separate file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalFile {
    /// Path relative to the chart root
    pub path: String,
    /// File content (the formatted rendition of the value)
    pub content: String,
    /// Identifier of the originating resource
    pub source_resource: String,
    /// Field key within the originating resource
    pub source_field: String,
    /// Detected kind of the content
    pub kind: ValueKind,
    /// SHA-256 (hex) of `content`
    pub checksum: String,
}

impl ExternalFile {
    /// Create a file, computing the checksum of `content`
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        source_resource: impl Into<String>,
        source_field: impl Into<String>,
        kind: ValueKind,
    ) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            checksum: checksum(&content),
            content,
            source_resource: source_resource.into(),
            source_field: source_field.into(),
            kind,
        }
    }

    pub fn from_processed(value: &ProcessedValue) -> Self {
        Self {
            path: value.path.clone(),
            content: value.content.clone(),
            source_resource: value.source_id.clone(),
            source_field: value.field_key.clone(),
            kind: value.kind,
            checksum: value.checksum.clone(),
        }
    }

    /// File name without directories
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// What [`ExternalFileAccumulator::add`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The path was new and the file is now stored
    Added,
    /// The same path with the same checksum was already stored
    Unchanged,
}

/// Content-addressed store of external files for one run
#[derive(Debug, Default)]
pub struct ExternalFileAccumulator {
    files: HashMap<String, ExternalFile>,
}

impl ExternalFileAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file.
    ///
    /// On a path conflict the stored entry is left untouched and the new
    /// file is dropped.
    pub fn add(&mut self, file: ExternalFile) -> Result<AddOutcome> {
        match self.files.get(&file.path) {
            None => {
                tracing::debug!(path = %file.path, source = %file.source_resource, "external file added");
                self.files.insert(file.path.clone(), file);
                Ok(AddOutcome::Added)
            }
            Some(existing) if existing.checksum == file.checksum => {
                tracing::debug!(
                    path = %file.path,
                    source = %file.source_resource,
                    first_source = %existing.source_resource,
                    "identical external file already present"
                );
                Ok(AddOutcome::Unchanged)
            }
            Some(existing) => {
                tracing::warn!(
                    path = %file.path,
                    source = %file.source_resource,
                    existing_source = %existing.source_resource,
                    "external file path conflict"
                );
                Err(ExtractError::PathConflict {
                    path: file.path,
                    resource: file.source_resource,
                    field: file.source_field,
                    new_checksum: file.checksum,
                    existing_resource: existing.source_resource.clone(),
                    existing_field: existing.source_field.clone(),
                    existing_checksum: existing.checksum.clone(),
                })
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&ExternalFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All files, in no particular order
    pub fn files(&self) -> impl Iterator<Item = &ExternalFile> {
        self.files.values()
    }

    /// All files sorted by path
    pub fn sorted_files(&self) -> Vec<&ExternalFile> {
        let mut files: Vec<&ExternalFile> = self.files.values().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Consume the accumulator, returning its files sorted by path
    pub fn finish(self) -> Vec<ExternalFile> {
        let mut files: Vec<ExternalFile> = self.files.into_values().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Proposed metadata tree of all files, keyed by basename.
    ///
    /// When two files share a basename, the one with the later path is keyed
    /// by its full path instead.
    pub fn suggest_structure(&self) -> BTreeMap<String, FileSummary> {
        let mut tree = BTreeMap::new();

        for file in self.sorted_files() {
            let key = if tree.contains_key(file.basename()) {
                file.path.clone()
            } else {
                file.basename().to_string()
            };
            tree.insert(key, FileSummary::from(file));
        }

        tree
    }

    /// [`suggest_structure`](Self::suggest_structure) rendered as YAML
    pub fn render_structure(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.suggest_structure())?)
    }
}

/// Review entry of [`ExternalFileAccumulator::suggest_structure`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub path: String,
    pub source_resource: String,
    pub source_field: String,
    pub kind: ValueKind,
    pub checksum: String,
}

impl From<&ExternalFile> for FileSummary {
    fn from(file: &ExternalFile) -> Self {
        Self {
            path: file.path.clone(),
            source_resource: file.source_resource.clone(),
            source_field: file.source_field.clone(),
            kind: file.kind,
            checksum: file.checksum.clone(),
        }
    }
}

/// Accumulator shared between workers.
///
/// `add` calls are serialized through a mutex, so concurrent conflicting
/// adds on one path resolve to exactly one stored entry.
#[derive(Debug, Clone, Default)]
pub struct SharedAccumulator {
    inner: Arc<Mutex<ExternalFileAccumulator>>,
}

impl SharedAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, file: ExternalFile) -> Result<AddOutcome> {
        self.lock().add(file)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current files, sorted by path
    pub fn snapshot(&self) -> Vec<ExternalFile> {
        self.lock().sorted_files().into_iter().cloned().collect()
    }

    /// Take the accumulated files out, leaving an empty accumulator behind
    pub fn take(&self) -> ExternalFileAccumulator {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, ExternalFileAccumulator> {
        // A panic while holding the lock cannot leave the map half-updated:
        // `add` inserts in a single call.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Snippet reading an external file at render time
pub fn file_reference(path: &str) -> String {
    format!("{{{{ .Files.Get {} }}}}", go_string(path))
}

/// Snippet reading an external file, falling back to a literal when the
/// file is missing or empty
pub fn file_reference_with_fallback(path: &str, fallback: &str) -> String {
    format!(
        "{{{{ .Files.Get {} | default {} }}}}",
        go_string(path),
        go_string(fallback)
    )
}

/// Snippet for a YAML block scalar: trims the preceding whitespace and
/// re-indents the file content by `indent` spaces on a new line
pub fn indented_file_reference(path: &str, indent: usize) -> String {
    format!("{{{{- .Files.Get {} | nindent {} }}}}", go_string(path), indent)
}

/// Quote a string as a Go template string literal
fn go_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
