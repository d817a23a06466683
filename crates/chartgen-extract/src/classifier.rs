//! Value classification
//!
//! Decides the structural category of a raw string value. The checks run in
//! a fixed order and the first match wins:
//!
//! 1. JSON, only when the parsed result is an object or an array
//! 2. XML, an optional prologue followed by exactly one well-formed root element
//! 3. Base64-encoded binary, only when the decoded bytes are not readable text
//! 4. Plain text
//!
//! Nothing here fails: a value no parser accepts is plain text.
//!
//! # Example
//!
//! ```rust
//! use chartgen_extract::{classify, ValueKind};
//!
//! assert_eq!(classify("hello"), ValueKind::PlainText);
//! assert_eq!(classify(r#"{"port":80,"workers":4}"#), ValueKind::Json);
//! assert_eq!(classify("42"), ValueKind::PlainText);
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

/// Shortest string considered as a base64 candidate.
///
/// Short words of a multiple-of-four length (`test`, `password`) are valid
/// base64 that decodes to noise; below this length they stay plain text.
pub const MIN_BASE64_LEN: usize = 16;

/// Structural category of a raw string value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Anything not recognized as structured or binary
    PlainText,
    /// JSON object or array
    Json,
    /// Well-formed XML document
    Xml,
    /// Base64 text encoding non-textual bytes
    Binary,
}

impl ValueKind {
    /// File extension used for externalized values of this kind
    pub fn extension(&self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Binary => "b64",
        }
    }

    /// Structured values are reformatted before being stored
    #[inline]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Json | Self::Xml)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PlainText => "plaintext",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Binary => "binary",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a raw string value
pub fn classify(raw: &str) -> ValueKind {
    if raw.trim().is_empty() {
        return ValueKind::PlainText;
    }

    if is_json_composite(raw) {
        ValueKind::Json
    } else if is_well_formed_xml(raw) {
        ValueKind::Xml
    } else if is_binary_base64(raw) {
        ValueKind::Binary
    } else {
        ValueKind::PlainText
    }
}

/// Strict JSON parse; bare scalars (`42`, `true`, `"x"`) do not count
fn is_json_composite(raw: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => value.is_object() || value.is_array(),
        Err(_) => false,
    }
}

/// Accepts declarations, comments, processing instructions and a doctype
/// around exactly one root element. Tags must balance and no text may appear
/// outside the root element.
pub(crate) fn is_well_formed_xml(raw: &str) -> bool {
    let trimmed = raw.trim();
    if !trimmed.starts_with('<') || !trimmed.ends_with('>') {
        return false;
    }

    let mut reader = Reader::from_str(trimmed);
    reader.config_mut().trim_text(true);

    let mut depth: usize = 0;
    let mut roots: usize = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::End(_)) => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::Text(text)) => {
                if depth == 0 && !text.iter().all(u8::is_ascii_whitespace) {
                    return false;
                }
            }
            Ok(Event::CData(_)) => {
                if depth == 0 {
                    return false;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return false,
        }
    }

    depth == 0 && roots == 1
}

/// Valid standard base64 whose decoded bytes are not readable text
fn is_binary_base64(raw: &str) -> bool {
    if raw.len() < MIN_BASE64_LEN || raw.len() % 4 != 0 {
        return false;
    }

    match STANDARD.decode(raw) {
        Ok(bytes) => !is_plausible_text(&bytes),
        Err(_) => false,
    }
}

/// UTF-8 without control characters other than tab, CR and LF
fn is_plausible_text(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(text) => !text
            .chars()
            .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serialized_name() {
        for kind in [ValueKind::PlainText, ValueKind::Json, ValueKind::Xml, ValueKind::Binary] {
            let serialized = serde_json::to_value(kind).unwrap();
            assert_eq!(serialized, kind.to_string());
        }
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(classify("hello"), ValueKind::PlainText);
        assert_eq!(classify("worker_processes 4;\nevents {}\n"), ValueKind::PlainText);
    }

    #[test]
    fn test_empty_is_plain_text() {
        assert_eq!(classify(""), ValueKind::PlainText);
        assert_eq!(classify("   \n"), ValueKind::PlainText);
    }

    #[test]
    fn test_json_object_and_array() {
        assert_eq!(classify(r#"{"port":80,"workers":4}"#), ValueKind::Json);
        assert_eq!(classify("[1, 2, 3]"), ValueKind::Json);
        assert_eq!(classify("  {\n  \"a\": {}\n}\n"), ValueKind::Json);
    }

    #[test]
    fn test_json_scalars_are_plain_text() {
        assert_eq!(classify("42"), ValueKind::PlainText);
        assert_eq!(classify("true"), ValueKind::PlainText);
        assert_eq!(classify("null"), ValueKind::PlainText);
        assert_eq!(classify(r#""quoted""#), ValueKind::PlainText);
    }

    #[test]
    fn test_malformed_json_is_not_json() {
        assert_eq!(classify(r#"{"port": 80,}"#), ValueKind::PlainText);
        assert_eq!(classify("{port: 80}"), ValueKind::PlainText);
    }

    #[test]
    fn test_xml_with_declaration() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration>
  <property name="level">debug</property>
</configuration>"#;
        assert_eq!(classify(xml), ValueKind::Xml);
    }

    #[test]
    fn test_xml_single_root_without_declaration() {
        assert_eq!(classify("<root><child/></root>"), ValueKind::Xml);
        assert_eq!(classify("<empty/>"), ValueKind::Xml);
        assert_eq!(classify("<!-- settings --><root>x</root>"), ValueKind::Xml);
    }

    #[test]
    fn test_malformed_xml() {
        assert_eq!(classify("<a><b></a></b>"), ValueKind::PlainText);
        assert_eq!(classify("<a>"), ValueKind::PlainText);
        assert_eq!(classify("<a/><b/>"), ValueKind::PlainText);
        assert_eq!(classify("<a></a> trailing"), ValueKind::PlainText);
        assert_eq!(classify("<?xml version=\"1.0\"?>"), ValueKind::PlainText);
    }

    #[test]
    fn test_binary_base64() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let encoded = STANDARD.encode(&bytes);

        assert_eq!(classify(&encoded), ValueKind::Binary);
    }

    #[test]
    fn test_base64_of_readable_text_is_plain() {
        // "hello world, this is plain text"
        let encoded = STANDARD.encode("hello world, this is plain text");
        assert_eq!(classify(&encoded), ValueKind::PlainText);
    }

    #[test]
    fn test_short_base64_words_are_plain() {
        assert_eq!(classify("test"), ValueKind::PlainText);
        assert_eq!(classify("password"), ValueKind::PlainText);
    }

    #[test]
    fn test_bad_padding_is_not_binary() {
        let bytes: Vec<u8> = (0u8..32).collect();
        let encoded = STANDARD.encode(&bytes);
        let unpadded = encoded.trim_end_matches('=');

        assert_ne!(unpadded.len() % 4, 0);
        assert_eq!(classify(unpadded), ValueKind::PlainText);
    }

    #[test]
    fn test_json_wins_over_other_checks() {
        assert_eq!(classify("[]"), ValueKind::Json);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(ValueKind::PlainText.extension(), "txt");
        assert_eq!(ValueKind::Json.extension(), "json");
        assert_eq!(ValueKind::Xml.extension(), "xml");
        assert_eq!(ValueKind::Binary.extension(), "b64");
        assert!(ValueKind::Xml.is_structured());
        assert!(!ValueKind::Binary.is_structured());
    }
}
