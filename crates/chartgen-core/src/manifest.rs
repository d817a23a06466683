//! Manifest loading
//!
//! Splits multi-document YAML streams into decoded documents. Empty
//! documents (a stray `---`, comment-only sections) are dropped, and
//! `kind: List` wrappers such as `kubectl get -o yaml` output are flattened
//! into their items.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::resource::Resource;
use crate::value::Value;

/// Parse every document of a YAML stream
pub fn parse_documents(yaml: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();

    for document in serde_yaml::Deserializer::from_str(yaml) {
        let value = Value::from(serde_yaml::Value::deserialize(document)?);
        push_flattened(&mut documents, value);
    }

    Ok(documents)
}

/// Read and parse a manifest file
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_documents(&content)
}

/// Parse a YAML stream straight into resources, failing on the first
/// document without a valid identity block
pub fn parse_resources(yaml: &str) -> Result<Vec<Resource>> {
    parse_documents(yaml)?
        .into_iter()
        .map(Resource::from_value)
        .collect()
}

fn push_flattened(documents: &mut Vec<Value>, value: Value) {
    if value.is_null() {
        return;
    }

    if is_list(&value) {
        if let Some(Value::Sequence(items)) = value.get("items") {
            for item in items.iter().cloned() {
                push_flattened(documents, item);
            }
        }
        return;
    }

    documents.push(value);
}

fn is_list(value: &Value) -> bool {
    value.get("kind").and_then(Value::as_str) == Some("List")
        && value.get("items").is_some()
}
