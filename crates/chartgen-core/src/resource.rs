//! Resource identity
//!
//! Two identities are used throughout the pipeline:
//! - [`ResourceTypeKey`]: group/version/kind, used to look up extraction strategies
//! - [`ResourceKey`]: type plus namespace and name, one concrete resource instance.
//!   This is also the endpoint type of dependency edges.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::value::Value;

/// Identifies a resource type (group, version, kind)
///
/// The core API group is the empty string, so `apiVersion: v1` maps to
/// `("", "v1", kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceTypeKey {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ResourceTypeKey {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Type in the core API group (`apiVersion: v1`)
    pub fn core(kind: impl Into<String>) -> Self {
        Self::new("", "v1", kind)
    }

    /// Build from an `apiVersion` string (`apps/v1`, `v1`) and a kind
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// The `apiVersion` string for this type
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

/// Identifies one concrete resource instance
///
/// Equality and hashing are structural over all five fields. `namespace` is
/// empty for cluster-scoped resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(
        type_key: &ResourceTypeKey,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: type_key.group.clone(),
            version: type_key.version.clone(),
            kind: type_key.kind.clone(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn type_key(&self) -> ResourceTypeKey {
        ResourceTypeKey::new(&self.group, &self.version, &self.kind)
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.namespace, self.kind, self.name)
        }
    }
}

/// The identity block of a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub name: String,
    /// None when the document does not set a namespace
    pub namespace: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// A decoded document with its identity parsed out
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    type_key: ResourceTypeKey,
    metadata: Metadata,
    document: Value,
}

impl Resource {
    /// Parse the identity fields of a decoded document.
    ///
    /// Requires a mapping with `apiVersion`, `kind` and `metadata.name`.
    pub fn from_value(document: Value) -> Result<Self> {
        match &document {
            Value::Mapping(_) => {}
            Value::Null => return Err(CoreError::invalid_document("document is empty")),
            other => {
                return Err(CoreError::invalid_document(format!(
                    "expected a mapping at the document root, found {}",
                    other.type_name()
                )));
            }
        }

        let api_version = required_str(&document, &["apiVersion"])?;
        let kind = required_str(&document, &["kind"])?;
        let name = required_str(&document, &["metadata", "name"])?;

        let namespace = document
            .get_in(&["metadata", "namespace"])
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
            .map(String::from);

        let metadata = Metadata {
            name: name.to_string(),
            namespace,
            labels: string_map(document.get_in(&["metadata", "labels"])),
            annotations: string_map(document.get_in(&["metadata", "annotations"])),
        };

        Ok(Self {
            type_key: ResourceTypeKey::from_api_version(api_version, kind),
            metadata,
            document,
        })
    }

    /// Parse a single YAML document into a resource
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_value(Value::from_yaml(yaml)?)
    }

    pub fn type_key(&self) -> &ResourceTypeKey {
        &self.type_key
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.type_key, self.namespace(), &self.metadata.name)
    }

    pub fn kind(&self) -> &str {
        &self.type_key.kind
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Namespace, or the empty string when the document sets none
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or("")
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    /// The full decoded document
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Nested field of the document by path segments
    pub fn field(&self, path: &[&str]) -> Option<&Value> {
        self.document.get_in(path)
    }

    /// Stable identifier of this resource, used to derive external file paths.
    ///
    /// Format: `<kind>[.<group>]/<namespace>/<name>` with the kind lowercased,
    /// the group omitted for the core group and the namespace segment omitted
    /// for cluster-scoped resources.
    pub fn identifier(&self) -> String {
        let mut kind = self.type_key.kind.to_lowercase();
        if !self.type_key.group.is_empty() {
            kind.push('.');
            kind.push_str(&self.type_key.group);
        }
        match self.metadata.namespace.as_deref() {
            Some(ns) => format!("{}/{}/{}", kind, ns, self.metadata.name),
            None => format!("{}/{}", kind, self.metadata.name),
        }
    }

    /// Build a reference from this resource to another one.
    ///
    /// When `namespace` is None the target is assumed to live in this
    /// resource's namespace, which is how in-namespace references resolve.
    pub fn reference(
        &self,
        type_key: &ResourceTypeKey,
        name: impl Into<String>,
        namespace: Option<&str>,
    ) -> ResourceKey {
        let namespace = namespace
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| self.namespace());
        ResourceKey::new(type_key, namespace, name)
    }
}

fn required_str<'a>(document: &'a Value, path: &[&str]) -> Result<&'a str> {
    document
        .get_in(path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::missing_field(path.join(".")))
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_mapping)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.scalar_to_string().map(|v| (k.clone(), v)))
                .collect()
        })
        .unwrap_or_default()
}
