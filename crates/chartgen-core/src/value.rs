//! Document values as a tagged union
//!
//! Decoded manifests are arbitrary trees of maps, sequences and scalars. They
//! are kept in [`Value`] rather than an untyped JSON value so that a field
//! decoded as an integer stays distinct from one decoded as a float.
//!
//! Mappings keep insertion order, which keeps extracted values trees in the
//! same order as the source manifest.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Result};

/// Ordered mapping of string keys to values
pub type Mapping = IndexMap<String, Value>;

/// Largest integer a 64-bit float represents exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// A decoded YAML/JSON value
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

impl Value {
    /// Create an empty mapping
    pub fn mapping() -> Self {
        Value::Mapping(Mapping::new())
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        Ok(Self::from(value))
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(Self::from(value))
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Short name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Render a scalar as a string (labels and annotations are sometimes
    /// written unquoted, e.g. `replicas: 3` or `enabled: true`)
    pub fn scalar_to_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Read this value as an integer.
    ///
    /// Floats are accepted only when they are finite, have no fractional
    /// part and lie within `±MAX_SAFE_INTEGER`. Everything else is rejected;
    /// values are never truncated. `field` names the offending field in the
    /// error.
    pub fn as_integer(&self, field: &str) -> Result<i64> {
        let reject = |reason: &str| CoreError::NumericCoercion {
            field: field.to_string(),
            value: self.display_scalar(),
            reason: reason.to_string(),
        };

        match self {
            Value::Int(i) => Ok(*i),
            Value::Float(f) => {
                if !f.is_finite() {
                    Err(reject("value is not finite"))
                } else if f.fract() != 0.0 {
                    Err(reject("value has a fractional part"))
                } else if f.abs() > MAX_SAFE_INTEGER as f64 {
                    Err(reject("value is outside the exactly representable range"))
                } else {
                    Ok(*f as i64)
                }
            }
            other => Err(reject(&format!("expected a number, found {}", other.type_name()))),
        }
    }

    fn display_scalar(&self) -> String {
        self.scalar_to_string()
            .unwrap_or_else(|| self.type_name().to_string())
    }

    /// Get a mapping entry
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Get a nested value by path segments.
    ///
    /// Segments are taken literally, so keys containing dots (`nginx.conf`)
    /// are addressable.
    pub fn get_in(&self, path: &[&str]) -> Option<&Value> {
        match path.split_first() {
            None => Some(self),
            Some((key, rest)) => self.get(key).and_then(|v| v.get_in(rest)),
        }
    }

    /// Set a nested value by path segments, creating intermediate mappings.
    ///
    /// A non-mapping found on the way is replaced by a mapping.
    pub fn set_in(&mut self, path: &[&str], new_value: Value) {
        let Some((key, rest)) = path.split_first() else {
            *self = new_value;
            return;
        };

        if !matches!(self, Value::Mapping(_)) {
            *self = Value::mapping();
        }

        if let Value::Mapping(map) = self {
            if rest.is_empty() {
                map.insert(key.to_string(), new_value);
            } else {
                map.entry(key.to_string())
                    .or_insert_with(Value::mapping)
                    .set_in(rest, new_value);
            }
        }
    }

    /// Deep merge another value into this one
    ///
    /// Rules:
    /// - Mappings: recursive merge
    /// - Everything else: overlay replaces base (sequences are not appended)
    pub fn merge(&mut self, overlay: &Value) {
        match (self, overlay) {
            (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
                for (key, overlay_value) in overlay_map {
                    match base_map.get_mut(key) {
                        Some(base_value) => base_value.merge(overlay_value),
                        None => {
                            base_map.insert(key.clone(), overlay_value.clone());
                        }
                    }
                }
            }
            (base, overlay) => {
                *base = overlay.clone();
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_yaml::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => Value::Bool(b),
            Yaml::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    // u64 beyond i64::MAX and real floats
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Yaml::String(s) => Value::String(s),
            Yaml::Sequence(seq) => Value::Sequence(seq.into_iter().map(Value::from).collect()),
            Yaml::Mapping(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| (yaml_key_to_string(k), Value::from(v)))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

/// Mapping keys are always strings in manifests, but YAML allows `1: x` or
/// `true: x`; those are stringified rather than rejected.
fn yaml_key_to_string(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        other => Value::from(other)
            .scalar_to_string()
            .unwrap_or_default(),
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(seq) => Value::Sequence(seq.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Mapping(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(seq: Vec<Value>) -> Self {
        Value::Sequence(seq)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_and_float_stay_distinct() {
        let value = Value::from_yaml("replicas: 3\nratio: 3.0\n").unwrap();

        assert_eq!(value.get("replicas"), Some(&Value::Int(3)));
        assert_eq!(value.get("ratio"), Some(&Value::Float(3.0)));
    }

    #[test]
    fn test_json_numbers() {
        let value = Value::from_json(r#"{"port": 80, "weight": 0.5}"#).unwrap();

        assert_eq!(value.get("port"), Some(&Value::Int(80)));
        assert_eq!(value.get("weight"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn test_mapping_preserves_order() {
        let value = Value::from_yaml("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
        let keys: Vec<&str> = value
            .as_mapping()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();

        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let value = Value::from_yaml("1: one\ntrue: yes\n").unwrap();

        assert_eq!(value.get("1").and_then(Value::as_str), Some("one"));
        assert_eq!(value.get("true").and_then(Value::as_str), Some("yes"));
    }

    #[test]
    fn test_as_integer_accepts_ints_and_integral_floats() {
        assert_eq!(Value::Int(3).as_integer("spec.replicas").unwrap(), 3);
        assert_eq!(Value::Float(3.0).as_integer("spec.replicas").unwrap(), 3);
        assert_eq!(
            Value::Float(MAX_SAFE_INTEGER as f64)
                .as_integer("spec.replicas")
                .unwrap(),
            MAX_SAFE_INTEGER
        );
        assert_eq!(
            Value::Float(-(MAX_SAFE_INTEGER as f64))
                .as_integer("spec.replicas")
                .unwrap(),
            -MAX_SAFE_INTEGER
        );
    }

    #[test]
    fn test_as_integer_rejects_fractional() {
        let err = Value::Float(2.5).as_integer("spec.replicas").unwrap_err();

        match err {
            CoreError::NumericCoercion { field, reason, .. } => {
                assert_eq!(field, "spec.replicas");
                assert!(reason.contains("fractional"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_as_integer_rejects_beyond_safe_range() {
        // 2^53 is the first integer past the boundary
        let beyond = Value::Float(9_007_199_254_740_992.0);
        assert!(beyond.as_integer("spec.replicas").is_err());
        assert!(Value::Float(f64::INFINITY).as_integer("x").is_err());
    }

    #[test]
    fn test_as_integer_rejects_non_numbers() {
        let err = Value::from("3").as_integer("spec.replicas").unwrap_err();
        assert!(err.to_string().contains("expected a number, found string"));
    }

    #[test]
    fn test_set_in_creates_intermediate_mappings() {
        let mut values = Value::mapping();
        values.set_in(&["app-config", "data", "nginx.conf"], Value::from("worker 1;"));
        values.set_in(&["app-config", "replicas"], Value::Int(2));

        assert_eq!(
            values
                .get_in(&["app-config", "data", "nginx.conf"])
                .and_then(Value::as_str),
            Some("worker 1;")
        );
        assert_eq!(values.get_in(&["app-config", "replicas"]), Some(&Value::Int(2)));
    }

    #[test]
    fn test_set_in_replaces_scalars_on_the_way() {
        let mut values = Value::from_yaml("image: nginx\n").unwrap();
        values.set_in(&["image", "tag"], Value::from("1.25"));

        assert_eq!(
            values.get_in(&["image", "tag"]).and_then(Value::as_str),
            Some("1.25")
        );
    }

    #[test]
    fn test_deep_merge() {
        let mut base = Value::from_yaml(
            r#"
image:
  repository: nginx
  tag: "1.0"
replicas: 1
"#,
        )
        .unwrap();

        let overlay = Value::from_yaml(
            r#"
image:
  tag: "2.0"
  pullPolicy: Always
replicas: 3
"#,
        )
        .unwrap();

        base.merge(&overlay);

        assert_eq!(base.get_in(&["image", "repository"]), Some(&Value::from("nginx")));
        assert_eq!(base.get_in(&["image", "tag"]), Some(&Value::from("2.0")));
        assert_eq!(base.get_in(&["image", "pullPolicy"]), Some(&Value::from("Always")));
        assert_eq!(base.get("replicas"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_yaml_roundtrip_keeps_numeric_kinds() {
        let value = Value::from_yaml("a: 1\nb: 1.5\n").unwrap();
        let yaml = value.to_yaml().unwrap();

        assert!(yaml.contains("a: 1\n"));
        assert!(yaml.contains("b: 1.5\n"));
    }
}
