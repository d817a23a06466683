//! Extraction strategy interface
//!
//! A strategy maps the fields of one or more resource types into a template,
//! a values subtree, dependency edges and external files. Strategies are
//! stateless; everything run-wide lives in the [`ExtractContext`] they are
//! handed.
//!
//! A strategy that inspects a resource and finds it is not meant for it
//! (a label-filtered specialization, say) returns
//! [`StrategyOutcome::NotApplicable`] so the next candidate can try.

use std::collections::BTreeMap;

use chartgen_core::{Resource, ResourceKey, ResourceTypeKey, Value};

use crate::accumulator::{ExternalFile, ExternalFileAccumulator};
use crate::classifier::ValueKind;
use crate::error::Result;
use crate::processor::{ProcessedValue, ValueProcessor};

/// Pluggable extraction logic for one or more resource types
pub trait ExtractionStrategy: Send + Sync {
    /// Human-readable name, used in logs and errors
    fn name(&self) -> &str;

    /// Resource types this strategy is registered for
    fn supported_types(&self) -> Vec<ResourceTypeKey>;

    /// Higher priorities are tried first
    fn priority(&self) -> i32;

    /// Extract a resource, or decline it
    fn process(&self, ctx: &mut ExtractContext<'_>, resource: &Resource)
    -> Result<StrategyOutcome>;
}

/// Result of invoking a single strategy
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// The strategy handled the resource; dispatch stops here
    Handled(ExtractResult),
    /// The strategy does not apply; dispatch tries the next candidate
    NotApplicable,
}

/// Per-resource output handed to the chart assembler
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractResult {
    /// Service or grouping name the resource belongs to
    pub service_name: String,
    /// Suggested template location, relative to `templates/`
    pub template_path: String,
    /// Suggested template text
    pub template: String,
    /// Where `values` should be merged in the chart's values tree
    pub values_path: Vec<String>,
    /// Extracted values subtree
    pub values: Value,
    /// Resources this resource references
    pub dependencies: Vec<ResourceKey>,
    /// Paths of external files produced for this resource
    pub external_files: Vec<String>,
    /// Free-form annotations for the assembler
    pub metadata: BTreeMap<String, String>,
}

impl ExtractResult {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            template_path: String::new(),
            template: String::new(),
            values_path: Vec::new(),
            values: Value::mapping(),
            dependencies: Vec::new(),
            external_files: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_template(mut self, path: impl Into<String>, template: impl Into<String>) -> Self {
        self.template_path = path.into();
        self.template = template.into();
        self
    }

    pub fn with_values_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values_path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Set a value in the extracted subtree
    pub fn set_value(&mut self, path: &[&str], value: impl Into<Value>) {
        self.values.set_in(path, value.into());
    }

    pub fn add_dependency(&mut self, key: ResourceKey) {
        self.dependencies.push(key);
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// The values path rendered as a template expression root
    /// (`.Values.app.data`)
    pub fn values_ref(&self, path: &[&str]) -> String {
        let mut expr = String::from(".Values");
        for segment in self.values_path.iter().map(String::as_str).chain(path.iter().copied()) {
            if is_identifier(segment) {
                expr.push('.');
                expr.push_str(segment);
            } else {
                // keys such as `nginx.conf` or `app-config` need index
                expr = format!("(index {} \"{}\")", expr, segment);
            }
        }
        expr
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Where an extracted value ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedValue {
    /// Small enough to stay in the values tree
    Inline(String),
    /// Stored as an external file
    External { path: String, kind: ValueKind },
}

/// Run-wide state handed to strategies
#[derive(Debug)]
pub struct ExtractContext<'a> {
    processor: &'a ValueProcessor,
    files: &'a mut ExternalFileAccumulator,
    chart_name: &'a str,
    externalized: Vec<String>,
}

impl<'a> ExtractContext<'a> {
    pub fn new(
        processor: &'a ValueProcessor,
        files: &'a mut ExternalFileAccumulator,
        chart_name: &'a str,
    ) -> Self {
        Self {
            processor,
            files,
            chart_name,
            externalized: Vec::new(),
        }
    }

    pub fn processor(&self) -> &ValueProcessor {
        self.processor
    }

    pub fn chart_name(&self) -> &str {
        self.chart_name
    }

    /// Externalization decision for a field, without storing anything
    pub fn process_value(&self, resource: &Resource, field: &str, raw: &str) -> ProcessedValue {
        self.processor.process(&resource.identifier(), field, raw)
    }

    /// Store a processed value as an external file.
    ///
    /// Path conflicts are returned as is; the caller decides whether to
    /// qualify the path and retry.
    pub fn externalize(&mut self, processed: &ProcessedValue) -> Result<()> {
        self.files.add(ExternalFile::from_processed(processed))?;
        if !self.externalized.contains(&processed.path) {
            self.externalized.push(processed.path.clone());
        }
        Ok(())
    }

    /// Process a field and externalize it when the size policy says so
    pub fn extract_value(
        &mut self,
        resource: &Resource,
        field: &str,
        raw: &str,
    ) -> Result<ExtractedValue> {
        let processed = self.process_value(resource, field, raw);
        self.place(processed, raw)
    }

    /// Process a field and externalize it regardless of size
    pub fn extract_external(
        &mut self,
        resource: &Resource,
        field: &str,
        raw: &str,
    ) -> Result<ExtractedValue> {
        let processed = self
            .processor
            .process_forced(&resource.identifier(), field, raw);
        self.place(processed, raw)
    }

    fn place(&mut self, processed: ProcessedValue, raw: &str) -> Result<ExtractedValue> {
        if processed.externalize {
            self.externalize(&processed)?;
            Ok(ExtractedValue::External {
                path: processed.path,
                kind: processed.kind,
            })
        } else {
            Ok(ExtractedValue::Inline(raw.to_string()))
        }
    }

    /// Paths externalized since the last call
    pub(crate) fn take_externalized(&mut self) -> Vec<String> {
        std::mem::take(&mut self.externalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> Resource {
        Resource::from_yaml("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: app\n  namespace: shop\n")
            .unwrap()
    }

    #[test]
    fn test_extract_value_inline_below_threshold() {
        let processor = ValueProcessor::new(16);
        let mut files = ExternalFileAccumulator::new();
        let mut ctx = ExtractContext::new(&processor, &mut files, "shop");

        let value = ctx.extract_value(&resource(), "greeting", "hello").unwrap();

        assert_eq!(value, ExtractedValue::Inline("hello".to_string()));
        assert!(ctx.take_externalized().is_empty());
        assert!(files.is_empty());
    }

    #[test]
    fn test_extract_value_external_at_threshold() {
        let processor = ValueProcessor::new(16);
        let mut files = ExternalFileAccumulator::new();
        let mut ctx = ExtractContext::new(&processor, &mut files, "shop");

        let raw = "a long line of text";
        let value = ctx.extract_value(&resource(), "notes", raw).unwrap();

        assert_eq!(
            value,
            ExtractedValue::External {
                path: "files/configmap/shop/app/notes".to_string(),
                kind: ValueKind::PlainText,
            }
        );
        assert_eq!(ctx.take_externalized(), vec!["files/configmap/shop/app/notes"]);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_extract_external_ignores_threshold() {
        let processor = ValueProcessor::default();
        let mut files = ExternalFileAccumulator::new();
        let mut ctx = ExtractContext::new(&processor, &mut files, "shop");

        let value = ctx.extract_external(&resource(), "tiny", "x").unwrap();
        assert!(matches!(value, ExtractedValue::External { .. }));
    }

    #[test]
    fn test_values_ref() {
        let result = ExtractResult::new("app").with_values_path(["appConfig"]);

        assert_eq!(result.values_ref(&["data", "greeting"]), ".Values.appConfig.data.greeting");
        assert_eq!(
            result.values_ref(&["data", "nginx.conf"]),
            "(index .Values.appConfig.data \"nginx.conf\")"
        );
    }

    #[test]
    fn test_set_value_and_metadata() {
        let mut result = ExtractResult::new("app");
        result.set_value(&["replicas"], 3i64);
        result.set_metadata("strategy", "test");

        assert_eq!(result.values.get("replicas"), Some(&Value::Int(3)));
        assert_eq!(result.metadata["strategy"], "test");
    }
}
