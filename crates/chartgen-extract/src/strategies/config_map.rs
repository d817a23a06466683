//! ConfigMap strategies
//!
//! The generic strategy keeps small entries in the values tree and moves
//! large ones to external files. The labelled specialization externalizes
//! every entry of ConfigMaps carrying the externalize label, so operators can
//! keep whole configuration bundles as files in the chart.

use chartgen_core::{Resource, ResourceTypeKey, Value};

use crate::accumulator::{file_reference, indented_file_reference};
use crate::error::{ExtractError, Result};
use crate::strategy::{
    ExtractContext, ExtractResult, ExtractedValue, ExtractionStrategy, StrategyOutcome,
};

use super::{GENERIC_PRIORITY, SPECIALIZED_PRIORITY, fullname, service_name, template_path, values_path};

/// Generic ConfigMap extraction, threshold based
#[derive(Debug, Default)]
pub struct ConfigMapStrategy;

impl ConfigMapStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionStrategy for ConfigMapStrategy {
    fn name(&self) -> &str {
        "configmap"
    }

    fn supported_types(&self) -> Vec<ResourceTypeKey> {
        vec![ResourceTypeKey::core("ConfigMap")]
    }

    fn priority(&self) -> i32 {
        GENERIC_PRIORITY
    }

    fn process(
        &self,
        ctx: &mut ExtractContext<'_>,
        resource: &Resource,
    ) -> Result<StrategyOutcome> {
        extract_config_map(self.name(), ctx, resource, Placement::Threshold).map(StrategyOutcome::Handled)
    }
}

/// ConfigMaps labelled `<label>: "true"` have every entry externalized
#[derive(Debug)]
pub struct LabeledConfigMapStrategy {
    label: String,
}

impl LabeledConfigMapStrategy {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn applies_to(&self, resource: &Resource) -> bool {
        resource
            .label(&self.label)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }
}

impl ExtractionStrategy for LabeledConfigMapStrategy {
    fn name(&self) -> &str {
        "labelled-configmap"
    }

    fn supported_types(&self) -> Vec<ResourceTypeKey> {
        vec![ResourceTypeKey::core("ConfigMap")]
    }

    fn priority(&self) -> i32 {
        SPECIALIZED_PRIORITY
    }

    fn process(
        &self,
        ctx: &mut ExtractContext<'_>,
        resource: &Resource,
    ) -> Result<StrategyOutcome> {
        if !self.applies_to(resource) {
            return Ok(StrategyOutcome::NotApplicable);
        }

        let mut result = extract_config_map(self.name(), ctx, resource, Placement::Always)?;
        result.set_metadata("externalize", "all");
        Ok(StrategyOutcome::Handled(result))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Threshold,
    Always,
}

/// A rendered `data`/`binaryData` entry
struct Entry {
    key: String,
    line: String,
}

fn extract_config_map(
    strategy: &str,
    ctx: &mut ExtractContext<'_>,
    resource: &Resource,
    placement: Placement,
) -> Result<ExtractResult> {
    let mut result = ExtractResult::new(service_name(resource))
        .with_values_path(values_path(resource));
    result.set_metadata("kind", resource.kind());

    let mut data = Vec::new();
    for (key, value) in entries(strategy, resource, "data")? {
        let extracted = match placement {
            Placement::Threshold => ctx.extract_value(resource, &key, &value)?,
            Placement::Always => ctx.extract_external(resource, &key, &value)?,
        };

        let line = match extracted {
            ExtractedValue::Inline(raw) => {
                result.set_value(&["data", key.as_str()], raw);
                format!(
                    "{}: {{{{ {} | quote }}}}",
                    key,
                    result.values_ref(&["data", key.as_str()])
                )
            }
            ExtractedValue::External { path, .. } => {
                format!("{}: |-\n    {}", key, indented_file_reference(&path, 4))
            }
        };
        data.push(Entry { key, line });
    }

    // binaryData is already base64 and never useful in the values tree.
    // Keys are unique across data and binaryData, so they share a directory.
    let mut binary = Vec::new();
    for (key, value) in entries(strategy, resource, "binaryData")? {
        let line = match ctx.extract_external(resource, &key, &value)? {
            ExtractedValue::External { path, .. } => format!("{}: {}", key, file_reference(&path)),
            ExtractedValue::Inline(raw) => format!("{}: {}", key, raw),
        };
        binary.push(Entry { key, line });
    }

    let template = render_template(ctx.chart_name(), resource, &data, &binary);
    Ok(result.with_template(template_path(resource), template))
}

/// String entries of a `data`-like mapping, in document order
fn entries(strategy: &str, resource: &Resource, section: &str) -> Result<Vec<(String, String)>> {
    let Some(value) = resource.field(&[section]) else {
        return Ok(Vec::new());
    };
    if value.is_null() {
        return Ok(Vec::new());
    }

    let map = value.as_mapping().ok_or_else(|| {
        ExtractError::strategy(
            strategy,
            resource.key(),
            section,
            format!("expected a mapping, found {}", value.type_name()),
        )
    })?;

    map.iter()
        .map(|(key, value)| match value {
            Value::Null => Ok((key.clone(), String::new())),
            other => other
                .scalar_to_string()
                .map(|raw| (key.clone(), raw))
                .ok_or_else(|| {
                    ExtractError::strategy(
                        strategy,
                        resource.key(),
                        &format!("{}.{}", section, key),
                        format!("expected a string, found {}", other.type_name()),
                    )
                }),
        })
        .collect()
}

fn render_template(chart: &str, resource: &Resource, data: &[Entry], binary: &[Entry]) -> String {
    let mut out = String::new();
    out.push_str("apiVersion: v1\nkind: ConfigMap\nmetadata:\n");
    out.push_str(&format!("  name: {}\n", fullname(chart, resource.name())));
    out.push_str("  labels:\n");
    out.push_str(&format!("    {{{{- include \"{}.labels\" . | nindent 4 }}}}\n", chart));

    for (section, entries) in [("data", data), ("binaryData", binary)] {
        if entries.is_empty() {
            continue;
        }
        out.push_str(section);
        out.push_str(":\n");
        for entry in entries {
            tracing::trace!(key = %entry.key, section, "rendering entry");
            out.push_str("  ");
            out.push_str(&entry.line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::ExternalFileAccumulator;
    use crate::processor::ValueProcessor;

    const APP_CONFIG: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: app
  namespace: shop
  labels:
    app: storefront
data:
  greeting: hello
  nginx.conf: |
    server {
      listen 80;
    }
"#;

    fn run(strategy: &dyn ExtractionStrategy, yaml: &str, threshold: usize) -> (StrategyOutcome, ExternalFileAccumulator) {
        let processor = ValueProcessor::new(threshold);
        let mut files = ExternalFileAccumulator::new();
        let resource = Resource::from_yaml(yaml).unwrap();
        let outcome = {
            let mut ctx = ExtractContext::new(&processor, &mut files, "shop");
            strategy.process(&mut ctx, &resource).unwrap()
        };
        (outcome, files)
    }

    fn handled(outcome: StrategyOutcome) -> ExtractResult {
        match outcome {
            StrategyOutcome::Handled(result) => result,
            StrategyOutcome::NotApplicable => panic!("expected the strategy to handle the resource"),
        }
    }

    #[test]
    fn test_configmap_splits_inline_and_external() {
        let (outcome, files) = run(&ConfigMapStrategy::new(), APP_CONFIG, 16);
        let result = handled(outcome);

        assert_eq!(result.service_name, "storefront");
        assert_eq!(result.values_path, vec!["app", "configMap"]);
        assert_eq!(
            result.values.get_in(&["data", "greeting"]),
            Some(&Value::from("hello"))
        );
        assert!(result.values.get_in(&["data", "nginx.conf"]).is_none());

        let file = files.get("files/configmap/shop/app/nginx.conf").unwrap();
        assert_eq!(file.source_field, "nginx.conf");
        assert!(file.content.contains("listen 80;"));
    }

    #[test]
    fn test_configmap_template() {
        let (outcome, _) = run(&ConfigMapStrategy::new(), APP_CONFIG, 16);
        let result = handled(outcome);

        assert_eq!(result.template_path, "app-configmap.yaml");
        insta::assert_snapshot!(result.template, @r#"
        apiVersion: v1
        kind: ConfigMap
        metadata:
          name: {{ include "shop.fullname" . }}-app
          labels:
            {{- include "shop.labels" . | nindent 4 }}
        data:
          greeting: {{ .Values.app.configMap.data.greeting | quote }}
          nginx.conf: |-
            {{- .Files.Get "files/configmap/shop/app/nginx.conf" | nindent 4 }}
        "#);
    }

    #[test]
    fn test_configmap_everything_inline_under_default_threshold() {
        let (outcome, files) = run(&ConfigMapStrategy::new(), APP_CONFIG, 1024);
        let result = handled(outcome);

        assert!(files.is_empty());
        assert!(result.values.get_in(&["data", "nginx.conf"]).is_some());
    }

    #[test]
    fn test_configmap_unquoted_scalars_are_stringified() {
        let yaml = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: flags\ndata:\n  port: 8080\n  debug: true\n";
        let (outcome, _) = run(&ConfigMapStrategy::new(), yaml, 1024);
        let result = handled(outcome);

        assert_eq!(result.values.get_in(&["data", "port"]), Some(&Value::from("8080")));
        assert_eq!(result.values.get_in(&["data", "debug"]), Some(&Value::from("true")));
    }

    #[test]
    fn test_configmap_nested_data_is_rejected_with_field() {
        let yaml = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: bad\ndata:\n  nested:\n    a: b\n";
        let processor = ValueProcessor::default();
        let mut files = ExternalFileAccumulator::new();
        let mut ctx = ExtractContext::new(&processor, &mut files, "shop");
        let resource = Resource::from_yaml(yaml).unwrap();

        let err = ConfigMapStrategy::new().process(&mut ctx, &resource).unwrap_err();
        match err {
            ExtractError::Strategy { strategy, field, .. } => {
                assert_eq!(strategy, "configmap");
                assert_eq!(field, "data.nested");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_binary_data_always_external() {
        let yaml = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: assets\nbinaryData:\n  logo.png: iVBORw0KGgoAAAANSUhEUgAAAAEAAAAB\n";
        let (outcome, files) = run(&ConfigMapStrategy::new(), yaml, 1024);
        let result = handled(outcome);

        assert_eq!(files.len(), 1);
        assert!(files.contains("files/configmap/assets/logo.png"));
        assert!(
            result
                .template
                .contains("binaryData:\n  logo.png: {{ .Files.Get \"files/configmap/assets/logo.png\" }}")
        );
    }

    #[test]
    fn test_labelled_strategy_declines_without_label() {
        let (outcome, files) = run(&LabeledConfigMapStrategy::new("chartgen.io/externalize"), APP_CONFIG, 16);

        assert_eq!(outcome, StrategyOutcome::NotApplicable);
        assert!(files.is_empty());
    }

    #[test]
    fn test_labelled_strategy_externalizes_everything() {
        let yaml = APP_CONFIG.replace(
            "    app: storefront\n",
            "    app: storefront\n    chartgen.io/externalize: \"true\"\n",
        );
        let (outcome, files) = run(&LabeledConfigMapStrategy::new("chartgen.io/externalize"), &yaml, 1024);
        let result = handled(outcome);

        assert_eq!(files.len(), 2);
        assert!(files.contains("files/configmap/shop/app/greeting"));
        assert!(files.contains("files/configmap/shop/app/nginx.conf"));
        assert_eq!(result.metadata["externalize"], "all");
        assert!(result.values.get_in(&["data", "greeting"]).is_none());
    }

    #[test]
    fn test_labelled_strategy_requires_true() {
        let yaml = APP_CONFIG.replace(
            "    app: storefront\n",
            "    app: storefront\n    chartgen.io/externalize: \"false\"\n",
        );
        let (outcome, _) = run(&LabeledConfigMapStrategy::new("chartgen.io/externalize"), &yaml, 1024);
        assert_eq!(outcome, StrategyOutcome::NotApplicable);
    }
}
