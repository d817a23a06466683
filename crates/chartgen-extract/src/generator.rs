//! Generation run driver
//!
//! Owns the state of one run: the registry, the value processor built from
//! the run's [`GeneratorConfig`], and the external file accumulator every
//! strategy writes into. Documents are processed in order and the first
//! failure aborts the run.

use std::collections::BTreeMap;

use chartgen_core::{GeneratorConfig, Resource, ResourceKey, Value};

use crate::accumulator::{ExternalFile, ExternalFileAccumulator, FileSummary};
use crate::error::{ExtractError, Result};
use crate::processor::ValueProcessor;
use crate::registry::{DispatchOutcome, Registry};
use crate::strategies::default_registry;
use crate::strategy::{ExtractContext, ExtractResult};

/// A resource some strategy handled
#[derive(Debug, Clone, PartialEq)]
pub struct HandledResource {
    pub resource: ResourceKey,
    pub strategy: String,
    pub result: ExtractResult,
}

/// Everything a generation run produced
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub handled: Vec<HandledResource>,
    /// Resources no registered strategy handled, in input order
    pub unhandled: Vec<ResourceKey>,
    /// External files, sorted by path
    pub files: Vec<ExternalFile>,
    /// Proposed metadata tree of the external files
    pub structure: BTreeMap<String, FileSummary>,
}

impl GenerationReport {
    /// Values subtrees of all handled resources merged at their values paths
    pub fn values(&self) -> Value {
        let mut values = Value::mapping();
        for handled in &self.handled {
            let path: Vec<&str> = handled.result.values_path.iter().map(String::as_str).collect();
            let mut subtree = Value::mapping();
            subtree.set_in(&path, handled.result.values.clone());
            values.merge(&subtree);
        }
        values
    }
}

/// Driver of a generation run
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    registry: Registry,
    processor: ValueProcessor,
    files: ExternalFileAccumulator,
}

impl Generator {
    /// Generator with the reference strategies
    pub fn new(config: GeneratorConfig) -> Self {
        let registry = default_registry(&config);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: GeneratorConfig, registry: Registry) -> Self {
        Self {
            processor: ValueProcessor::from_config(&config),
            config,
            registry,
            files: ExternalFileAccumulator::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Files externalized so far
    pub fn files(&self) -> &ExternalFileAccumulator {
        &self.files
    }

    /// Dispatch one resource
    pub fn process_resource(&mut self, resource: &Resource) -> Result<DispatchOutcome> {
        let mut ctx = ExtractContext::new(&self.processor, &mut self.files, &self.config.chart_name);
        self.registry.dispatch_resource(&mut ctx, resource)
    }

    /// Dispatch one decoded document
    pub fn process(&mut self, document: &Value) -> Result<DispatchOutcome> {
        let resource = Resource::from_value(document.clone()).map_err(ExtractError::InvalidDocument)?;
        self.process_resource(&resource)
    }

    /// Process every document in order and collect the report.
    ///
    /// Fails on the first document that cannot be processed; the error
    /// names the resource, or the document's position when it has no
    /// usable identity. Two handled resources claiming the same template
    /// path, or overlapping values paths, also fail the run.
    pub fn run<I>(mut self, documents: I) -> Result<GenerationReport>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut handled = Vec::new();
        let mut unhandled = Vec::new();
        let mut claims = OutputClaims::default();

        for (index, document) in documents.into_iter().enumerate() {
            let resource = Resource::from_value(document)
                .map_err(|err| ExtractError::InvalidDocument(err).in_resource(format!("document #{}", index + 1)))?;
            let key = resource.key();

            match self.process_resource(&resource)? {
                DispatchOutcome::Handled { strategy, result } => {
                    claims.claim(&key, &result)?;
                    tracing::info!(resource = %key, strategy = %strategy, "extracted");
                    handled.push(HandledResource {
                        resource: key,
                        strategy,
                        result,
                    });
                }
                DispatchOutcome::Unhandled => {
                    tracing::warn!(resource = %key, "no strategy for resource, skipped");
                    unhandled.push(key);
                }
            }
        }

        let structure = self.files.suggest_structure();
        Ok(GenerationReport {
            handled,
            unhandled,
            files: self.files.finish(),
            structure,
        })
    }
}

/// Template and values paths already taken in a run
#[derive(Debug, Default)]
struct OutputClaims {
    templates: BTreeMap<String, ResourceKey>,
    values: Vec<(Vec<String>, ResourceKey)>,
}

impl OutputClaims {
    fn claim(&mut self, key: &ResourceKey, result: &ExtractResult) -> Result<()> {
        if !result.template_path.is_empty() {
            if let Some(existing) = self.templates.get(&result.template_path) {
                return Err(collision("Template path", &result.template_path, key, existing));
            }
        }

        if has_values(&result.values) {
            let path = &result.values_path;
            // a prefix would merge one subtree into the other
            let overlapping = self.values.iter().find(|(taken, _)| {
                let shared = taken.len().min(path.len());
                taken[..shared] == path[..shared]
            });
            if let Some((_, existing)) = overlapping {
                return Err(collision("Values path", &path.join("."), key, existing));
            }
            self.values.push((path.clone(), key.clone()));
        }

        if !result.template_path.is_empty() {
            self.templates.insert(result.template_path.clone(), key.clone());
        }
        Ok(())
    }
}

fn has_values(values: &Value) -> bool {
    match values.as_mapping() {
        Some(map) => !map.is_empty(),
        None => !values.is_null(),
    }
}

fn collision(output: &'static str, path: &str, key: &ResourceKey, existing: &ResourceKey) -> ExtractError {
    ExtractError::OutputCollision {
        output,
        path: path.to_string(),
        resource: key.to_string(),
        existing_resource: existing.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgen_core::manifest::parse_documents;

    const MANIFESTS: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
  namespace: shop
data:
  mode: production
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: shop
spec:
  replicas: 2
  template:
    spec:
      containers:
        - name: web
          image: shop/web:1.4.0
          envFrom:
            - configMapRef:
                name: settings
      volumes:
        - name: config
          configMap:
            name: settings
---
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: shop
"#;

    fn config(threshold: usize) -> GeneratorConfig {
        GeneratorConfig {
            chart_name: "shop".to_string(),
            threshold,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_run_collects_handled_and_unhandled() {
        let report = Generator::new(config(1024))
            .run(parse_documents(MANIFESTS).unwrap())
            .unwrap();

        let strategies: Vec<&str> = report.handled.iter().map(|h| h.strategy.as_str()).collect();
        assert_eq!(strategies, vec!["configmap", "workload"]);
        assert_eq!(report.unhandled.len(), 1);
        assert_eq!(report.unhandled[0].to_string(), "shop/Service/web");
        assert!(report.files.is_empty());
    }

    #[test]
    fn test_run_deduplicates_edges() {
        let report = Generator::new(config(1024))
            .run(parse_documents(MANIFESTS).unwrap())
            .unwrap();

        let workload = &report.handled[1].result;
        assert_eq!(workload.dependencies.len(), 1);
        assert_eq!(workload.dependencies[0].to_string(), "shop/ConfigMap/settings");
    }

    #[test]
    fn test_report_values_merged_by_path() {
        let report = Generator::new(config(1024))
            .run(parse_documents(MANIFESTS).unwrap())
            .unwrap();
        let values = report.values();

        assert_eq!(
            values.get_in(&["settings", "configMap", "data", "mode"]),
            Some(&Value::from("production"))
        );
        assert_eq!(values.get_in(&["web", "deployment", "replicas"]), Some(&Value::Int(2)));
    }

    #[test]
    fn test_run_externalizes_with_configured_threshold() {
        let report = Generator::new(config(8))
            .run(parse_documents(MANIFESTS).unwrap())
            .unwrap();

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].path, "files/configmap/shop/settings/mode");
        assert_eq!(report.handled[0].result.external_files, vec!["files/configmap/shop/settings/mode"]);
        assert!(report.structure.contains_key("mode"));
    }

    #[test]
    fn test_run_reports_document_position_without_identity() {
        let documents = parse_documents("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: ok\n---\nkind: ConfigMap\n").unwrap();
        let err = Generator::new(config(1024)).run(documents).unwrap_err();

        assert!(err.to_string().contains("document #2"), "{err}");
    }

    #[test]
    fn test_run_fails_fast_with_resource_identity() {
        let yaml = MANIFESTS.replace("replicas: 2", "replicas: 1.5");
        let err = Generator::new(config(1024))
            .run(parse_documents(&yaml).unwrap())
            .unwrap_err();

        assert!(err.to_string().contains("shop/Deployment/web"), "{err}");
        assert!(err.to_string().contains("spec.replicas"), "{err}");
    }

    #[test]
    fn test_labelled_and_generic_configmaps_in_one_run() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: a
  labels:
    chartgen.io/externalize: "true"
data:
  motd: welcome
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: b
data:
  motd: welcome
"#;
        let report = Generator::new(config(4)).run(parse_documents(yaml).unwrap()).unwrap();

        assert_eq!(report.handled[0].strategy, "labelled-configmap");
        assert_eq!(report.handled[1].strategy, "configmap");
        assert_eq!(report.files.len(), 2);
    }

    #[test]
    fn test_keys_differing_by_extension_are_externalized_apart() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: app
  namespace: shop
  labels:
    chartgen.io/externalize: "true"
data:
  notes: first note
  notes.txt: second note
  settings: '{"a":1}'
  settings.json: '{"b":2}'
"#;
        let report = Generator::new(config(1024)).run(parse_documents(yaml).unwrap()).unwrap();

        let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "files/configmap/shop/app/notes",
                "files/configmap/shop/app/notes.txt",
                "files/configmap/shop/app/settings",
                "files/configmap/shop/app/settings.json",
            ]
        );
        assert_eq!(report.files[0].content, "first note");
        assert_eq!(report.files[1].content, "second note");
    }

    #[test]
    fn test_same_name_in_two_namespaces_is_a_collision() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: app
  namespace: a
data:
  greeting: hello
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: app
  namespace: b
data:
  greeting: bye
"#;
        let err = Generator::new(config(1024))
            .run(parse_documents(yaml).unwrap())
            .unwrap_err();

        match err {
            ExtractError::OutputCollision { output, path, resource, existing_resource } => {
                assert_eq!(output, "Template path");
                assert_eq!(path, "app-configmap.yaml");
                assert_eq!(resource, "b/ConfigMap/app");
                assert_eq!(existing_resource, "a/ConfigMap/app");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_folded_values_keys_are_a_collision() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: app-config
data:
  mode: a
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: app_config
data:
  mode: b
"#;
        let err = Generator::new(config(1024))
            .run(parse_documents(yaml).unwrap())
            .unwrap_err();

        assert!(matches!(err, ExtractError::OutputCollision { output: "Values path", .. }), "{err}");
        assert!(err.to_string().contains("appConfig.configMap"), "{err}");
        assert!(err.to_string().contains("ConfigMap/app-config"), "{err}");
    }

    #[test]
    fn test_same_name_different_kinds_do_not_collide() {
        let report = Generator::new(config(1024))
            .run(parse_documents(&MANIFESTS.replace("name: settings\n  namespace", "name: web\n  namespace")).unwrap())
            .unwrap();
        let values = report.values();

        assert_eq!(values.get_in(&["web", "configMap", "data", "mode"]), Some(&Value::from("production")));
        assert_eq!(values.get_in(&["web", "deployment", "replicas"]), Some(&Value::Int(2)));
    }
}
