//! Workload strategy: Deployments, StatefulSets and DaemonSets
//!
//! Replica counts and container images move to the values tree. Every
//! ConfigMap, Secret, ServiceAccount and PersistentVolumeClaim the pod
//! template references becomes a dependency edge.

use chartgen_core::{Resource, ResourceTypeKey, Value};

use crate::dependency::targets;
use crate::error::{ExtractError, Result};
use crate::strategy::{ExtractContext, ExtractResult, ExtractionStrategy, StrategyOutcome};

use super::{
    GENERIC_PRIORITY, fullname, service_name, template_path, unquote_template_markers, values_key,
    values_path,
};

const POD_SPEC: [&str; 3] = ["spec", "template", "spec"];

/// Metadata fields set by the API server, never part of a chart
const SERVER_FIELDS: [&str; 6] = [
    "namespace",
    "uid",
    "resourceVersion",
    "generation",
    "creationTimestamp",
    "managedFields",
];

#[derive(Debug, Default)]
pub struct WorkloadStrategy;

impl WorkloadStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl ExtractionStrategy for WorkloadStrategy {
    fn name(&self) -> &str {
        "workload"
    }

    fn supported_types(&self) -> Vec<ResourceTypeKey> {
        ["Deployment", "StatefulSet", "DaemonSet"]
            .into_iter()
            .map(|kind| ResourceTypeKey::new("apps", "v1", kind))
            .collect()
    }

    fn priority(&self) -> i32 {
        GENERIC_PRIORITY
    }

    fn process(
        &self,
        ctx: &mut ExtractContext<'_>,
        resource: &Resource,
    ) -> Result<StrategyOutcome> {
        let mut result = ExtractResult::new(service_name(resource))
            .with_values_path(values_path(resource));
        result.set_metadata("kind", resource.kind());

        let mut template = resource.document().clone();
        if let Some(mut metadata) = template.get("metadata").cloned() {
            if let Some(map) = metadata.as_mapping_mut() {
                for field in SERVER_FIELDS {
                    map.shift_remove(field);
                }
            }
            metadata.set_in(&["name"], fullname(ctx.chart_name(), resource.name()).into());
            template.set_in(&["metadata"], metadata);
        }
        if let Some(map) = template.as_mapping_mut() {
            map.shift_remove("status");
        }

        if let Some(replicas) = resource.field(&["spec", "replicas"]) {
            let count = replicas.as_integer("spec.replicas").map_err(|err| {
                ExtractError::strategy(self.name(), resource.key(), "spec.replicas", err.to_string())
            })?;
            result.set_value(&["replicas"], count);
            template.set_in(
                &["spec", "replicas"],
                format!("{{{{ {} }}}}", result.values_ref(&["replicas"])).into(),
            );
        }

        for section in ["initContainers", "containers"] {
            self.extract_images(resource, &mut result, &mut template, section)?;
        }

        collect_dependencies(resource, &mut result);

        let yaml = template.to_yaml().map_err(|err| {
            ExtractError::strategy(self.name(), resource.key(), "template", err.to_string())
        })?;
        Ok(StrategyOutcome::Handled(
            result.with_template(template_path(resource), unquote_template_markers(&yaml)),
        ))
    }
}

impl WorkloadStrategy {
    fn extract_images(
        &self,
        resource: &Resource,
        result: &mut ExtractResult,
        template: &mut Value,
        section: &str,
    ) -> Result<()> {
        let path = [POD_SPEC[0], POD_SPEC[1], POD_SPEC[2], section];
        let Some(containers) = resource.field(&path).and_then(Value::as_sequence) else {
            return Ok(());
        };

        let mut rewritten = Vec::with_capacity(containers.len());
        for (index, container) in containers.iter().enumerate() {
            let mut container = container.clone();
            let field = format!("spec.template.spec.{}[{}]", section, index);

            let name = container.get("name").and_then(Value::as_str).ok_or_else(|| {
                ExtractError::strategy(self.name(), resource.key(), &field, "container has no name")
            })?;
            let key = values_key(name);

            if let Some(image) = container.get("image").and_then(Value::as_str) {
                let image = image.to_string();
                result.set_value(&[section, key.as_str(), "image"], image);
                let reference = result.values_ref(&[section, key.as_str(), "image"]);
                container.set_in(&["image"], format!("{{{{ {} }}}}", reference).into());
            }
            rewritten.push(container);
        }

        template.set_in(&path, Value::Sequence(rewritten));
        Ok(())
    }
}

fn collect_dependencies(resource: &Resource, result: &mut ExtractResult) {
    let Some(pod) = resource.field(&POD_SPEC) else {
        return;
    };

    let mut add = |type_key: ResourceTypeKey, name: Option<&Value>| {
        if let Some(name) = name.and_then(Value::as_str).filter(|n| !n.is_empty()) {
            result.add_dependency(resource.reference(&type_key, name, None));
        }
    };

    add(targets::service_account(), pod.get("serviceAccountName"));

    for secret in sequence(pod.get("imagePullSecrets")) {
        add(targets::secret(), secret.get("name"));
    }

    for section in ["initContainers", "containers"] {
        for container in sequence(pod.get(section)) {
            for source in sequence(container.get("envFrom")) {
                add(targets::config_map(), source.get_in(&["configMapRef", "name"]));
                add(targets::secret(), source.get_in(&["secretRef", "name"]));
            }
            for env in sequence(container.get("env")) {
                add(targets::config_map(), env.get_in(&["valueFrom", "configMapKeyRef", "name"]));
                add(targets::secret(), env.get_in(&["valueFrom", "secretKeyRef", "name"]));
            }
        }
    }

    for volume in sequence(pod.get("volumes")) {
        add(targets::config_map(), volume.get_in(&["configMap", "name"]));
        add(targets::secret(), volume.get_in(&["secret", "secretName"]));
        add(
            targets::persistent_volume_claim(),
            volume.get_in(&["persistentVolumeClaim", "claimName"]),
        );
        for source in sequence(volume.get_in(&["projected", "sources"])) {
            add(targets::config_map(), source.get_in(&["configMap", "name"]));
            add(targets::secret(), source.get_in(&["secret", "name"]));
        }
    }
}

fn sequence(value: Option<&Value>) -> &[Value] {
    value.and_then(Value::as_sequence).unwrap_or(&[])
}
