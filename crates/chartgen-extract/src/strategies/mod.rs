//! Reference extraction strategies
//!
//! | Strategy              | Types                                  | Priority |
//! |-----------------------|----------------------------------------|----------|
//! | `labelled-configmap`  | `v1/ConfigMap` with the externalize label | 110   |
//! | `configmap`           | `v1/ConfigMap`                         | 80       |
//! | `workload`            | `apps/v1` Deployment, StatefulSet, DaemonSet | 80 |

mod config_map;
mod workload;

pub use config_map::{ConfigMapStrategy, LabeledConfigMapStrategy};
pub use workload::WorkloadStrategy;

use chartgen_core::{GeneratorConfig, Resource};

use crate::registry::{Registry, RegistryBuilder};

/// Priority of generic, type-wide strategies
pub const GENERIC_PRIORITY: i32 = 80;

/// Priority of label- or annotation-filtered specializations
pub const SPECIALIZED_PRIORITY: i32 = 110;

/// Registry with every reference strategy
pub fn default_registry(config: &GeneratorConfig) -> Registry {
    RegistryBuilder::new()
        .register(LabeledConfigMapStrategy::new(&config.externalize_label))
        .register(ConfigMapStrategy::new())
        .register(WorkloadStrategy::new())
        .build()
}

/// Key of a resource in the values tree: `app-config` becomes `appConfig`
pub fn values_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut upper_next = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if upper_next && !key.is_empty() {
                key.push(c.to_ascii_uppercase());
            } else {
                key.push(c);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }

    if key.starts_with(|c: char| c.is_ascii_digit()) {
        key.insert(0, '_');
    }
    key
}

/// Values path of a resource: its name, then its kind
/// (`web` Deployment becomes `web.deployment`), so resources of different
/// kinds sharing a name get separate subtrees
pub(crate) fn values_path(resource: &Resource) -> [String; 2] {
    let kind = resource.kind();
    let mut kind_key = String::with_capacity(kind.len());
    let mut chars = kind.chars();
    if let Some(first) = chars.next() {
        kind_key.push(first.to_ascii_lowercase());
        kind_key.extend(chars);
    }
    [values_key(resource.name()), kind_key]
}

/// Grouping name: `app.kubernetes.io/name`, then `app`, then the resource name
pub(crate) fn service_name(resource: &Resource) -> String {
    resource
        .label("app.kubernetes.io/name")
        .or_else(|| resource.label("app"))
        .unwrap_or_else(|| resource.name())
        .to_string()
}

/// Template file name for a resource
pub(crate) fn template_path(resource: &Resource) -> String {
    format!("{}-{}.yaml", resource.name(), resource.kind().to_lowercase())
}

/// Templated resource name
pub(crate) fn fullname(chart_name: &str, name: &str) -> String {
    format!("{{{{ include \"{}.fullname\" . }}}}-{}", chart_name, name)
}

/// serde_yaml quotes scalars starting with `{`; template expressions must be
/// bare so they render to typed YAML (`replicas: 3`, not `replicas: '3'`)
pub(crate) fn unquote_template_markers(yaml: &str) -> String {
    yaml.replace("'{{", "{{").replace("}}'", "}}")
}
