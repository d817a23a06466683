//! Dependency edges between resources
//!
//! Strategies push a [`ResourceKey`] for every resource the processed
//! resource references. The same target is often reached through several
//! fields (an `envFrom` entry and a volume naming the same ConfigMap), so the
//! dispatcher collapses the list with [`dedup_edges`] before returning it.
//!
//! Namespace inference is the strategy's job, see
//! [`Resource::reference`](chartgen_core::Resource::reference).

use chartgen_core::{ResourceKey, ResourceTypeKey};
use indexmap::IndexSet;

/// Remove structurally equal edges, keeping the first occurrence of each
pub fn dedup_edges(edges: Vec<ResourceKey>) -> Vec<ResourceKey> {
    let unique: IndexSet<ResourceKey> = edges.into_iter().collect();
    unique.into_iter().collect()
}

/// Type keys of common reference targets
pub mod targets {
    use super::ResourceTypeKey;

    pub fn config_map() -> ResourceTypeKey {
        ResourceTypeKey::core("ConfigMap")
    }

    pub fn secret() -> ResourceTypeKey {
        ResourceTypeKey::core("Secret")
    }

    pub fn service_account() -> ResourceTypeKey {
        ResourceTypeKey::core("ServiceAccount")
    }

    pub fn persistent_volume_claim() -> ResourceTypeKey {
        ResourceTypeKey::core("PersistentVolumeClaim")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cm(namespace: &str, name: &str) -> ResourceKey {
        ResourceKey::new(&targets::config_map(), namespace, name)
    }

    #[test]
    fn test_dedup_collapses_equal_edges() {
        let edges = vec![cm("shop", "settings"), cm("shop", "settings")];
        assert_eq!(dedup_edges(edges), vec![cm("shop", "settings")]);
    }

    #[test]
    fn test_dedup_keeps_distinct_namespaces_and_kinds() {
        let secret = ResourceKey::new(&targets::secret(), "shop", "settings");
        let edges = vec![
            cm("shop", "settings"),
            cm("infra", "settings"),
            secret.clone(),
            cm("shop", "settings"),
        ];

        let deduped = dedup_edges(edges);
        assert_eq!(
            deduped,
            vec![cm("shop", "settings"), cm("infra", "settings"), secret]
        );
    }

    #[test]
    fn test_dedup_is_order_independent_as_a_set() {
        let a = vec![cm("shop", "a"), cm("shop", "b"), cm("shop", "a")];
        let b = vec![cm("shop", "b"), cm("shop", "a"), cm("shop", "b")];

        let set_a: HashSet<ResourceKey> = dedup_edges(a).into_iter().collect();
        let set_b: HashSet<ResourceKey> = dedup_edges(b).into_iter().collect();
        assert_eq!(set_a, set_b);
        assert_eq!(set_a.len(), 2);
    }

    #[test]
    fn test_dedup_empty() {
        assert!(dedup_edges(Vec::new()).is_empty());
    }
}
