//! Strategy registry and dispatch
//!
//! Resource types are reused for many purposes told apart only by labels or
//! annotations, so several strategies may register for the same type. For a
//! given resource the candidates are tried by descending priority (ties keep
//! registration order) and the first one that handles it wins:
//!
//! ```text
//! ConfigMap ──► labelled-configmap (110) ──NotApplicable──► configmap (80) ──Handled──► result
//! ```
//!
//! An error from a candidate stops dispatch; lower-priority candidates are
//! not tried.
//!
//! # Example
//!
//! ```rust
//! use chartgen_core::Value;
//! use chartgen_extract::{
//!     DispatchOutcome, ExternalFileAccumulator, ExtractContext, RegistryBuilder, ValueProcessor,
//! };
//! use chartgen_extract::strategies::ConfigMapStrategy;
//!
//! let registry = RegistryBuilder::new()
//!     .register(ConfigMapStrategy::new())
//!     .build();
//!
//! let processor = ValueProcessor::default();
//! let mut files = ExternalFileAccumulator::new();
//! let mut ctx = ExtractContext::new(&processor, &mut files, "shop");
//!
//! let doc = Value::from_yaml(
//!     "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: app\ndata:\n  greeting: hello\n",
//! ).unwrap();
//!
//! match registry.dispatch(&mut ctx, &doc).unwrap() {
//!     DispatchOutcome::Handled { strategy, .. } => assert_eq!(strategy, "configmap"),
//!     DispatchOutcome::Unhandled => unreachable!(),
//! }
//! ```

use std::collections::HashMap;

use chartgen_core::{Resource, ResourceTypeKey, Value};

use crate::dependency::dedup_edges;
use crate::error::{ExtractError, Result};
use crate::strategy::{ExtractContext, ExtractResult, ExtractionStrategy, StrategyOutcome};

/// Result of dispatching one resource
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A strategy handled the resource
    Handled {
        /// Name of the winning strategy
        strategy: String,
        result: ExtractResult,
    },
    /// No registered strategy accepted the resource
    Unhandled,
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    pub fn into_result(self) -> Option<ExtractResult> {
        match self {
            Self::Handled { result, .. } => Some(result),
            Self::Unhandled => None,
        }
    }
}

struct Entry {
    strategy: Box<dyn ExtractionStrategy>,
    priority: i32,
}

/// Collects strategies before any resource is processed
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy for every type it supports
    pub fn register(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.add(Box::new(strategy));
        self
    }

    /// Register an already boxed strategy
    pub fn add(&mut self, strategy: Box<dyn ExtractionStrategy>) {
        let priority = strategy.priority();
        self.entries.push(Entry { strategy, priority });
    }

    /// Freeze the registry. Candidate lists are ordered once here.
    pub fn build(self) -> Registry {
        let mut by_type: HashMap<ResourceTypeKey, Vec<usize>> = HashMap::new();

        for (index, entry) in self.entries.iter().enumerate() {
            for type_key in entry.strategy.supported_types() {
                let candidates = by_type.entry(type_key).or_default();
                if !candidates.contains(&index) {
                    candidates.push(index);
                }
            }
        }

        // stable sort: equal priorities keep registration order
        for candidates in by_type.values_mut() {
            candidates.sort_by(|a, b| self.entries[*b].priority.cmp(&self.entries[*a].priority));
        }

        Registry {
            entries: self.entries,
            by_type,
        }
    }
}

/// Read-only strategy registry
///
/// Safe to share between threads once built.
pub struct Registry {
    entries: Vec<Entry>,
    by_type: HashMap<ResourceTypeKey, Vec<usize>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field(
                "strategies",
                &self
                    .entries
                    .iter()
                    .map(|e| (e.strategy.name(), e.priority))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Number of registered strategies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the candidates for a type, in the order they are tried
    pub fn candidates(&self, type_key: &ResourceTypeKey) -> Vec<&str> {
        self.candidate_strategies(type_key)
            .into_iter()
            .map(|strategy| strategy.name())
            .collect()
    }

    /// Types with at least one registered strategy
    pub fn supported_types(&self) -> Vec<&ResourceTypeKey> {
        let mut types: Vec<&ResourceTypeKey> = self.by_type.keys().collect();
        types.sort();
        types
    }

    fn candidate_strategies(&self, type_key: &ResourceTypeKey) -> Vec<&dyn ExtractionStrategy> {
        self.by_type
            .get(type_key)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&index| self.entries[index].strategy.as_ref())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Dispatch a decoded document.
    ///
    /// A document without a valid identity block is rejected before any
    /// strategy runs.
    pub fn dispatch(&self, ctx: &mut ExtractContext<'_>, document: &Value) -> Result<DispatchOutcome> {
        let resource = Resource::from_value(document.clone()).map_err(ExtractError::InvalidDocument)?;
        self.dispatch_resource(ctx, &resource)
    }

    /// Dispatch an already parsed resource
    pub fn dispatch_resource(
        &self,
        ctx: &mut ExtractContext<'_>,
        resource: &Resource,
    ) -> Result<DispatchOutcome> {
        let key = resource.key();

        for strategy in self.candidate_strategies(resource.type_key()) {
            // files from a declining candidate are not attributed to the winner
            ctx.take_externalized();

            let outcome = strategy.process(ctx, resource).map_err(|err| {
                tracing::debug!(strategy = strategy.name(), resource = %key, error = %err, "strategy failed");
                err.in_resource(&key)
            })?;

            match outcome {
                StrategyOutcome::Handled(mut result) => {
                    tracing::debug!(strategy = strategy.name(), resource = %key, "resource handled");
                    result.dependencies = dedup_edges(std::mem::take(&mut result.dependencies));
                    for path in ctx.take_externalized() {
                        if !result.external_files.contains(&path) {
                            result.external_files.push(path);
                        }
                    }
                    return Ok(DispatchOutcome::Handled {
                        strategy: strategy.name().to_string(),
                        result,
                    });
                }
                StrategyOutcome::NotApplicable => {
                    tracing::trace!(strategy = strategy.name(), resource = %key, "strategy declined");
                }
            }
        }

        tracing::debug!(resource = %key, "no strategy handled resource");
        Ok(DispatchOutcome::Unhandled)
    }
}
