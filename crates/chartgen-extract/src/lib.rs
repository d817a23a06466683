//! Chartgen Extract - turn decoded cluster resources into chart artifacts
//!
//! This crate holds the extraction pipeline of chartgen:
//!
//! | Stage        | Module          | Output                                      |
//! |--------------|-----------------|---------------------------------------------|
//! | Classify     | [`classifier`]  | plain text, JSON, XML or binary             |
//! | Process      | [`processor`]   | formatted content, checksum, external path  |
//! | Accumulate   | [`accumulator`] | deduplicated external files for the run     |
//! | Dispatch     | [`registry`]    | first strategy willing to handle a resource |
//! | Extract      | [`strategies`]  | template, values subtree, dependency edges  |
//!
//! # Example
//!
//! ```rust
//! use chartgen_core::{GeneratorConfig, manifest::parse_documents};
//! use chartgen_extract::Generator;
//!
//! let documents = parse_documents(
//!     "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: app\ndata:\n  greeting: hello\n",
//! ).unwrap();
//!
//! let report = Generator::new(GeneratorConfig::default()).run(documents).unwrap();
//!
//! assert_eq!(report.handled.len(), 1);
//! assert_eq!(report.handled[0].strategy, "configmap");
//! assert!(report.files.is_empty());
//! ```

pub mod accumulator;
pub mod classifier;
pub mod dependency;
pub mod error;
pub mod generator;
pub mod processor;
pub mod registry;
pub mod strategies;
pub mod strategy;

// Re-exports
pub use accumulator::{AddOutcome, ExternalFile, ExternalFileAccumulator, FileSummary, SharedAccumulator};
pub use classifier::{ValueKind, classify};
pub use error::{ExtractError, Result};
pub use generator::{GenerationReport, Generator, HandledResource};
pub use processor::{ProcessedValue, ValueProcessor};
pub use registry::{DispatchOutcome, Registry, RegistryBuilder};
pub use strategies::default_registry;
pub use strategy::{ExtractContext, ExtractResult, ExtractedValue, ExtractionStrategy, StrategyOutcome};
