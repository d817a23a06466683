//! Chartgen Core - Core types for converting cluster manifests into chart artifacts
//!
//! This crate provides the foundational types used throughout chartgen:
//! - `Value`: Decoded document values as a tagged union (int and float kept apart)
//! - `Resource`: A decoded document with its identity parsed out
//! - `ResourceTypeKey` / `ResourceKey`: Type and instance identities
//! - `GeneratorConfig`: Settings of a generation run
//! - `manifest`: Multi-document YAML loading

pub mod config;
pub mod error;
pub mod manifest;
pub mod resource;
pub mod value;

pub use config::GeneratorConfig;
pub use error::{CoreError, Result};
pub use resource::{Metadata, Resource, ResourceKey, ResourceTypeKey};
pub use value::{Mapping, Value};
