//! Shared data contracts for annotation lines and corpus manifests.

pub mod annotation;
pub mod manifest;

pub use annotation::{AnnotationError, AnnotationRecord, BoundingBox, MetaValue};
pub use manifest::{CorpusManifest, CorpusManifestSchemaVersion, ManifestError};
