//! Persistent annotated-frame corpora and anchor-grid batching.
//!
//! This crate provides utilities for:
//! - Ingesting image sequences and their annotation files into a re-openable corpus
//! - Assigning ground-truth boxes to a fixed anchor lattice
//! - Batch-indexed access to stacked frames and per-anchor targets
//! - Alignment and anchor-collision checks
//! - Burn tensor conversion (behind `burn-runtime`)

// Module declarations
pub mod anchors;
pub mod batch;
pub mod corpus;
pub mod dense;
pub mod frame_store;
pub mod manager;
pub mod natural;
pub mod persist;
pub mod types;
pub mod validation;

// Re-export public API
pub use anchors::{anchor_count, anchors, nearest_anchor, AnchorGrid, AnchorPoint};
pub use batch::{regroup_anchor_major, BatchIter, CorpusBatch};
pub use corpus::{Corpus, FrameIter, FrameMeta, GroundTruths, CORPUS_EXT};
pub use dense::DenseFrames;
pub use frame_store::{FrameImage, FrameStore};
pub use manager::{build_template, CompiledOutput, CorpusManager};
pub use types::*;
pub use validation::{summarize_corpus, summarize_with_thresholds, validate_summary};

pub use data_contracts::{AnnotationRecord, BoundingBox, CorpusManifest, MetaValue};

#[cfg(feature = "burn-runtime")]
pub use batch::BurnBatch;
