//! Core types, error definitions, and data structures for corpus_dataset.

use data_contracts::{AnnotationError, ManifestError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type CorpusResult<T> = Result<T, CorpusError>;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("not found: {path}")]
    NotFound { path: PathBuf },
    #[error("frame {key} was never ingested ({path})")]
    FrameNotFound { key: usize, path: PathBuf },
    #[error("bad frame file {path}: {msg}")]
    FrameFormat { path: PathBuf, msg: String },
    #[error("malformed annotation at {path}:{line}: {source}")]
    MalformedAnnotation {
        path: PathBuf,
        line: usize,
        #[source]
        source: AnnotationError,
    },
    #[error("invalid manifest at {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },
    #[error("corpus at {path} has already been compiled")]
    AlreadyCompiled { path: PathBuf },
    #[error("corpus is not compiled yet; call CorpusManager::compile() first")]
    NotCompiledYet,
    #[error("batch {index} out of range ({count} batches)")]
    BatchOutOfRange { index: usize, count: usize },
    #[error("shape mismatch: {msg}")]
    ShapeMismatch { msg: String },
    #[error("anchor factor must be greater than zero")]
    InvalidAnchorFactor,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Other(String),
}

impl CorpusError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            CorpusError::NotFound { path }
        } else {
            CorpusError::Io { path, source }
        }
    }
}

/// Frame dimensions the anchor grid spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

/// `[x1, y1, x2, y2, presence]` for one anchor of one frame.
pub type AnchorSlot = [i64; 5];
/// Value of an anchor slot no box was assigned to.
pub const EMPTY_SLOT: AnchorSlot = [0; 5];
/// One slot per anchor, in grid order.
pub type AnchorTemplate = Vec<AnchorSlot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Anchor grid spacing in pixels. Ignored when the corpus is already compiled.
    pub anchor_factor: u32,
    pub batch_size: usize,
    /// Grid extent used by `compile`. Ignored when the corpus is already compiled.
    pub geometry: FrameGeometry,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            anchor_factor: 40,
            batch_size: 1,
            geometry: FrameGeometry::default(),
        }
    }
}

/// Outcome of one `Corpus::load_dir` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Annotation lines parsed (blank lines excluded).
    pub annotations: usize,
    /// Ground-truth frames held after the call.
    pub frames: usize,
    /// Images written by this call.
    pub images: usize,
    /// Key assigned to the first image written by this call.
    pub first_key: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub frames: usize,
    pub empty_frames: usize,
    pub boxes: usize,
    pub images: usize,
    /// Ground-truth frames with no stored image under the same key.
    pub frames_without_image: usize,
    /// Stored images whose key has no ground-truth frame.
    pub images_without_frame: usize,
    /// Boxes lost because a later box in the same frame took the same anchor.
    pub anchor_collisions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Pass,
    Warn,
    Fail,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationThresholds {
    /// Max frames/images without a counterpart under the same key.
    pub max_misaligned: Option<usize>,
    pub max_collisions: Option<usize>,
    pub max_empty_ratio: Option<f32>,
}

impl ValidationThresholds {
    pub fn from_env() -> Self {
        fn parse_usize(key: &str) -> Option<usize> {
            std::env::var(key).ok()?.parse().ok()
        }
        fn parse_ratio(key: &str) -> Option<f32> {
            std::env::var(key).ok()?.parse().ok()
        }
        ValidationThresholds {
            max_misaligned: parse_usize("CORPUS_MAX_MISALIGNED"),
            max_collisions: parse_usize("CORPUS_MAX_COLLISIONS"),
            max_empty_ratio: parse_ratio("CORPUS_MAX_EMPTY_RATIO"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: CorpusSummary,
}

pub(crate) const DEFAULT_LOG_EVERY: usize = 1000;

/// Progress logging interval from `CORPUS_LOG_EVERY`; `0` or `off` disables it.
pub(crate) fn log_every_from_env() -> Option<usize> {
    match std::env::var("CORPUS_LOG_EVERY") {
        Ok(val) => {
            if val.eq_ignore_ascii_case("off") || val.trim() == "0" {
                None
            } else {
                val.trim().parse::<usize>().ok().filter(|v| *v > 0)
            }
        }
        Err(_) => Some(DEFAULT_LOG_EVERY),
    }
}
