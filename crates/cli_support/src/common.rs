use clap::Args;
use corpus_dataset::{FrameGeometry, ManagerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Existing corpus directory shared across corpus_* tooling.
#[derive(Debug, Clone, Args)]
pub struct CorpusPathArgs {
    /// Corpus directory (`<savedir>/<name>.corpus`).
    #[arg(long)]
    pub corpus: PathBuf,
}

/// Manager overrides; unset flags fall back to the tools config.
#[derive(Debug, Clone, Default, Args)]
pub struct ManagerArgs {
    /// Anchor spacing in pixels.
    #[arg(long)]
    pub anchor_factor: Option<u32>,
    /// Frames per batch.
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Frame width the anchor grid spans.
    #[arg(long)]
    pub frame_width: Option<u32>,
    /// Frame height the anchor grid spans.
    #[arg(long)]
    pub frame_height: Option<u32>,
}

impl ManagerArgs {
    /// Overlay the flags that were given on top of `base`.
    pub fn apply(&self, base: ManagerConfig) -> ManagerConfig {
        ManagerConfig {
            anchor_factor: self.anchor_factor.unwrap_or(base.anchor_factor),
            batch_size: self.batch_size.unwrap_or(base.batch_size),
            geometry: FrameGeometry::new(
                self.frame_width.unwrap_or(base.geometry.width),
                self.frame_height.unwrap_or(base.geometry.height),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flags_keep_base_values() {
        let base = ManagerConfig::default();
        assert_eq!(ManagerArgs::default().apply(base), base);
    }

    #[test]
    fn given_flags_override() {
        let args = ManagerArgs {
            anchor_factor: Some(20),
            frame_height: Some(480),
            ..Default::default()
        };
        let cfg = args.apply(ManagerConfig::default());
        assert_eq!(cfg.anchor_factor, 20);
        assert_eq!(cfg.batch_size, 1);
        assert_eq!(cfg.geometry, FrameGeometry::new(1280, 480));
    }
}
