use std::path::{Path, PathBuf};

use corpus_dataset::{FrameGeometry, ManagerConfig};
use serde::Deserialize;
use tracing::warn;

const DEFAULT_CONFIG_NAME: &str = "corpus-tools.toml";
const CONFIG_ENV: &str = "CORPUS_TOOLS_CONFIG";

#[derive(Debug, Clone, PartialEq)]
pub struct ToolConfig {
    /// Where new corpora are created when `--savedir` is not given.
    pub corpora_root: PathBuf,
    pub anchor_factor: u32,
    pub batch_size: usize,
    pub frame_width: u32,
    pub frame_height: u32,
    pub downsample_correction: f64,
    /// Appended to a frame-set directory name to find its annotation file.
    pub annotation_ext: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let defaults = ManagerConfig::default();
        Self {
            corpora_root: PathBuf::from("corpora"),
            anchor_factor: defaults.anchor_factor,
            batch_size: defaults.batch_size,
            frame_width: defaults.geometry.width,
            frame_height: defaults.geometry.height,
            downsample_correction: 1.0,
            annotation_ext: ".txt".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ToolConfigFile {
    corpora_root: Option<String>,
    annotation_ext: Option<String>,
    downsample_correction: Option<f64>,
    anchors: Option<AnchorSection>,
    batching: Option<BatchSection>,
}

#[derive(Debug, Deserialize, Default)]
struct AnchorSection {
    factor: Option<u32>,
    frame_width: Option<u32>,
    frame_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct BatchSection {
    batch_size: Option<usize>,
}

impl ToolConfig {
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let cfg = Self::from_path(Path::new(&path)).unwrap_or_default();
            cfg.warn_if_invalid();
            return cfg;
        }
        let cfg = Self::from_path(Path::new(DEFAULT_CONFIG_NAME)).unwrap_or_default();
        cfg.warn_if_invalid();
        cfg
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let raw = std::fs::read_to_string(path).ok()?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Option<Self> {
        let file: ToolConfigFile = toml::from_str(raw).ok()?;
        Some(Self::from_file(file))
    }

    fn from_file(file: ToolConfigFile) -> Self {
        let defaults = Self::default();
        let anchors = file.anchors.unwrap_or_default();
        ToolConfig {
            corpora_root: file
                .corpora_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.corpora_root),
            anchor_factor: anchors.factor.unwrap_or(defaults.anchor_factor),
            batch_size: file
                .batching
                .and_then(|b| b.batch_size)
                .unwrap_or(defaults.batch_size),
            frame_width: anchors.frame_width.unwrap_or(defaults.frame_width),
            frame_height: anchors.frame_height.unwrap_or(defaults.frame_height),
            downsample_correction: file
                .downsample_correction
                .unwrap_or(defaults.downsample_correction),
            annotation_ext: file
                .annotation_ext
                .filter(|e| !e.trim().is_empty())
                .unwrap_or(defaults.annotation_ext),
        }
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            anchor_factor: self.anchor_factor,
            batch_size: self.batch_size,
            geometry: FrameGeometry::new(self.frame_width, self.frame_height),
        }
    }

    fn warn_if_invalid(&self) {
        if self.anchor_factor == 0 {
            warn!("tools config: anchors.factor is 0; compile will be rejected");
        }
        if self.batch_size == 0 {
            warn!("tools config: batching.batch_size is 0; batching will be rejected");
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            warn!("tools config: frame size has a zero side; the anchor grid collapses");
        }
        if self.downsample_correction == 0.0 || !self.downsample_correction.is_finite() {
            warn!("tools config: downsample_correction must be a non-zero number");
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match std::env::var(key) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&format!("${{{key}}}")),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_variables_are_left_in_place() {
        assert_eq!(
            expand_env("a/${CORPUS_TOOLS_SURELY_UNSET_VAR}/b"),
            "a/${CORPUS_TOOLS_SURELY_UNSET_VAR}/b"
        );
        assert_eq!(expand_env("plain/${unterminated"), "plain/${unterminated");
    }

    #[test]
    fn known_variables_expand() {
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env("${PATH}/x"), format!("{path}/x"));
    }
}
