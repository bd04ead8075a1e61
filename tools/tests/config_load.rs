use std::fs;
use std::path::PathBuf;

use corpus_dataset::FrameGeometry;
use corpus_tools::ToolConfig;

#[test]
fn missing_file_yields_none() {
    let tmp = tempfile::tempdir().expect("tempdir");
    assert!(ToolConfig::from_path(&tmp.path().join("absent.toml")).is_none());
}

#[test]
fn loads_minimal_config() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("corpus-tools.toml");
    fs::write(&path, "corpora_root = \"/data/corpora\"\n").expect("write temp config");
    let cfg = ToolConfig::from_path(&path).expect("load config");
    assert_eq!(cfg.corpora_root, PathBuf::from("/data/corpora"));
    assert_eq!(cfg.anchor_factor, 40);
    assert_eq!(cfg.batch_size, 1);
    assert_eq!(cfg.annotation_ext, ".txt");
}

#[test]
fn sections_feed_the_manager_config() {
    let cfg = ToolConfig::from_toml(
        r#"
downsample_correction = 2.0
annotation_ext = ".ann"

[anchors]
factor = 20
frame_width = 640
frame_height = 360

[batching]
batch_size = 8
"#,
    )
    .expect("parse config");
    assert_eq!(cfg.downsample_correction, 2.0);
    assert_eq!(cfg.annotation_ext, ".ann");
    let mc = cfg.manager_config();
    assert_eq!(mc.anchor_factor, 20);
    assert_eq!(mc.batch_size, 8);
    assert_eq!(mc.geometry, FrameGeometry::new(640, 360));
}

#[test]
fn invalid_toml_is_rejected() {
    assert!(ToolConfig::from_toml("anchors = [").is_none());
}

#[test]
fn home_prefix_expands() {
    let Ok(home) = std::env::var("HOME") else {
        return;
    };
    let cfg = ToolConfig::from_toml("corpora_root = \"~/corpora\"").expect("parse config");
    assert_eq!(cfg.corpora_root, PathBuf::from(format!("{home}/corpora")));
}
