use data_contracts::{CorpusManifest, CorpusManifestSchemaVersion, ManifestError};

#[test]
fn empty_name_rejected() {
    let manifest = CorpusManifest::new("  ", "corpora");
    assert_eq!(manifest.validate().unwrap_err(), ManifestError::EmptyName);
}

#[test]
fn separator_in_name_rejected() {
    let manifest = CorpusManifest::new("a/b", "corpora");
    assert!(matches!(
        manifest.validate(),
        Err(ManifestError::InvalidName(_))
    ));
}

#[test]
fn missing_compiled_flag_defaults_to_false() {
    let raw = r#"{"schema_version":"V1","name":"1-1-1","savedir":"corpora"}"#;
    let manifest: CorpusManifest = serde_json::from_str(raw).unwrap();
    assert_eq!(manifest.schema_version, CorpusManifestSchemaVersion::V1);
    assert!(!manifest.compiled);
    assert!(manifest.validate().is_ok());
}
