//! JSON snapshots and atomic replace-on-write.

use crate::types::{CorpusError, CorpusResult};
use data_contracts::CorpusManifest;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";

pub fn read_json<T: DeserializeOwned>(path: &Path) -> CorpusResult<T> {
    let raw = fs::read(path).map_err(|e| CorpusError::io(path, e))?;
    serde_json::from_slice(&raw).map_err(|e| CorpusError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Serialize into a temporary file next to `path`, then rename it over `path`.
/// Readers see either the previous or the new contents, never a partial write.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> CorpusResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| CorpusError::io(parent, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, value).map_err(|e| CorpusError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        writer.flush().map_err(|e| CorpusError::io(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| CorpusError::io(path, e))?;
    tmp.persist(path).map_err(|e| CorpusError::io(path, e.error))?;
    Ok(())
}

pub fn load_manifest(root: &Path) -> CorpusResult<CorpusManifest> {
    let path = root.join(MANIFEST_FILE);
    let manifest: CorpusManifest = read_json(&path)?;
    manifest.validate().map_err(|e| CorpusError::Manifest { path, source: e })?;
    Ok(manifest)
}

pub fn save_manifest(root: &Path, manifest: &CorpusManifest) -> CorpusResult<()> {
    let path = root.join(MANIFEST_FILE);
    manifest
        .validate()
        .map_err(|e| CorpusError::Manifest {
            path: path.clone(),
            source: e,
        })?;
    write_json_atomic(&path, manifest)
}

/// Read-modify-write of the manifest. Single writer assumed.
pub fn update_manifest<F>(root: &Path, f: F) -> CorpusResult<CorpusManifest>
where
    F: FnOnce(&mut CorpusManifest),
{
    let mut manifest = load_manifest(root)?;
    f(&mut manifest);
    save_manifest(root, &manifest)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&path, &vec![4]).unwrap();
        let back: Vec<i32> = read_json(&path).unwrap();
        assert_eq!(back, vec![4]);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<Vec<i32>>(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CorpusError::NotFound { .. }));
    }

    #[test]
    fn update_flips_compiled_flag() {
        let dir = tempfile::tempdir().unwrap();
        save_manifest(dir.path(), &CorpusManifest::new("c", "out")).unwrap();
        let updated = update_manifest(dir.path(), |m| m.compiled = true).unwrap();
        assert!(updated.compiled);
        assert!(load_manifest(dir.path()).unwrap().compiled);
    }
}
