//! Persistent, re-openable corpus: ground truths, meta and per-frame pixels.

use crate::dense::DenseFrames;
use crate::frame_store::{FrameImage, FrameStore};
use crate::natural::natural_sort_paths;
use crate::persist::{load_manifest, read_json, save_manifest, write_json_atomic};
use crate::types::{log_every_from_env, CorpusError, CorpusResult, LoadReport};
use data_contracts::{AnnotationRecord, BoundingBox, CorpusManifest, MetaValue};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CORPUS_EXT: &str = "corpus";
const DATA_DIR: &str = "data";
const INPUTS_DIR: &str = "inputs";
const TRUTHS_FILE: &str = "truths.json";
const META_FILE: &str = "meta.json";
pub(crate) const ANCHORED_FILE: &str = "anchored_truths.json";

/// Frame index -> boxes annotated in that frame.
pub type GroundTruths = DenseFrames<BoundingBox>;
/// Frame index -> trailing annotation fields, one entry per box.
pub type FrameMeta = DenseFrames<Vec<MetaValue>>;

#[derive(Debug, Clone)]
pub struct Corpus {
    name: String,
    savedir: PathBuf,
    root: PathBuf,
    truths: GroundTruths,
    meta: FrameMeta,
    store: FrameStore,
}

impl Corpus {
    /// Create an empty corpus at `<savedir>/<name>.corpus`. The directory
    /// layout, manifest and empty truth/meta snapshots are written immediately.
    ///
    /// A random 8-character name is used when `name` is `None`. Fails if a
    /// corpus already exists at the target path.
    pub fn create(savedir: impl AsRef<Path>, name: Option<&str>) -> CorpusResult<Self> {
        let savedir = savedir.as_ref();
        let name = match name {
            Some(n) => n.to_string(),
            None => generated_name(),
        };
        let manifest = CorpusManifest::new(name.clone(), savedir);
        let root = savedir.join(format!("{name}.{CORPUS_EXT}"));
        let manifest_path = root.join(crate::persist::MANIFEST_FILE);
        manifest
            .validate()
            .map_err(|e| CorpusError::Manifest {
                path: manifest_path.clone(),
                source: e,
            })?;
        if manifest_path.exists() {
            return Err(CorpusError::Io {
                path: manifest_path,
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "corpus already exists; use Corpus::open",
                ),
            });
        }

        let inputs = root.join(DATA_DIR).join(INPUTS_DIR);
        fs::create_dir_all(&inputs).map_err(|e| CorpusError::Io {
            path: inputs.clone(),
            source: e,
        })?;
        save_manifest(&root, &manifest)?;

        let corpus = Self {
            name,
            savedir: savedir.to_path_buf(),
            store: FrameStore::new(inputs),
            root,
            truths: GroundTruths::new(),
            meta: FrameMeta::new(),
        };
        corpus.save_truths()?;
        info!(name = %corpus.name, root = %corpus.root.display(), "created corpus");
        Ok(corpus)
    }

    /// Reopen a corpus directory written by [`Corpus::create`]. Pixel data
    /// stays on disk and is read per frame.
    pub fn open(root: impl AsRef<Path>) -> CorpusResult<Self> {
        let root = root.as_ref().to_path_buf();
        let manifest = load_manifest(&root)?;
        let data = root.join(DATA_DIR);
        let truths: GroundTruths = read_json(&data.join(TRUTHS_FILE))?;
        let meta: FrameMeta = read_json(&data.join(META_FILE))?;
        let inputs = data.join(INPUTS_DIR);
        if !inputs.is_dir() {
            return Err(CorpusError::NotFound { path: inputs });
        }
        info!(
            name = %manifest.name,
            frames = truths.len(),
            compiled = manifest.compiled,
            "opened corpus"
        );
        Ok(Self {
            name: manifest.name,
            savedir: manifest.savedir,
            root,
            truths,
            meta,
            store: FrameStore::new(inputs),
        })
    }

    /// Ingest one frame sequence.
    ///
    /// Every annotation line is parsed before anything is applied, so a
    /// malformed line leaves the corpus untouched. Boxes and meta are appended
    /// to their frame, growing both lists densely, and both snapshots are then
    /// rewritten wholesale. Images are decoded in natural file-name order and
    /// stored under consecutive keys.
    ///
    /// Both images and annotation frames are offset by one base: the larger of
    /// the ground-truth frame count and the next free image key (0 on a fresh
    /// corpus). A sequence therefore never adds boxes to an earlier sequence's
    /// frames; if the earlier one annotated more frames than it had images,
    /// the missing keys read back as `FrameNotFound`.
    ///
    /// The stored key is the listing position, not the annotation frame index;
    /// the two only line up when file names and frame numbers do. A decode
    /// failure stops the call with earlier frames already written.
    pub fn load_dir(
        &mut self,
        images_dir: impl AsRef<Path>,
        annotation_path: impl AsRef<Path>,
        downsample_correction: f64,
    ) -> CorpusResult<LoadReport> {
        let images_dir = images_dir.as_ref();
        let annotation_path = annotation_path.as_ref();
        let first_key = self.truths.len().max(self.store.next_key()?);

        let records = parse_annotations(annotation_path, downsample_correction)?;
        for rec in &records {
            let frame = first_key + rec.frame;
            self.truths.push(frame, rec.bbox);
            self.meta.push(frame, rec.meta.clone());
        }
        self.save_truths()?;
        info!(
            annotations = records.len(),
            frames = self.truths.len(),
            path = %annotation_path.display(),
            "loaded ground truths"
        );

        let images = list_images(images_dir)?;
        let log_every = log_every_from_env();
        for (i, path) in images.iter().enumerate() {
            let img = image::open(path)
                .map_err(|e| CorpusError::Image {
                    path: path.clone(),
                    source: e,
                })?
                .to_rgb8();
            let key = first_key + i;
            self.store.write(key, &FrameImage::from_rgb(img))?;
            if log_every.is_some_and(|n| (i + 1) % n == 0) {
                debug!(stored = i + 1, total = images.len(), "storing frames");
            }
        }
        info!(
            images = images.len(),
            first_key,
            dir = %images_dir.display(),
            "stored frames"
        );

        let stored = first_key + images.len();
        if stored != self.truths.len() {
            warn!(
                next_image_key = stored,
                frames = self.truths.len(),
                "image count differs from ground-truth frame count; frames are matched by key"
            );
        }

        Ok(LoadReport {
            annotations: records.len(),
            frames: self.truths.len(),
            images: images.len(),
            first_key,
        })
    }

    /// Ingest several sequences: each sub-directory of `imagedirs_root`, in
    /// natural order, paired with `<truths_root>/<sub-directory name><ext>`.
    pub fn load_dirs(
        &mut self,
        imagedirs_root: impl AsRef<Path>,
        truths_root: impl AsRef<Path>,
        ext: &str,
        downsample_correction: f64,
    ) -> CorpusResult<Vec<LoadReport>> {
        let imagedirs_root = imagedirs_root.as_ref();
        let truths_root = truths_root.as_ref();
        let mut dirs: Vec<PathBuf> = fs::read_dir(imagedirs_root)
            .map_err(|e| CorpusError::io(imagedirs_root, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_dir())
            .collect();
        natural_sort_paths(&mut dirs);

        let mut reports = Vec::with_capacity(dirs.len());
        for (i, dir) in dirs.iter().enumerate() {
            let Some(stem) = dir.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            info!(set = i + 1, of = dirs.len(), dir = %dir.display(), "loading frame set");
            let annotation = truths_root.join(format!("{stem}{ext}"));
            reports.push(self.load_dir(dir, annotation, downsample_correction)?);
        }
        Ok(reports)
    }

    /// Lazy pass over every stored frame in key order. Each call re-lists the
    /// store; each item is read from disk when pulled.
    pub fn images(&self) -> CorpusResult<FrameIter> {
        Ok(FrameIter {
            store: self.store.clone(),
            keys: self.store.keys()?,
            cursor: 0,
        })
    }

    /// Pixels stored under `key`.
    pub fn images_by_index(&self, key: usize) -> CorpusResult<FrameImage> {
        self.store.read(key)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `savedir` argument the corpus was created with.
    pub fn savedir(&self) -> &Path {
        &self.savedir
    }

    /// The corpus directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ground_truths(&self) -> &GroundTruths {
        &self.truths
    }

    pub fn meta(&self) -> &FrameMeta {
        &self.meta
    }

    /// Number of ground-truth frames, including frames without boxes.
    pub fn frame_count(&self) -> usize {
        self.truths.len()
    }

    /// Number of stored pixel frames.
    pub fn image_count(&self) -> CorpusResult<usize> {
        Ok(self.store.keys()?.len())
    }

    /// Fresh read of the manifest from disk.
    pub fn manifest(&self) -> CorpusResult<CorpusManifest> {
        load_manifest(&self.root)
    }

    pub(crate) fn anchored_path(&self) -> PathBuf {
        self.root.join(DATA_DIR).join(ANCHORED_FILE)
    }

    fn save_truths(&self) -> CorpusResult<()> {
        let data = self.root.join(DATA_DIR);
        write_json_atomic(&data.join(META_FILE), &self.meta)?;
        write_json_atomic(&data.join(TRUTHS_FILE), &self.truths)
    }
}

/// Restartable-by-construction iterator over stored frames.
pub struct FrameIter {
    store: FrameStore,
    keys: Vec<usize>,
    cursor: usize,
}

impl FrameIter {
    pub fn keys(&self) -> &[usize] {
        &self.keys
    }
}

impl Iterator for FrameIter {
    type Item = CorpusResult<FrameImage>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = *self.keys.get(self.cursor)?;
        self.cursor += 1;
        Some(self.store.read(key))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.keys.len() - self.cursor;
        (left, Some(left))
    }
}

impl ExactSizeIterator for FrameIter {}

fn generated_name() -> String {
    let id = uuid::Uuid::new_v4().to_string();
    id[id.len() - 8..].to_string()
}

fn parse_annotations(
    path: &Path,
    downsample_correction: f64,
) -> CorpusResult<Vec<AnnotationRecord>> {
    let raw = fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    let mut records = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let parsed = AnnotationRecord::parse_line(line, downsample_correction).map_err(|e| {
            CorpusError::MalformedAnnotation {
                path: path.to_path_buf(),
                line: i + 1,
                source: e,
            }
        })?;
        if let Some(rec) = parsed {
            records.push(rec);
        }
    }
    Ok(records)
}

fn list_images(dir: &Path) -> CorpusResult<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| CorpusError::io(dir, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .collect();
    natural_sort_paths(&mut paths);
    Ok(paths)
}
