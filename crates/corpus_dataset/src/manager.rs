//! Anchor compilation and batch-indexed access over a [`Corpus`].

use crate::anchors::{anchor_count, AnchorGrid};
use crate::batch::{regroup_anchor_major, BatchIter, CorpusBatch};
use crate::corpus::{Corpus, GroundTruths};
use crate::frame_store::FrameImage;
use crate::persist::{read_json, update_manifest, write_json_atomic};
use crate::types::{
    log_every_from_env, AnchorTemplate, CorpusError, CorpusResult, FrameGeometry, ManagerConfig,
    EMPTY_SLOT,
};
use data_contracts::BoundingBox;
use ndarray::{Array2, Array3, Array4};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Persisted result of [`CorpusManager::compile`]: one template per
/// ground-truth frame plus the grid parameters that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledOutput {
    pub anchor_factor: u32,
    pub geometry: FrameGeometry,
    pub templates: Vec<AnchorTemplate>,
}

impl CompiledOutput {
    pub fn frames(&self) -> usize {
        self.templates.len()
    }
}

/// Template for one frame: each box lands in the slot of its nearest anchor.
///
/// Lossy: when several boxes of the frame share an anchor, the last one in
/// annotation order wins and the others are dropped.
pub fn build_template(frame: &[BoundingBox], grid: &AnchorGrid) -> AnchorTemplate {
    let mut template = vec![EMPTY_SLOT; grid.len()];
    for bbox in frame {
        template[grid.assign(bbox)] = bbox.to_slot();
    }
    template
}

pub fn compile_templates(truths: &GroundTruths, grid: &AnchorGrid) -> Vec<AnchorTemplate> {
    let log_every = log_every_from_env();
    truths
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            if log_every.is_some_and(|n| (i + 1) % n == 0) {
                debug!(compiled = i + 1, total = truths.len(), "compiling frames");
            }
            build_template(frame, grid)
        })
        .collect()
}

/// Batch view over a corpus. Owns the compiled anchor templates; the corpus
/// itself is only read, apart from the manifest's compiled flag.
#[derive(Debug)]
pub struct CorpusManager<'c> {
    corpus: &'c Corpus,
    anchor_factor: u32,
    geometry: FrameGeometry,
    batch_size: usize,
    compiled: Option<CompiledOutput>,
}

impl<'c> CorpusManager<'c> {
    /// Bind to `corpus`. If the corpus was compiled before, the persisted
    /// templates are loaded and their anchor factor and geometry replace the
    /// ones in `cfg`.
    pub fn new(corpus: &'c Corpus, cfg: ManagerConfig) -> CorpusResult<Self> {
        if cfg.batch_size == 0 {
            return Err(CorpusError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }
        let manifest = corpus.manifest()?;
        if manifest.compiled {
            let compiled: CompiledOutput = read_json(&corpus.anchored_path())?;
            if compiled.anchor_factor != cfg.anchor_factor {
                debug!(
                    requested = cfg.anchor_factor,
                    persisted = compiled.anchor_factor,
                    "using persisted anchor factor"
                );
            }
            info!(
                corpus = corpus.name(),
                frames = compiled.frames(),
                anchor_factor = compiled.anchor_factor,
                "loaded compiled anchors"
            );
            return Ok(Self {
                corpus,
                anchor_factor: compiled.anchor_factor,
                geometry: compiled.geometry,
                batch_size: cfg.batch_size,
                compiled: Some(compiled),
            });
        }
        if cfg.anchor_factor == 0 {
            return Err(CorpusError::InvalidAnchorFactor);
        }
        Ok(Self {
            corpus,
            anchor_factor: cfg.anchor_factor,
            geometry: cfg.geometry,
            batch_size: cfg.batch_size,
            compiled: None,
        })
    }

    /// Assign every ground-truth box to its anchor, persist the templates and
    /// mark the corpus compiled. One-shot: fails with `AlreadyCompiled` if the
    /// corpus is compiled, leaving the existing output untouched.
    ///
    /// The templates are written before the manifest flag, and the flag is the
    /// commit point. If flagging fails, the returned error leaves an unflagged
    /// `anchored_truths.json` behind; it is never read, and the next `compile`
    /// overwrites it.
    pub fn compile(&mut self) -> CorpusResult<&CompiledOutput> {
        if self.compiled.is_some() || self.corpus.manifest()?.compiled {
            return Err(CorpusError::AlreadyCompiled {
                path: self.corpus.root().to_path_buf(),
            });
        }
        let grid = self.anchor_grid()?;
        info!(
            corpus = self.corpus.name(),
            frames = self.corpus.frame_count(),
            anchors = grid.len(),
            anchor_factor = self.anchor_factor,
            "compiling anchors"
        );
        let output = CompiledOutput {
            anchor_factor: self.anchor_factor,
            geometry: self.geometry,
            templates: compile_templates(self.corpus.ground_truths(), &grid),
        };
        let anchored = self.corpus.anchored_path();
        write_json_atomic(&anchored, &output)?;
        if let Err(e) = update_manifest(self.corpus.root(), |m| m.compiled = true) {
            warn!(
                path = %anchored.display(),
                error = %e,
                "compiled templates written but corpus not flagged; compile again"
            );
            return Err(e);
        }
        info!(frames = output.frames(), "compiled anchors");
        Ok(&*self.compiled.insert(output))
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    pub fn compiled(&self) -> Option<&CompiledOutput> {
        self.compiled.as_ref()
    }

    pub fn corpus(&self) -> &'c Corpus {
        self.corpus
    }

    pub fn anchor_factor(&self) -> u32 {
        self.anchor_factor
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn anchor_grid(&self) -> CorpusResult<AnchorGrid> {
        AnchorGrid::new(self.geometry, self.anchor_factor)
    }

    pub fn anchor_count(&self) -> usize {
        anchor_count(self.geometry, self.anchor_factor)
    }

    /// Frames covered by batches: compiled templates once compiled, otherwise
    /// the ground-truth frames `compile` would turn into templates.
    pub fn frame_count(&self) -> usize {
        match &self.compiled {
            Some(c) => c.frames(),
            None => self.corpus.frame_count(),
        }
    }

    /// Whole batches available; a trailing partial batch is dropped.
    pub fn batch_count(&self) -> usize {
        self.frame_count() / self.batch_size
    }

    /// Frames `[index * batch_size, (index + 1) * batch_size)`: pixels stacked
    /// as `[batch, height, width, 3]` and targets regrouped per anchor.
    pub fn batch(&self, index: usize) -> CorpusResult<CorpusBatch> {
        let compiled = self.require_compiled()?;
        let count = self.batch_count();
        if index >= count {
            return Err(CorpusError::BatchOutOfRange { index, count });
        }
        let start = index * self.batch_size;
        let end = start + self.batch_size;

        let mut dims: Option<(u32, u32)> = None;
        let mut buf: Vec<u8> = Vec::new();
        for key in start..end {
            let frame = self.corpus.images_by_index(key)?;
            match dims {
                None => {
                    dims = Some((frame.width, frame.height));
                    buf.reserve(self.batch_size * frame.as_raw().len());
                }
                Some(d) if d != (frame.width, frame.height) => {
                    return Err(CorpusError::ShapeMismatch {
                        msg: format!(
                            "frame {key} is {}x{}, batch started at {}x{}",
                            frame.width, frame.height, d.0, d.1
                        ),
                    });
                }
                _ => {}
            }
            buf.extend_from_slice(frame.as_raw());
        }
        let (width, height) = dims.unwrap_or((self.geometry.width, self.geometry.height));
        let images = Array4::from_shape_vec(
            (self.batch_size, height as usize, width as usize, 3),
            buf,
        )
        .map_err(|e| CorpusError::ShapeMismatch { msg: e.to_string() })?;

        let targets = regroup_anchor_major(&compiled.templates[start..end], self.anchor_count())?;
        Ok(CorpusBatch {
            index,
            frames: start..end,
            images,
            targets,
        })
    }

    /// Every batch in order; calling again starts over.
    pub fn batches(&self) -> BatchIter<'_, 'c> {
        BatchIter::new(self, self.batch_count())
    }

    /// All templates as `[frames, anchors, 5]`.
    pub fn outputs(&self) -> CorpusResult<Array3<i64>> {
        let compiled = self.require_compiled()?;
        let anchors = self.anchor_count();
        let mut flat = Vec::with_capacity(compiled.frames() * anchors * 5);
        for template in &compiled.templates {
            if template.len() != anchors {
                return Err(template_len_mismatch(template.len(), anchors));
            }
            flat.extend(template.iter().flatten().copied());
        }
        Array3::from_shape_vec((compiled.frames(), anchors, 5), flat)
            .map_err(|e| CorpusError::ShapeMismatch { msg: e.to_string() })
    }

    /// Templates one frame at a time as `[anchors, 5]`.
    pub fn outputs_gen(&self) -> CorpusResult<impl Iterator<Item = Array2<i64>> + '_> {
        let compiled = self.require_compiled()?;
        Ok(compiled.templates.iter().map(|template| {
            let mut arr = Array2::zeros((template.len(), 5));
            for (a, slot) in template.iter().enumerate() {
                for (c, v) in slot.iter().enumerate() {
                    arr[[a, c]] = *v;
                }
            }
            arr
        }))
    }

    /// Every stored frame as `[frames, height, width, 3]`. Loads the whole
    /// corpus; prefer [`CorpusManager::inputs_gen`] or batches for training.
    pub fn inputs(&self) -> CorpusResult<Array4<u8>> {
        let mut dims: Option<(u32, u32)> = None;
        let mut frames = 0usize;
        let mut buf = Vec::new();
        for frame in self.corpus.images()? {
            let frame = frame?;
            match dims {
                None => dims = Some((frame.width, frame.height)),
                Some(d) if d != (frame.width, frame.height) => {
                    return Err(CorpusError::ShapeMismatch {
                        msg: "stored frames have differing sizes".into(),
                    });
                }
                _ => {}
            }
            buf.extend_from_slice(frame.as_raw());
            frames += 1;
        }
        let (width, height) = dims.unwrap_or((self.geometry.width, self.geometry.height));
        Array4::from_shape_vec((frames, height as usize, width as usize, 3), buf)
            .map_err(|e| CorpusError::ShapeMismatch { msg: e.to_string() })
    }

    /// Stored frames one at a time as `[height, width, 3]`.
    pub fn inputs_gen(&self) -> CorpusResult<impl Iterator<Item = CorpusResult<Array3<u8>>>> {
        Ok(self
            .corpus
            .images()?
            .map(|frame| frame.map(FrameImage::into_array)))
    }

    fn require_compiled(&self) -> CorpusResult<&CompiledOutput> {
        self.compiled.as_ref().ok_or(CorpusError::NotCompiledYet)
    }
}

pub(crate) fn template_len_mismatch(got: usize, expected: usize) -> CorpusError {
    CorpusError::ShapeMismatch {
        msg: format!("template has {got} slots, grid has {expected} anchors"),
    }
}
