//! Model-ready batches: stacked frames plus one target list per anchor head.

use crate::manager::{template_len_mismatch, CorpusManager};
use crate::types::{AnchorTemplate, CorpusResult};
use ndarray::{Array2, Array4};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusBatch {
    pub index: usize,
    /// Frame keys covered by this batch.
    pub frames: Range<usize>,
    /// `[batch, height, width, 3]` raw RGB.
    pub images: Array4<u8>,
    /// One `[batch, 5]` array per anchor, in grid order.
    pub targets: Vec<Array2<i64>>,
}

impl CorpusBatch {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Anchors holding a box in at least one frame of the batch.
    pub fn occupied_anchors(&self) -> Vec<usize> {
        self.targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.column(4).iter().any(|v| *v != 0))
            .map(|(a, _)| a)
            .collect()
    }
}

/// Turn frame-major templates (`frames x anchors x 5`) into anchor-major
/// targets (`anchors x [frames, 5]`), the layout a network with one output
/// head per anchor consumes.
pub fn regroup_anchor_major(
    templates: &[AnchorTemplate],
    anchor_count: usize,
) -> CorpusResult<Vec<Array2<i64>>> {
    if let Some(bad) = templates.iter().find(|t| t.len() != anchor_count) {
        return Err(template_len_mismatch(bad.len(), anchor_count));
    }
    Ok((0..anchor_count)
        .map(|a| {
            let mut target = Array2::zeros((templates.len(), 5));
            for (f, template) in templates.iter().enumerate() {
                for (c, v) in template[a].iter().enumerate() {
                    target[[f, c]] = *v;
                }
            }
            target
        })
        .collect())
}

/// Walks `0..batch_count` loading one batch per step.
pub struct BatchIter<'m, 'c> {
    manager: &'m CorpusManager<'c>,
    next: usize,
    count: usize,
}

impl<'m, 'c> BatchIter<'m, 'c> {
    pub(crate) fn new(manager: &'m CorpusManager<'c>, count: usize) -> Self {
        Self {
            manager,
            next: 0,
            count,
        }
    }
}

impl Iterator for BatchIter<'_, '_> {
    type Item = CorpusResult<CorpusBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.manager.batch(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for BatchIter<'_, '_> {}

#[cfg(feature = "burn-runtime")]
pub struct BurnBatch<B: burn::tensor::backend::Backend> {
    /// `[batch, height, width, 3]`, pixel values 0..=255 as floats.
    pub images: burn::tensor::Tensor<B, 4>,
    /// One `[batch, 5]` tensor per anchor.
    pub targets: Vec<burn::tensor::Tensor<B, 2>>,
}

#[cfg(feature = "burn-runtime")]
impl CorpusBatch {
    pub fn to_burn<B: burn::tensor::backend::Backend>(&self, device: &B::Device) -> BurnBatch<B> {
        use burn::tensor::{Tensor, TensorData};

        let shape = self.images.shape();
        let dims = [shape[0], shape[1], shape[2], shape[3]];
        let pixels: Vec<f32> = self.images.iter().map(|v| *v as f32).collect();
        let images = Tensor::<B, 4>::from_data(TensorData::new(pixels, dims), device);
        let targets = self
            .targets
            .iter()
            .map(|t| {
                let values: Vec<f32> = t.iter().map(|v| *v as f32).collect();
                Tensor::<B, 2>::from_data(TensorData::new(values, [t.nrows(), 5]), device)
            })
            .collect();
        BurnBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EMPTY_SLOT;

    #[test]
    fn regroup_transposes_frames_and_anchors() {
        let templates = vec![
            vec![[1, 1, 2, 2, 1], EMPTY_SLOT, EMPTY_SLOT],
            vec![EMPTY_SLOT, EMPTY_SLOT, [5, 5, 6, 6, 1]],
        ];
        let targets = regroup_anchor_major(&templates, 3).unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].shape(), &[2, 5]);
        assert_eq!(targets[0].row(0).to_vec(), vec![1, 1, 2, 2, 1]);
        assert_eq!(targets[0].row(1).to_vec(), vec![0; 5]);
        assert!(targets[1].iter().all(|v| *v == 0));
        assert_eq!(targets[2].row(1).to_vec(), vec![5, 5, 6, 6, 1]);
    }

    #[test]
    fn regroup_rejects_wrong_template_length() {
        let templates = vec![vec![EMPTY_SLOT; 2]];
        assert!(regroup_anchor_major(&templates, 3).is_err());
    }
}
