//! Frame-indexed lists that stay dense when frames are referenced out of order.

use serde::{Deserialize, Serialize};

/// Frame index -> items of that frame, with no holes in the index range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenseFrames<T> {
    frames: Vec<Vec<T>>,
}

impl<T> Default for DenseFrames<T> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<T> DenseFrames<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow to hold `frame`, filling every skipped index with an empty list.
    /// Returns how many frames were added.
    pub fn ensure_frame(&mut self, frame: usize) -> usize {
        let before = self.frames.len();
        if frame >= before {
            self.frames.resize_with(frame + 1, Vec::new);
        }
        self.frames.len() - before
    }

    pub fn push(&mut self, frame: usize, item: T) {
        self.ensure_frame(frame);
        self.frames[frame].push(item);
    }

    pub fn get(&self, frame: usize) -> Option<&[T]> {
        self.frames.get(frame).map(Vec::as_slice)
    }

    /// Number of frames, including empty ones.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total items across all frames.
    pub fn item_count(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.frames.iter().map(Vec::as_slice)
    }

    pub fn into_inner(self) -> Vec<Vec<T>> {
        self.frames
    }
}

impl<T> From<Vec<Vec<T>>> for DenseFrames<T> {
    fn from(frames: Vec<Vec<T>>) -> Self {
        Self { frames }
    }
}
