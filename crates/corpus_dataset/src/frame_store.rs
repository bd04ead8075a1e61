//! Per-frame pixel files (`FRM1`) and the directory that holds them.
//!
//! Layout, little endian:
//! ```text
//! 0..4    magic "FRM1"
//! 4..8    format version (u32)
//! 8..12   width (u32)
//! 12..16  height (u32)
//! 16..20  channels (u32, always 3)
//! 20..    width * height * 3 bytes, row-major RGB triples
//! ```

use crate::types::{CorpusError, CorpusResult};
use ndarray::Array3;
use std::fs;
use std::path::{Path, PathBuf};

pub const FRAME_MAGIC: &[u8; 4] = b"FRM1";
pub const FRAME_VERSION: u32 = 1;
pub const FRAME_HEADER_LEN: usize = 20;
pub const FRAME_EXT: &str = "frame";
const CHANNELS: u32 = 3;

/// Decoded pixels of one frame as a flat list of RGB triples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
}

impl FrameImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> CorpusResult<Self> {
        let Some(expected) = pixel_bytes(width, height) else {
            return Err(CorpusError::ShapeMismatch {
                msg: format!("{width}x{height} frame is too large to address"),
            });
        };
        if pixels.len() != expected {
            return Err(CorpusError::ShapeMismatch {
                msg: format!(
                    "{}x{} frame needs {expected} bytes, got {}",
                    width,
                    height,
                    pixels.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_rgb(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / CHANNELS as usize
    }

    /// Per-pixel channel triples in row-major order.
    pub fn triples(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.pixels.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    /// `height x width x 3` view of the frame.
    pub fn to_array(&self) -> Array3<u8> {
        self.clone().into_array()
    }

    pub fn into_array(self) -> Array3<u8> {
        let shape = (self.height as usize, self.width as usize, CHANNELS as usize);
        // Length is checked at construction.
        Array3::from_shape_vec(shape, self.pixels).unwrap_or_else(|_| Array3::zeros(shape))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + self.pixels.len());
        out.extend_from_slice(FRAME_MAGIC);
        out.extend_from_slice(&FRAME_VERSION.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&CHANNELS.to_le_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }

    pub fn decode(data: &[u8], path: &Path) -> CorpusResult<Self> {
        let bad = |msg: String| CorpusError::FrameFormat {
            path: path.to_path_buf(),
            msg,
        };
        if data.len() < FRAME_HEADER_LEN {
            return Err(bad(format!("file too small ({} bytes)", data.len())));
        }
        if &data[0..4] != FRAME_MAGIC {
            return Err(bad("bad magic".into()));
        }
        let version = read_u32_le(&data[4..8]);
        if version != FRAME_VERSION {
            return Err(bad(format!("unsupported version {version}")));
        }
        let width = read_u32_le(&data[8..12]);
        let height = read_u32_le(&data[12..16]);
        let channels = read_u32_le(&data[16..20]);
        if channels != CHANNELS {
            return Err(bad(format!("unsupported channels {channels}")));
        }
        let body = pixel_bytes(width, height)
            .ok_or_else(|| bad(format!("{width}x{height} frame is too large to address")))?;
        if data.len() - FRAME_HEADER_LEN != body {
            return Err(bad(format!(
                "expected {body} pixel bytes for {width}x{height}, found {}",
                data.len() - FRAME_HEADER_LEN
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: data[FRAME_HEADER_LEN..].to_vec(),
        })
    }
}

/// Byte length of a `width x height` RGB frame; `None` on overflow.
fn pixel_bytes(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS as usize)
}

fn read_u32_le(data: &[u8]) -> u32 {
    let mut arr = [0u8; 4];
    arr.copy_from_slice(data);
    u32::from_le_bytes(arr)
}

/// Directory of `<key>.frame` files.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: usize) -> PathBuf {
        self.dir.join(format!("{key}.{FRAME_EXT}"))
    }

    pub fn write(&self, key: usize, frame: &FrameImage) -> CorpusResult<()> {
        let path = self.path_for(key);
        fs::write(&path, frame.encode()).map_err(|e| CorpusError::io(path, e))
    }

    pub fn read(&self, key: usize) -> CorpusResult<FrameImage> {
        let path = self.path_for(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CorpusError::FrameNotFound { key, path });
            }
            Err(e) => return Err(CorpusError::Io { path, source: e }),
        };
        FrameImage::decode(&data, &path)
    }

    /// Stored keys in ascending order. Files not named `<integer>.frame` are ignored.
    pub fn keys(&self) -> CorpusResult<Vec<usize>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| CorpusError::io(&self.dir, e))?;
        let mut keys: Vec<usize> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(FRAME_EXT))
            .filter_map(|p| p.file_stem()?.to_str()?.parse().ok())
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    /// One past the highest stored key; the key the next ingested image gets.
    pub fn next_key(&self) -> CorpusResult<usize> {
        Ok(self.keys()?.last().map(|k| k + 1).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrameImage {
        FrameImage::new(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn encoded_header_layout() {
        let bytes = sample().encode();
        assert_eq!(&bytes[0..4], b"FRM1");
        assert_eq!(read_u32_le(&bytes[8..12]), 2);
        assert_eq!(read_u32_le(&bytes[12..16]), 1);
        assert_eq!(bytes.len(), FRAME_HEADER_LEN + 6);
        let back = FrameImage::decode(&bytes, Path::new("x")).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn truncated_or_foreign_files_are_rejected() {
        let mut bytes = sample().encode();
        bytes.pop();
        assert!(matches!(
            FrameImage::decode(&bytes, Path::new("x")),
            Err(CorpusError::FrameFormat { .. })
        ));
        assert!(matches!(
            FrameImage::decode(b"PNG\0", Path::new("x")),
            Err(CorpusError::FrameFormat { .. })
        ));
        let mut bytes = sample().encode();
        bytes[0] = b'X';
        assert!(FrameImage::decode(&bytes, Path::new("x")).is_err());
    }

    #[test]
    fn array_is_height_width_channels() {
        let frame = FrameImage::new(3, 2, (0..18).collect()).unwrap();
        let arr = frame.to_array();
        assert_eq!(arr.shape(), &[2, 3, 3]);
        assert_eq!(arr[[1, 0, 0]], 9);
        assert_eq!(frame.triples().nth(4), Some([12, 13, 14]));
        assert_eq!(frame.pixel_count(), 6);
    }

    #[test]
    fn pixel_length_must_match_dimensions() {
        assert!(matches!(
            FrameImage::new(2, 2, vec![0; 5]),
            Err(CorpusError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            FrameImage::new(u32::MAX, u32::MAX, Vec::new()),
            Err(CorpusError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn oversized_header_is_a_format_error() {
        let mut bytes = sample().encode();
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            FrameImage::decode(&bytes, Path::new("x")),
            Err(CorpusError::FrameFormat { .. })
        ));
    }

    #[test]
    fn corrupt_stored_frame_reads_back_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(dir.path());
        store.write(0, &sample()).unwrap();
        let mut bytes = fs::read(store.path_for(0)).unwrap();
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        fs::write(store.path_for(0), bytes).unwrap();
        assert!(matches!(
            store.read(0),
            Err(CorpusError::FrameFormat { .. })
        ));
    }
}
