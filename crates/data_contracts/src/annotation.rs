//! Per-line ground-truth annotations: `id x1 y1 x2 y2 frame [meta...]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of whitespace-separated fields on an annotation line.
pub const MIN_FIELDS: usize = 6;

/// Axis-aligned box in pixel coordinates. Corner ordering is not validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Arithmetic mean of the two corners.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 as f64 + self.x2 as f64) / 2.0,
            (self.y1 as f64 + self.y2 as f64) / 2.0,
        )
    }

    pub fn as_array(&self) -> [i64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Box coordinates followed by the presence flag.
    pub fn to_slot(&self) -> [i64; 5] {
        [self.x1, self.y1, self.x2, self.y2, 1]
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from(v: [i64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.as_array()
    }
}

/// Opaque auxiliary annotation field (occlusion flags, class tags, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Text(String),
}

impl MetaValue {
    /// Numeric fields are truncated to integers; anything else is kept as text
    /// with surrounding double quotes stripped. Never fails.
    pub fn parse(raw: &str) -> Self {
        Self::parse_corrected(raw, 1.0)
    }

    /// Like [`MetaValue::parse`], dividing numeric fields by
    /// `downsample_correction` before truncation.
    pub fn parse_corrected(raw: &str, downsample_correction: f64) -> Self {
        match parse_number(raw) {
            Some(v) => MetaValue::Int((v / downsample_correction).trunc() as i64),
            None => MetaValue::Text(raw.trim_matches('"').to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            MetaValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Int(_) => None,
            MetaValue::Text(s) => Some(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationError {
    #[error("expected at least 6 fields, found {0}")]
    TooFewFields(usize),
    #[error("field {index} ({name}) is not numeric: {raw:?}")]
    NonNumeric {
        index: usize,
        name: &'static str,
        raw: String,
    },
    #[error("frame index must be non-negative, got {0}")]
    NegativeFrame(i64),
    #[error("downsample correction must be finite and non-zero, got {0}")]
    InvalidCorrection(f64),
}

/// One parsed annotation line.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    /// Track/object id; carried along but not used for anchor assignment.
    pub track_id: MetaValue,
    pub bbox: BoundingBox,
    pub frame: usize,
    pub meta: Vec<MetaValue>,
}

impl AnnotationRecord {
    /// Parse one line. Blank lines yield `Ok(None)`.
    ///
    /// Every numeric field except the frame index (box, track id, meta) is
    /// divided by `downsample_correction` and truncated toward zero, which maps
    /// annotations made at a higher capture resolution onto the stored frames.
    /// The frame field is truncated but never corrected.
    pub fn parse_line(
        line: &str,
        downsample_correction: f64,
    ) -> Result<Option<Self>, AnnotationError> {
        if !downsample_correction.is_finite() || downsample_correction == 0.0 {
            return Err(AnnotationError::InvalidCorrection(downsample_correction));
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            return Ok(None);
        }
        if fields.len() < MIN_FIELDS {
            return Err(AnnotationError::TooFewFields(fields.len()));
        }

        const BOX_NAMES: [&str; 4] = ["x1", "y1", "x2", "y2"];
        let mut coords = [0i64; 4];
        for (i, name) in BOX_NAMES.iter().enumerate() {
            let raw = fields[i + 1];
            let v = parse_number(raw).ok_or_else(|| AnnotationError::NonNumeric {
                index: i + 1,
                name: *name,
                raw: raw.to_string(),
            })?;
            coords[i] = (v / downsample_correction).trunc() as i64;
        }

        let frame_raw = fields[5];
        let frame = parse_number(frame_raw)
            .ok_or_else(|| AnnotationError::NonNumeric {
                index: 5,
                name: "frame",
                raw: frame_raw.to_string(),
            })?
            .trunc() as i64;
        if frame < 0 {
            return Err(AnnotationError::NegativeFrame(frame));
        }

        Ok(Some(Self {
            track_id: MetaValue::parse_corrected(fields[0], downsample_correction),
            bbox: BoundingBox::from(coords),
            frame: frame as usize,
            meta: fields[MIN_FIELDS..]
                .iter()
                .map(|f| MetaValue::parse_corrected(f, downsample_correction))
                .collect(),
        }))
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_box_frame_and_meta() {
        let rec = AnnotationRecord::parse_line("7 10 12 20 22 3 1 \"person\"", 1.0)
            .unwrap()
            .unwrap();
        assert_eq!(rec.track_id, MetaValue::Int(7));
        assert_eq!(rec.bbox, BoundingBox::new(10, 12, 20, 22));
        assert_eq!(rec.frame, 3);
        assert_eq!(
            rec.meta,
            vec![MetaValue::Int(1), MetaValue::Text("person".into())]
        );
    }

    #[test]
    fn correction_divides_every_numeric_field_but_the_frame() {
        let rec = AnnotationRecord::parse_line("0 100 101 302 299 9 5", 3.0)
            .unwrap()
            .unwrap();
        assert_eq!(rec.bbox, BoundingBox::new(33, 33, 100, 99));
        assert_eq!(rec.frame, 9);
        assert_eq!(rec.meta, vec![MetaValue::Int(1)]);

        let rec = AnnotationRecord::parse_line("3 30 30 60 60 9 6 \"tag\"", 3.0)
            .unwrap()
            .unwrap();
        assert_eq!(rec.track_id, MetaValue::Int(1));
        assert_eq!(rec.bbox, BoundingBox::new(10, 10, 20, 20));
        assert_eq!(rec.frame, 9);
        assert_eq!(
            rec.meta,
            vec![MetaValue::Int(2), MetaValue::Text("tag".into())]
        );
    }

    #[test]
    fn fractional_values_truncate_toward_zero() {
        let rec = AnnotationRecord::parse_line("a 10.9 -3.7 20.2 4.99 2.8", 1.0)
            .unwrap()
            .unwrap();
        assert_eq!(rec.bbox, BoundingBox::new(10, -3, 20, 4));
        assert_eq!(rec.frame, 2);
        assert_eq!(rec.track_id, MetaValue::Text("a".into()));
    }

    #[test]
    fn blank_line_is_skipped() {
        assert_eq!(AnnotationRecord::parse_line("   ", 1.0).unwrap(), None);
    }

    #[test]
    fn short_line_is_rejected() {
        let err = AnnotationRecord::parse_line("0 1 2 3 4", 1.0).unwrap_err();
        assert_eq!(err, AnnotationError::TooFewFields(5));
    }

    #[test]
    fn non_numeric_box_is_rejected() {
        let err = AnnotationRecord::parse_line("0 1 x 3 4 0", 1.0).unwrap_err();
        assert!(matches!(err, AnnotationError::NonNumeric { index: 2, .. }));
    }

    #[test]
    fn non_numeric_meta_is_text() {
        assert_eq!(MetaValue::parse("\"lost\""), MetaValue::Text("lost".into()));
        assert_eq!(MetaValue::parse("nan"), MetaValue::Text("nan".into()));
        assert_eq!(MetaValue::parse("4.0"), MetaValue::Int(4));
    }

    #[test]
    fn zero_correction_is_rejected() {
        let err = AnnotationRecord::parse_line("0 1 2 3 4 0", 0.0).unwrap_err();
        assert_eq!(err, AnnotationError::InvalidCorrection(0.0));
    }

    #[test]
    fn box_serializes_as_plain_array() {
        let json = serde_json::to_string(&BoundingBox::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json, "[1,2,3,4]");
        let meta: Vec<MetaValue> = serde_json::from_str("[3,\"tag\"]").unwrap();
        assert_eq!(meta, vec![MetaValue::Int(3), MetaValue::Text("tag".into())]);
    }
}
