//! Fixed anchor lattice and nearest-anchor assignment.

use crate::types::{CorpusError, CorpusResult, FrameGeometry};
use data_contracts::BoundingBox;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub x: u32,
    pub y: u32,
}

impl AnchorPoint {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    fn distance_to(&self, (cx, cy): (f64, f64)) -> f64 {
        let dx = self.x as f64 - cx;
        let dy = self.y as f64 - cy;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Anchors on `[0, width] x [0, height]` every `spacing` pixels, both origins
/// included. Ordered x-major: the anchor at column `xi`, row `yi` sits at index
/// `xi * ny + yi` where `ny = height / spacing + 1`.
///
/// A zero spacing yields no anchors.
pub fn anchors(width: u32, height: u32, spacing: u32) -> Vec<AnchorPoint> {
    if spacing == 0 {
        return Vec::new();
    }
    // Column/row indices stay within u32; only the counts need the extra bit.
    let (last_x, last_y) = (width / spacing, height / spacing);
    let capacity = anchor_count(FrameGeometry::new(width, height), spacing);
    let mut points = Vec::with_capacity(capacity);
    for xi in 0..=last_x {
        for yi in 0..=last_y {
            points.push(AnchorPoint::new(xi * spacing, yi * spacing));
        }
    }
    points
}

/// Size of the lattice [`anchors`] builds for this geometry and spacing.
pub fn anchor_count(geometry: FrameGeometry, spacing: u32) -> usize {
    if spacing == 0 {
        return 0;
    }
    let nx = (geometry.width / spacing) as usize + 1;
    let ny = (geometry.height / spacing) as usize + 1;
    nx * ny
}

/// Index of the anchor closest to the box center. The first anchor wins ties.
pub fn nearest_anchor_index(bbox: &BoundingBox, anchors: &[AnchorPoint]) -> Option<usize> {
    let center = bbox.center();
    let mut best: Option<(usize, f64)> = None;
    for (i, anchor) in anchors.iter().enumerate() {
        let d = anchor.distance_to(center);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

pub fn nearest_anchor(bbox: &BoundingBox, anchors: &[AnchorPoint]) -> Option<AnchorPoint> {
    nearest_anchor_index(bbox, anchors).map(|i| anchors[i])
}

/// Anchor lattice bound to a frame geometry and spacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorGrid {
    geometry: FrameGeometry,
    spacing: u32,
    points: Vec<AnchorPoint>,
}

impl AnchorGrid {
    pub fn new(geometry: FrameGeometry, spacing: u32) -> CorpusResult<Self> {
        if spacing == 0 {
            return Err(CorpusError::InvalidAnchorFactor);
        }
        Ok(Self {
            geometry,
            spacing,
            points: anchors(geometry.width, geometry.height, spacing),
        })
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn spacing(&self) -> u32 {
        self.spacing
    }

    pub fn points(&self) -> &[AnchorPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Grid index of the anchor nearest to the box center.
    pub fn assign(&self, bbox: &BoundingBox) -> usize {
        // A grid built by `new` always has at least the origin anchor.
        nearest_anchor_index(bbox, &self.points).unwrap_or(0)
    }

    pub fn index_of(&self, point: AnchorPoint) -> Option<usize> {
        if point.x % self.spacing != 0 || point.y % self.spacing != 0 {
            return None;
        }
        let ny = (self.geometry.height / self.spacing) as usize + 1;
        let xi = (point.x / self.spacing) as usize;
        let yi = (point.y / self.spacing) as usize;
        if yi >= ny || xi > (self.geometry.width / self.spacing) as usize {
            return None;
        }
        Some(xi * ny + yi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn count_matches_lattice_size() {
        for &(w, h, s) in &[(1280, 720, 40), (100, 50, 7), (10, 10, 20), (0, 0, 3)] {
            let pts = anchors(w, h, s);
            assert_eq!(pts.len(), ((w / s + 1) * (h / s + 1)) as usize);
            let unique: HashSet<_> = pts.iter().collect();
            assert_eq!(unique.len(), pts.len());
            assert_eq!(pts, anchors(w, h, s));
        }
        assert_eq!(anchors(1280, 720, 40).len(), 627);
        assert_eq!(anchor_count(FrameGeometry::default(), 40), 627);
    }

    #[test]
    fn ordering_is_x_major() {
        let pts = anchors(80, 40, 40);
        let expected: Vec<_> = [(0, 0), (0, 40), (40, 0), (40, 40), (80, 0), (80, 40)]
            .iter()
            .map(|&(x, y)| AnchorPoint::new(x, y))
            .collect();
        assert_eq!(pts, expected);
    }

    #[test]
    fn nearest_is_the_minimum_distance() {
        let pts = anchors(1280, 720, 40);
        let bbox = BoundingBox::new(500, 500, 520, 520);
        let got = nearest_anchor(&bbox, &pts).unwrap();
        assert_eq!(got, AnchorPoint::new(520, 520));
        let center = bbox.center();
        let best = got.distance_to(center);
        assert!(pts.iter().all(|p| p.distance_to(center) >= best));
    }

    #[test]
    fn ties_resolve_to_first_anchor() {
        let pts = anchors(80, 80, 40);
        // Center (20, 20) is equidistant from (0,0), (0,40), (40,0), (40,40).
        let bbox = BoundingBox::new(10, 10, 30, 30);
        assert_eq!(nearest_anchor(&bbox, &pts), Some(AnchorPoint::new(0, 0)));
        // Center (60, 40): (40, 40) precedes (80, 40).
        let bbox = BoundingBox::new(50, 30, 70, 50);
        assert_eq!(nearest_anchor(&bbox, &pts), Some(AnchorPoint::new(40, 40)));
    }

    #[test]
    fn boxes_outside_the_frame_snap_to_the_border() {
        let grid = AnchorGrid::new(FrameGeometry::new(80, 80), 40).unwrap();
        let idx = grid.assign(&BoundingBox::new(-100, -100, -50, -50));
        assert_eq!(grid.points()[idx], AnchorPoint::new(0, 0));
        let idx = grid.assign(&BoundingBox::new(500, 10, 600, 20));
        assert_eq!(grid.points()[idx], AnchorPoint::new(80, 0));
    }

    #[test]
    fn index_of_inverts_ordering() {
        let grid = AnchorGrid::new(FrameGeometry::default(), 40).unwrap();
        for (i, p) in grid.points().iter().enumerate() {
            assert_eq!(grid.index_of(*p), Some(i));
        }
        assert_eq!(grid.index_of(AnchorPoint::new(41, 0)), None);
        assert_eq!(grid.index_of(AnchorPoint::new(0, 760)), None);
    }

    #[test]
    fn full_range_dimensions_do_not_overflow() {
        let tall = FrameGeometry::new(0, u32::MAX);
        assert_eq!(anchor_count(tall, 1), u32::MAX as usize + 1);
        let square = FrameGeometry::new(u32::MAX, u32::MAX);
        assert_eq!(anchor_count(square, u32::MAX), 4);

        let pts = anchors(u32::MAX, 0, u32::MAX);
        assert_eq!(pts, vec![AnchorPoint::new(0, 0), AnchorPoint::new(u32::MAX, 0)]);

        let grid = AnchorGrid::new(FrameGeometry::new(1, u32::MAX), u32::MAX).unwrap();
        assert_eq!(grid.index_of(AnchorPoint::new(0, u32::MAX)), Some(1));
    }

    #[test]
    fn zero_spacing_is_rejected() {
        assert!(anchors(10, 10, 0).is_empty());
        assert!(matches!(
            AnchorGrid::new(FrameGeometry::default(), 0),
            Err(CorpusError::InvalidAnchorFactor)
        ));
        assert_eq!(nearest_anchor(&BoundingBox::default(), &[]), None);
    }
}
