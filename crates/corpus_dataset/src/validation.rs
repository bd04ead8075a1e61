//! Corpus quality checks: frame/image alignment and lossy anchor assignment.

use crate::anchors::AnchorGrid;
use crate::corpus::Corpus;
use crate::types::{
    CorpusResult, CorpusSummary, ValidationOutcome, ValidationReport, ValidationThresholds,
};
use data_contracts::BoundingBox;
use std::collections::HashSet;

/// Boxes of one frame that a later box in the same frame pushes out of its anchor slot.
pub fn anchor_collisions(frame: &[BoundingBox], grid: &AnchorGrid) -> usize {
    let mut taken = HashSet::new();
    frame.iter().filter(|b| !taken.insert(grid.assign(b))).count()
}

pub fn summarize_corpus(corpus: &Corpus, grid: &AnchorGrid) -> CorpusResult<CorpusSummary> {
    let truths = corpus.ground_truths();
    let keys: HashSet<usize> = corpus.images()?.keys().iter().copied().collect();
    let mut summary = CorpusSummary {
        frames: truths.len(),
        images: keys.len(),
        boxes: truths.item_count(),
        ..Default::default()
    };
    for (i, frame) in truths.iter().enumerate() {
        if frame.is_empty() {
            summary.empty_frames += 1;
        }
        if !keys.contains(&i) {
            summary.frames_without_image += 1;
        }
        summary.anchor_collisions += anchor_collisions(frame, grid);
    }
    summary.images_without_frame = keys.iter().filter(|k| **k >= truths.len()).count();
    Ok(summary)
}

fn apply_threshold(
    label: &str,
    count: usize,
    max_count: Option<usize>,
    outcome: &mut ValidationOutcome,
    reasons: &mut Vec<String>,
) {
    if let Some(max) = max_count {
        if count > max {
            *outcome = ValidationOutcome::Fail;
            reasons.push(format!("{label}: {count} exceeds max {max}"));
        }
    }
    if count > 0 {
        if *outcome == ValidationOutcome::Pass {
            *outcome = ValidationOutcome::Warn;
        }
        reasons.push(format!("{label}: {count} observed"));
    }
}

pub fn validate_summary(
    summary: CorpusSummary,
    thresholds: &ValidationThresholds,
) -> ValidationReport {
    let mut outcome = ValidationOutcome::Pass;
    let mut reasons = Vec::new();

    apply_threshold(
        "misaligned (frame/image)",
        summary.frames_without_image + summary.images_without_frame,
        thresholds.max_misaligned,
        &mut outcome,
        &mut reasons,
    );
    apply_threshold(
        "anchor collisions",
        summary.anchor_collisions,
        thresholds.max_collisions,
        &mut outcome,
        &mut reasons,
    );
    if let Some(max_r) = thresholds.max_empty_ratio {
        let ratio = summary.empty_frames as f32 / summary.frames.max(1) as f32;
        if ratio > max_r {
            outcome = ValidationOutcome::Fail;
            reasons.push(format!(
                "empty frames: ratio {:.3} exceeds max {:.3}",
                ratio, max_r
            ));
        }
    }

    ValidationReport {
        outcome,
        reasons,
        summary,
    }
}

pub fn summarize_with_thresholds(
    corpus: &Corpus,
    grid: &AnchorGrid,
    thresholds: &ValidationThresholds,
) -> CorpusResult<ValidationReport> {
    let summary = summarize_corpus(corpus, grid)?;
    Ok(validate_summary(summary, thresholds))
}
