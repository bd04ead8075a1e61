//! Plain-text rendering of validation reports for the corpus_* binaries.

use corpus_dataset::{CorpusBatch, ValidationReport};

pub fn report_lines(report: &ValidationReport) -> Vec<String> {
    let s = &report.summary;
    let mut lines = vec![format!(
        "Validation outcome: {} (frames={} empty={} boxes={} images={} frames_without_image={} images_without_frame={} anchor_collisions={})",
        report.outcome.as_str(),
        s.frames,
        s.empty_frames,
        s.boxes,
        s.images,
        s.frames_without_image,
        s.images_without_frame,
        s.anchor_collisions
    )];
    lines.extend(report.reasons.iter().map(|r| format!(" - {r}")));
    lines
}

pub fn batch_lines(batch: &CorpusBatch) -> Vec<String> {
    let occupied = batch.occupied_anchors();
    let mut lines = vec![
        format!(
            "Batch {} (frames {}..{}): images {:?}, {} anchor targets of {:?}",
            batch.index,
            batch.frames.start,
            batch.frames.end,
            batch.images.shape(),
            batch.targets.len(),
            batch.targets.first().map(|t| t.shape().to_vec()).unwrap_or_default()
        ),
        format!("Occupied anchors: {}", occupied.len()),
    ];
    for a in occupied {
        for (row, slot) in batch.targets[a].outer_iter().enumerate() {
            if slot[4] != 0 {
                lines.push(format!(
                    " - anchor {a} frame {}: [{}, {}, {}, {}]",
                    batch.frames.start + row,
                    slot[0],
                    slot[1],
                    slot[2],
                    slot[3]
                ));
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_dataset::{CorpusSummary, ValidationOutcome};

    #[test]
    fn report_lists_reasons_under_the_headline() {
        let report = ValidationReport {
            outcome: ValidationOutcome::Warn,
            reasons: vec!["anchor collisions: 2 observed".into()],
            summary: CorpusSummary {
                frames: 3,
                anchor_collisions: 2,
                ..Default::default()
            },
        };
        let lines = report_lines(&report);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Validation outcome: warn"));
        assert!(lines[0].contains("anchor_collisions=2"));
        assert_eq!(lines[1], " - anchor collisions: 2 observed");
    }
}
