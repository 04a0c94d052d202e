/*!
 * Tests for cross-language time alignment
 */

use subcorpus::alignment::TimeAligner;
use subcorpus::app_config::AlignmentConfig;
use subcorpus::cue::{Cue, TimeWindow};
use crate::common::{cue, timed};

fn aligner() -> TimeAligner {
    TimeAligner::new(&AlignmentConfig::default())
}

fn segmented(windows: &[(i64, i64)]) -> Cue {
    Cue::with_segments(
        1,
        windows.iter()
            .enumerate()
            .map(|(index, (start, end))| (TimeWindow::new(*start, *end), format!("part {}", index + 1)))
            .collect(),
    )
}

/// Test that a target shown at the same time is found
#[test]
fn test_findMatch_withCloseWindow_shouldReturnTarget() {
    let source = timed(1, 1_000, 2_000);
    let targets = vec![cue(7, 1_050, 2_050, "Olá")];

    let matched = aligner().find_match(&source, &targets).unwrap();

    assert_eq!(matched.text(), "Olá");
    assert_eq!(matched.id(), 7);
}

/// Test that a single window needs both bounds within tolerance
#[test]
fn test_findMatch_withStartOffByTooMuch_shouldReturnNone() {
    let source = timed(1, 1_000, 2_000);
    let targets = vec![cue(7, 1_500, 2_050, "Olá")];

    assert!(aligner().find_match(&source, &targets).is_none());
}

/// Test the tolerance boundary on both sides of each bound
#[test]
fn test_findMatch_atToleranceBoundary_shouldBeInclusive() {
    let source = timed(1, 1_000, 2_000);

    assert!(aligner().find_match(&source, &[timed(2, 1_300, 2_300)]).is_some());
    assert!(aligner().find_match(&source, &[timed(2, 700, 1_700)]).is_some());
    assert!(aligner().find_match(&source, &[timed(2, 1_301, 2_000)]).is_none());
    assert!(aligner().find_match(&source, &[timed(2, 1_000, 1_699)]).is_none());
}

/// Test that the first target in file order wins
#[test]
fn test_findMatch_withSeveralTargets_shouldPickFirst() {
    let source = timed(1, 1_000, 2_000);
    let targets = vec![timed(2, 1_200, 2_200), timed(3, 1_000, 2_000)];

    assert_eq!(aligner().find_match(&source, &targets).unwrap().id(), 2);
}

/// Test that every segment of a stitched cue resolves strictly
#[test]
fn test_findMatch_withStrictSegments_shouldConcatenateTargets() {
    let source = segmented(&[(1_000, 2_000), (2_100, 3_000)]);
    let targets = vec![cue(1, 1_000, 2_000, "Eu vou"), cue(2, 2_100, 3_000, "para casa")];

    let matched = aligner().find_match(&source, &targets).unwrap();

    assert_eq!(matched.text(), "Eu vou para casa");
    assert_eq!(matched.windows(), source.windows());
}

/// Test that one relaxed segment fits in the budget of a three-segment cue
#[test]
fn test_findMatch_withOneRelaxedSegment_shouldUseBudget() {
    let source = segmented(&[(1_000, 2_000), (2_100, 3_000), (3_100, 4_000)]);
    let targets = vec![
        cue(1, 1_000, 2_000, "Um"),
        cue(2, 2_100, 3_500, "dois"),
        cue(3, 3_100, 4_000, "três"),
    ];

    let matched = aligner().find_match(&source, &targets).unwrap();

    assert_eq!(matched.text(), "Um dois três");
    assert_eq!(matched.id(), 1);
}

/// Test that a second relaxed segment exceeds the budget and fails the whole cue
#[test]
fn test_findMatch_withTwoRelaxedSegments_shouldReturnNone() {
    let source = segmented(&[(1_000, 2_000), (2_100, 3_000), (3_100, 4_000)]);
    let targets = vec![
        cue(1, 1_000, 2_000, "Um"),
        cue(2, 2_100, 3_500, "dois"),
        cue(3, 3_100, 4_600, "três"),
    ];

    assert!(aligner().find_match(&source, &targets).is_none());
}

/// Test that a segment without any counterpart fails the whole cue
#[test]
fn test_findMatch_withUnmatchedSegment_shouldReturnNone() {
    let source = segmented(&[(1_000, 2_000), (50_000, 51_000)]);
    let targets = vec![cue(1, 1_000, 2_000, "Um")];

    assert!(aligner().find_match(&source, &targets).is_none());
}

/// Test that a target is consumed by at most one segment
#[test]
fn test_findMatch_withSharedTarget_shouldNotReuseIt() {
    let source = segmented(&[(1_000, 2_000), (2_100, 3_000)]);
    let targets = vec![cue(1, 1_000, 3_000, "Longo")];

    assert!(aligner().find_match(&source, &targets).is_none());
}

/// Test the budget of larger cues (5 segments allow 2 relaxed matches)
#[test]
fn test_findMatch_withFiveSegments_shouldAllowTwoRelaxed() {
    let windows = [(0, 900), (1_000, 1_900), (2_000, 2_900), (3_000, 3_900), (4_000, 4_900)];
    let source = segmented(&windows);

    let with_relaxed = |relaxed: usize| -> Vec<Cue> {
        windows.iter()
            .enumerate()
            .map(|(index, (start, end))| {
                let end = if index < relaxed { end + 500 } else { *end };
                cue(index + 1, *start, end, &format!("parte {}", index + 1))
            })
            .collect()
    };

    assert_eq!(TimeAligner::miss_budget(5), 2);
    assert!(aligner().find_match(&source, &with_relaxed(2)).is_some());
    assert!(aligner().find_match(&source, &with_relaxed(3)).is_none());
}

/// Test that nothing matches without windows or targets
#[test]
fn test_findMatch_withEmptyInput_shouldReturnNone() {
    let empty = Cue::with_segments(1, Vec::new());

    assert!(aligner().find_match(&empty, &[timed(1, 0, 1_000)]).is_none());
    assert!(aligner().find_match(&timed(1, 0, 1_000), &[]).is_none());
}
