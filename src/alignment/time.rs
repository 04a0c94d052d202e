/*!
 * Cross-language alignment of cues by display time.
 *
 * A single-window cue needs a counterpart whose span starts and ends within
 * tolerance. A multi-window cue is resolved window by window; windows that only
 * have a relaxed counterpart (start or end within tolerance) draw on a miss
 * budget shared by the whole cue.
 */

use std::collections::HashSet;
use log::debug;

use crate::app_config::AlignmentConfig;
use crate::cue::{Cue, TimeWindow};

// @const: Share of segments allowed to match on a single bound
pub const MISS_BUDGET_RATIO: f64 = 0.3;

/// Finds the counterpart of a cue in the other track of a language pair
#[derive(Debug, Clone, Copy)]
pub struct TimeAligner {
    time_tolerance_ms: i64,
}

impl TimeAligner {
    pub fn new(config: &AlignmentConfig) -> Self {
        Self {
            time_tolerance_ms: config.time_tolerance_ms(),
        }
    }

    pub fn time_tolerance_ms(&self) -> i64 {
        self.time_tolerance_ms
    }

    /// Number of relaxed matches a cue with `segments` windows may use
    pub fn miss_budget(segments: usize) -> usize {
        (MISS_BUDGET_RATIO * segments as f64).round() as usize
    }

    /// Find the target cue, or combination of target cues, shown alongside `source`
    pub fn find_match(&self, source: &Cue, targets: &[Cue]) -> Option<Cue> {
        match source.windows() {
            [] => None,
            [window] => self.strict_match(window, targets, &HashSet::new()).cloned(),
            windows => self.match_segments(source.id(), windows, targets),
        }
    }

    fn strict_match<'t>(&self, window: &TimeWindow, targets: &'t [Cue], used: &HashSet<&str>) -> Option<&'t Cue> {
        targets.iter().find(|target| {
            !used.contains(target.text())
                && target.span().is_some_and(|span| span.matches_within(window, self.time_tolerance_ms))
        })
    }

    fn relaxed_match<'t>(&self, window: &TimeWindow, targets: &'t [Cue], used: &HashSet<&str>) -> Option<&'t Cue> {
        targets.iter().find(|target| {
            !used.contains(target.text())
                && target.span().is_some_and(|span| span.touches_within(window, self.time_tolerance_ms))
        })
    }

    fn match_segments(&self, id: usize, windows: &[TimeWindow], targets: &[Cue]) -> Option<Cue> {
        let budget = Self::miss_budget(windows.len());
        let mut misses = 0;
        let mut used: HashSet<&str> = HashSet::new();
        let mut segments: Vec<(TimeWindow, String)> = Vec::with_capacity(windows.len());

        for window in windows {
            let matched = match self.strict_match(window, targets, &used) {
                Some(target) => target,
                None => {
                    let Some(target) = self.relaxed_match(window, targets, &used) else {
                        debug!("Cue {}: no counterpart for window {}", id, window);
                        return None;
                    };
                    misses += 1;
                    if misses > budget {
                        debug!("Cue {}: {} relaxed matches exceed budget of {}", id, misses, budget);
                        return None;
                    }
                    target
                }
            };

            used.insert(matched.text());
            segments.push((*window, matched.text().to_string()));
        }

        Some(Cue::with_segments(id, segments))
    }
}
