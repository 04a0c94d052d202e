/*!
 * Batch alignment of many reference lines.
 *
 * Alignment runs in two phases. `prepare` parses every subtitle file the batch
 * needs into the shared `CueStore`, one file at a time. `align_all` then
 * matches the lines in parallel against the already-parsed cues and returns
 * the results in request order.
 */

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use futures::stream::{self, StreamExt};
use log::{debug, error};

use crate::app_config::AlignmentConfig;
use crate::cue::{Cue, Track};
use crate::cue_store::{CueStore, PreloadReport};

use super::text::TextAligner;
use super::time::TimeAligner;

/// One line to align, tagged with its position in the input
#[derive(Debug, Clone)]
pub struct AlignmentRequest {
    /// Position of the line in the input, used to restore order
    pub index: usize,

    /// Transcript filename of the episode the line belongs to
    pub filename: String,

    /// Reference line
    pub line: String,
}

impl AlignmentRequest {
    pub fn new(index: usize, filename: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            index,
            filename: filename.into(),
            line: line.into(),
        }
    }
}

/// What a batch looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Text match on the source track, then time match on the target track
    CrossLanguage,

    /// Text match on a single track only
    TextOnly(Track),
}

impl MatchMode {
    fn tracks(&self) -> &'static [Track] {
        match self {
            Self::CrossLanguage => &[Track::Source, Track::Target],
            Self::TextOnly(Track::Source) => &[Track::Source],
            Self::TextOnly(Track::Target) => &[Track::Target],
        }
    }
}

/// Outcome of aligning one request
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub index: usize,

    pub mode: MatchMode,

    /// Cue (or stitched cue) matching the reference text
    pub cue: Option<Cue>,

    /// Time-aligned counterpart of `cue` in the target track
    pub counterpart: Option<Cue>,
}

impl AlignmentResult {
    fn miss(index: usize, mode: MatchMode) -> Self {
        Self {
            index,
            mode,
            cue: None,
            counterpart: None,
        }
    }

    /// Whether the request was fully resolved for its mode
    pub fn is_hit(&self) -> bool {
        match self.mode {
            MatchMode::CrossLanguage => self.cue.is_some() && self.counterpart.is_some(),
            MatchMode::TextOnly(_) => self.cue.is_some(),
        }
    }

    pub fn is_miss(&self) -> bool {
        !self.is_hit()
    }
}

/// Read-only matching state shared with worker threads
#[derive(Clone)]
struct Matcher {
    store: Arc<CueStore>,
    text: TextAligner,
    time: TimeAligner,
}

impl Matcher {
    /// Cues of a file that was loaded during the prepare phase
    fn cached(&self, filename: &str, track: Track) -> Option<Arc<[Cue]>> {
        if !self.store.contains(filename, track) {
            return None;
        }
        self.store.get(filename, track).ok()
    }

    fn align(&self, request: &AlignmentRequest, mode: MatchMode) -> AlignmentResult {
        let mut result = AlignmentResult::miss(request.index, mode);

        match mode {
            MatchMode::TextOnly(track) => {
                if let Some(cues) = self.cached(&request.filename, track) {
                    result.cue = self.text.find_match(&request.line, &cues);
                }
            }
            MatchMode::CrossLanguage => {
                let source = self.cached(&request.filename, Track::Source);
                let target = self.cached(&request.filename, Track::Target);
                if let (Some(source), Some(target)) = (source, target) {
                    result.cue = self.text.find_match(&request.line, &source);
                    result.counterpart = result.cue.as_ref()
                        .and_then(|cue| self.time.find_match(cue, &target));
                }
            }
        }

        debug!("Row {} ({}): {}", request.index, request.filename, if result.is_hit() { "hit" } else { "miss" });
        result
    }
}

/// Aligns batches of lines against the subtitles of their episodes
pub struct BatchAligner {
    matcher: Matcher,

    /// Maximum number of lines matched at once
    max_concurrent: usize,
}

impl BatchAligner {
    pub fn new(store: Arc<CueStore>, config: &AlignmentConfig, max_concurrent: usize) -> Self {
        Self {
            matcher: Matcher {
                store,
                text: TextAligner::new(config),
                time: TimeAligner::new(config),
            },
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn store(&self) -> &Arc<CueStore> {
        &self.matcher.store
    }

    /// Parse every subtitle file the requests need
    ///
    /// Must complete before `align_all`; files that fail here make their
    /// requests misses.
    pub fn prepare(&self, requests: &[AlignmentRequest], mode: MatchMode) -> PreloadReport {
        let mut seen = HashSet::new();
        let filenames: Vec<&str> = requests.iter()
            .map(|request| request.filename.as_str())
            .filter(|filename| seen.insert(*filename))
            .collect();

        let mut report = PreloadReport::default();
        for &track in mode.tracks() {
            let track_report = self.matcher.store.preload(filenames.iter().copied(), track);
            report.loaded += track_report.loaded;
            report.cached += track_report.cached;
            report.failures.extend(track_report.failures);
        }

        report
    }

    /// Align a single request synchronously
    pub fn align_one(&self, request: &AlignmentRequest, mode: MatchMode) -> AlignmentResult {
        self.matcher.align(request, mode)
    }

    /// Align all requests in parallel, returning results sorted by request index
    pub async fn align_all(
        &self,
        requests: Vec<AlignmentRequest>,
        mode: MatchMode,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Vec<AlignmentResult> {
        let total = requests.len();
        let processed = Arc::new(AtomicUsize::new(0));

        let mut results = stream::iter(requests)
            .map(|request| {
                let matcher = self.matcher.clone();
                let processed = processed.clone();
                let progress_callback = progress_callback.clone();

                async move {
                    let index = request.index;
                    let result = match tokio::task::spawn_blocking(move || matcher.align(&request, mode)).await {
                        Ok(result) => result,
                        Err(e) => {
                            error!("Matching task for row {} failed: {}", index, e);
                            AlignmentResult::miss(index, mode)
                        }
                    };

                    let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total);

                    result
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;

        // Sort results by request index to maintain input order
        results.sort_by_key(|result| result.index);
        results
    }
}
