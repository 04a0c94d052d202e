/*!
 * Parsed cue caching.
 *
 * This module keeps every subtitle file that was parsed once in memory, keyed
 * by filename and track. Entries are populated at most once and never evicted,
 * so the aligners can share them across worker threads without copying.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::RwLock;
use log::{debug, warn};

use crate::cue::{Cue, Track};
use crate::cue_parser::CueParser;
use crate::errors::AppError;

/// Supplies the raw content of a subtitle file
pub trait CueSource: Send + Sync {
    /// Load the content of `filename` for the given track
    fn load(&self, filename: &str, track: Track) -> Result<String, AppError>;
}

/// Subtitle content held in memory, keyed by filename and track
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    files: HashMap<StoreKey, String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register content and return self for chaining
    pub fn with_file(mut self, filename: &str, track: Track, content: impl Into<String>) -> Self {
        self.insert(filename, track, content);
        self
    }

    pub fn insert(&mut self, filename: &str, track: Track, content: impl Into<String>) {
        self.files.insert(StoreKey::new(filename, track), content.into());
    }
}

impl CueSource for InMemorySource {
    fn load(&self, filename: &str, track: Track) -> Result<String, AppError> {
        self.files.get(&StoreKey::new(filename, track))
            .cloned()
            .ok_or_else(|| AppError::File(format!("No {} subtitle registered for {}", track, filename)))
    }
}

/// Cache key combining filename and track
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoreKey {
    filename: String,
    track: Track,
}

impl StoreKey {
    fn new(filename: &str, track: Track) -> Self {
        Self {
            filename: filename.to_string(),
            track,
        }
    }
}

/// Outcome of a bulk preload
#[derive(Debug, Default)]
pub struct PreloadReport {
    /// Files parsed by this call
    pub loaded: usize,

    /// Files that were already cached
    pub cached: usize,

    /// Files that could not be loaded, with the reason
    pub failures: Vec<(String, AppError)>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(file, _)| file.as_str())
    }
}

/// Memoizing store of parsed cue sequences
pub struct CueStore {
    /// Where raw content comes from
    source: Box<dyn CueSource>,

    /// Parsed sequences
    entries: RwLock<HashMap<StoreKey, Arc<[Cue]>>>,

    /// Requests answered from the cache
    hits: AtomicUsize,

    /// Files parsed
    loads: AtomicUsize,
}

impl CueStore {
    pub fn new(source: impl CueSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            entries: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    /// Get the cues of a file, loading and parsing it on first request
    ///
    /// Parse failures are returned as [`AppError::Subtitle`] and are not cached,
    /// so a later request retries the load.
    pub fn get(&self, filename: &str, track: Track) -> Result<Arc<[Cue]>, AppError> {
        let key = StoreKey::new(filename, track);

        if let Some(cues) = self.entries.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cues.clone());
        }

        let mut entries = self.entries.write();
        // Another writer may have populated the key while we waited for the lock
        if let Some(cues) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cues.clone());
        }

        let content = self.source.load(filename, track)?;
        let cues: Arc<[Cue]> = CueParser::parse(&content, track)
            .map_err(|source| AppError::Subtitle {
                file: filename.to_string(),
                source,
            })?
            .into();

        debug!("Parsed {} {} cues from {}", cues.len(), track, filename);
        self.loads.fetch_add(1, Ordering::Relaxed);
        entries.insert(key, cues.clone());

        Ok(cues)
    }

    /// Populate several files ahead of a read-only phase
    ///
    /// Never stops at the first failure; every file is attempted once.
    pub fn preload<'a, I>(&self, filenames: I, track: Track) -> PreloadReport
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut report = PreloadReport::default();

        for filename in filenames {
            if self.contains(filename, track) {
                report.cached += 1;
                continue;
            }

            match self.get(filename, track) {
                Ok(_) => report.loaded += 1,
                Err(e) => {
                    warn!("Could not load {} subtitles for {}: {}", track, filename, e);
                    report.failures.push((filename.to_string(), e));
                }
            }
        }

        report
    }

    pub fn contains(&self, filename: &str, track: Track) -> bool {
        self.entries.read().contains_key(&StoreKey::new(filename, track))
    }

    /// Number of cached files
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get store statistics as (cache hits, files parsed)
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.loads.load(Ordering::Relaxed))
    }
}
