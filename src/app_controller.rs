use anyhow::{anyhow, Context, Result};
use log::{error, warn, info, debug};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use indicatif::{ProgressBar, ProgressStyle};

use crate::alignment::{AlignmentRequest, AlignmentResult, BatchAligner, MatchMode};
use crate::app_config::{AlignmentConfig, Config};
use crate::corpus::row::{REVIEW_PREFIX, ONLY_TRANSLATION_PREFIX, SUBTITLE_TRANSLATION_PREFIX};
use crate::corpus::{compare_ids, read_data_lines, CornellDataset, CorpusRow, CorpusStats, CorpusWriter, IdMismatch, ScriptRow};
use crate::cue::Track;
use crate::cue_parser::CueParser;
use crate::cue_store::{CueSource, CueStore, PreloadReport};
use crate::errors::{AppError, ParseError};
use crate::file_utils::{FileManager, SubtitleLocator};
use crate::translation::Translator;

// @module: Application controller for corpus building

// @const: Rows aligned and written per round, so an interrupted run loses little work
const ROWS_PER_ROUND: usize = 1000;

/// Tally of an align or review pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AlignmentSummary {
    /// Rows already present in the output before this run
    pub resumed_from: usize,
    /// Rows the aligners resolved
    pub hits: usize,
    /// Rows the aligners could not resolve
    pub misses: usize,
    /// Rows copied to the output unchanged
    pub copied: usize,
    /// Subtitle files skipped because they could not be parsed
    pub skipped_files: Vec<String>,
}

impl AlignmentSummary {
    pub fn aligned(&self) -> usize {
        self.hits + self.misses
    }

    fn record(&mut self, result: &AlignmentResult) {
        if result.is_hit() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    fn skip_file(&mut self, filename: String) {
        if !self.skipped_files.contains(&filename) {
            self.skipped_files.push(filename);
        }
    }
}

/// Tally of a translate pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TranslationSummary {
    /// Requests sent to the translation service
    pub batches: usize,
    /// Lines translated
    pub translated: usize,
    /// Translations that led to a target subtitle
    pub subtitle_matches: usize,
    /// Translations kept as is
    pub translation_only: usize,
    /// Characters sent for translation
    pub characters: usize,
    /// Rows copied to the output unchanged
    pub copied: usize,
}

/// Tally of the Cornell generate pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CornellSummary {
    /// Conversations listed in the dataset
    pub conversations: usize,
    /// Dialogue turns of the complete conversations
    pub turns: usize,
    /// Rows already present in the output before this run
    pub resumed_from: usize,
    /// Rows written by this run
    pub written: usize,
}

/// Result of checking every subtitle file of the dataset
#[derive(Debug, Default)]
pub struct LintReport {
    pub files: usize,
    pub cues: usize,
    pub malformed: Vec<(PathBuf, ParseError)>,
}

/// A corpus line waiting to be written by the translate pass
enum PendingRow {
    /// Not a valid corpus row, copied verbatim
    Raw(String),
    /// Already has a target-language line
    Done(CorpusRow),
    /// Waits for its translation
    Untranslated(CorpusRow),
}

/// Main application controller for corpus building
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Parsed subtitles shared by every pass
    store: Arc<CueStore>,
}

impl Controller {
    // @method: Create a new controller reading subtitles from the configured dataset
    pub fn with_config(config: Config) -> Result<Self> {
        let locator = SubtitleLocator::from_dataset(&config.dataset);
        Ok(Self::with_source(config, locator))
    }

    /// Create a controller reading subtitles from another source
    pub fn with_source(config: Config, source: impl CueSource + 'static) -> Self {
        Self {
            config,
            store: Arc::new(CueStore::new(source)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<CueStore> {
        &self.store
    }

    /// Align every transcript line to the subtitles of both languages
    ///
    /// Appends to the corpus file, resuming after the rows it already holds.
    pub async fn build_corpus(&self) -> Result<AlignmentSummary> {
        let start_time = std::time::Instant::now();
        let script_path = self.config.dataset.script_path();
        let corpus_path = self.config.dataset.corpus_path();

        let lines = Self::read_input(&script_path)?;
        let resumed_from = CorpusWriter::written_rows(&corpus_path)?;
        let mut summary = AlignmentSummary { resumed_from, ..Default::default() };

        if resumed_from >= lines.len() {
            info!("Corpus {:?} already holds all {} rows", corpus_path, lines.len());
            return Ok(summary);
        }
        info!("Aligning {} rows, starting at row {}", lines.len() - resumed_from, resumed_from + 1);

        let aligner = self.batch_aligner(&self.config.alignment);
        let mut writer = CorpusWriter::open(&corpus_path)?;

        for (round, chunk) in lines[resumed_from..].chunks(ROWS_PER_ROUND).enumerate() {
            let first_row = resumed_from + round * ROWS_PER_ROUND;
            let rows = chunk.iter()
                .enumerate()
                .map(|(offset, line)| {
                    ScriptRow::parse(line)
                        .with_context(|| format!("Invalid row {} in {:?}", first_row + offset + 1, script_path))
                })
                .collect::<Result<Vec<_>>>()?;

            let requests = rows.iter()
                .enumerate()
                .map(|(index, row)| AlignmentRequest::new(index, row.filename.as_str(), row.line.as_str()))
                .collect();
            let results = self.run_batch(&aligner, requests, MatchMode::CrossLanguage, &mut summary).await?;

            for (row, result) in rows.iter().zip(&results) {
                summary.record(result);
                let corpus_row = match (&result.cue, &result.counterpart) {
                    (Some(source), Some(target)) => CorpusRow::from_script(row, source.text(), target.text()),
                    _ => CorpusRow::from_script(row, row.line.as_str(), ""),
                };
                writer.append(&corpus_row)?;
            }
            writer.flush()?;
        }

        self.log_summary("Alignment", &summary, start_time.elapsed());
        Ok(summary)
    }

    /// Retry unaligned corpus rows with the looser review settings
    ///
    /// Rows resolved here get the review prefix so they can be checked by hand.
    pub async fn review_corpus(&self) -> Result<AlignmentSummary> {
        let start_time = std::time::Instant::now();
        let input_path = self.config.dataset.corpus_path();
        let output_path = self.config.dataset.revised_corpus_path();

        let lines = Self::read_input(&input_path)?;
        let resumed_from = CorpusWriter::written_rows(&output_path)?;
        let mut summary = AlignmentSummary { resumed_from, ..Default::default() };

        if resumed_from >= lines.len() {
            info!("Revised corpus {:?} already holds all {} rows", output_path, lines.len());
            return Ok(summary);
        }
        info!("Reviewing {} rows, starting at row {}", lines.len() - resumed_from, resumed_from + 1);

        let aligner = self.batch_aligner(&self.config.review_alignment);
        let mut writer = CorpusWriter::open(&output_path)?;

        for chunk in lines[resumed_from..].chunks(ROWS_PER_ROUND) {
            let parsed: Vec<Result<CorpusRow, AppError>> = chunk.iter().map(|line| CorpusRow::parse(line)).collect();

            let requests = parsed.iter()
                .enumerate()
                .filter_map(|(index, row)| match row {
                    Ok(row) if row.pt_line.is_empty() => {
                        Some(AlignmentRequest::new(index, row.filename.as_str(), row.en_line.as_str()))
                    }
                    _ => None,
                })
                .collect();
            let mut results = self.run_batch(&aligner, requests, MatchMode::CrossLanguage, &mut summary).await?
                .into_iter()
                .peekable();

            for (index, (line, row)) in chunk.iter().zip(parsed).enumerate() {
                let mut row = match row {
                    Ok(row) => row,
                    Err(e) => {
                        debug!("Copying unparseable row verbatim: {}", e);
                        summary.copied += 1;
                        writer.append_raw(line)?;
                        continue;
                    }
                };

                match results.next_if(|result| result.index == index) {
                    Some(result) => {
                        summary.record(&result);
                        if let Some(target) = result.counterpart.as_ref().filter(|_| result.is_hit()) {
                            row.pt_line = format!("{}{}", REVIEW_PREFIX, target.text());
                        }
                    }
                    None => summary.copied += 1,
                }
                writer.append(&row)?;
            }
            writer.flush()?;
        }

        self.log_summary("Review", &summary, start_time.elapsed());
        Ok(summary)
    }

    /// Machine-translate rows that are still unaligned
    ///
    /// Each translation is looked up in the target subtitles; a match replaces
    /// the translation with the subtitle text.
    pub async fn translate_corpus(&self, translator: &dyn Translator) -> Result<TranslationSummary> {
        let input_path = self.config.dataset.corpus_path();
        let output_path = self.config.dataset.revised_corpus_path();

        let lines = Self::read_input(&input_path)?;
        let resumed_from = CorpusWriter::written_rows(&output_path)?;
        let mut summary = TranslationSummary::default();

        if resumed_from >= lines.len() {
            info!("Revised corpus {:?} already holds all {} rows", output_path, lines.len());
            return Ok(summary);
        }
        info!("Translating unaligned rows, starting at row {}", resumed_from + 1);

        let aligner = self.batch_aligner(&self.config.alignment);
        let batch_size = self.config.translation.batch_size.max(1);
        let mut writer = CorpusWriter::open(&output_path)?;
        let mut pending: Vec<PendingRow> = Vec::new();
        let mut queued = 0;

        for line in &lines[resumed_from..] {
            let entry = match CorpusRow::parse(line) {
                Ok(row) if row.pt_line.is_empty() => PendingRow::Untranslated(row),
                Ok(row) => PendingRow::Done(row),
                Err(_) => PendingRow::Raw(line.clone()),
            };

            if let PendingRow::Untranslated(_) = entry {
                queued += 1;
            } else if pending.is_empty() {
                // Nothing waits for a translation, so order is kept by writing now
                Self::write_pending(&mut writer, entry, &mut summary)?;
                continue;
            }
            pending.push(entry);

            if queued == batch_size {
                self.translate_pending(translator, &aligner, std::mem::take(&mut pending), &mut writer, &mut summary).await?;
                queued = 0;
            }
        }

        if !pending.is_empty() {
            self.translate_pending(translator, &aligner, pending, &mut writer, &mut summary).await?;
        }
        writer.flush()?;

        info!("Translated {} lines in {} requests ({} characters)", summary.translated, summary.batches, summary.characters);
        info!("SUB-TRANS: {}", summary.subtitle_matches);
        info!("ONLY-TRANS: {}", summary.translation_only);
        Ok(summary)
    }

    /// Count row statuses of a corpus file, the corpus file by default
    pub fn corpus_stats(&self, path: Option<&Path>) -> Result<CorpusStats> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| self.config.dataset.corpus_path());
        if !FileManager::file_exists(&path) {
            return Err(anyhow!("Corpus file does not exist: {:?}", path));
        }

        let stats = CorpusStats::from_file(&path)?;
        if stats.malformed > 0 {
            warn!("{} rows of {:?} are not valid corpus rows", stats.malformed, path);
        }
        Ok(stats)
    }

    /// Compare the id column of a corpus file with another one, the corpus file by default
    pub fn compare_corpus_ids(&self, other: &Path, base: Option<&Path>) -> Result<Vec<IdMismatch>> {
        let base = base.map(Path::to_path_buf).unwrap_or_else(|| self.config.dataset.corpus_path());
        for path in [base.as_path(), other] {
            if !FileManager::file_exists(path) {
                return Err(anyhow!("Corpus file does not exist: {:?}", path));
            }
        }

        let mismatches = compare_ids(&base, other)?;
        for mismatch in &mismatches {
            debug!("{}", mismatch);
        }
        info!("Compared ids of {:?} and {:?}: {} mismatches", base, other, mismatches.len());
        Ok(mismatches)
    }

    /// Write every turn of the Cornell movie dialogs as an untranslated corpus row
    ///
    /// Resumes after the rows the output already holds.
    pub fn generate_cornell_corpus(&self) -> Result<CornellSummary> {
        let dataset_config = &self.config.dataset;
        let lines_path = dataset_config.cornell_lines_path();
        let conversations_path = dataset_config.cornell_conversations_path();
        let output_path = dataset_config.cornell_corpus_path();

        for path in [&lines_path, &conversations_path] {
            if !FileManager::file_exists(path) {
                return Err(anyhow!("Input file does not exist: {:?}", path));
            }
        }

        let dataset = CornellDataset::load(&lines_path, &conversations_path)
            .with_context(|| format!("Cannot read the Cornell dataset from {:?}", conversations_path))?;
        let turns = dataset.turns()?;
        let resumed_from = CorpusWriter::written_rows(&output_path)?;
        let mut summary = CornellSummary {
            conversations: dataset.conversation_count(),
            turns: turns.len(),
            resumed_from,
            written: 0,
        };

        if resumed_from >= turns.len() {
            info!("Cornell corpus {:?} already holds all {} rows", output_path, turns.len());
            return Ok(summary);
        }

        let mut writer = CorpusWriter::open(&output_path)?;
        for turn in &turns[resumed_from..] {
            writer.append(&turn.to_corpus_row())?;
        }
        writer.flush()?;
        summary.written = writer.appended();

        info!("Wrote {} dialogue turns from {} conversations to {:?}", summary.written, summary.conversations, output_path);
        Ok(summary)
    }

    /// Machine-translate every row of the Cornell corpus
    ///
    /// Rows are sent `batch_size` at a time and written once their batch is
    /// translated, so an interrupted run resumes at the first missing batch.
    pub async fn translate_cornell_corpus(&self, translator: &dyn Translator) -> Result<TranslationSummary> {
        let input_path = self.config.dataset.cornell_corpus_path();
        let output_path = self.config.dataset.cornell_translated_path();

        let lines = Self::read_input(&input_path)?;
        let resumed_from = CorpusWriter::written_rows(&output_path)?;
        let mut summary = TranslationSummary::default();

        if resumed_from >= lines.len() {
            info!("Translated Cornell corpus {:?} already holds all {} rows", output_path, lines.len());
            return Ok(summary);
        }
        info!("### Starting at row {} ###", resumed_from + 1);

        let batch_size = self.config.translation.batch_size.max(1);
        let mut writer = CorpusWriter::open(&output_path)?;

        for (round, chunk) in lines[resumed_from..].chunks(batch_size).enumerate() {
            let first_row = resumed_from + round * batch_size;
            let mut rows = chunk.iter()
                .enumerate()
                .map(|(offset, line)| {
                    CorpusRow::parse(line)
                        .with_context(|| format!("Invalid row {} in {:?}", first_row + offset + 1, input_path))
                })
                .collect::<Result<Vec<_>>>()?;

            let en_lines: Vec<String> = rows.iter().map(|row| row.en_line.clone()).collect();
            let characters: usize = en_lines.iter().map(|line| line.chars().count()).sum();

            let translations = translator.translate(&en_lines).await
                .context("Translation request failed")?;
            if translations.len() != en_lines.len() {
                return Err(anyhow!("Expected {} translations, received {}", en_lines.len(), translations.len()));
            }

            for (row, translation) in rows.iter_mut().zip(translations) {
                row.pt_line = translation;
                writer.append(row)?;
            }
            writer.flush()?;

            summary.batches += 1;
            summary.translated += rows.len();
            summary.translation_only += rows.len();
            summary.characters += characters;
            info!("TRANSLATED: {} characters -- TOTAL: {} characters", characters, summary.characters);
        }

        Ok(summary)
    }

    /// Parse every subtitle file of both languages and report the ones that fail
    pub fn lint_subtitles(&self) -> Result<LintReport> {
        let locator = SubtitleLocator::from_dataset(&self.config.dataset);
        let mut report = LintReport::default();

        for track in [Track::Source, Track::Target] {
            let dir = locator.track_dir(track);
            if !FileManager::dir_exists(dir) {
                warn!("{} subtitle folder {:?} does not exist", track, dir);
                continue;
            }

            for path in FileManager::find_files(dir, "srt")? {
                let content = FileManager::read_text_lossless(&path)?;
                report.files += 1;

                match CueParser::parse(&content, track) {
                    Ok(cues) => {
                        debug!("{:?}: {} cues", path, cues.len());
                        report.cues += cues.len();
                    }
                    Err(e) => {
                        error!("{:?}: {}", path, e);
                        report.malformed.push((path, e));
                    }
                }
            }
        }

        info!("Checked {} subtitle files, {} cues, {} malformed", report.files, report.cues, report.malformed.len());
        Ok(report)
    }

    fn batch_aligner(&self, alignment: &AlignmentConfig) -> BatchAligner {
        BatchAligner::new(self.store.clone(), alignment, self.config.concurrent_matches)
    }

    fn read_input(path: &Path) -> Result<Vec<String>> {
        if !FileManager::file_exists(path) {
            return Err(anyhow!("Input file does not exist: {:?}", path));
        }
        Ok(read_data_lines(path)?)
    }

    /// Preload the subtitles a batch needs, then align it with a progress bar
    async fn run_batch(
        &self,
        aligner: &BatchAligner,
        requests: Vec<AlignmentRequest>,
        mode: MatchMode,
        summary: &mut AlignmentSummary,
    ) -> Result<Vec<AlignmentResult>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let report = aligner.prepare(&requests, mode);
        debug!("Preloaded subtitles: {} parsed, {} cached", report.loaded, report.cached);
        for file in self.check_preload(report)? {
            summary.skip_file(file);
        }

        let progress_bar = Self::progress_bar(requests.len() as u64);
        let pb = progress_bar.clone();
        let results = aligner.align_all(requests, mode, move |completed, _total| {
            pb.set_position(completed as u64);
        }).await;
        progress_bar.finish_and_clear();

        Ok(results)
    }

    /// Files to skip, or the first failure that must abort the run
    fn check_preload(&self, report: PreloadReport) -> Result<Vec<String>> {
        let mut skipped = Vec::new();

        for (file, error) in report.failures {
            match error {
                AppError::Subtitle { .. } if self.config.skip_malformed_files => {
                    warn!("Skipping {}, its rows count as misses: {}", file, error);
                    skipped.push(file);
                }
                other => {
                    return Err(anyhow::Error::new(other).context(format!("Cannot align rows of {}", file)));
                }
            }
        }

        Ok(skipped)
    }

    async fn translate_pending(
        &self,
        translator: &dyn Translator,
        aligner: &BatchAligner,
        pending: Vec<PendingRow>,
        writer: &mut CorpusWriter,
        summary: &mut TranslationSummary,
    ) -> Result<()> {
        let untranslated: Vec<&CorpusRow> = pending.iter()
            .filter_map(|entry| match entry {
                PendingRow::Untranslated(row) => Some(row),
                _ => None,
            })
            .collect();
        let lines: Vec<String> = untranslated.iter().map(|row| row.en_line.clone()).collect();
        let characters: usize = lines.iter().map(|line| line.chars().count()).sum();

        let translations = translator.translate(&lines).await
            .context("Translation request failed")?;
        if translations.len() != lines.len() {
            return Err(anyhow!("Expected {} translations, received {}", lines.len(), translations.len()));
        }

        let requests = untranslated.iter()
            .zip(&translations)
            .enumerate()
            .map(|(index, (row, translation))| AlignmentRequest::new(index, row.filename.as_str(), translation.as_str()))
            .collect();
        let mut alignment = AlignmentSummary::default();
        let results = self.run_batch(aligner, requests, MatchMode::TextOnly(Track::Target), &mut alignment).await?;

        summary.batches += 1;
        summary.translated += lines.len();
        summary.characters += characters;
        info!("Translated {} characters, {} in total", characters, summary.characters);

        let mut translated = translations.into_iter().zip(results);
        for entry in pending {
            let entry = match entry {
                PendingRow::Untranslated(mut row) => {
                    let (translation, result) = translated.next()
                        .ok_or_else(|| anyhow!("Missing translation for row {}", row.id))?;
                    row.pt_line = match &result.cue {
                        Some(cue) => {
                            summary.subtitle_matches += 1;
                            format!("{}{}", SUBTITLE_TRANSLATION_PREFIX, cue.text())
                        }
                        None => {
                            summary.translation_only += 1;
                            format!("{}{}", ONLY_TRANSLATION_PREFIX, translation)
                        }
                    };
                    PendingRow::Done(row)
                }
                other => other,
            };
            Self::write_pending(writer, entry, summary)?;
        }
        writer.flush()?;

        Ok(())
    }

    fn write_pending(writer: &mut CorpusWriter, entry: PendingRow, summary: &mut TranslationSummary) -> Result<()> {
        match entry {
            PendingRow::Raw(line) => {
                summary.copied += 1;
                writer.append_raw(&line)?;
            }
            PendingRow::Done(row) | PendingRow::Untranslated(row) => {
                writer.append(&row)?;
            }
        }
        Ok(())
    }

    fn progress_bar(total: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(total);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Matching");
        progress_bar
    }

    fn log_summary(&self, pass: &str, summary: &AlignmentSummary, elapsed: std::time::Duration) {
        info!("{} finished in {}", pass, Self::format_duration(elapsed));
        info!("TOTAL: {}", summary.aligned());
        info!("HITS: {}", summary.hits);
        info!("MISSES: {}", summary.misses);
        if summary.copied > 0 {
            info!("COPIED: {}", summary.copied);
        }
        for file in &summary.skipped_files {
            warn!("Skipped unparseable subtitles of {}", file);
        }
        let (hits, loads) = self.store.stats();
        debug!("Subtitle store: {} files parsed, {} cache hits", loads, hits);
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
