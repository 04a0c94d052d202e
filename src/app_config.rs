use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::ConfigurationError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO), the language reference lines are written in
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO), the language the corpus is completed with
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Dataset locations
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Settings of the first alignment pass
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Looser settings of the review pass
    #[serde(default = "AlignmentConfig::review")]
    pub review_alignment: AlignmentConfig,

    /// Translation service config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Maximum number of lines matched in parallel
    #[serde(default = "default_concurrent_matches")]
    pub concurrent_matches: usize,

    /// Treat rows of unparseable subtitle files as misses instead of aborting
    #[serde(default)]
    pub skip_malformed_files: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Where the transcript, subtitles and corpus files live
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatasetConfig {
    // @field: Base directory, "~/" is expanded
    #[serde(default = "default_dataset_root")]
    pub root: String,

    // @field: Subtitles of the source language, one folder per season
    #[serde(default = "default_source_subtitles")]
    pub source_subtitles: String,

    // @field: Subtitles of the target language, one folder per season
    #[serde(default = "default_target_subtitles")]
    pub target_subtitles: String,

    // @field: Transcript the corpus is built from
    #[serde(default = "default_script_file")]
    pub script_file: String,

    // @field: Output of the align pass
    #[serde(default = "default_corpus_file")]
    pub corpus_file: String,

    // @field: Output of the review and translate passes
    #[serde(default = "default_revised_corpus_file")]
    pub revised_corpus_file: String,

    // @field: Cornell movie lines
    #[serde(default = "default_cornell_lines_file")]
    pub cornell_lines_file: String,

    // @field: Cornell conversations, as lists of movie line ids
    #[serde(default = "default_cornell_conversations_file")]
    pub cornell_conversations_file: String,

    // @field: Untranslated Cornell corpus
    #[serde(default = "default_cornell_corpus_file")]
    pub cornell_corpus_file: String,

    // @field: Translated Cornell corpus
    #[serde(default = "default_cornell_translated_file")]
    pub cornell_translated_file: String,
}

impl DatasetConfig {
    /// Resolve a dataset-relative path against the root
    pub fn resolve(&self, relative: &str) -> PathBuf {
        crate::file_utils::FileManager::expand_home(&self.root).join(relative)
    }

    pub fn source_subtitles_dir(&self) -> PathBuf {
        self.resolve(&self.source_subtitles)
    }

    pub fn target_subtitles_dir(&self) -> PathBuf {
        self.resolve(&self.target_subtitles)
    }

    pub fn script_path(&self) -> PathBuf {
        self.resolve(&self.script_file)
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.resolve(&self.corpus_file)
    }

    pub fn revised_corpus_path(&self) -> PathBuf {
        self.resolve(&self.revised_corpus_file)
    }

    pub fn cornell_lines_path(&self) -> PathBuf {
        self.resolve(&self.cornell_lines_file)
    }

    pub fn cornell_conversations_path(&self) -> PathBuf {
        self.resolve(&self.cornell_conversations_file)
    }

    pub fn cornell_corpus_path(&self) -> PathBuf {
        self.resolve(&self.cornell_corpus_file)
    }

    pub fn cornell_translated_path(&self) -> PathBuf {
        self.resolve(&self.cornell_translated_file)
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: default_dataset_root(),
            source_subtitles: default_source_subtitles(),
            target_subtitles: default_target_subtitles(),
            script_file: default_script_file(),
            corpus_file: default_corpus_file(),
            revised_corpus_file: default_revised_corpus_file(),
            cornell_lines_file: default_cornell_lines_file(),
            cornell_conversations_file: default_cornell_conversations_file(),
            cornell_corpus_file: default_cornell_corpus_file(),
            cornell_translated_file: default_cornell_translated_file(),
        }
    }
}

/// Matching thresholds shared by the text and time aligners
///
/// Values are checked on construction, including deserialization, so an
/// `AlignmentConfig` in hand is always usable.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(try_from = "AlignmentConfigFile")]
pub struct AlignmentConfig {
    time_tolerance_ms: i64,
    similarity_acceptance: f64,
}

/// Unchecked form of [`AlignmentConfig`] as written in the config file
#[derive(Deserialize)]
struct AlignmentConfigFile {
    #[serde(default = "default_time_tolerance_ms")]
    time_tolerance_ms: i64,

    #[serde(default = "default_similarity_acceptance")]
    similarity_acceptance: f64,
}

impl TryFrom<AlignmentConfigFile> for AlignmentConfig {
    type Error = ConfigurationError;

    fn try_from(raw: AlignmentConfigFile) -> Result<Self, Self::Error> {
        Self::new(raw.time_tolerance_ms, raw.similarity_acceptance)
    }
}

impl AlignmentConfig {
    // @param time_tolerance_ms: Slack allowed on each window bound
    // @param similarity_acceptance: Edit distance allowed per reference character
    pub fn new(time_tolerance_ms: i64, similarity_acceptance: f64) -> Result<Self, ConfigurationError> {
        if time_tolerance_ms <= 0 {
            return Err(ConfigurationError::NonPositiveTolerance(time_tolerance_ms));
        }
        if !similarity_acceptance.is_finite() || similarity_acceptance <= 0.0 {
            return Err(ConfigurationError::NonPositiveAcceptance(similarity_acceptance));
        }

        Ok(Self {
            time_tolerance_ms,
            similarity_acceptance,
        })
    }

    /// Preset of the review pass
    pub fn review() -> Self {
        Self {
            time_tolerance_ms: 600,
            similarity_acceptance: 0.3,
        }
    }

    pub fn time_tolerance_ms(&self) -> i64 {
        self.time_tolerance_ms
    }

    pub fn similarity_acceptance(&self) -> f64 {
        self.similarity_acceptance
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            time_tolerance_ms: default_time_tolerance_ms(),
            similarity_acceptance: default_similarity_acceptance(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Service URL of the translateText call
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,

    /// Language code sent as sourceLanguageCode
    #[serde(default = "default_source_language")]
    pub source_language_code: String,

    /// Language code sent as targetLanguageCode
    #[serde(default = "default_target_language")]
    pub target_language_code: String,

    /// Static bearer token; takes precedence over `auth_command`
    #[serde(default)]
    pub api_key: String,

    /// Shell command printing a fresh access token
    #[serde(default)]
    pub auth_command: Option<String>,

    /// Lines sent per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Pause before retrying when the service cannot be reached
    #[serde(default = "default_offline_wait_secs")]
    pub offline_wait_secs: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translation_endpoint(),
            source_language_code: default_source_language(),
            target_language_code: default_target_language(),
            api_key: String::new(),
            auth_command: None,
            batch_size: default_batch_size(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            offline_wait_secs: default_offline_wait_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "pt".to_string()
}

fn default_dataset_root() -> String {
    "~/PUCRS/pt-br-corpus-generator".to_string()
}

fn default_source_subtitles() -> String {
    "Dataset/FRIENDS-en-us".to_string()
}

fn default_target_subtitles() -> String {
    "Dataset/FRIENDS-pt-br".to_string()
}

fn default_script_file() -> String {
    "Dataset/friends-original.csv".to_string()
}

fn default_corpus_file() -> String {
    "friends-final.csv".to_string()
}

fn default_revised_corpus_file() -> String {
    "friends-final-2.csv".to_string()
}

fn default_cornell_lines_file() -> String {
    "Dataset/cornell/movie_lines.txt".to_string()
}

fn default_cornell_conversations_file() -> String {
    "Dataset/cornell/movie_conversations.txt".to_string()
}

fn default_cornell_corpus_file() -> String {
    "cornell-dataset.csv".to_string()
}

fn default_cornell_translated_file() -> String {
    "cornell-dataset-2.csv".to_string()
}

fn default_time_tolerance_ms() -> i64 {
    300
}

fn default_similarity_acceptance() -> f64 {
    0.25
}

fn default_translation_endpoint() -> String {
    "https://translation.googleapis.com/v3/projects/corpus-generator:translateText".to_string()
}

fn default_batch_size() -> usize {
    128
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_offline_wait_secs() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_concurrent_matches() -> usize {
    8
}

impl Config {
    /// Load the configuration file, writing the defaults first when it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .context(format!("Failed to open config file: {:?}", path))?;

            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .context(format!("Failed to parse config file: {:?}", path))?;

            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();

        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(path, config_json)
            .context(format!("Failed to write default config to file: {:?}", path))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        if crate::language_utils::language_codes_match(&self.source_language, &self.target_language) {
            return Err(anyhow!("Source and target languages must differ, both are '{}'", self.source_language));
        }

        if self.concurrent_matches == 0 {
            return Err(ConfigurationError::Invalid("concurrent_matches must be at least 1".to_string()).into());
        }

        if self.translation.batch_size == 0 {
            return Err(ConfigurationError::Invalid("translation.batch_size must be at least 1".to_string()).into());
        }

        if self.translation.endpoint.trim().is_empty() {
            return Err(anyhow!("Translation endpoint must not be empty"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            dataset: DatasetConfig::default(),
            alignment: AlignmentConfig::default(),
            review_alignment: AlignmentConfig::review(),
            translation: TranslationConfig::default(),
            concurrent_matches: default_concurrent_matches(),
            skip_malformed_files: false,
            log_level: LogLevel::default(),
        }
    }
}
