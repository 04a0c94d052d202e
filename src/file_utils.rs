use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use log::debug;

use crate::app_config::DatasetConfig;
use crate::cue::Track;
use crate::cue_store::CueSource;
use crate::errors::AppError;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @expands: Leading "~/" to the home directory
    pub fn expand_home(path: &str) -> PathBuf {
        match path.strip_prefix("~/") {
            Some(rest) => match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => PathBuf::from(path),
            },
            None => PathBuf::from(path),
        }
    }

    /// Find files with a specific extension in a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let extension = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            let matches = path.extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
            if path.is_file() && matches {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Read a text file as UTF-8, decoding it as Latin-1 when it is not valid UTF-8
    pub fn read_text_lossless<P: AsRef<Path>>(path: P) -> Result<String> {
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))?;

        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                debug!("{:?} is not UTF-8, decoding as Latin-1", path.as_ref());
                Ok(e.into_bytes().iter().map(|&byte| byte as char).collect())
            }
        }
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

/// Resolves corpus filenames to subtitle files of the dataset
///
/// The transcript names episodes like `0101.txt`; the matching subtitles live
/// at `<track folder>/01/0101.srt`, one folder per season.
#[derive(Debug, Clone)]
pub struct SubtitleLocator {
    source_dir: PathBuf,
    target_dir: PathBuf,
}

impl SubtitleLocator {
    pub fn new(source_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
        }
    }

    pub fn from_dataset(dataset: &DatasetConfig) -> Self {
        Self::new(dataset.source_subtitles_dir(), dataset.target_subtitles_dir())
    }

    pub fn track_dir(&self, track: Track) -> &Path {
        match track {
            Track::Source => &self.source_dir,
            Track::Target => &self.target_dir,
        }
    }

    /// Path of the subtitle file for a transcript filename
    pub fn subtitle_path(&self, filename: &str, track: Track) -> PathBuf {
        let name = Path::new(filename.trim());
        let season: String = name.to_string_lossy().chars().take(2).collect();

        self.track_dir(track)
            .join(season)
            .join(name.with_extension("srt"))
    }
}

impl CueSource for SubtitleLocator {
    fn load(&self, filename: &str, track: Track) -> Result<String, AppError> {
        let path = self.subtitle_path(filename, track);
        if !FileManager::file_exists(&path) {
            return Err(AppError::File(format!("Subtitle file not found: {:?}", path)));
        }

        FileManager::read_text_lossless(&path)
            .map_err(|e| AppError::File(format!("{:#}", e)))
    }
}
