/*!
 * Append-only corpus files.
 *
 * A corpus file starts with the header line; every row is appended with a
 * leading newline so the file never ends with an empty line. The number of
 * rows already written is what a resumed run skips in its input.
 */

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use log::debug;

use crate::errors::AppError;
use crate::file_utils::FileManager;

use super::row::{split_columns, CorpusRow, RowStatus, CORPUS_HEADER};

/// Appends rows to a corpus file
pub struct CorpusWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    appended: usize,
}

impl CorpusWriter {
    /// Open a corpus file for appending, creating it with the header when missing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            FileManager::ensure_dir(parent)?;
        }

        let is_new = !FileManager::file_exists(&path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::File(format!("Failed to open corpus file {:?}: {}", path, e)))?;

        let mut writer = BufWriter::new(file);
        if is_new {
            debug!("Creating corpus file {:?}", path);
            writer.write_all(CORPUS_HEADER.as_bytes())?;
            writer.flush()?;
        }

        Ok(Self { path, writer, appended: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this writer
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn append(&mut self, row: &CorpusRow) -> Result<(), AppError> {
        self.append_raw(&row.to_string())
    }

    /// Append a line as is, for rows that could not be parsed
    pub fn append_raw(&mut self, line: &str) -> Result<(), AppError> {
        write!(self.writer, "\n{}", line)?;
        self.appended += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), AppError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of data rows in an existing corpus file, 0 when it does not exist
    pub fn written_rows(path: &Path) -> Result<usize, AppError> {
        if !FileManager::file_exists(path) {
            return Ok(0);
        }
        let content = FileManager::read_text_lossless(path)?;
        Ok(content.split('\n').count().saturating_sub(1))
    }
}

impl Drop for CorpusWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Read the data lines of a transcript or corpus file, skipping the header
pub fn read_data_lines(path: &Path) -> Result<Vec<String>, AppError> {
    let content = FileManager::read_text_lossless(path)?;

    Ok(content
        .split('\n')
        .skip(1)
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

/// Tally of row statuses in a corpus file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorpusStats {
    pub hits: usize,
    pub reviews: usize,
    pub only_translations: usize,
    pub subtitle_translations: usize,
    pub misses: usize,
    /// Lines that are not valid corpus rows
    pub malformed: usize,
}

impl CorpusStats {
    pub fn record(&mut self, status: RowStatus) {
        match status {
            RowStatus::Hit => self.hits += 1,
            RowStatus::Review => self.reviews += 1,
            RowStatus::OnlyTranslation => self.only_translations += 1,
            RowStatus::SubtitleTranslation => self.subtitle_translations += 1,
            RowStatus::Miss => self.misses += 1,
        }
    }

    /// Tally the rows of a corpus file, header excluded
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let mut stats = Self::default();
        for line in read_data_lines(path)? {
            match CorpusRow::parse(&line) {
                Ok(row) => stats.record(row.status()),
                Err(_) => stats.malformed += 1,
            }
        }
        Ok(stats)
    }

    pub fn total(&self) -> usize {
        self.hits + self.reviews + self.only_translations + self.subtitle_translations + self.misses
    }
}

impl fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TOTAL: {}", self.total())?;
        writeln!(f, "HITS: {}", self.hits)?;
        writeln!(f, "REVIEWS: {}", self.reviews)?;
        writeln!(f, "ONLY-TRANS: {}", self.only_translations)?;
        writeln!(f, "SUB-TRANS: {}", self.subtitle_translations)?;
        write!(f, "MISSES: {}", self.misses)?;
        if self.malformed > 0 {
            write!(f, "\nMALFORMED: {}", self.malformed)?;
        }
        Ok(())
    }
}

/// A data row whose id differs between two corpus files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMismatch {
    /// 1-based data row position
    pub row: usize,
    /// Id in the first file, `None` past its end
    pub id: Option<String>,
    /// Id in the second file, `None` past its end
    pub other_id: Option<String>,
}

impl fmt::Display for IdMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ROW: {} -- ID: {} -- OTHER ID: {}",
            self.row,
            self.id.as_deref().unwrap_or("-"),
            self.other_id.as_deref().unwrap_or("-")
        )
    }
}

/// Compare the id column of two corpus files row by row
///
/// A pass that copies its input keeps every id at the same row, so any
/// mismatch means the output fell out of step with its input.
pub fn compare_ids(path: &Path, other: &Path) -> Result<Vec<IdMismatch>, AppError> {
    let ids = read_ids(path)?;
    let other_ids = read_ids(other)?;

    let mismatches = (0..ids.len().max(other_ids.len()))
        .filter_map(|index| {
            let id = ids.get(index);
            let other_id = other_ids.get(index);
            (id != other_id).then(|| IdMismatch {
                row: index + 1,
                id: id.cloned(),
                other_id: other_id.cloned(),
            })
        })
        .collect();

    Ok(mismatches)
}

fn read_ids(path: &Path) -> Result<Vec<String>, AppError> {
    Ok(read_data_lines(path)?
        .iter()
        .map(|line| split_columns(line).into_iter().next().unwrap_or_default())
        .collect())
}
