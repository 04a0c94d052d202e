use std::fmt;

use crate::errors::AppError;

// @module: Semicolon-separated transcript and corpus rows

// @const: Header of every corpus file
pub const CORPUS_HEADER: &str = "id;scene_id;person;en_us_line;pt_br_line;filename";

// @const: Status prefixes written into the target-language column
pub const REVIEW_PREFIX: &str = "REVIEW: ";
pub const ONLY_TRANSLATION_PREFIX: &str = "ONLY-TRANS: ";
pub const SUBTITLE_TRANSLATION_PREFIX: &str = "SUB-TRANS: ";

const SEPARATOR: char = ';';
const QUOTE: char = '"';

/// One dialogue line of the source transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRow {
    pub id: String,
    pub scene_id: String,
    pub person: String,
    pub gender: String,
    pub original_line: String,
    pub line: String,
    pub metadata: String,
    pub filename: String,
}

impl ScriptRow {
    pub const COLUMNS: usize = 8;

    pub fn parse(row: &str) -> Result<Self, AppError> {
        let columns = split_columns(row);
        let [id, scene_id, person, gender, original_line, line, metadata, filename]: [String; 8] =
            columns.try_into().map_err(|columns: Vec<String>| {
                AppError::Corpus(format!("Expected {} columns, found {}: '{}'", Self::COLUMNS, columns.len(), row))
            })?;

        Ok(Self { id, scene_id, person, gender, original_line, line, metadata, filename })
    }
}

/// One row of the aligned corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRow {
    pub id: String,
    pub scene_id: String,
    pub person: String,
    pub en_line: String,
    pub pt_line: String,
    pub filename: String,
}

impl CorpusRow {
    pub const COLUMNS: usize = 6;

    pub fn parse(row: &str) -> Result<Self, AppError> {
        let columns = split_columns(row);
        let [id, scene_id, person, en_line, pt_line, filename]: [String; 6] =
            columns.try_into().map_err(|columns: Vec<String>| {
                AppError::Corpus(format!("Expected {} columns, found {}: '{}'", Self::COLUMNS, columns.len(), row))
            })?;

        Ok(Self { id, scene_id, person, en_line, pt_line, filename })
    }

    /// Corpus row for a transcript line, with the given texts
    pub fn from_script(script: &ScriptRow, en_line: impl Into<String>, pt_line: impl Into<String>) -> Self {
        Self {
            id: script.id.clone(),
            scene_id: script.scene_id.clone(),
            person: script.person.clone(),
            en_line: en_line.into(),
            pt_line: pt_line.into(),
            filename: script.filename.clone(),
        }
    }

    pub fn status(&self) -> RowStatus {
        RowStatus::classify(&self.pt_line)
    }
}

impl fmt::Display for CorpusRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{}",
            self.id,
            self.scene_id,
            self.person,
            escape_field(&self.en_line),
            escape_field(&self.pt_line),
            self.filename
        )
    }
}

/// How the target-language column of a corpus row was filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowStatus {
    /// Aligned by the first pass
    Hit,
    /// Aligned by the review pass
    Review,
    /// Machine translation with no matching subtitle
    OnlyTranslation,
    /// Subtitle found through its machine translation
    SubtitleTranslation,
    /// Not filled yet
    Miss,
}

impl RowStatus {
    pub fn classify(pt_line: &str) -> Self {
        if pt_line.is_empty() {
            Self::Miss
        } else if pt_line.starts_with(REVIEW_PREFIX) {
            Self::Review
        } else if pt_line.starts_with(ONLY_TRANSLATION_PREFIX) {
            Self::OnlyTranslation
        } else if pt_line.starts_with(SUBTITLE_TRANSLATION_PREFIX) {
            Self::SubtitleTranslation
        } else {
            Self::Hit
        }
    }
}

/// Split a row on `;`, where a field opening with `"` runs to the next `"`
pub fn split_columns(row: &str) -> Vec<String> {
    let mut columns = Vec::new();
    let mut rest = row;

    loop {
        if let Some(quoted) = rest.strip_prefix(QUOTE) {
            let (value, after) = quoted.split_once(QUOTE).unwrap_or((quoted, ""));
            columns.push(value.to_string());
            // Skip anything between the closing quote and the next separator
            match after.split_once(SEPARATOR) {
                Some((_, next)) => rest = next,
                None => break,
            }
        } else {
            match rest.split_once(SEPARATOR) {
                Some((value, next)) => {
                    columns.push(value.to_string());
                    rest = next;
                }
                None => {
                    columns.push(rest.to_string());
                    break;
                }
            }
        }
    }

    columns
}

/// Quote a text field containing the separator, dropping inner quotes
pub fn escape_field(field: &str) -> String {
    if field.contains(SEPARATOR) {
        format!("{}{}{}", QUOTE, field.replace(QUOTE, ""), QUOTE)
    } else {
        field.to_string()
    }
}
