/*!
 * Cornell movie-dialog dataset.
 *
 * `movie_lines.txt` holds one line per row as
 * `<line id> +++$+++ <user id> +++$+++ <movie id> +++$+++ <character> +++$+++ <text>`;
 * `movie_conversations.txt` lists the line ids of each conversation in its
 * fourth field, as `['L194', 'L195']`. Every conversation becomes a scene and
 * every line a dialogue turn of the corpus.
 */

use std::collections::HashMap;
use std::path::Path;
use log::{debug, warn};

use crate::errors::AppError;
use crate::file_utils::FileManager;

use super::row::CorpusRow;

// @const: Field separator of both Cornell files
pub const FIELD_SEPARATOR: &str = " +++$+++ ";

// @const: Filename column of rows that do not come from a subtitled episode
pub const NO_FILENAME: &str = "-";

/// Speaker and text of one movie line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieLine {
    pub character: String,
    pub text: String,
}

/// One line of a conversation, numbered across the whole dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueTurn {
    pub id: usize,
    pub scene_id: usize,
    pub character: String,
    pub line: String,
}

impl DialogueTurn {
    /// Untranslated corpus row, with quotes removed from the line
    pub fn to_corpus_row(&self) -> CorpusRow {
        CorpusRow {
            id: self.id.to_string(),
            scene_id: self.scene_id.to_string(),
            person: self.character.clone(),
            en_line: self.line.replace('"', ""),
            pt_line: String::new(),
            filename: NO_FILENAME.to_string(),
        }
    }
}

/// Movie lines and conversations loaded from the dataset files
#[derive(Debug, Default)]
pub struct CornellDataset {
    lines: HashMap<String, MovieLine>,
    conversations: Vec<Vec<String>>,
}

impl CornellDataset {
    pub fn load(lines_path: &Path, conversations_path: &Path) -> Result<Self, AppError> {
        let lines = FileManager::read_text_lossless(lines_path)?;
        let conversations = FileManager::read_text_lossless(conversations_path)?;
        Self::parse(&lines, &conversations)
    }

    pub fn parse(lines: &str, conversations: &str) -> Result<Self, AppError> {
        let mut dataset = Self::default();

        for (number, row) in Self::rows(lines) {
            let fields: Vec<&str> = row.splitn(5, FIELD_SEPARATOR).collect();
            let [line_id, _, _, character, text]: [&str; 5] = fields.try_into()
                .map_err(|_| AppError::Corpus(format!("Movie line {} has fewer than 5 fields: '{}'", number, row)))?;

            dataset.lines.insert(line_id.trim().to_string(), MovieLine {
                character: character.to_string(),
                text: text.to_string(),
            });
        }

        for (number, row) in Self::rows(conversations) {
            let ids_field = row.split(FIELD_SEPARATOR).nth(3)
                .ok_or_else(|| AppError::Corpus(format!("Conversation {} has no line ids: '{}'", number, row)))?;

            let ids = ids_field
                .chars()
                .filter(|c| !matches!(c, ' ' | '\'' | '[' | ']'))
                .collect::<String>()
                .split(',')
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            dataset.conversations.push(ids);
        }

        debug!("Loaded {} movie lines and {} conversations", dataset.lines.len(), dataset.conversations.len());
        Ok(dataset)
    }

    pub fn line(&self, id: &str) -> Option<&MovieLine> {
        self.lines.get(id)
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Dialogue turns of every complete conversation, in file order
    ///
    /// A conversation holding an empty line is skipped and does not take a
    /// scene id. An unknown line id is an error.
    pub fn turns(&self) -> Result<Vec<DialogueTurn>, AppError> {
        let mut turns = Vec::new();
        let mut scene_id = 0;

        for (index, ids) in self.conversations.iter().enumerate() {
            let lines = ids.iter()
                .map(|id| {
                    self.line(id).ok_or_else(|| {
                        AppError::Corpus(format!("Conversation {} refers to unknown line {}", index + 1, id))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            if lines.iter().any(|line| line.text.is_empty()) {
                warn!("Skipping conversation {} with an empty line", index + 1);
                continue;
            }

            scene_id += 1;
            for line in lines {
                turns.push(DialogueTurn {
                    id: turns.len() + 1,
                    scene_id,
                    character: line.character.clone(),
                    line: line.text.clone(),
                });
            }
        }

        Ok(turns)
    }

    /// Non-empty rows with their 1-based line numbers
    fn rows(content: &str) -> impl Iterator<Item = (usize, &str)> {
        content.split('\n')
            .enumerate()
            .map(|(index, row)| (index + 1, row.trim_end_matches('\r')))
            .filter(|(_, row)| !row.is_empty())
    }
}
