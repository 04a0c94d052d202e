/*!
 * Transcript and corpus files.
 *
 * - `row`: column layouts, quoting and row status classification
 * - `cornell`: turns of the Cornell movie-dialog dataset
 * - `writer`: append-only corpus output, resume offsets, statistics and id checks
 */

pub mod cornell;
pub mod row;
pub mod writer;

pub use cornell::{CornellDataset, DialogueTurn};
pub use row::{CorpusRow, RowStatus, ScriptRow, CORPUS_HEADER};
pub use writer::{compare_ids, read_data_lines, CorpusStats, CorpusWriter, IdMismatch};
