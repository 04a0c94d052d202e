/*!
 * Alignment of dialogue lines against subtitle tracks.
 *
 * - `text`: matches a reference line to a cue of the source track, stitching
 *   lines that the subtitles split over several cues
 * - `time`: matches a source cue to the cue(s) shown at the same time in the
 *   target track
 * - `batch`: runs both over many lines in parallel, preserving input order
 * - `levenshtein`: the edit distance used by the text aligner
 */

pub mod batch;
pub mod levenshtein;
pub mod text;
pub mod time;

pub use batch::{AlignmentRequest, AlignmentResult, BatchAligner, MatchMode};
pub use levenshtein::levenshtein;
pub use text::TextAligner;
pub use time::TimeAligner;
