/*!
 * Text alignment of a reference line against a cue sequence.
 *
 * Strategies are tried in order and the first success wins:
 * 1. direct best match by edit distance
 * 2. stitching forward from a cue that is a prefix of the line
 * 3. stitching backward from a cue that is a suffix of the line
 * 4. stitching around a cue contained in the line
 *
 * A cue (or stitched run of cues) is admissible when its distance to the
 * reference is strictly below `acceptance * len(reference)`.
 */

use log::debug;

use crate::app_config::AlignmentConfig;
use crate::cue::Cue;

use super::levenshtein::distance_from_chars;

/// Finds the cue, or run of consecutive cues, that best reproduces a line
#[derive(Debug, Clone, Copy)]
pub struct TextAligner {
    similarity_acceptance: f64,
}

/// Reference line prepared for repeated distance queries
struct Reference<'a> {
    text: &'a str,
    chars: Vec<char>,
    bound: f64,
}

impl<'a> Reference<'a> {
    fn new(text: &'a str, acceptance: f64) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let bound = chars.len() as f64 * acceptance;
        Self { text, chars, bound }
    }

    fn distance(&self, candidate: &str) -> usize {
        distance_from_chars(&self.chars, candidate)
    }

    fn accepts(&self, distance: usize) -> bool {
        (distance as f64) < self.bound
    }
}

impl TextAligner {
    pub fn new(config: &AlignmentConfig) -> Self {
        Self {
            similarity_acceptance: config.similarity_acceptance(),
        }
    }

    pub fn similarity_acceptance(&self) -> f64 {
        self.similarity_acceptance
    }

    /// Find the cue matching `reference`, stitching split lines when needed
    ///
    /// Returns `None` when no admissible cue or stitched run exists.
    pub fn find_match(&self, reference: &str, cues: &[Cue]) -> Option<Cue> {
        if reference.is_empty() || cues.is_empty() {
            return None;
        }
        let reference = Reference::new(reference, self.similarity_acceptance);

        if let Some(cue) = Self::best_direct_match(&reference, cues) {
            return Some(cue.clone());
        }

        let stitched = Self::stitch_from_prefix(&reference, cues)
            .or_else(|| Self::stitch_from_suffix(&reference, cues))
            .or_else(|| Self::stitch_around_contained(&reference, cues));

        if let Some(cue) = &stitched {
            debug!("Stitched {} cues ending at cue {} for '{}'", cue.windows().len(), cue.id(), reference.text);
        }
        stitched
    }

    /// Smallest admissible distance; the leftmost cue wins ties
    fn best_direct_match<'c>(reference: &Reference, cues: &'c [Cue]) -> Option<&'c Cue> {
        let mut best: Option<(&Cue, usize)> = None;

        for cue in cues {
            let distance = reference.distance(cue.text());
            if !reference.accepts(distance) {
                continue;
            }
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((cue, distance)),
            }
        }

        best.map(|(cue, _)| cue)
    }

    fn stitch_from_prefix(reference: &Reference, cues: &[Cue]) -> Option<Cue> {
        let last = cues.len() - 1;
        let anchor = cues[..last].iter()
            .position(|cue| !cue.text().is_empty() && reference.text.starts_with(cue.text()))?;

        let mut running = cues[anchor].text().to_string();
        let mut distance = reference.distance(&running);

        for end in anchor + 1..cues.len() {
            let candidate = join_texts(&running, cues[end].text());
            let next_distance = reference.distance(&candidate);

            if reference.accepts(next_distance) {
                return Some(Cue::stitch(&cues[anchor..=end], candidate));
            }
            if next_distance >= distance {
                return None;
            }
            running = candidate;
            distance = next_distance;
        }

        None
    }

    fn stitch_from_suffix(reference: &Reference, cues: &[Cue]) -> Option<Cue> {
        let anchor = 1 + cues[1..].iter()
            .position(|cue| !cue.text().is_empty() && reference.text.ends_with(cue.text()))?;

        let mut running = cues[anchor].text().to_string();
        let mut distance = reference.distance(&running);

        for start in (0..anchor).rev() {
            let candidate = join_texts(cues[start].text(), &running);
            let next_distance = reference.distance(&candidate);

            if reference.accepts(next_distance) {
                return Some(Cue::stitch(&cues[start..=anchor], candidate));
            }
            if next_distance >= distance {
                return None;
            }
            running = candidate;
            distance = next_distance;
        }

        None
    }

    /// Grow forward then backward from a cue found in the middle of the line
    fn stitch_around_contained(reference: &Reference, cues: &[Cue]) -> Option<Cue> {
        let anchor = cues.iter().position(|cue| {
            let text = cue.text();
            !text.is_empty()
                && reference.text.contains(text)
                && !reference.text.starts_with(text)
                && !reference.text.ends_with(text)
        })?;

        let mut start = anchor;
        let mut end = anchor;
        let mut running = cues[anchor].text().to_string();
        let mut distance = reference.distance(&running);
        let mut accepted: Option<Cue> = None;

        for next in anchor + 1..cues.len() {
            let candidate = join_texts(&running, cues[next].text());
            let next_distance = reference.distance(&candidate);

            if reference.accepts(next_distance) {
                end = next;
                running = candidate;
                distance = next_distance;
                let stitched = Cue::stitch(&cues[start..=end], running.clone());

                // Only look backward when the preceding cue still brings the line closer
                let improves_backward = anchor > 0
                    && reference.distance(&join_texts(cues[anchor - 1].text(), &running)) < distance;
                if !improves_backward {
                    return Some(stitched);
                }
                accepted = Some(stitched);
                break;
            }
            if next_distance >= distance {
                break;
            }
            end = next;
            running = candidate;
            distance = next_distance;
        }

        for previous in (0..start).rev() {
            let candidate = join_texts(cues[previous].text(), &running);
            let next_distance = reference.distance(&candidate);

            if reference.accepts(next_distance) {
                return Some(Cue::stitch(&cues[previous..=end], candidate));
            }
            if next_distance >= distance {
                break;
            }
            start = previous;
            running = candidate;
            distance = next_distance;
        }

        accepted
    }
}

/// Concatenate two cue texts, adding a space unless the join already has one
fn join_texts(head: &str, tail: &str) -> String {
    let needs_space = !head.is_empty()
        && !tail.is_empty()
        && !head.ends_with(char::is_whitespace)
        && !tail.starts_with(char::is_whitespace);

    if needs_space {
        format!("{} {}", head, tail)
    } else {
        format!("{}{}", head, tail)
    }
}
