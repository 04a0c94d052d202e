/*!
 * Tests for subtitle cue parsing
 */

use subcorpus::cue::{TimeWindow, Track};
use subcorpus::cue_parser::CueParser;
use subcorpus::errors::ParseError;
use crate::common::build_srt;

/// Test that CRLF and LF files with the same cues parse identically
#[test]
fn test_parse_withCrlfAndLf_shouldProduceSameCues() {
    let cues = [(1_000, 2_000, "Hello there"), (3_000, 4_500, "How are you?")];

    let crlf = CueParser::parse(&build_srt(&cues, true), Track::Source).unwrap();
    let lf = CueParser::parse(&build_srt(&cues, false), Track::Source).unwrap();

    assert_eq!(crlf, lf);
    assert_eq!(crlf.len(), 2);
    assert_eq!(crlf[1].text(), "How are you?");
    assert_eq!(crlf[1].windows(), &[TimeWindow::new(3_000, 4_500)]);
}

/// Test that parsing the same content twice yields the same cues
#[test]
fn test_parse_calledTwice_shouldBeIdempotent() {
    let content = build_srt(&[(0, 900, "<i>One</i>"), (1_000, 1_900, "Two...")], false);

    let first = CueParser::parse(&content, Track::Target).unwrap();
    let second = CueParser::parse(&content, Track::Target).unwrap();

    assert_eq!(first, second);
}

/// Test that a byte order mark does not break the first block
#[test]
fn test_parse_withByteOrderMark_shouldIgnoreIt() {
    let content = format!("\u{feff}{}", build_srt(&[(1_000, 2_000, "Hi")], true));
    let cues = CueParser::parse(&content, Track::Source).unwrap();

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].id(), 1);
}

/// Test that multi-line cue text is cleaned and joined
#[test]
fn test_parse_withMarkup_shouldCleanEachLine() {
    let content = "1\n00:00:01,000 --> 00:00:03,000\n<i>- MONICA: Come on</i>\n- [sighs] Fine.\n";
    let cues = CueParser::parse(content, Track::Source).unwrap();

    assert_eq!(cues[0].text(), "Come on Fine.");
}

/// Test that blocks emptied by cleaning are dropped without renumbering
#[test]
fn test_parse_withEmptiedBlock_shouldKeepOriginalIds() {
    let content = build_srt(&[
        (1_000, 2_000, "First"),
        (3_000, 4_000, "[door slams]"),
        (5_000, 6_000, "Third"),
    ], false);
    let cues = CueParser::parse(&content, Track::Source).unwrap();

    let ids: Vec<usize> = cues.iter().map(|cue| cue.id()).collect();
    assert_eq!(ids, vec![1, 3]);
}

/// Test that gaps in the file's own sequence numbers are preserved
#[test]
fn test_parse_withSequenceGaps_shouldKeepFileIds() {
    let content = "5\n00:00:01,000 --> 00:00:02,000\nA\n\n9\n00:00:03,000 --> 00:00:04,000\nB\n";
    let cues = CueParser::parse(content, Track::Source).unwrap();

    assert_eq!(cues[0].id(), 5);
    assert_eq!(cues[1].id(), 9);
}

/// Test that a cue trailing off merges with the cue picking it up (source track)
#[test]
fn test_parse_withContinuationOnSource_shouldMergeCues() {
    let content = build_srt(&[
        (10_000, 11_000, "I was thinking..."),
        (11_200, 12_000, "...we should go"),
        (13_000, 14_000, "Okay"),
    ], true);
    let cues = CueParser::parse(&content, Track::Source).unwrap();

    assert_eq!(cues.len(), 2);
    let merged = &cues[0];
    assert_eq!(merged.id(), 1);
    assert_eq!(merged.text(), "I was thinking we should go");
    assert_eq!(merged.windows(), &[TimeWindow::new(10_000, 11_000), TimeWindow::new(11_200, 12_000)]);
    assert!(merged.is_multi_window());
    assert_eq!(cues[1].id(), 3);
}

/// Test that the target track drops ellipses and never merges
#[test]
fn test_parse_withContinuationOnTarget_shouldStripEllipsesOnly() {
    let content = build_srt(&[
        (10_000, 11_000, "Eu estava pensando..."),
        (11_200, 12_000, "...devíamos ir"),
    ], false);
    let cues = CueParser::parse(&content, Track::Target).unwrap();

    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].text(), "Eu estava pensando");
    assert_eq!(cues[1].text(), "devíamos ir");
}

/// Test that a cue only ending with an ellipsis is left alone
#[test]
fn test_parse_withUnansweredEllipsis_shouldNotMerge() {
    let content = build_srt(&[(0, 1_000, "Well..."), (1_100, 2_000, "Never mind")], false);
    let cues = CueParser::parse(&content, Track::Source).unwrap();

    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].text(), "Well...");
}

/// Test that a position hint after the end timecode is ignored
#[test]
fn test_parse_withPositionHint_shouldReadEndTimecode() {
    let content = "1\n00:00:01,000 --> 00:00:02,000 X1:100 X2:200\nHi\n";
    let cues = CueParser::parse(content, Track::Source).unwrap();

    assert_eq!(cues[0].windows(), &[TimeWindow::new(1_000, 2_000)]);
}

/// Test that a block without a numeric id is reported with its position
#[test]
fn test_parse_withMissingId_shouldReturnMalformedBlock() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\nHi\n\nHello\n00:00:03,000 --> 00:00:04,000\nThere\n";
    let result = CueParser::parse(content, Track::Source);

    match result {
        Err(ParseError::MalformedBlock { block, .. }) => assert_eq!(block, 2),
        other => panic!("Expected MalformedBlock, got {:?}", other),
    }
}

/// Test that a time line without the arrow is malformed
#[test]
fn test_parse_withoutTimeSeparator_shouldReturnMalformedBlock() {
    let content = "1\n00:00:01,000 -> 00:00:02,000\nHi\n";
    let result = CueParser::parse(content, Track::Source);

    assert!(matches!(result, Err(ParseError::MalformedBlock { block: 1, .. })));
}

/// Test that a broken timecode is reported as such
#[test]
fn test_parse_withInvalidTimecode_shouldReturnInvalidTimecode() {
    let content = "1\n00:00:01,000 --> 00:00:2,000\nHi\n";
    let result = CueParser::parse(content, Track::Source);

    match result {
        Err(ParseError::InvalidTimecode { value, .. }) => assert_eq!(value, "00:00:2,000"),
        other => panic!("Expected InvalidTimecode, got {:?}", other),
    }
}

/// Test that an hour field too large for milliseconds is an error, in a timecode and in a file
#[test]
fn test_parse_withOverflowingHours_shouldReturnInvalidTimecode() {
    match CueParser::parse_timecode("999999999999999:00:00,000") {
        Err(ParseError::InvalidTimecode { reason, .. }) => assert_eq!(reason, "timecode out of range"),
        other => panic!("Expected InvalidTimecode, got {:?}", other),
    }
    assert!(CueParser::parse_timecode("99999999999999999999:00:00,000").is_err());

    let content = "1\n00:00:01,000 --> 999999999999999:00:00,000\nHi\n";
    match CueParser::parse(content, Track::Source) {
        Err(ParseError::InvalidTimecode { value, .. }) => assert_eq!(value, "999999999999999:00:00,000"),
        other => panic!("Expected InvalidTimecode, got {:?}", other),
    }
}

/// Test that empty content parses to no cues
#[test]
fn test_parse_withEmptyContent_shouldReturnNoCues() {
    assert!(CueParser::parse("", Track::Source).unwrap().is_empty());
    assert!(CueParser::parse("\r\n\r\n", Track::Target).unwrap().is_empty());
}

/// Test timecode conversion including hours
#[test]
fn test_parseTimecode_shouldConvertToMilliseconds() {
    assert_eq!(CueParser::parse_timecode("00:00:00,000").unwrap(), 0);
    assert_eq!(CueParser::parse_timecode("00:01:02,003").unwrap(), 62_003);
    assert_eq!(CueParser::parse_timecode("02:00:00,000").unwrap(), 7_200_000);
}
