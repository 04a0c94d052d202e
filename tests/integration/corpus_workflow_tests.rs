/*!
 * End-to-end tests of the corpus passes on a dataset laid out in a temp folder
 */

use std::fs;

use subcorpus::app_config::Config;
use subcorpus::app_controller::Controller;
use subcorpus::corpus::{CorpusStats, CORPUS_HEADER};
use crate::common::{
    build_srt, corpus_lines, create_dataset, create_temp_dir, create_test_file, init_test_logging,
    mock_translator::MockTranslator, script_rows, SCRIPT_HEADER,
};

const ALIGNED: [&str; 4] = [
    "1;1;Ross;Hello there;Olá;0101.txt",
    "2;1;Monica;I am going home;Eu vou para casa;0101.txt",
    "3;2;Chandler;Where is the coffee?;;0101.txt",
    "4;2;Joey;How you doin'?;;0101.txt",
];

/// Adds a second episode whose English subtitles cannot be parsed
fn add_broken_episode(config: &Config, with_target: bool) {
    let root = std::path::Path::new(&config.dataset.root);
    create_test_file(root, "Dataset/FRIENDS-en-us/01/0102.srt", "1\n00:00:01,000 -> 00:00:02,000\nBad\n").unwrap();
    if with_target {
        create_test_file(root, "Dataset/FRIENDS-pt-br/01/0102.srt", &build_srt(&[(1_000, 2_000, "Ruim")], false)).unwrap();
    }

    let mut script = vec![SCRIPT_HEADER];
    script.extend(script_rows());
    script.push("5;3;Ross;M;Bad file.;Bad file;;0102.txt");
    create_test_file(root, "Dataset/friends-original.csv", &script.join("\n")).unwrap();
}

/// Test the align pass: hits carry both subtitle texts, misses keep the transcript line
#[tokio::test]
async fn test_buildCorpus_shouldWriteAlignedRows() {
    init_test_logging();
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let controller = Controller::with_config(config).unwrap();

    let summary = controller.build_corpus().await.unwrap();

    assert_eq!(summary.hits, 2);
    assert_eq!(summary.misses, 2);
    assert_eq!(summary.resumed_from, 0);
    assert!(summary.skipped_files.is_empty());

    let corpus_path = controller.config().dataset.corpus_path();
    let content = fs::read_to_string(&corpus_path).unwrap();
    assert!(content.starts_with(CORPUS_HEADER));
    assert_eq!(corpus_lines(&corpus_path).unwrap(), ALIGNED);
}

/// Test that a complete corpus is left untouched by a second run
#[tokio::test]
async fn test_buildCorpus_runTwice_shouldNotDuplicateRows() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let controller = Controller::with_config(config).unwrap();

    controller.build_corpus().await.unwrap();
    let summary = controller.build_corpus().await.unwrap();

    assert_eq!(summary.resumed_from, 4);
    assert_eq!(summary.aligned(), 0);
    assert_eq!(corpus_lines(&controller.config().dataset.corpus_path()).unwrap(), ALIGNED);
}

/// Test that an interrupted corpus is completed from the first missing row
#[tokio::test]
async fn test_buildCorpus_withPartialOutput_shouldResume() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    create_test_file(temp_dir.path(), "friends-final.csv", &format!("{}\n{}", CORPUS_HEADER, ALIGNED[0])).unwrap();
    let controller = Controller::with_config(config).unwrap();

    let summary = controller.build_corpus().await.unwrap();

    assert_eq!(summary.resumed_from, 1);
    assert_eq!(summary.hits, 1);
    assert_eq!(summary.misses, 2);
    assert_eq!(corpus_lines(&controller.config().dataset.corpus_path()).unwrap(), ALIGNED);
}

/// Test that a missing transcript aborts the pass
#[tokio::test]
async fn test_buildCorpus_withoutScript_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let mut config = create_dataset(temp_dir.path()).unwrap();
    config.dataset.script_file = "missing.csv".to_string();
    let controller = Controller::with_config(config).unwrap();

    assert!(controller.build_corpus().await.is_err());
}

/// Test that unparseable subtitles abort the pass unless skipping is enabled
#[tokio::test]
async fn test_buildCorpus_withMalformedSubtitles_shouldAbortOrSkip() {
    let temp_dir = create_temp_dir().unwrap();
    let mut config = create_dataset(temp_dir.path()).unwrap();
    add_broken_episode(&config, true);

    let strict = Controller::with_config(config.clone()).unwrap();
    let error = strict.build_corpus().await.unwrap_err();
    assert!(format!("{:#}", error).contains("0102.txt"), "{:#}", error);

    fs::remove_file(config.dataset.corpus_path()).unwrap();
    config.skip_malformed_files = true;
    let lenient = Controller::with_config(config).unwrap();
    let summary = lenient.build_corpus().await.unwrap();

    assert_eq!(summary.skipped_files, vec!["0102.txt".to_string()]);
    assert_eq!(summary.hits, 2);
    assert_eq!(summary.misses, 3);
    let lines = corpus_lines(&lenient.config().dataset.corpus_path()).unwrap();
    assert_eq!(lines[4], "5;3;Ross;Bad file;;0102.txt");
}

/// Test that a missing subtitle file aborts even when skipping malformed files
#[tokio::test]
async fn test_buildCorpus_withMissingSubtitles_shouldAbort() {
    let temp_dir = create_temp_dir().unwrap();
    let mut config = create_dataset(temp_dir.path()).unwrap();
    config.skip_malformed_files = true;
    add_broken_episode(&config, false);
    let controller = Controller::with_config(config).unwrap();

    assert!(controller.build_corpus().await.is_err());
}

/// Test the review pass: looser settings resolve the row whose timing was off
#[tokio::test]
async fn test_reviewCorpus_shouldMarkReviewedRows() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let controller = Controller::with_config(config).unwrap();
    controller.build_corpus().await.unwrap();

    let summary = controller.review_corpus().await.unwrap();

    assert_eq!(summary.hits, 1);
    assert_eq!(summary.misses, 1);
    assert_eq!(summary.copied, 2);
    let lines = corpus_lines(&controller.config().dataset.revised_corpus_path()).unwrap();
    assert_eq!(lines, vec![
        ALIGNED[0],
        ALIGNED[1],
        "3;2;Chandler;Where is the coffee?;REVIEW: Cadê o café?;0101.txt",
        ALIGNED[3],
    ]);
}

/// Test that rows which are not corpus rows are copied verbatim by the review pass
#[tokio::test]
async fn test_reviewCorpus_withInvalidRow_shouldCopyIt() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let content = format!("{}\n{}\nnot;a;row\n{}", CORPUS_HEADER, ALIGNED[0], ALIGNED[2]);
    create_test_file(temp_dir.path(), "friends-final.csv", &content).unwrap();
    let controller = Controller::with_config(config).unwrap();

    let summary = controller.review_corpus().await.unwrap();

    assert_eq!(summary.copied, 2);
    assert_eq!(summary.hits, 1);
    let lines = corpus_lines(&controller.config().dataset.revised_corpus_path()).unwrap();
    assert_eq!(lines[1], "not;a;row");
    assert!(lines[2].contains("REVIEW: Cadê o café?"));
}

/// Test the translate pass: translations found in the subtitles are replaced by them
#[tokio::test]
async fn test_translateCorpus_shouldPreferSubtitleText() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let controller = Controller::with_config(config).unwrap();
    controller.build_corpus().await.unwrap();
    let translator = MockTranslator::new(&[
        ("Where is the coffee?", "Cadê o café?"),
        ("How you doin'?", "Como você está?"),
    ]);

    let summary = controller.translate_corpus(&translator).await.unwrap();

    assert_eq!(summary.batches, 1);
    assert_eq!(summary.translated, 2);
    assert_eq!(summary.subtitle_matches, 1);
    assert_eq!(summary.translation_only, 1);
    assert_eq!(summary.characters, "Where is the coffee?".len() + "How you doin'?".len());
    assert_eq!(translator.calls(), vec![vec!["Where is the coffee?".to_string(), "How you doin'?".to_string()]]);

    let revised_path = controller.config().dataset.revised_corpus_path();
    assert_eq!(corpus_lines(&revised_path).unwrap(), vec![
        ALIGNED[0],
        ALIGNED[1],
        "3;2;Chandler;Where is the coffee?;SUB-TRANS: Cadê o café?;0101.txt",
        "4;2;Joey;How you doin'?;ONLY-TRANS: Como você está?;0101.txt",
    ]);

    let stats = controller.corpus_stats(Some(revised_path.as_path())).unwrap();
    assert_eq!(stats, CorpusStats {
        hits: 2,
        subtitle_translations: 1,
        only_translations: 1,
        ..Default::default()
    });
}

/// Test that small batches keep row order across several requests
#[tokio::test]
async fn test_translateCorpus_withBatchSizeOne_shouldSendOneLinePerRequest() {
    let temp_dir = create_temp_dir().unwrap();
    let mut config = create_dataset(temp_dir.path()).unwrap();
    config.translation.batch_size = 1;
    let controller = Controller::with_config(config).unwrap();
    controller.build_corpus().await.unwrap();
    let translator = MockTranslator::new(&[]);

    let summary = controller.translate_corpus(&translator).await.unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(translator.calls().len(), 2);
    let lines = corpus_lines(&controller.config().dataset.revised_corpus_path()).unwrap();
    assert_eq!(lines[2], "3;2;Chandler;Where is the coffee?;ONLY-TRANS: [pt] Where is the coffee?;0101.txt");
    assert_eq!(lines[3], "4;2;Joey;How you doin'?;ONLY-TRANS: [pt] How you doin'?;0101.txt");
}

/// Test that a failing translation service aborts the pass
#[tokio::test]
async fn test_translateCorpus_withFailingService_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let controller = Controller::with_config(config).unwrap();
    controller.build_corpus().await.unwrap();

    let result = controller.translate_corpus(&MockTranslator::failing()).await;

    assert!(result.is_err());
}

/// Test statistics of the default corpus file and of a missing one
#[tokio::test]
async fn test_corpusStats_shouldCountAlignedCorpus() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let controller = Controller::with_config(config).unwrap();

    assert!(controller.corpus_stats(None).is_err());

    controller.build_corpus().await.unwrap();
    let stats = controller.corpus_stats(None).unwrap();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.total(), 4);
}

/// Test that linting parses every subtitle file and reports the broken ones
#[test]
fn test_lintSubtitles_shouldReportMalformedFiles() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();

    let report = Controller::with_config(config.clone()).unwrap().lint_subtitles().unwrap();
    assert_eq!(report.files, 2);
    assert_eq!(report.cues, 10);
    assert!(report.malformed.is_empty());

    add_broken_episode(&config, true);
    let report = Controller::with_config(config).unwrap().lint_subtitles().unwrap();
    assert_eq!(report.files, 4);
    assert_eq!(report.malformed.len(), 1);
    assert!(report.malformed[0].0.ends_with("FRIENDS-en-us/01/0102.srt"));
}

/// Writes a small Cornell movie-dialog dataset under the dataset root
fn add_cornell_dataset(config: &Config) {
    let root = std::path::Path::new(&config.dataset.root);
    let lines = [
        "L3 +++$+++ u1 +++$+++ m0 +++$+++ CAMERON +++$+++ Why \"not\"?",
        "L2 +++$+++ u0 +++$+++ m0 +++$+++ BIANCA +++$+++ No; never.",
        "L1 +++$+++ u1 +++$+++ m0 +++$+++ CAMERON +++$+++ Can we go?",
        "L9 +++$+++ u0 +++$+++ m0 +++$+++ BIANCA +++$+++ ",
    ];
    let conversations = [
        "u0 +++$+++ u1 +++$+++ m0 +++$+++ ['L1', 'L2']",
        "u0 +++$+++ u1 +++$+++ m0 +++$+++ ['L3', 'L9']",
        "u0 +++$+++ u1 +++$+++ m0 +++$+++ ['L3']",
    ];
    create_test_file(root, &config.dataset.cornell_lines_file, &lines.join("\n")).unwrap();
    create_test_file(root, &config.dataset.cornell_conversations_file, &conversations.join("\n")).unwrap();
}

const CORNELL_ROWS: [&str; 3] = [
    "1;1;CAMERON;Can we go?;;-",
    "2;1;BIANCA;\"No; never.\";;-",
    "3;2;CAMERON;Why not?;;-",
];

/// Test generating the Cornell corpus, then running it again
#[test]
fn test_generateCornellCorpus_shouldWriteEveryCompleteConversation() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    add_cornell_dataset(&config);
    let controller = Controller::with_config(config).unwrap();

    let summary = controller.generate_cornell_corpus().unwrap();

    assert_eq!(summary.conversations, 3);
    assert_eq!(summary.turns, 3);
    assert_eq!(summary.written, 3);
    let corpus_path = controller.config().dataset.cornell_corpus_path();
    assert!(fs::read_to_string(&corpus_path).unwrap().starts_with(CORPUS_HEADER));
    assert_eq!(corpus_lines(&corpus_path).unwrap(), CORNELL_ROWS);

    let summary = controller.generate_cornell_corpus().unwrap();
    assert_eq!(summary.resumed_from, 3);
    assert_eq!(summary.written, 0);
    assert_eq!(corpus_lines(&corpus_path).unwrap(), CORNELL_ROWS);
}

/// Test that generating without the Cornell files fails
#[test]
fn test_generateCornellCorpus_withoutDataset_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let controller = Controller::with_config(config).unwrap();

    assert!(controller.generate_cornell_corpus().is_err());
    assert!(!controller.config().dataset.cornell_corpus_path().exists());
}

/// Test translating every Cornell row in batches, resuming after written batches
#[tokio::test]
async fn test_translateCornellCorpus_shouldTranslateEveryRowInBatches() {
    let temp_dir = create_temp_dir().unwrap();
    let mut config = create_dataset(temp_dir.path()).unwrap();
    config.translation.batch_size = 2;
    add_cornell_dataset(&config);
    let controller = Controller::with_config(config).unwrap();
    controller.generate_cornell_corpus().unwrap();
    let translator = MockTranslator::new(&[("Can we go?", "Podemos ir?")]);

    let summary = controller.translate_cornell_corpus(&translator).await.unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.translated, 3);
    assert_eq!(summary.characters, "Can we go?".len() + "No; never.".len() + "Why not?".len());
    assert_eq!(translator.calls(), vec![
        vec!["Can we go?".to_string(), "No; never.".to_string()],
        vec!["Why not?".to_string()],
    ]);
    let translated_path = controller.config().dataset.cornell_translated_path();
    assert_eq!(corpus_lines(&translated_path).unwrap(), vec![
        "1;1;CAMERON;Can we go?;Podemos ir?;-",
        "2;1;BIANCA;\"No; never.\";\"[pt] No; never.\";-",
        "3;2;CAMERON;Why not?;[pt] Why not?;-",
    ]);

    let again = MockTranslator::new(&[]);
    let summary = controller.translate_cornell_corpus(&again).await.unwrap();
    assert_eq!(summary.batches, 0);
    assert!(again.calls().is_empty());
}

/// Test that a translation failure stops before writing the batch
#[tokio::test]
async fn test_translateCornellCorpus_withFailingService_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    add_cornell_dataset(&config);
    let controller = Controller::with_config(config).unwrap();
    controller.generate_cornell_corpus().unwrap();

    assert!(controller.translate_cornell_corpus(&MockTranslator::failing()).await.is_err());
    let translated_path = controller.config().dataset.cornell_translated_path();
    assert!(corpus_lines(&translated_path).unwrap().is_empty());
}

/// Test comparing ids of the review output with its input
#[tokio::test]
async fn test_compareCorpusIds_shouldDetectRowsOutOfStep() {
    let temp_dir = create_temp_dir().unwrap();
    let config = create_dataset(temp_dir.path()).unwrap();
    let controller = Controller::with_config(config).unwrap();
    controller.build_corpus().await.unwrap();
    controller.review_corpus().await.unwrap();
    let revised_path = controller.config().dataset.revised_corpus_path();

    assert!(controller.compare_corpus_ids(&revised_path, None).unwrap().is_empty());

    let shuffled = create_test_file(temp_dir.path(), "shuffled.csv", &[CORPUS_HEADER, ALIGNED[1], ALIGNED[0]].join("\n")).unwrap();
    let mismatches = controller.compare_corpus_ids(&shuffled, Some(revised_path.as_path())).unwrap();
    assert_eq!(mismatches.iter().map(|m| m.row).collect::<Vec<_>>(), vec![1, 2, 3, 4]);

    assert!(controller.compare_corpus_ids(&temp_dir.path().join("missing.csv"), None).is_err());
}
