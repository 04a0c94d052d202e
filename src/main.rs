// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use log::{info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use subcorpus::app_config::{Config, LogLevel};
use subcorpus::app_controller::Controller;
use subcorpus::translation::CloudTranslator;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align transcript lines with both subtitle tracks into the corpus file
    Align,

    /// Retry unaligned corpus rows with looser settings
    Review,

    /// Machine-translate rows that are still unaligned
    Translate,

    /// Count hits, reviews, translations and misses of a corpus file
    Stats {
        /// Corpus file to inspect (defaults to the configured corpus file)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Check that a corpus file keeps the row ids of another one
    Compare {
        /// Corpus file to check, such as a review or translate output
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Corpus file holding the expected ids (defaults to the configured corpus file)
        #[arg(long, value_name = "BASE")]
        against: Option<PathBuf>,
    },

    /// Parse every subtitle file of the dataset and report malformed ones
    Lint,

    /// Build the corpus of the Cornell movie-dialog dataset
    Cornell {
        #[command(subcommand)]
        mode: CornellMode,
    },

    /// Generate shell completions for subcorpus
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CornellMode {
    /// Write every turn of the movie conversations as an untranslated row
    Generate,

    /// Machine-translate every row of the Cornell corpus
    Translate,
}

/// subcorpus - bilingual dialogue corpus builder
///
/// Aligns the lines of a TV show transcript with the subtitles of two
/// languages, producing a parallel corpus.
#[derive(Parser, Debug)]
#[command(name = "subcorpus")]
#[command(version)]
#[command(about = "Build a parallel dialogue corpus from subtitle tracks")]
#[command(long_about = "subcorpus matches each transcript line to its subtitle cue in the source language, \
then to the cue shown at the same time in the target language.

EXAMPLES:
    subcorpus align                          # Build the corpus file
    subcorpus review                         # Retry misses with looser settings
    subcorpus translate                      # Fill remaining misses by machine translation
    subcorpus stats friends-final-2.csv      # Show row statuses of a corpus file
    subcorpus compare friends-final-2.csv    # Check a revised corpus keeps the row ids
    subcorpus --log-level debug lint         # Check every subtitle file
    subcorpus cornell generate               # Build the Cornell movie-dialog corpus
    subcorpus cornell translate              # Translate it
    subcorpus completions bash > subcorpus.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                color, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set through max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(cmd_log_level) = cli.log_level {
        log::set_max_level(LogLevel::from(cmd_log_level).into());
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subcorpus", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level.into();
    }

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;
    log::set_max_level(config.log_level.into());

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Align => {
            controller.build_corpus().await?;
        }
        Commands::Review => {
            controller.review_corpus().await?;
        }
        Commands::Translate => {
            let translator = CloudTranslator::new(&controller.config().translation)?;
            info!("Translating with {}", translator.endpoint());
            controller.translate_corpus(&translator).await?;
        }
        Commands::Stats { file } => {
            let stats = controller.corpus_stats(file.as_deref())?;
            println!("{}", stats);
        }
        Commands::Compare { file, against } => {
            let mismatches = controller.compare_corpus_ids(&file, against.as_deref())?;
            for mismatch in &mismatches {
                println!("{}", mismatch);
            }
            if !mismatches.is_empty() {
                anyhow::bail!("{} rows of {:?} do not keep their id", mismatches.len(), file);
            }
        }
        Commands::Cornell { mode: CornellMode::Generate } => {
            controller.generate_cornell_corpus()?;
        }
        Commands::Cornell { mode: CornellMode::Translate } => {
            let translator = CloudTranslator::new(&controller.config().translation)?;
            info!("Translating with {}", translator.endpoint());
            controller.translate_cornell_corpus(&translator).await?;
        }
        Commands::Lint => {
            let report = controller.lint_subtitles()?;
            if !report.malformed.is_empty() {
                anyhow::bail!("{} subtitle files could not be parsed", report.malformed.len());
            }
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
