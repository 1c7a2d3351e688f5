use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gemini_adapter::GeminiClient;
use markdown_adapter::{HistoryView, MarkdownHistoryRenderer};
use promptlog_core::application::{HistoryService, PipelineState, SubmissionPipeline};
use promptlog_core::domain::Record;
use promptlog_core::error::PipelineError;
use promptlog_core::ports::{HistoryRenderer, TableStore};
use promptlog_core::utils::LocalClock;
use sheets_adapter::SheetsTableStore;
use sqlite_adapter::SqliteTableStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, StoreTarget, DEFAULT_CONFIG_FILE};

/// Sends text to a hosted model and logs (time, input, output) to a worksheet
#[derive(Parser, Debug)]
#[command(name = "promptlog", version)]
#[command(about = "Forwards input to a text-generation model and keeps a running log in a spreadsheet")]
struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off). Overrides RUST_LOG if set.
    #[arg(long = "log-level", global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a response for TEXT and append it to the log
    Submit {
        /// Input text; read from stdin when omitted or "-"
        text: Option<String>,

        /// Send the input without the configured instruction
        #[arg(long)]
        raw: bool,
    },
    /// Show saved entries, newest first
    History {
        #[arg(long, value_enum, default_value_t = ViewArg::Grid)]
        view: ViewArg,

        /// Write the rendered history to this file instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ViewArg {
    Grid,
    Transcript,
}

impl From<ViewArg> for HistoryView {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Grid => HistoryView::Grid,
            ViewArg::Transcript => HistoryView::Transcript,
        }
    }
}

const EXIT_OK: u8 = 0;
const EXIT_FAILURE: u8 = 1;
/// Exit status for output that was generated but could not be saved.
const EXIT_NOT_SAVED: u8 = 2;

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Warning: Invalid log level '{}', using 'warn'", level);
            EnvFilter::new("warn")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path, true)?,
        None => Config::load(&PathBuf::from(DEFAULT_CONFIG_FILE), false)?,
    };
    Ok(config)
}

fn build_store(config: &Config) -> Result<Box<dyn TableStore>> {
    let store: Box<dyn TableStore> = match config.store_target()? {
        StoreTarget::Sheets(sheets) => Box::new(
            SheetsTableStore::new(sheets).context("failed to initialise the Sheets client")?,
        ),
        StoreTarget::Sqlite { path, worksheet } => {
            Box::new(SqliteTableStore::new(path, worksheet))
        }
    };
    Ok(store)
}

fn read_input(text: Option<String>) -> Result<String> {
    match text {
        Some(text) if text != "-" => Ok(text),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read input from stdin")?;
            Ok(buf)
        }
    }
}

fn submit(config: &Config, text: Option<String>, raw: bool) -> Result<u8> {
    // Both collaborators must be configured before any cycle runs.
    let generator = GeminiClient::new(config.gemini()?)
        .context("failed to initialise the generation client")?;
    let store = build_store(config)?;

    let instruction = if raw { None } else { config.instruction() };
    let pipeline = SubmissionPipeline::new(Box::new(generator), store, Box::new(LocalClock))
        .with_instruction(instruction);

    let input = read_input(text)?;
    let result = pipeline.submit_observed(&input, |state| {
        if state == PipelineState::Generating {
            eprintln!("Generating...");
        }
    });

    let code = report_outcome(result, &mut io::stdout(), &mut io::stderr())?;
    Ok(code)
}

/// Prints the result of one cycle and picks the exit status. Generated
/// output reaches `out` whether or not it was saved.
fn report_outcome(
    result: Result<Option<Record>, PipelineError>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<u8> {
    match result {
        Ok(None) => {
            writeln!(err, "Nothing to submit: input is empty")?;
            Ok(EXIT_OK)
        }
        Ok(Some(record)) => {
            writeln!(out, "{}", record.output_text)?;
            writeln!(err, "Saved at {}", record.timestamp)?;
            Ok(EXIT_OK)
        }
        Err(PipelineError::NotSaved { record, source }) => {
            writeln!(out, "{}", record.output_text)?;
            writeln!(err, "Error: generated but not saved: {}", source)?;
            Ok(EXIT_NOT_SAVED)
        }
        Err(e @ PipelineError::Generation(_)) => {
            writeln!(err, "Error: {}", e)?;
            Ok(EXIT_FAILURE)
        }
    }
}

fn history(config: &Config, view: ViewArg, output: Option<PathBuf>) -> Result<u8> {
    let service = HistoryService::new(build_store(config)?, config.title.clone());
    let history = service.load();
    let rendered = MarkdownHistoryRenderer::new(view.into()).render(&history);

    match output {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), entries = history.entries.len(), "history written");
            println!("Wrote {} entries to {}", history.entries.len(), path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(EXIT_OK)
}

fn run(cli: Cli) -> Result<u8> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Command::Submit { text, raw } => submit(&config, text, raw),
        Command::History { view, output } => history(&config, view, output),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
