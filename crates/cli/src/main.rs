// dedupe - review duplicate repository records and merge them by hand

mod exit_codes;
mod logging;
mod plain;
mod report;
mod tui;
mod util;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use dedupe_config::Settings;
use dedupe_finder::{find_with_summary, FinderFilters};
use dedupe_io::{DatasetStore, StoreError};
use dedupe_session::{EditSession, SessionError};

use exit_codes::{
    EXIT_ERROR, EXIT_PERSISTENCE, EXIT_SUCCESS, EXIT_TERMINAL, EXIT_USAGE,
    session_exit_code, store_exit_code,
};
use logging::LogSink;

const DEFAULT_DATA: &str = "data.csv";

#[derive(Parser, Debug)]
#[command(name = "dedupe")]
#[command(about = "Find repository records that look like duplicates and reconcile them group by group")]
#[command(long_version = long_version())]
#[command(version)]
#[command(after_help = "\
Examples:
  dedupe repositories.csv
  dedupe repositories.csv --entry-recorded-by jdoe --no-pobox
  dedupe repositories.csv -o cleaned.csv
  dedupe repositories.csv --report --json | jq '.summary'
  printf 'd 2\\ns\\nq\\n' | dedupe repositories.csv --plain

Commands during review:
  n / <Enter>  next group       p  previous group
  d <rec>      delete record    m <field> <from>,<to>  copy a field
  u            undo             s  save     q  quit     h  help")]
struct Cli {
    /// Dataset CSV [default: settings `data.path`, then data.csv]
    #[arg(env = "DEDUPE_DATA", value_name = "DATA")]
    data: Option<PathBuf>,

    /// Where `s` writes the dataset [default: DATA]
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Only review groups containing a record entered by NAME
    #[arg(long, value_name = "NAME")]
    entry_recorded_by: Option<String>,

    /// Leave out records whose primary address is a PO box
    #[arg(long)]
    no_pobox: bool,

    /// Print the duplicate groups and exit
    #[arg(long, conflicts_with = "plain")]
    report: bool,

    /// Report as JSON (with --report)
    #[arg(long, requires = "report")]
    json: bool,

    /// Line-oriented review on stdin/stdout instead of the full-screen UI
    #[arg(long)]
    plain: bool,

    /// Append logs to this file
    #[arg(long, env = "DEDUPE_LOG_FILE", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Report { json: bool },
    Plain,
    Tui,
}

/// Command line merged over the settings file.
#[derive(Debug)]
struct RunConfig {
    data: PathBuf,
    output: PathBuf,
    filters: FinderFilters,
    log_file: Option<PathBuf>,
    mode: Mode,
}

impl RunConfig {
    fn resolve(cli: Cli, settings: Settings) -> Self {
        let data = cli
            .data
            .or(settings.data_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA));
        let output = cli.output.or(settings.output).unwrap_or_else(|| data.clone());
        let filters = FinderFilters::new(
            cli.entry_recorded_by.or(settings.entry_recorded_by),
            cli.no_pobox || settings.no_pobox,
        );
        let mode = if cli.report {
            Mode::Report { json: cli.json }
        } else if cli.plain {
            Mode::Plain
        } else {
            Mode::Tui
        };

        Self {
            data,
            output,
            filters,
            log_file: cli.log_file.or(settings.log_file),
            mode,
        }
    }

    fn log_sink(&self) -> LogSink<'_> {
        match (&self.log_file, self.mode) {
            (Some(path), _) => LogSink::File(path),
            (None, Mode::Tui) => LogSink::Off,
            (None, _) => LogSink::Stderr,
        }
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };
    let settings = Settings::try_load();
    let config = RunConfig::resolve(cli, settings.clone().unwrap_or_default());

    match run(config, settings.err()) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(mut config: RunConfig, settings_error: Option<String>) -> Result<(), CliError> {
    // Full screen needs a terminal on both ends
    if config.mode == Mode::Tui && !(io::stdin().is_terminal() && io::stdout().is_terminal()) {
        config.mode = Mode::Plain;
    }
    let sink = config.log_sink();
    logging::init(sink)?;
    if let Some(e) = settings_error {
        // No subscriber in full-screen mode; say it before the screen is taken
        if sink == LogSink::Off {
            eprintln!("warning: {}; using defaults", e);
        } else {
            log::warn!("{}; using defaults", e);
        }
    }
    log::debug!("{:?}", config);

    let store = DatasetStore::load(&config.data).map_err(|e| {
        let hint = match &e {
            StoreError::Load { .. } if !config.data.exists() => Some(format!(
                "pass the dataset path, set DEDUPE_DATA, or set data.path in {}",
                Settings::config_path_display()
            )),
            _ => None,
        };
        let err = CliError::store(e);
        match hint {
            Some(h) => err.with_hint(h),
            None => err,
        }
    })?;

    let found = find_with_summary(&store, &config.filters);

    if let Mode::Report { json } = config.mode {
        let mut out = io::stdout().lock();
        return if json {
            report::write_json(&found, &mut out)
        } else {
            report::write_text(&found, &mut out, &mut io::stderr().lock())
        };
    }

    if found.groups.is_empty() {
        println!("no duplicate groups found in {}", config.data.display());
        return Ok(());
    }

    let mut session = EditSession::new(store, found.groups, &config.output);
    match config.mode {
        Mode::Plain => plain::run(&mut session, io::stdin().lock(), &mut io::stdout().lock()),
        _ => tui::run(session, file_label(&config.data)),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// For `map_err` on stdout/stderr writes.
    pub fn write(err: io::Error) -> Self {
        Self::io(format!("failed to write output: {}", err))
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PERSISTENCE, message: msg.into(), hint: None }
    }

    pub fn terminal(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_TERMINAL,
            message: msg.into(),
            hint: Some("use --plain when no interactive terminal is available".to_string()),
        }
    }

    pub fn store(err: StoreError) -> Self {
        Self { code: store_exit_code(&err), message: err.to_string(), hint: None }
    }

    pub fn session(err: SessionError) -> Self {
        Self { code: session_exit_code(&err), message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
