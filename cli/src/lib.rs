//! Command-line host for fzgate sessions.

pub mod haystack;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre};
use fzgate_core::{GatewaySettings, RawOptions, SessionHandle, SessionRegistry, expose_constants};
use fzgate_search::NucleoEngine;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", about = "Fuzzy search over a haystack file.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the sort criterion and case mode codes as JSON.
    Constants,
    /// Read needles from stdin, one per line, and print one JSON result per needle.
    Search {
        /// JSON array of strings, or one entry per line.
        #[arg(long, value_name = "FILE")]
        haystack: PathBuf,
        /// Options object, e.g. `{"caseMode": 2, "sort": [1]}`.
        #[arg(long, value_name = "JSON")]
        options: Option<String>,
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

pub fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Constants => {
            println!("{}", serde_json::to_string(&expose_constants())?);
            Ok(())
        }
        Command::Search {
            haystack,
            options,
            config,
        } => search(&haystack, options.as_deref(), config.as_deref()),
    }
}

fn search(haystack_path: &Path, options: Option<&str>, config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    init_tracing(&settings);

    let entries = haystack::load(haystack_path)?;
    let options = parse_options(options)?.translate()?;

    let engine = NucleoEngine::new(settings.engine);
    let registry = Arc::new(SessionRegistry::new(Arc::new(engine)));
    let session = registry.open(entries, options)?;

    let out = Arc::new(Mutex::new(io::stdout()));
    stream(&session, io::stdin().lock(), out)?;
    Ok(())
}

/// Submits every line of `needles` to `session` and writes each result to
/// `out` as one JSON line. Ends the session once all results are written.
///
/// Returns the number of needles submitted.
pub fn stream<R, W>(session: &SessionHandle, needles: R, out: Arc<Mutex<W>>) -> Result<usize>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    let (done_tx, done_rx) = mpsc::channel();
    session.add_listener(move |result| {
        let mut out = out.lock().unwrap_or_else(PoisonError::into_inner);
        match result.to_json() {
            Ok(json) => {
                if let Err(err) = writeln!(out, "{json}").and_then(|()| out.flush()) {
                    warn!(error = %err, "Failed to write result.");
                }
            }
            Err(err) => warn!(error = %err, "Failed to serialize result."),
        }
        let _ = done_tx.send(());
    })?;

    let mut submitted = 0;
    for line in needles.lines() {
        session.search(&line?)?;
        submitted += 1;
    }

    for _ in 0..submitted {
        done_rx
            .recv()
            .map_err(|_| eyre::eyre!("Session stopped before all results arrived."))?;
    }
    session.end()?;

    Ok(submitted)
}

pub fn parse_options(options: Option<&str>) -> Result<RawOptions> {
    let value = match options {
        Some(text) => serde_json::from_str(text)
            .map_err(|err| eyre::eyre!("--options must be valid JSON: {err}"))?,
        None => Value::Null,
    };
    Ok(RawOptions::from_value(value)?)
}

fn load_settings(path: Option<&Path>) -> Result<GatewaySettings> {
    let settings = match path {
        Some(path) => GatewaySettings::load(path)?,
        None => GatewaySettings::default(),
    };

    let problems = settings.validate();
    if !problems.is_empty() {
        return Err(eyre::eyre!("Invalid settings: {}.", problems.join("; ")));
    }
    Ok(settings)
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr since
/// stdout carries results.
fn init_tracing(settings: &GatewaySettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
