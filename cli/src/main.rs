//! formgate CLI - terminal surface for the waitlist and support forms.
//!
//! Each subcommand builds a [`FormSession`] from config, types the given
//! values into it the way a user would, and submits once.
//!
//! ```text
//! main() -> load config -> FormSession::new -> on_change per field -> submit
//!                                                                      |
//!                                                                      v
//!                                  success copy | mailto: link | error copy (exit 1)
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use formgate_config::{FormgateConfig, formgate_home, state_path};
use formgate_core::{
    DispatchOutcome, EditOutcome, FileStore, FormSession, HttpTransport, SubmitBlocked,
    SubmitOutcome,
};
use formgate_types::{ErrorKind, Field, FormKind, Rejection, SUPPORT_TOPICS};

#[derive(Parser)]
#[command(name = "formgate")]
#[command(about = "Join the Kaiju Swap waitlist or contact support")]
struct Cli {
    /// Config file to use instead of ~/.formgate/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the waitlist
    Waitlist {
        #[arg(long)]
        email: String,
    },
    /// Send a support request
    Support {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// One of the topics listed by `formgate topics`
        #[arg(long, value_parser = PossibleValuesParser::new(SUPPORT_TOPICS.iter().copied()))]
        subject: String,
        #[arg(long, required_unless_present = "message_file", conflicts_with = "message_file")]
        message: Option<String>,
        /// Read the message body from a file
        #[arg(long)]
        message_file: Option<PathBuf>,
    },
    /// List support topics
    Topics,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // stdout carries the command's result; no log file means no logs.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.formgate/logs/formgate.log
    if let Some(home) = formgate_home() {
        candidates.push(home.join("logs").join("formgate.log"));
    }

    // Fallback: ./.formgate/logs/formgate.log
    candidates.push(PathBuf::from(".formgate").join("logs").join("formgate.log"));

    candidates
}

fn load_config(explicit: Option<&Path>) -> Result<FormgateConfig> {
    let loaded = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            FormgateConfig::load_from(path)?
        }
        None => FormgateConfig::load()?,
    };
    Ok(loaded.unwrap_or_default())
}

fn store_path() -> PathBuf {
    state_path().unwrap_or_else(|| {
        PathBuf::from(".formgate")
            .join("state")
            .join("throttle.json")
    })
}

fn read_message(message: Option<String>, message_file: Option<&Path>) -> Result<String> {
    match (message, message_file) {
        (Some(message), _) => Ok(message),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read message from {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let (form, values) = match cli.command {
        Commands::Topics => {
            for topic in SUPPORT_TOPICS {
                println!("{topic}");
            }
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Waitlist { email } => (FormKind::Waitlist, vec![(Field::Email, email)]),
        Commands::Support {
            name,
            email,
            subject,
            message,
            message_file,
        } => {
            let message = read_message(message, message_file.as_deref())?;
            (
                FormKind::Support,
                vec![
                    (Field::Name, name),
                    (Field::Email, email),
                    (Field::Subject, subject),
                    (Field::Message, message),
                ],
            )
        }
    };

    let config = load_config(cli.config.as_deref())?;
    let settings = config.form_settings(form)?;
    let transport = HttpTransport::new(&config.http_settings())?;
    let store = FileStore::new(store_path());
    let mut session = FormSession::new(settings, store, transport);

    for (field, value) in &values {
        if session.on_change(*field, value) == EditOutcome::Refused {
            return Ok(report_rejection(Rejection::field(
                *field,
                ErrorKind::InvalidFormat,
            )));
        }
    }

    let outcome = session.submit(Utc::now().timestamp_millis()).await;
    Ok(report(form, outcome))
}

fn report(form: FormKind, outcome: SubmitOutcome) -> ExitCode {
    match outcome {
        SubmitOutcome::Delivered(DispatchOutcome::Sent) => {
            println!("{}", form.success_message());
            ExitCode::SUCCESS
        }
        SubmitOutcome::Delivered(DispatchOutcome::HandedOffToMailClient { uri }) => {
            println!("{}", form.success_message());
            println!("Open this link in your mail client to send it:");
            println!("{uri}");
            ExitCode::SUCCESS
        }
        SubmitOutcome::Delivered(DispatchOutcome::NetworkError) => {
            report_rejection(Rejection::form(ErrorKind::NetworkError))
        }
        SubmitOutcome::Rejected(rejection) => report_rejection(rejection),
        SubmitOutcome::Blocked(SubmitBlocked::MissingRequired(_)) => {
            report_rejection(Rejection::form(ErrorKind::Required))
        }
        SubmitOutcome::Blocked(reason) => {
            eprintln!("Submission not started: {reason:?}");
            ExitCode::FAILURE
        }
    }
}

fn report_rejection(rejection: Rejection) -> ExitCode {
    eprintln!("{rejection}");
    ExitCode::FAILURE
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();
    run(cli).await
}
