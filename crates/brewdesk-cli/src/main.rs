//! brewdesk - command-line front end for the account service.
//!
//! Signs in, registers, signs out and reports on the stored session. Session
//! handling lives in `brewdesk-core`; this binary only prompts, prints and
//! picks the credential backend.

mod commands;
mod prompt;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use brewdesk_core::bootstrap::StoreChoice;
use brewdesk_core::Config;

/// Log file name prefix inside `--log-dir`
const LOG_FILE_PREFIX: &str = "brewdesk.log";

#[derive(Parser, Debug)]
#[command(name = "brewdesk")]
#[command(version)]
#[command(about = "Sign in to your brewdesk account from the terminal", long_about = None)]
struct Cli {
    /// Keep credentials in memory only; nothing is read from or written to the keychain
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    Login {
        /// Email address (defaults to the last one used)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Create an account and sign in to it
    Register {
        /// Display name for the new account
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show who is signed in
    Status {
        /// Re-fetch the profile from the server first
        #[arg(long)]
        refresh: bool,
    },

    /// Inspect the stored session without changing it
    Diagnose {
        /// Also check the stored token against the server
        #[arg(long)]
        probe: bool,
    },

    /// Show or change the persisted settings
    Config {
        /// Base URL of the account service; pass "" to clear
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
    },
}

/// Initialize the tracing subscriber for logging
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=brewdesk_core=debug).
/// The returned guard flushes the file writer and must outlive `main`'s work.
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load()?;
    let choice = if cli.ephemeral {
        StoreChoice::Ephemeral
    } else {
        StoreChoice::Configured
    };

    match cli.command {
        Command::Login { email } => commands::login(&mut config, choice, email).await,
        Command::Register { name, email } => {
            commands::register(&config, choice, name, email).await
        }
        Command::Logout => commands::logout(&config, choice).await,
        Command::Status { refresh } => commands::status(&config, choice, refresh).await,
        Command::Diagnose { probe } => commands::diagnose(&config, choice, probe).await,
        Command::Config { api_url } => commands::config(&mut config, api_url),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_ref());
    info!(command = ?cli.command, "brewdesk starting");

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_command() {
        let cli = Cli::try_parse_from(["brewdesk", "status", "--refresh", "--ephemeral"]).unwrap();
        assert!(cli.ephemeral);
        assert!(matches!(cli.command, Command::Status { refresh: true }));
    }

    #[test]
    fn test_register_requires_name() {
        assert!(Cli::try_parse_from(["brewdesk", "register"]).is_err());
        let cli =
            Cli::try_parse_from(["brewdesk", "register", "--name", "A", "-e", "a@b.com"]).unwrap();
        match cli.command {
            Command::Register { name, email } => {
                assert_eq!(name, "A");
                assert_eq!(email.as_deref(), Some("a@b.com"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
