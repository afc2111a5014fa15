//! Terminal client for the account portal.
//!
//! Shares the session lifecycle with the browser app through the `session`
//! crate; the token and cached user live in a JSON file instead of
//! `localStorage`.

mod commands;
mod http;
mod storage;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use session::{RegisterRequest, SessionStore, ValidationPolicy};

use crate::commands::CliError;
use crate::http::HttpAccountApi;
use crate::storage::FileStorage;

#[derive(Parser, Debug)]
#[command(name = "portal-cli", about = "Account portal command-line client")]
struct Cli {
    #[arg(long, env = "PORTAL_API_BASE_URL", default_value = "http://localhost:8080/api")]
    base_url: String,

    /// Session file; defaults to `$HOME/.account-portal/session.json`.
    #[arg(long, env = "PORTAL_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Keep the cached user when the server cannot be reached.
    #[arg(long, default_value_t = false)]
    offline_tolerant: bool,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session.
    Login {
        #[arg(long)]
        username: String,
        /// Read from stdin when omitted.
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account. Does not log in.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Validate the stored session and show the profile.
    Whoami,
    /// Show the cached session without contacting the server.
    Status,
    /// Forget the stored session.
    Logout,
}

type FileSessionStore = SessionStore<Arc<FileStorage>, HttpAccountApi<Arc<FileStorage>>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt().with_writer(io::stderr).with_max_level(level).init();

    match run(cli).await {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String, CliError> {
    let path = cli.state_file.unwrap_or_else(storage::default_state_file);
    tracing::debug!(path = %path.display(), base_url = %cli.base_url, "using session file");
    let file = Arc::new(FileStorage::new(path));
    let api = HttpAccountApi::new(cli.base_url, Arc::clone(&file))?;
    let policy =
        if cli.offline_tolerant { ValidationPolicy::ClearOnRejection } else { ValidationPolicy::ClearOnAnyFailure };
    let store: FileSessionStore = SessionStore::new(Arc::clone(&file), api).with_policy(policy);

    match cli.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password()?,
            };
            commands::login(&store, &username, &password).await
        }
        Command::Register { username, email, password, first_name, last_name } => {
            let request = RegisterRequest { username, email, password, first_name, last_name };
            commands::register(&store, &request).await
        }
        Command::Whoami => commands::whoami(&store).await,
        Command::Status => Ok(commands::status(&file)),
        Command::Logout => Ok(commands::logout(&store)),
    }
}

fn prompt_password() -> Result<String, CliError> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
