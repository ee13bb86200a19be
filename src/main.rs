// Entrypoint for the CLI application.
// - Loads `.env`, parses flags, sets up logging, then hands the GitLab
//   client, the git wrapper and the terminal prompter to the workflow.
// - Returns `anyhow::Result` so any failure is printed and exits non-zero.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gitlab_archiver::api::GitLabClient;
use gitlab_archiver::config::{Cli, Settings};
use gitlab_archiver::git::GitCli;
use gitlab_archiver::ui::TerminalPrompter;
use gitlab_archiver::workflow::Archiver;

fn main() -> Result<()> {
    // A missing `.env` is fine; values may come from the real environment.
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let settings = Settings::from_cli(Cli::parse())?;
    let gitlab = GitLabClient::from_settings(&settings)?;
    let prompter = TerminalPrompter::new();

    Archiver::new(&gitlab, &GitCli, &prompter, settings.ssh_target.clone()).run()
}

/// Logs go to stderr and default to `warn` so they stay out of the prompts.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
