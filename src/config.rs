// Configuration: command-line flags with environment fallbacks. A `.env`
// file in the working directory is loaded by `main` before parsing so its
// values are picked up through the `env = ...` attributes below.

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;

/// Command-line interface. Every flag can also come from the environment.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Archive or delete GitLab projects before you run into your project limit"
)]
pub struct Cli {
    /// Base URL of the GitLab instance.
    #[arg(long, env = "GITLAB_SERVER", default_value = "https://gitlab.com")]
    pub server: String,

    /// Personal access token with the `api` scope.
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Host used for the SSH connectivity check (defaults to the server host).
    #[arg(long, env = "GITLAB_SSH_HOST")]
    pub ssh_host: Option<String>,
}

/// Validated runtime settings built from `Cli`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: Url,
    pub token: String,
    /// `user@host` target handed to `ssh -T`.
    pub ssh_target: String,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let server = Url::parse(cli.server.trim())
            .with_context(|| format!("Invalid GitLab server URL: {}", cli.server))?;
        let host = match cli.ssh_host {
            Some(host) => host,
            None => server
                .host_str()
                .map(str::to_string)
                .with_context(|| format!("GitLab server URL has no host: {}", server))?,
        };
        Ok(Settings {
            server,
            token: cli.token,
            ssh_target: ssh_target(&host),
        })
    }
}

/// Accepts either a bare host or an explicit `user@host`.
fn ssh_target(host: &str) -> String {
    if host.contains('@') {
        host.to_string()
    } else {
        format!("git@{}", host)
    }
}
