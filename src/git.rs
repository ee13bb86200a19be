//! Thin wrapper around the `git` and `ssh` executables.
//!
//! Credentials are whatever the user's git setup already provides (SSH agent,
//! credential helper); nothing here handles authentication.

use std::path::Path;
use std::process::{Command, Output};

use crate::error::GitError;

/// Source-control operations used while consolidating projects.
pub trait Vcs {
    fn init(&self, dir: &Path) -> Result<(), GitError>;
    fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), GitError>;
    fn fetch(&self, dir: &Path, remote: &str) -> Result<(), GitError>;
    /// `git checkout -b <branch> <start_point>`
    fn checkout_new_branch(
        &self,
        dir: &Path,
        branch: &str,
        start_point: &str,
    ) -> Result<(), GitError>;
    /// `git push --all <remote>`
    fn push_all(&self, dir: &Path, remote: &str) -> Result<(), GitError>;
    /// Whether `ssh -T <target>` authenticates. GitLab answers with a
    /// greeting and exit status 0 once a key is registered.
    fn ssh_reachable(&self, target: &str) -> Result<bool, GitError>;
}

/// `BatchMode` never prompts. `accept-new` records an unknown host key
/// instead of failing on it; a changed key is still rejected.
const SSH_CHECK_OPTIONS: [&str; 5] = [
    "-T",
    "-o",
    "BatchMode=yes",
    "-o",
    "StrictHostKeyChecking=accept-new",
];

/// `Vcs` backed by the `git` binary on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    fn git(&self, dir: &Path, args: &[&str]) -> Result<Output, GitError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir).args(args);
        run(cmd, &format!("git {}", args.join(" ")))
    }
}

impl Vcs for GitCli {
    fn init(&self, dir: &Path) -> Result<(), GitError> {
        self.git(dir, &["init", "--quiet"]).map(drop)
    }

    fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), GitError> {
        self.git(dir, &["remote", "add", name, url]).map(drop)
    }

    fn fetch(&self, dir: &Path, remote: &str) -> Result<(), GitError> {
        self.git(dir, &["fetch", "--quiet", remote]).map(drop)
    }

    fn checkout_new_branch(
        &self,
        dir: &Path,
        branch: &str,
        start_point: &str,
    ) -> Result<(), GitError> {
        self.git(dir, &["checkout", "--quiet", "-b", branch, start_point])
            .map(drop)
    }

    fn push_all(&self, dir: &Path, remote: &str) -> Result<(), GitError> {
        self.git(dir, &["push", "--quiet", "--all", remote])
            .map(drop)
    }

    fn ssh_reachable(&self, target: &str) -> Result<bool, GitError> {
        let command = format!("ssh -T {}", target);
        tracing::debug!("{}", command);
        let output = Command::new("ssh")
            .args(SSH_CHECK_OPTIONS)
            .arg(target)
            .output()
            .map_err(|source| GitError::Spawn { command, source })?;
        tracing::debug!(
            status = %output.status,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "ssh check finished"
        );
        Ok(output.status.success())
    }
}

fn run(mut cmd: Command, command: &str) -> Result<Output, GitError> {
    tracing::debug!("{}", command);
    let output = cmd.output().map_err(|source| GitError::Spawn {
        command: command.to_string(),
        source,
    })?;
    if !output.status.success() {
        return Err(GitError::Failed {
            command: command.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_check_accepts_new_host_keys() {
        assert!(SSH_CHECK_OPTIONS.contains(&"BatchMode=yes"));
        assert!(SSH_CHECK_OPTIONS.contains(&"StrictHostKeyChecking=accept-new"));
        let batch = SSH_CHECK_OPTIONS.iter().position(|o| *o == "BatchMode=yes");
        assert_eq!(batch.map(|i| SSH_CHECK_OPTIONS[i - 1]), Some("-o"));
    }

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    #[test]
    fn failing_command_reports_stderr() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let err = GitCli.fetch(dir.path(), "origin").unwrap_err();
        match err {
            GitError::Failed { command, stderr, .. } => {
                assert_eq!(command, "git fetch --quiet origin");
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn consolidates_branch_from_local_remote() {
        if !git_available() {
            return;
        }
        let source = tempfile::tempdir().unwrap();
        let commit = |args: &[&str]| {
            let status = Command::new("git")
                .arg("-C")
                .arg(source.path())
                .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
                .args(args)
                .status()
                .unwrap();
            assert!(status.success(), "git {:?}", args);
        };
        commit(&["init", "--quiet"]);
        commit(&["checkout", "--quiet", "-b", "feature/x"]);
        commit(&["commit", "--quiet", "--allow-empty", "-m", "first"]);

        let main = tempfile::tempdir().unwrap();
        let git = GitCli;
        git.init(main.path()).unwrap();
        git.add_remote(main.path(), "7", source.path().to_str().unwrap())
            .unwrap();
        git.fetch(main.path(), "7").unwrap();
        git.checkout_new_branch(main.path(), "group/app/feature/x", "7/feature/x")
            .unwrap();

        let head = Command::new("git")
            .arg("-C")
            .arg(main.path())
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&head.stdout).trim(),
            "group/app/feature/x"
        );
    }
}
