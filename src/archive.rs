//! Vocabulary of an archiving run: archive modes, clone protocols, quota
//! status, and the naming rules for consolidated branches and downloaded
//! archives.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, TimeZone};

use crate::api::Project;
use crate::error::ParseModeError;
use crate::ui::Tone;

/// Remaining-project count at or below which the quota message turns yellow.
pub const QUOTA_WARNING_MARGIN: i64 = 5;

/// Suffix of the scratch directory the consolidated repository is built in.
pub const TEMP_DIR_SUFFIX: &str = "_gitlab-archive";

/// Strategy applied to every selected project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    /// Merge all branches into one new upstream project.
    SingleRepo,
    /// Save per-branch tarballs locally.
    DownloadAndDelete,
    Delete,
}

impl ArchiveMode {
    pub const ALL: [ArchiveMode; 3] = [
        ArchiveMode::SingleRepo,
        ArchiveMode::DownloadAndDelete,
        ArchiveMode::Delete,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ArchiveMode::SingleRepo => "Archive into single repo",
            ArchiveMode::DownloadAndDelete => "Download archives and delete",
            ArchiveMode::Delete => "Delete without saving",
        }
    }
}

impl fmt::Display for ArchiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ArchiveMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArchiveMode::ALL
            .into_iter()
            .find(|mode| mode.label() == s)
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

/// Transport used for cloning and pushing in consolidation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Ssh,
    Https,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Ssh, Protocol::Https];

    pub fn clone_url(self, project: &Project) -> &str {
        match self {
            Protocol::Ssh => &project.ssh_url_to_repo,
            Protocol::Https => &project.http_url_to_repo,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ssh => f.write_str("SSH"),
            Protocol::Https => f.write_str("HTTPS"),
        }
    }
}

/// Where the user stands relative to `projects_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaStatus {
    Exhausted { limit: i64 },
    Low { remaining: i64, limit: i64 },
    Plenty { remaining: i64, limit: i64 },
}

impl QuotaStatus {
    pub fn new(limit: i64, owned: usize) -> Self {
        let owned = i64::try_from(owned).unwrap_or(i64::MAX);
        let remaining = limit.saturating_sub(owned);
        if remaining <= 0 {
            QuotaStatus::Exhausted { limit }
        } else if remaining <= QUOTA_WARNING_MARGIN {
            QuotaStatus::Low { remaining, limit }
        } else {
            QuotaStatus::Plenty { remaining, limit }
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            QuotaStatus::Exhausted { .. } => Tone::Error,
            QuotaStatus::Low { .. } => Tone::Warning,
            QuotaStatus::Plenty { .. } => Tone::Success,
        }
    }

    pub fn message(&self) -> String {
        match self {
            QuotaStatus::Exhausted { limit } => format!(
                "You have reached the project limit of {} projects. You will need to delete \
                 one or more projects manually to use the '{}' mode.",
                limit,
                ArchiveMode::SingleRepo
            ),
            QuotaStatus::Low { remaining, limit } | QuotaStatus::Plenty { remaining, limit } => {
                format!(
                    "You have {} projects left before reaching the project limit of {}.",
                    remaining, limit
                )
            }
        }
    }
}

/// A project paired with the label it is shown under in the selection list.
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    pub label: String,
    pub project: Project,
}

impl ProjectDescriptor {
    pub fn new(project: Project) -> Self {
        ProjectDescriptor {
            label: describe(&project),
            project,
        }
    }
}

impl fmt::Display for ProjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// `"Group / Name (Last activity 03/05/2024, 14:07)"`
pub fn describe(project: &Project) -> String {
    format!(
        "{} (Last activity {})",
        project.name_with_namespace,
        project.last_activity_at.format("%m/%d/%Y, %H:%M")
    )
}

/// Branch name inside the consolidated repository.
pub fn consolidated_branch_name(path_with_namespace: &str, branch: &str) -> String {
    format!("{}/{}", path_with_namespace, branch)
}

/// File name for a downloaded branch archive. Slashes would create
/// subdirectories, so they become dashes.
pub fn archive_file_name(path_with_namespace: &str, branch: &str) -> String {
    format!(
        "{}-{}.tar.gz",
        path_with_namespace.replace('/', "-"),
        branch.replace('/', "-")
    )
}

pub fn upstream_project_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("project-archive-{}", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references in a user-typed path.
pub fn expand_path(input: &str) -> PathBuf {
    let home = dirs::home_dir();
    expand_path_with(input, home.as_deref(), |name| std::env::var(name).ok())
}

fn expand_path_with(
    input: &str,
    home: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    let input = input.trim();
    let expanded = match (home, input.strip_prefix('~')) {
        (Some(home), Some("")) => home.to_path_buf(),
        (Some(home), Some(rest)) if rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(input),
    };
    PathBuf::from(expand_vars(&expanded.to_string_lossy(), &lookup))
}

/// Unknown variables are left untouched.
fn expand_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = match after.strip_prefix('{') {
            Some(inner) => match inner.find('}') {
                Some(end) => (&inner[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };
        let value = if name.is_empty() { None } else { lookup(name) };
        match value {
            Some(value) => {
                out.push_str(&value);
                rest = &after[consumed..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
