// The interactive run: show the quota, pick projects and a mode, then carry
// out that mode. Everything external is reached through the `GitLab`, `Vcs`
// and `Prompter` traits.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::api::GitLab;
use crate::archive::{
    archive_file_name, consolidated_branch_name, expand_path, upstream_project_name, ArchiveMode,
    ProjectDescriptor, Protocol, QuotaStatus, TEMP_DIR_SUFFIX,
};
use crate::git::Vcs;
use crate::ui::{Prompter, Tone};

const IRREVERSIBLE: &str =
    "Do you want to delete the original projects?\nThis action cannot be undone.";

pub struct Archiver<'a> {
    gitlab: &'a dyn GitLab,
    vcs: &'a dyn Vcs,
    prompter: &'a dyn Prompter,
    ssh_target: String,
}

impl<'a> Archiver<'a> {
    pub fn new(
        gitlab: &'a dyn GitLab,
        vcs: &'a dyn Vcs,
        prompter: &'a dyn Prompter,
        ssh_target: impl Into<String>,
    ) -> Self {
        Archiver {
            gitlab,
            vcs,
            prompter,
            ssh_target: ssh_target.into(),
        }
    }

    /// One full session, from the quota check to the chosen mode's last step.
    pub fn run(&self) -> Result<()> {
        let user = self.gitlab.current_user()?;
        let projects = self.gitlab.owned_projects()?;
        tracing::info!(count = projects.len(), "listed owned projects");

        let quota = QuotaStatus::new(user.projects_limit, projects.len());
        self.prompter.say(quota.tone(), &quota.message());
        self.prompter.pause()?;

        if projects.is_empty() {
            self.prompter.say(
                Tone::Warning,
                "You do not own any projects. Nothing to archive.",
            );
            return Ok(());
        }

        let descriptors: Vec<ProjectDescriptor> =
            projects.into_iter().map(ProjectDescriptor::new).collect();
        let labels: Vec<String> = descriptors.iter().map(|d| d.label.clone()).collect();
        let chosen = self
            .prompter
            .multi_select("Select projects to archive", &labels)?;
        let selected: Vec<ProjectDescriptor> = chosen
            .into_iter()
            .filter_map(|i| descriptors.get(i).cloned())
            .collect();
        if selected.is_empty() {
            self.prompter
                .say(Tone::Error, "No projects selected. Exiting.");
            return Ok(());
        }

        let modes: Vec<String> = ArchiveMode::ALL.iter().map(|m| m.to_string()).collect();
        let index = self.prompter.select("Select archival mode", &modes, 0)?;
        let mode: ArchiveMode = modes
            .get(index)
            .context("Archival mode selection out of range")?
            .parse()?;
        tracing::info!(%mode, projects = selected.len(), "starting");

        match mode {
            ArchiveMode::SingleRepo => self.consolidate(&selected),
            ArchiveMode::DownloadAndDelete => self.download(&selected),
            ArchiveMode::Delete => self.delete_only(&selected),
        }
    }

    /// Merge every branch of every selected project into a fresh upstream
    /// project, then offer to delete the originals.
    pub fn consolidate(&self, selected: &[ProjectDescriptor]) -> Result<()> {
        let Some(protocol) = self.choose_protocol()? else {
            return Ok(());
        };

        let tmp_dir = tempfile::Builder::new()
            .suffix(TEMP_DIR_SUFFIX)
            .tempdir()
            .context("Failed to create temporary directory")?;
        let repo = tmp_dir.path();
        self.prompter.say(
            Tone::Progress,
            &format!("Created temporary directory {}", repo.display()),
        );
        self.vcs.init(repo)?;
        self.prompter.say(
            Tone::Progress,
            &format!("Initialized main repository in {}", repo.display()),
        );

        let upstream_name = upstream_project_name(&Local::now());
        let upstream = self.gitlab.create_project(&upstream_name)?;
        self.prompter.say(
            Tone::Progress,
            &format!("Created upstream project {}", upstream_name),
        );
        self.vcs
            .add_remote(repo, "origin", protocol.clone_url(&upstream))?;

        for descriptor in selected {
            self.merge_project(repo, protocol, descriptor)?;
        }

        // No spinner around fetch/push: git may ask for credentials on the tty.
        self.prompter
            .say(Tone::Progress, "Pushing branches to upstream project");
        self.vcs.push_all(repo, "origin")?;
        self.prompter
            .say(Tone::Progress, "Pushed branches to upstream project");

        let prompt = format!(
            "Your new project is available at {}.\n{}",
            upstream.web_url, IRREVERSIBLE
        );
        self.confirm_and_delete(selected, &prompt)?;
        Ok(())
    }

    /// Ask for the transport and make sure it can work. `None` means stop.
    fn choose_protocol(&self) -> Result<Option<Protocol>> {
        let items: Vec<String> = Protocol::ALL.iter().map(|p| p.to_string()).collect();
        let index = self
            .prompter
            .select("Select protocol for cloning", &items, 0)?;
        let protocol = Protocol::ALL
            .get(index)
            .copied()
            .context("Protocol selection out of range")?;

        match protocol {
            Protocol::Ssh => {
                let spinner = self.prompter.spinner("Checking SSH access...");
                let reachable = self.vcs.ssh_reachable(&self.ssh_target);
                spinner.finish_and_clear();
                if !reachable? {
                    tracing::warn!(ssh_target = %self.ssh_target, "ssh check failed");
                    self.prompter.say(
                        Tone::Error,
                        "You need to set up SSH keys before using this mode.",
                    );
                    return Ok(None);
                }
                self.prompter
                    .say(Tone::Success, "SSH keys are set up already!");
            }
            Protocol::Https => {
                self.prompter.say(
                    Tone::Warning,
                    "You may get prompted for your GitLab username and password.",
                );
            }
        }
        Ok(Some(protocol))
    }

    fn merge_project(
        &self,
        repo: &Path,
        protocol: Protocol,
        descriptor: &ProjectDescriptor,
    ) -> Result<()> {
        let project = &descriptor.project;
        let remote = project.id.to_string();
        self.vcs
            .add_remote(repo, &remote, protocol.clone_url(project))?;

        self.prompter
            .say(Tone::Progress, &format!("Fetching {}", descriptor));
        self.vcs.fetch(repo, &remote)?;

        self.prompter.say(
            Tone::Progress,
            &format!("Grabbing branches from {}", descriptor),
        );
        for branch in self.gitlab.branches(project.id)? {
            self.prompter.say(
                Tone::Progress,
                &format!("Checking out branch {} from {}", branch.name, descriptor),
            );
            let local = consolidated_branch_name(&project.path_with_namespace, &branch.name);
            let start = format!("{}/{}", remote, branch.name);
            self.vcs.checkout_new_branch(repo, &local, &start)?;
            self.prompter.say(
                Tone::Progress,
                &format!("Checked out branch {} from {}", branch.name, descriptor),
            );
        }
        Ok(())
    }

    /// Save one tarball per branch into a user-chosen directory, then offer to
    /// delete the originals.
    pub fn download(&self, selected: &[ProjectDescriptor]) -> Result<()> {
        let answer = self.prompter.input("Select directory to save archives")?;
        if answer.trim().is_empty() {
            self.prompter
                .say(Tone::Error, "No directory selected. Exiting.");
            return Ok(());
        }
        let dir = expand_path(&answer);
        if !dir.is_dir() {
            self.prompter.say(
                Tone::Error,
                &format!("{} is not a directory. Exiting.", dir.display()),
            );
            return Ok(());
        }

        for descriptor in selected {
            let project = &descriptor.project;
            for branch in self.gitlab.branches(project.id)? {
                let spinner = self
                    .prompter
                    .spinner(&format!("Downloading {} from {}...", branch.name, descriptor));
                let archive = self.gitlab.repository_archive(project.id, &branch.name);
                spinner.finish_and_clear();
                let archive = archive?;

                let file = dir.join(archive_file_name(&project.path_with_namespace, &branch.name));
                fs::write(&file, &archive)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                tracing::debug!(path = %file.display(), bytes = archive.len(), "saved archive");
                self.prompter.say(
                    Tone::Progress,
                    &format!(
                        "Downloaded archive for branch {} from {}",
                        branch.name, descriptor
                    ),
                );
            }
        }

        let prompt = format!("Archives have been saved to {}.\n{}", dir.display(), IRREVERSIBLE);
        self.confirm_and_delete(selected, &prompt)?;
        Ok(())
    }

    pub fn delete_only(&self, selected: &[ProjectDescriptor]) -> Result<()> {
        self.confirm_and_delete(selected, IRREVERSIBLE)?;
        Ok(())
    }

    /// The only path to `delete_project`. Returns how many were deleted.
    fn confirm_and_delete(&self, selected: &[ProjectDescriptor], prompt: &str) -> Result<usize> {
        if !self.prompter.confirm(prompt)? {
            tracing::info!("deletion declined");
            return Ok(0);
        }
        for descriptor in selected {
            self.gitlab.delete_project(descriptor.project.id)?;
            self.prompter
                .say(Tone::Warning, &format!("Deleted project {}", descriptor));
        }
        Ok(selected.len())
    }
}
