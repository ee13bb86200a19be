// Library root
// -----------
// The binary (`main.rs`) wires these modules into the interactive CLI.
//
// Module responsibilities:
// - `config`: command-line flags and environment (`GITLAB_SERVER`,
//   `GITLAB_TOKEN`, ...) turned into validated `Settings`.
// - `api`: blocking GitLab REST client behind the `GitLab` trait.
// - `git`: `git`/`ssh` subprocess wrapper behind the `Vcs` trait.
// - `archive`: archive modes, quota status and naming rules.
// - `workflow`: the session itself, driving the three archive modes.
// - `ui`: terminal prompts and styled output behind the `Prompter` trait.
// - `error`: typed errors for the API, git and mode parsing.
pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod git;
pub mod ui;
pub mod workflow;
