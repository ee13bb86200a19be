// API client module: a small blocking client for the parts of the GitLab
// REST API (v4) this tool needs. The `GitLab` trait is what the workflow
// talks to, so tests can swap in an in-memory fake.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::ApiError;

const PER_PAGE: &str = "100";
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Operations the archiver needs from a GitLab instance.
pub trait GitLab {
    fn current_user(&self) -> Result<User>;
    /// Projects owned by the current user, most recently active first.
    fn owned_projects(&self) -> Result<Vec<Project>>;
    fn create_project(&self, name: &str) -> Result<Project>;
    fn branches(&self, project_id: u64) -> Result<Vec<Branch>>;
    /// Raw `tar.gz` archive of `git_ref`.
    fn repository_archive(&self, project_id: u64, git_ref: &str) -> Result<Vec<u8>>;
    fn delete_project(&self, project_id: u64) -> Result<()>;
}

/// The authenticated user. Only the quota is of interest.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub username: String,
    pub projects_limit: i64,
}

/// Subset of GitLab's project representation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub name_with_namespace: String,
    pub path_with_namespace: String,
    pub last_activity_at: DateTime<Utc>,
    pub ssh_url_to_repo: String,
    pub http_url_to_repo: String,
    pub web_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Branch {
    pub name: String,
}

/// Payload for `POST /projects`.
#[derive(Serialize, Debug)]
pub struct CreateProjectRequest<'a> {
    pub name: &'a str,
}

/// Blocking client holding the reqwest client (with the private token baked
/// into its default headers) and the `/api/v4` base URL.
#[derive(Clone)]
pub struct GitLabClient {
    client: Client,
    base_url: Url,
}

impl GitLabClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut token = HeaderValue::from_str(&settings.token)
            .context("GitLab token contains characters not allowed in a header")?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("private-token", token);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(GitLabClient {
            client,
            base_url: api_base(&settings.server),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid API path {}", path))
    }

    /// Fetch every page of a list endpoint, following `X-Next-Page`.
    fn get_all<T: DeserializeOwned>(
        &self,
        action: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let url = self.url(path)?;
        let mut items = Vec::new();
        let mut page = String::from("1");
        loop {
            tracing::debug!(%url, %page, "GET");
            let res = self
                .client
                .get(url.clone())
                .query(query)
                .query(&[("per_page", PER_PAGE), ("page", page.as_str())])
                .send()
                .with_context(|| format!("Failed to send request: {}", action))?;
            let res = check(action, res)?;
            let next = next_page(res.headers());
            let batch: Vec<T> = res
                .json()
                .with_context(|| format!("Parsing response json: {}", action))?;
            items.extend(batch);
            match next {
                Some(n) => page = n,
                None => break,
            }
        }
        Ok(items)
    }

    fn send(&self, action: &str, req: RequestBuilder) -> Result<Response> {
        let res = req
            .send()
            .with_context(|| format!("Failed to send request: {}", action))?;
        check(action, res)
    }
}

impl GitLab for GitLabClient {
    fn current_user(&self) -> Result<User> {
        let action = "Fetch current user";
        let res = self.send(action, self.client.get(self.url("user")?))?;
        let user: User = res.json().context("Parsing user response json")?;
        tracing::info!(username = %user.username, limit = user.projects_limit, "authenticated");
        Ok(user)
    }

    fn owned_projects(&self) -> Result<Vec<Project>> {
        self.get_all(
            "List owned projects",
            "projects",
            &[("owned", "true"), ("order_by", "last_activity_at")],
        )
    }

    fn create_project(&self, name: &str) -> Result<Project> {
        let action = format!("Create project {}", name);
        let req = self
            .client
            .post(self.url("projects")?)
            .json(&CreateProjectRequest { name });
        let res = self.send(&action, req)?;
        let project: Project = res.json().context("Parsing created project json")?;
        tracing::info!(id = project.id, path = %project.path_with_namespace, "created project");
        Ok(project)
    }

    fn branches(&self, project_id: u64) -> Result<Vec<Branch>> {
        self.get_all(
            &format!("List branches of project {}", project_id),
            &format!("projects/{}/repository/branches", project_id),
            &[],
        )
    }

    fn repository_archive(&self, project_id: u64, git_ref: &str) -> Result<Vec<u8>> {
        let action = format!("Download archive of project {} at {}", project_id, git_ref);
        let url = self.url(&format!("projects/{}/repository/archive.tar.gz", project_id))?;
        let req = self.client.get(url).query(&[("sha", git_ref)]);
        let res = self.send(&action, req)?;
        let bytes = res
            .bytes()
            .with_context(|| format!("Reading body: {}", action))?;
        tracing::debug!(project_id, git_ref, size = bytes.len(), "downloaded archive");
        Ok(bytes.to_vec())
    }

    fn delete_project(&self, project_id: u64) -> Result<()> {
        let action = format!("Delete project {}", project_id);
        let url = self.url(&format!("projects/{}", project_id))?;
        self.send(&action, self.client.delete(url))?;
        tracing::info!(project_id, "deleted project");
        Ok(())
    }
}

/// `https://host/prefix` -> `https://host/prefix/api/v4/`. The trailing
/// slash matters for `Url::join`.
fn api_base(server: &Url) -> Url {
    let mut base = server.clone();
    let path = format!("{}/api/v4/", server.path().trim_end_matches('/'));
    base.set_path(&path);
    base.set_query(None);
    base
}

fn next_page(headers: &HeaderMap) -> Option<String> {
    headers
        .get(NEXT_PAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Turn a non-success response into an `ApiError`, preferring GitLab's
/// `message` / `error` field over the raw body.
fn check(action: &str, res: Response) -> Result<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let txt = res.text().unwrap_or_else(|_| "".into());
    Err(ApiError::Status {
        action: action.to_string(),
        status,
        message: error_message(&txt),
    }
    .into())
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("message").or_else(|| json.get("error")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}
