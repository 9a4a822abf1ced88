use crate::model::{Commit, FilterOptions, Repository};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::process::Command;

/// Upper bound on the repository catalog fetch
const REPO_LIST_LIMIT: &str = "1000";

/// The session's data provider. One implementation shells out to `gh`;
/// tests substitute their own.
pub trait CommitSource: Send + Sync {
    /// Ordered repository catalog for the authenticated user
    fn list_repositories(&self) -> Result<Vec<Repository>>;

    /// Ordered branch names for one repository
    fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>>;

    /// One page of commits for a repository/branch under the given filters.
    /// The caller derives "more available" from the returned count.
    fn fetch_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        filters: &FilterOptions,
        page: u32,
    ) -> Result<Vec<Commit>>;
}

/// Check that `gh` is installed and authenticated. Runs before any session
/// state exists; either failure aborts startup.
pub fn ensure_gh_installed() -> Result<()> {
    let output = Command::new("gh")
        .args(["--version"])
        .output()
        .context("GitHub CLI (gh) is not installed. Install it: https://cli.github.com")?;

    if !output.status.success() {
        anyhow::bail!("GitHub CLI (gh) is not working properly");
    }

    let auth = Command::new("gh")
        .args(["auth", "status"])
        .output()
        .context("Failed to check gh auth status")?;

    if !auth.status.success() {
        anyhow::bail!("GitHub CLI is not authenticated. Run: gh auth login");
    }

    Ok(())
}

// ── gh-backed provider ──

pub struct GhClient;

impl GhClient {
    fn run_gh(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new("gh")
            .args(args)
            .output()
            .context("Failed to run gh")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("gh {}: {}", args.first().unwrap_or(&""), stderr.trim());
        }
        Ok(output.stdout)
    }

    fn gh_json<T: serde::de::DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let stdout = self.run_gh(args)?;
        serde_json::from_slice(&stdout).context("Failed to parse gh output")
    }
}

impl CommitSource for GhClient {
    fn list_repositories(&self) -> Result<Vec<Repository>> {
        let response: Vec<RepoResponse> = self.gh_json(&[
            "repo",
            "list",
            "--json",
            "name,nameWithOwner,description,url,pushedAt,defaultBranchRef",
            "--limit",
            REPO_LIST_LIMIT,
        ])?;
        Ok(response.into_iter().map(map_repository).collect())
    }

    fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let endpoint = format!("repos/{}/{}/branches", owner, repo);
        let response: Vec<BranchResponse> = self.gh_json(&["api", &endpoint])?;
        Ok(response.into_iter().map(|b| b.name).collect())
    }

    fn fetch_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        filters: &FilterOptions,
        page: u32,
    ) -> Result<Vec<Commit>> {
        let endpoint = build_commits_endpoint(owner, repo, branch, filters, page);
        let response: Vec<CommitResponse> = self.gh_json(&["api", &endpoint])?;
        Ok(response.into_iter().map(map_commit).collect())
    }
}

// ── Wire format ──

#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    name: String,
    #[serde(rename = "nameWithOwner")]
    name_with_owner: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(rename = "pushedAt", default)]
    pushed_at: Option<String>,
    #[serde(rename = "defaultBranchRef", default)]
    default_branch_ref: Option<BranchResponse>,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitInner,
    #[serde(rename = "html_url", default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct CommitInner {
    #[serde(default)]
    message: String,
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize, Default)]
struct CommitAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    date: Option<String>,
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn map_repository(r: RepoResponse) -> Repository {
    Repository {
        name: r.name,
        pushed_at: parse_timestamp(r.pushed_at.as_deref()),
        name_with_owner: r.name_with_owner,
        description: r.description.unwrap_or_default(),
        url: r.url,
        default_branch: r.default_branch_ref.map(|b| b.name).unwrap_or_default(),
    }
}

fn map_commit(r: CommitResponse) -> Commit {
    let author = r.commit.author.unwrap_or_default();
    Commit {
        sha: r.sha,
        message: r.commit.message,
        author: author.name,
        email: author.email,
        date: parse_timestamp(author.date.as_deref()),
        url: r.html_url,
    }
}

/// Build the REST endpoint for one page of commits. Dates are widened to the
/// inclusive bounds of the given calendar days.
pub fn build_commits_endpoint(
    owner: &str,
    repo: &str,
    branch: &str,
    filters: &FilterOptions,
    page: u32,
) -> String {
    let mut endpoint = format!(
        "repos/{}/{}/commits?per_page={}&page={}",
        owner, repo, filters.per_page, page
    );

    if !branch.is_empty() {
        endpoint.push_str("&sha=");
        endpoint.push_str(branch);
    }
    if !filters.date_from.is_empty() {
        endpoint.push_str("&since=");
        endpoint.push_str(&filters.date_from);
        endpoint.push_str("T00:00:00Z");
    }
    if !filters.date_to.is_empty() {
        endpoint.push_str("&until=");
        endpoint.push_str(&filters.date_to);
        endpoint.push_str("T23:59:59Z");
    }
    if !filters.author.is_empty() {
        endpoint.push_str("&author=");
        endpoint.push_str(&filters.author);
    }
    endpoint
}
