use crate::config::ScorerConfig;
use crate::model::Commit;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::process::Command;
use std::sync::OnceLock;

/// Optional relevance-scoring capability. Availability is probed once per
/// process; when unavailable the session never invokes `score`.
pub trait RelevanceScorer: Send + Sync {
    fn is_available(&self) -> bool;

    /// Score a batch of (identifier, text) pairs against a query. Returns
    /// identifier → score for every record the tool emitted. A process-level
    /// failure is an error; partial or malformed output is not.
    fn score(&self, batch: &[(String, String)], query: &str) -> Result<HashMap<String, f64>>;
}

// ── ck-backed scorer ──

/// Shells out to the configured scoring tool (`ck` by default). The batch is
/// staged as one file per commit in a temp directory; the tool prints one
/// JSON relevance record per line.
pub struct CkScorer {
    config: ScorerConfig,
    available: OnceLock<bool>,
}

impl CkScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self {
            config,
            available: OnceLock::new(),
        }
    }
}

impl RelevanceScorer for CkScorer {
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            Command::new(&self.config.command)
                .arg("--version")
                .output()
                .map(|out| out.status.success())
                .unwrap_or(false)
        })
    }

    fn score(&self, batch: &[(String, String)], query: &str) -> Result<HashMap<String, f64>> {
        let dir = tempfile::Builder::new()
            .prefix("ght-semantic-")
            .tempdir()
            .context("Failed to create scoring directory")?;

        for (id, text) in batch {
            let path = dir.path().join(format!("{}.txt", id));
            let mut file =
                std::fs::File::create(&path).context("Failed to stage commit for scoring")?;
            file.write_all(text.as_bytes())
                .context("Failed to stage commit for scoring")?;
        }

        let args = resolve_args(&self.config.args, query, &dir.path().to_string_lossy());

        let output = Command::new(&self.config.command)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to run {}", self.config.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed: {}", self.config.command, stderr.trim());
        }

        Ok(parse_score_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Substitute the `{query}` and `{dir}` placeholders in the configured
/// argument template
fn resolve_args(template: &[String], query: &str, dir: &str) -> Vec<String> {
    template
        .iter()
        .map(|a| a.replace("{query}", query).replace("{dir}", dir))
        .collect()
}

// ── Relevance-record parsing ──

#[derive(Debug, Deserialize)]
struct ScoreRecord {
    file: String,
    score: f64,
}

/// Parse relevance records, one JSON object per line. Malformed lines are
/// skipped, blank lines ignored; parsing never fails as a whole.
pub fn parse_score_output(output: &str) -> HashMap<String, f64> {
    let mut scores = HashMap::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ScoreRecord>(line) {
            Ok(record) => {
                scores.insert(id_from_path(&record.file).to_string(), record.score);
            }
            Err(err) => {
                tracing::warn!("skipping malformed relevance record: {}", err);
            }
        }
    }
    scores
}

/// Recover a commit identity from the tool's path-like identifier:
/// last path segment, minus any file extension.
fn id_from_path(path: &str) -> &str {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base)
}

// ── Reranking ──

/// Rerank a first-page batch by relevance. Returns the scored subset in
/// descending score order; commits without a recovered score are dropped.
/// A scorer process failure propagates to the caller.
pub fn rerank_commits(
    scorer: &dyn RelevanceScorer,
    commits: Vec<Commit>,
    query: &str,
) -> Result<Vec<Commit>> {
    if query.is_empty() || commits.is_empty() {
        return Ok(commits);
    }

    let batch: Vec<(String, String)> = commits
        .iter()
        .map(|c| (c.sha.clone(), c.message.clone()))
        .collect();
    let scores = scorer.score(&batch, query)?;

    Ok(filter_and_sort_by_score(commits, &scores))
}

fn filter_and_sort_by_score(commits: Vec<Commit>, scores: &HashMap<String, f64>) -> Vec<Commit> {
    let mut scored: Vec<(f64, Commit)> = commits
        .into_iter()
        .filter_map(|c| scores.get(&c.sha).map(|&s| (s, c)))
        .collect();
    // Stable sort keeps the received order for equal scores
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, c)| c).collect()
}
