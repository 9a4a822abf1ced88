use thiserror::Error;

/// Failures that reach the session state machine. Preflight failures
/// (gh missing / unauthenticated) abort before a session exists and are
/// plain `anyhow` errors at the CLI edge.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A batch fetch (catalog, branch batch, first-page commit batch) failed.
    /// Session-fatal: the whole batch is discarded and the session moves to
    /// `Failed`; only restarting the program recovers.
    #[error("failed to load {what}: {cause}")]
    BatchFetch { what: String, cause: anyhow::Error },

    /// A single repository's load-more page failed. Scoped to that page:
    /// surfaced as a notice, the in-flight flag is cleared, retry is allowed.
    #[error("failed to load page {page} of {repo}: {cause}")]
    LoadMore {
        repo: String,
        page: u32,
        cause: anyhow::Error,
    },

    /// The external scoring process failed outright while reranking one
    /// repository's batch. Fails that batch only.
    #[error("semantic scoring failed for {repo}: {cause}")]
    ScorerTool { repo: String, cause: anyhow::Error },
}

impl SessionError {
    pub fn batch(what: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::BatchFetch {
            what: what.into(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_error_names_the_batch() {
        let err = SessionError::batch("branches for octocat/trail", anyhow::anyhow!("boom"));
        assert_eq!(
            err.to_string(),
            "failed to load branches for octocat/trail: boom"
        );
    }

    #[test]
    fn load_more_error_names_repo_and_page() {
        let err = SessionError::LoadMore {
            repo: "octocat/trail".to_string(),
            page: 3,
            cause: anyhow::anyhow!("timeout"),
        };
        assert_eq!(
            err.to_string(),
            "failed to load page 3 of octocat/trail: timeout"
        );
    }
}
