use crate::model::{Commit, RepoCommits};

/// Moving the cursor into the last N commits of a repository's window
/// triggers a background load of its next page.
pub const LOAD_MORE_MARGIN: usize = 3;

/// The merged, navigable view over every selected repository's commit
/// window. Cross-repository order is fixed to the original selection order
/// for the lifetime of the session; within a repository, commits stay
/// exactly as received.
#[derive(Debug, Default)]
pub struct CommitFeed {
    repos: Vec<RepoCommits>,
    /// Global index over the concatenation of all windows
    cursor: usize,
}

impl CommitFeed {
    pub fn new(repos: Vec<RepoCommits>) -> Self {
        Self { repos, cursor: 0 }
    }

    pub fn repos(&self) -> &[RepoCommits] {
        &self.repos
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.repos.iter().map(|rc| rc.commits.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Move the cursor, clamped to [0, total-1] (0 when the feed is empty)
    pub fn move_cursor(&mut self, delta: isize) {
        let total = self.total();
        let max = total.saturating_sub(1);
        let moved = self.cursor as isize + delta;
        self.cursor = moved.clamp(0, max as isize) as usize;
    }

    /// The repository whose window contains the cursor, with the global
    /// index range [start, end) of that window
    fn window_at_cursor(&self) -> Option<(&RepoCommits, usize, usize)> {
        let mut start = 0;
        for rc in &self.repos {
            let end = start + rc.commits.len();
            if self.cursor >= start && self.cursor < end {
                return Some((rc, start, end));
            }
            start = end;
        }
        None
    }

    pub fn repo_at_cursor(&self) -> Option<&RepoCommits> {
        self.window_at_cursor().map(|(rc, _, _)| rc)
    }

    /// Load-more target after a downward cursor move: the cursor sits in the
    /// trailing margin of a window whose repository still has more pages.
    /// Returns (repository key, next page number).
    pub fn next_page_in_margin(&self) -> Option<(String, u32)> {
        let (rc, _, end) = self.window_at_cursor()?;
        if !rc.has_more || self.cursor < end.saturating_sub(LOAD_MORE_MARGIN) {
            return None;
        }
        Some((rc.repository.name_with_owner.clone(), rc.page + 1))
    }

    /// Load-more target for the explicit "load next page" action: the
    /// repository containing the cursor, if it has more pages.
    pub fn next_page_at_cursor(&self) -> Option<(String, u32)> {
        let (rc, _, _) = self.window_at_cursor()?;
        if !rc.has_more {
            return None;
        }
        Some((rc.repository.name_with_owner.clone(), rc.page + 1))
    }

    /// Append a fetched page to its repository's window: order preserved,
    /// page cursor advanced, "more available" recomputed from the page-size
    /// heuristic. Unknown keys are ignored (a stale result after restart).
    pub fn append_page(&mut self, repo_key: &str, page: u32, commits: Vec<Commit>, per_page: u32) {
        let Some(rc) = self
            .repos
            .iter_mut()
            .find(|rc| rc.repository.name_with_owner == repo_key)
        else {
            return;
        };
        rc.has_more = commits.len() == per_page as usize;
        rc.page = rc.page.max(page);
        rc.commits.extend(commits);
    }
}
