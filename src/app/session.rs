use super::feed::CommitFeed;
use super::screens::{Browse, FilterForm, RepoBranches, RepoSelect};
use crate::error::SessionError;
use crate::github::CommitSource;
use crate::model::{Commit, FilterOptions, RepoCommits, Repository};
use crate::semantic::{self, RelevanceScorer};
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// The active screen. Each variant owns only the state relevant to it;
/// everything session-wide lives on `Session`.
#[derive(Debug)]
pub enum Screen {
    Initializing,
    SelectingRepos(RepoSelect),
    ResolvingBranches,
    ConfiguringFilters(FilterForm),
    LoadingCommits,
    Browsing(Browse),
    /// Terminal: a batch fetch failed. Only restarting the program recovers.
    Failed(String),
}

/// Exactly one result event per background task
#[derive(Debug)]
pub enum SessionEvent {
    CatalogLoaded(Vec<Repository>),
    BranchesLoaded(Vec<RepoBranches>),
    CommitsLoaded {
        repos: Vec<RepoCommits>,
        /// Repo-scoped scorer failures collected during the semantic pass
        notices: Vec<String>,
    },
    MoreLoaded {
        repo: String,
        page: u32,
        commits: Vec<Commit>,
    },
    MoreFailed {
        message: String,
    },
    BatchFailed(String),
}

/// The session controller. Exclusively owns and mutates all session state;
/// the UI reads snapshots, key handlers call the intent methods below, and
/// each background task resolves to one `SessionEvent` applied here.
pub struct Session {
    source: Arc<dyn CommitSource>,
    scorer: Arc<dyn RelevanceScorer>,
    events: Sender<SessionEvent>,

    /// Full repository catalog, fetched once per program run
    pub catalog: Vec<Repository>,
    /// The user's subset, in selection (catalog) order
    pub selected: Vec<Repository>,
    /// Repository key → resolved branch
    pub branches: HashMap<String, String>,
    pub filters: FilterOptions,
    pub feed: CommitFeed,
    /// Serializes load-more: at most one in flight session-wide
    loading_more: bool,
    pub screen: Screen,
    pub should_quit: bool,
}

impl Session {
    /// Create the session and kick off the catalog fetch
    pub fn new(
        source: Arc<dyn CommitSource>,
        scorer: Arc<dyn RelevanceScorer>,
        seed_filters: FilterOptions,
        events: Sender<SessionEvent>,
    ) -> Self {
        let session = Self {
            source,
            scorer,
            events,
            catalog: Vec::new(),
            selected: Vec::new(),
            branches: HashMap::new(),
            filters: seed_filters,
            feed: CommitFeed::default(),
            loading_more: false,
            screen: Screen::Initializing,
            should_quit: false,
        };
        session.spawn_catalog_fetch();
        session
    }

    pub fn loading_more(&self) -> bool {
        self.loading_more
    }

    fn spawn_catalog_fetch(&self) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        thread::spawn(move || {
            let event = match source.list_repositories() {
                Ok(repos) => SessionEvent::CatalogLoaded(repos),
                Err(err) => {
                    SessionEvent::BatchFailed(SessionError::batch("repositories", err).to_string())
                }
            };
            let _ = events.send(event);
        });
    }

    // ── Intents (from key handlers) ──

    /// Confirm the repository subset and start the branch batch. One task,
    /// sequential over the selection, fail-fast: any error discards the
    /// whole batch.
    pub fn confirm_selection(&mut self) {
        let Screen::SelectingRepos(select) = &self.screen else {
            return;
        };
        let selection = select.selection(&self.catalog);
        if selection.is_empty() {
            return;
        }
        info!(count = selection.len(), "repository subset confirmed");
        self.selected = selection.clone();
        self.screen = Screen::ResolvingBranches;

        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        thread::spawn(move || {
            let mut lists = Vec::with_capacity(selection.len());
            for repo in selection {
                match source.list_branches(repo.owner(), repo.repo_name()) {
                    Ok(branches) => lists.push(RepoBranches { repo, branches }),
                    Err(err) => {
                        let what = format!("branches for {}", repo.name_with_owner);
                        let _ = events.send(SessionEvent::BatchFailed(
                            SessionError::batch(what, err).to_string(),
                        ));
                        return;
                    }
                }
            }
            let _ = events.send(SessionEvent::BranchesLoaded(lists));
        });
    }

    /// Submit the filter form: validate, capture the branch map, and fetch
    /// page 1 for every selected repository in one fail-fast task. The
    /// semantic pass, when enabled and available, reranks each first page
    /// inside the same task.
    pub fn submit_filters(&mut self) {
        let Screen::ConfiguringFilters(form) = &self.screen else {
            return;
        };
        self.filters = form.filters();
        self.branches = form.branch_map();
        self.screen = Screen::LoadingCommits;
        info!(per_page = self.filters.per_page, "loading first pages");

        let source = Arc::clone(&self.source);
        let scorer = Arc::clone(&self.scorer);
        let events = self.events.clone();
        let selected = self.selected.clone();
        let branches = self.branches.clone();
        let filters = self.filters.clone();
        thread::spawn(move || {
            let mut repos = Vec::with_capacity(selected.len());
            for repo in selected {
                let branch = branches
                    .get(&repo.name_with_owner)
                    .filter(|b| !b.is_empty())
                    .cloned()
                    .unwrap_or_else(|| repo.default_branch.clone());
                match source.fetch_commits(repo.owner(), repo.repo_name(), &branch, &filters, 1) {
                    Ok(commits) => {
                        let has_more = commits.len() == filters.per_page as usize;
                        repos.push(RepoCommits {
                            repository: repo,
                            branch,
                            commits,
                            page: 1,
                            has_more,
                        });
                    }
                    Err(err) => {
                        let what = format!("commits for {}", repo.name_with_owner);
                        let _ = events.send(SessionEvent::BatchFailed(
                            SessionError::batch(what, err).to_string(),
                        ));
                        return;
                    }
                }
            }

            let mut notices = Vec::new();
            if filters.has_semantic_filter() && scorer.is_available() {
                for rc in &mut repos {
                    let batch = std::mem::take(&mut rc.commits);
                    match semantic::rerank_commits(&*scorer, batch, &filters.semantic_query) {
                        Ok(commits) => rc.commits = commits,
                        Err(err) => {
                            // Fails this repository's batch only; the other
                            // repositories keep their pages.
                            let error = SessionError::ScorerTool {
                                repo: rc.repository.name_with_owner.clone(),
                                cause: err,
                            };
                            notices.push(error.to_string());
                            rc.has_more = false;
                        }
                    }
                }
            }

            let _ = events.send(SessionEvent::CommitsLoaded { repos, notices });
        });
    }

    /// Move the browsing cursor; a downward move into a window's trailing
    /// margin triggers a background load of that repository's next page
    pub fn move_cursor(&mut self, delta: isize) {
        if !matches!(self.screen, Screen::Browsing(_)) {
            return;
        }
        self.feed.move_cursor(delta);
        if delta > 0 {
            if let Some((repo, page)) = self.feed.next_page_in_margin() {
                self.spawn_load_more(repo, page);
            }
        }
    }

    /// Explicit "load next page" for the repository containing the cursor
    pub fn request_more(&mut self) {
        if !matches!(self.screen, Screen::Browsing(_)) {
            return;
        }
        if let Some((repo, page)) = self.feed.next_page_at_cursor() {
            self.spawn_load_more(repo, page);
        }
    }

    /// Dispatch a load-more task unless one is already in flight; extra
    /// triggers are dropped, not queued
    fn spawn_load_more(&mut self, repo_key: String, page: u32) {
        if self.loading_more {
            return;
        }
        let Some(rc) = self
            .feed
            .repos()
            .iter()
            .find(|rc| rc.repository.name_with_owner == repo_key)
        else {
            return;
        };
        self.loading_more = true;
        info!(repo = %repo_key, page, "loading more commits");

        let repository = rc.repository.clone();
        let branch = rc.branch.clone();
        let filters = self.filters.clone();
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        thread::spawn(move || {
            let result = source.fetch_commits(
                repository.owner(),
                repository.repo_name(),
                &branch,
                &filters,
                page,
            );
            let event = match result {
                Ok(commits) => SessionEvent::MoreLoaded {
                    repo: repo_key,
                    page,
                    commits,
                },
                Err(err) => SessionEvent::MoreFailed {
                    message: SessionError::LoadMore {
                        repo: repo_key,
                        page,
                        cause: err,
                    }
                    .to_string(),
                },
            };
            let _ = events.send(event);
        });
    }

    /// Toggle the detail box for the commit under the cursor
    pub fn toggle_expanded(&mut self) {
        let cursor = self.feed.cursor();
        if let Screen::Browsing(browse) = &mut self.screen {
            browse.toggle_expanded(cursor);
        }
    }

    /// Back to repository selection. Clears the subset, branch map and all
    /// commit windows; the catalog is kept and not re-fetched.
    pub fn restart(&mut self) {
        if !matches!(self.screen, Screen::Browsing(_)) {
            return;
        }
        info!("session restart");
        self.selected.clear();
        self.branches.clear();
        self.feed = CommitFeed::default();
        self.loading_more = false;
        self.screen = Screen::SelectingRepos(RepoSelect::new());
    }

    // ── Event application ──

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CatalogLoaded(repos) => {
                info!(count = repos.len(), "catalog loaded");
                self.catalog = repos;
                self.screen = Screen::SelectingRepos(RepoSelect::new());
            }
            SessionEvent::BranchesLoaded(lists) => {
                if matches!(self.screen, Screen::ResolvingBranches) {
                    self.screen =
                        Screen::ConfiguringFilters(FilterForm::new(lists, &self.filters));
                }
            }
            SessionEvent::CommitsLoaded { repos, notices } => {
                if matches!(self.screen, Screen::LoadingCommits) {
                    self.feed = CommitFeed::new(repos);
                    let notice = if notices.is_empty() {
                        None
                    } else {
                        Some(notices.join("; "))
                    };
                    self.screen = Screen::Browsing(Browse::new(notice));
                }
            }
            SessionEvent::MoreLoaded {
                repo,
                page,
                commits,
            } => {
                self.loading_more = false;
                self.feed
                    .append_page(&repo, page, commits, self.filters.per_page);
                if let Screen::Browsing(browse) = &mut self.screen {
                    browse.notice = None;
                }
            }
            SessionEvent::MoreFailed { message } => {
                warn!(%message, "load-more failed");
                self.loading_more = false;
                if let Screen::Browsing(browse) = &mut self.screen {
                    browse.notice = Some(message);
                }
            }
            SessionEvent::BatchFailed(message) => {
                warn!(%message, "batch fetch failed");
                self.screen = Screen::Failed(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;

    const RECV_WAIT: Duration = Duration::from_secs(5);

    fn repo(key: &str) -> Repository {
        Repository {
            name: key.split('/').next_back().unwrap_or(key).to_string(),
            name_with_owner: key.to_string(),
            description: String::new(),
            url: String::new(),
            pushed_at: None,
            default_branch: "main".to_string(),
        }
    }

    struct StubSource {
        catalog: Vec<Repository>,
        branches: Vec<String>,
        fail_branches: bool,
        fail_commits: bool,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                catalog: vec![repo("octo/alpha"), repo("octo/beta")],
                branches: vec!["main".to_string(), "dev".to_string()],
                fail_branches: false,
                fail_commits: false,
            }
        }
    }

    impl CommitSource for StubSource {
        fn list_repositories(&self) -> Result<Vec<Repository>> {
            Ok(self.catalog.clone())
        }

        fn list_branches(&self, _owner: &str, _repo: &str) -> Result<Vec<String>> {
            if self.fail_branches {
                anyhow::bail!("branch fetch refused");
            }
            Ok(self.branches.clone())
        }

        fn fetch_commits(
            &self,
            _owner: &str,
            repo: &str,
            _branch: &str,
            filters: &FilterOptions,
            page: u32,
        ) -> Result<Vec<Commit>> {
            if self.fail_commits {
                anyhow::bail!("commit fetch refused");
            }
            // Always a full page: has_more stays true
            Ok((0..filters.per_page)
                .map(|i| Commit {
                    sha: format!("{repo}-p{page}-{i}"),
                    message: format!("commit {i} of {repo}"),
                    author: String::new(),
                    email: String::new(),
                    date: None,
                    url: String::new(),
                })
                .collect())
        }
    }

    struct NoScorer;

    impl RelevanceScorer for NoScorer {
        fn is_available(&self) -> bool {
            false
        }
        fn score(
            &self,
            _batch: &[(String, String)],
            _query: &str,
        ) -> Result<HashMap<String, f64>> {
            unreachable!("unavailable scorer must never be invoked");
        }
    }

    struct FailingScorer;

    impl RelevanceScorer for FailingScorer {
        fn is_available(&self) -> bool {
            true
        }
        fn score(
            &self,
            _batch: &[(String, String)],
            _query: &str,
        ) -> Result<HashMap<String, f64>> {
            anyhow::bail!("scoring process crashed");
        }
    }

    struct FirstCommitScorer;

    impl RelevanceScorer for FirstCommitScorer {
        fn is_available(&self) -> bool {
            true
        }
        fn score(
            &self,
            batch: &[(String, String)],
            _query: &str,
        ) -> Result<HashMap<String, f64>> {
            // Score only the first commit of each batch
            Ok(batch
                .first()
                .map(|(id, _)| HashMap::from([(id.clone(), 1.0)]))
                .unwrap_or_default())
        }
    }

    fn new_session(
        source: StubSource,
        scorer: Arc<dyn RelevanceScorer>,
        seed: FilterOptions,
    ) -> (Session, Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel();
        let session = Session::new(Arc::new(source), scorer, seed, tx);
        (session, rx)
    }

    fn pump(session: &mut Session, rx: &Receiver<SessionEvent>) {
        let event = rx.recv_timeout(RECV_WAIT).expect("task event");
        session.apply(event);
    }

    fn select_both(session: &mut Session) {
        let Screen::SelectingRepos(select) = &mut session.screen else {
            panic!("expected repo selection");
        };
        select.selected.insert(0);
        select.selected.insert(1);
    }

    /// Drive a fresh session all the way into Browsing
    fn browse(session: &mut Session, rx: &Receiver<SessionEvent>) {
        pump(session, rx); // catalog
        select_both(session);
        session.confirm_selection();
        assert!(matches!(session.screen, Screen::ResolvingBranches));
        pump(session, rx); // branches
        assert!(matches!(session.screen, Screen::ConfiguringFilters(_)));
        session.submit_filters();
        assert!(matches!(session.screen, Screen::LoadingCommits));
        pump(session, rx); // commits
        assert!(matches!(session.screen, Screen::Browsing(_)));
    }

    #[test]
    fn startup_loads_catalog_into_selection() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        assert!(matches!(session.screen, Screen::Initializing));
        pump(&mut session, &rx);
        assert!(matches!(session.screen, Screen::SelectingRepos(_)));
        assert_eq!(session.catalog.len(), 2);
    }

    #[test]
    fn empty_selection_cannot_be_confirmed() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        pump(&mut session, &rx);
        session.confirm_selection();
        assert!(matches!(session.screen, Screen::SelectingRepos(_)));
    }

    #[test]
    fn full_flow_reaches_browsing_in_selection_order() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        browse(&mut session, &rx);

        assert_eq!(session.feed.cursor(), 0);
        assert_eq!(session.feed.total(), 100);
        let repos = session.feed.repos();
        assert_eq!(repos[0].repository.name_with_owner, "octo/alpha");
        assert_eq!(repos[1].repository.name_with_owner, "octo/beta");
        assert!(repos[0].commits[0].sha.starts_with("alpha-p1-"));
        assert!(repos.iter().all(|rc| rc.page == 1 && rc.has_more));
    }

    #[test]
    fn branch_batch_failure_is_session_fatal() {
        let mut source = StubSource::new();
        source.fail_branches = true;
        let (mut session, rx) = new_session(source, Arc::new(NoScorer), FilterOptions::default());
        pump(&mut session, &rx);
        select_both(&mut session);
        session.confirm_selection();
        pump(&mut session, &rx);

        let Screen::Failed(message) = &session.screen else {
            panic!("expected failed state");
        };
        assert!(message.contains("branches for octo/alpha"));
    }

    #[test]
    fn commit_batch_failure_is_session_fatal() {
        let mut source = StubSource::new();
        source.fail_commits = true;
        let (mut session, rx) = new_session(source, Arc::new(NoScorer), FilterOptions::default());
        pump(&mut session, &rx);
        select_both(&mut session);
        session.confirm_selection();
        pump(&mut session, &rx);
        session.submit_filters();
        pump(&mut session, &rx);
        assert!(matches!(session.screen, Screen::Failed(_)));
    }

    #[test]
    fn margin_move_triggers_exactly_one_load_more() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        browse(&mut session, &rx);

        // Into alpha's trailing margin (window end 50, margin starts at 47)
        session.move_cursor(47);
        assert!(session.loading_more());

        // Second trigger while in flight: dropped, not queued
        session.move_cursor(1);
        session.request_more();

        let event = rx.recv_timeout(RECV_WAIT).expect("load-more result");
        session.apply(event);
        assert!(!session.loading_more());
        assert_eq!(session.feed.repos()[0].commits.len(), 100);
        assert_eq!(session.feed.repos()[0].page, 2);

        // Exactly one task ran: nothing else ever arrives
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn explicit_request_targets_cursor_repo() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        browse(&mut session, &rx);

        // Cursor at 0 sits in octo/alpha
        session.request_more();
        pump(&mut session, &rx);
        assert_eq!(session.feed.repos()[0].commits.len(), 100);
        assert_eq!(session.feed.repos()[1].commits.len(), 50);
    }

    #[test]
    fn load_more_failure_is_a_notice_not_a_transition() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        browse(&mut session, &rx);

        session.apply(SessionEvent::MoreFailed {
            message: "failed to load page 2 of octo/alpha: boom".to_string(),
        });

        let Screen::Browsing(browse_state) = &session.screen else {
            panic!("expected browsing to survive");
        };
        assert!(browse_state.notice.as_deref().unwrap().contains("page 2"));
        assert!(!session.loading_more());

        // The cleared flag allows a retry
        session.request_more();
        assert!(session.loading_more());
        pump(&mut session, &rx);
    }

    #[test]
    fn restart_keeps_catalog_and_clears_the_rest() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        browse(&mut session, &rx);

        session.restart();

        assert!(matches!(session.screen, Screen::SelectingRepos(_)));
        assert_eq!(session.catalog.len(), 2);
        assert!(session.selected.is_empty());
        assert!(session.branches.is_empty());
        assert_eq!(session.feed.total(), 0);
        // No catalog re-fetch was issued
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn restart_only_applies_while_browsing() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        pump(&mut session, &rx);
        session.restart();
        assert!(matches!(session.screen, Screen::SelectingRepos(_)));
        select_both(&mut session);
        session.restart();
        let Screen::SelectingRepos(select) = &session.screen else {
            panic!("expected repo selection");
        };
        assert_eq!(select.selected.len(), 2);
    }

    #[test]
    fn semantic_query_with_unavailable_scorer_is_silently_ignored() {
        let seed = FilterOptions {
            semantic_query: "auth refactor".to_string(),
            ..FilterOptions::default()
        };
        let (mut session, rx) = new_session(StubSource::new(), Arc::new(NoScorer), seed);
        browse(&mut session, &rx);

        // Full pages pass through unchanged, no notice
        assert_eq!(session.feed.total(), 100);
        let Screen::Browsing(browse_state) = &session.screen else {
            panic!("expected browsing");
        };
        assert!(browse_state.notice.is_none());
    }

    #[test]
    fn semantic_pass_reranks_each_first_page() {
        let seed = FilterOptions {
            semantic_query: "auth refactor".to_string(),
            ..FilterOptions::default()
        };
        let (mut session, rx) = new_session(StubSource::new(), Arc::new(FirstCommitScorer), seed);
        browse(&mut session, &rx);

        // Each repository's page collapses to its single scored commit;
        // has_more keeps the pre-rerank page-size heuristic.
        assert_eq!(session.feed.total(), 2);
        assert_eq!(session.feed.repos()[0].commits[0].sha, "alpha-p1-0");
        assert_eq!(session.feed.repos()[1].commits[0].sha, "beta-p1-0");
        assert!(session.feed.repos().iter().all(|rc| rc.has_more));
    }

    #[test]
    fn scorer_process_failure_fails_only_that_batch() {
        let seed = FilterOptions {
            semantic_query: "auth refactor".to_string(),
            ..FilterOptions::default()
        };
        let (mut session, rx) = new_session(StubSource::new(), Arc::new(FailingScorer), seed);
        browse(&mut session, &rx);

        // Both batches happen to fail here (same scorer), but the session
        // still reaches Browsing with the failures as notices.
        let Screen::Browsing(browse_state) = &session.screen else {
            panic!("expected browsing");
        };
        let notice = browse_state.notice.as_deref().unwrap();
        assert!(notice.contains("semantic scoring failed for octo/alpha"));
        assert!(notice.contains("octo/beta"));
        assert_eq!(session.feed.total(), 0);
        assert!(session.feed.repos().iter().all(|rc| !rc.has_more));
    }

    #[test]
    fn stale_load_more_after_restart_is_ignored() {
        let (mut session, rx) =
            new_session(StubSource::new(), Arc::new(NoScorer), FilterOptions::default());
        browse(&mut session, &rx);
        session.move_cursor(47); // in-flight load-more for octo/alpha
        session.restart();

        // The task cannot be cancelled; its late result must not disturb
        // the fresh selection screen.
        pump(&mut session, &rx);
        assert!(matches!(session.screen, Screen::SelectingRepos(_)));
        assert_eq!(session.feed.total(), 0);
        assert!(!session.loading_more());
    }
}
