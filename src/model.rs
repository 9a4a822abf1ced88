use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 100;

// ── Repository ──

/// A repository from the user's catalog. Immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    pub name: String,
    /// "owner/name", the unique key for a repository within a session
    pub name_with_owner: String,
    pub description: String,
    pub url: String,
    pub pushed_at: Option<DateTime<Utc>>,
    pub default_branch: String,
}

impl Repository {
    pub fn owner(&self) -> &str {
        self.name_with_owner
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or(&self.name_with_owner)
    }

    pub fn repo_name(&self) -> &str {
        match self.name_with_owner.split_once('/') {
            Some((_, repo)) if !repo.is_empty() => repo,
            _ => &self.name,
        }
    }

    /// Humanized time since the last push, for the selection list
    pub fn time_since_push(&self) -> String {
        match self.pushed_at {
            Some(at) => format_duration(Utc::now() - at),
            None => "unknown".to_string(),
        }
    }
}

fn format_duration(d: Duration) -> String {
    let minutes = d.num_minutes();
    let hours = d.num_hours();
    let days = d.num_days();
    if minutes < 1 {
        "just now".to_string()
    } else if hours < 1 {
        pluralize(minutes, "minute")
    } else if days < 1 {
        pluralize(hours, "hour")
    } else if days < 7 {
        pluralize(days, "day")
    } else if days < 30 {
        pluralize(days / 7, "week")
    } else if days < 365 {
        pluralize(days / 30, "month")
    } else {
        pluralize(days / 365, "year")
    }
}

fn pluralize(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

// ── Commit ──

/// A single commit as returned by the commits endpoint. Identity = SHA.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub email: String,
    pub date: Option<DateTime<Utc>>,
    pub url: String,
}

impl Commit {
    pub fn short_sha(&self) -> &str {
        if self.sha.len() >= 7 {
            &self.sha[..7]
        } else {
            &self.sha
        }
    }

    /// First line of the message, for the collapsed row
    pub fn first_line(&self) -> &str {
        self.message.split('\n').next().unwrap_or("").trim()
    }

    pub fn has_multiple_lines(&self) -> bool {
        self.message.trim().contains('\n')
    }

    pub fn extra_line_count(&self) -> usize {
        self.message.trim().lines().count().saturating_sub(1)
    }

    pub fn formatted_date(&self) -> String {
        match self.date {
            Some(date) => date.format("%Y-%m-%d %H:%M").to_string(),
            None => "unknown".to_string(),
        }
    }

    pub fn author_with_email(&self) -> String {
        if self.email.is_empty() {
            self.author.clone()
        } else {
            format!("{} <{}>", self.author, self.email)
        }
    }
}

// ── Filters ──

/// User-entered query options. `validate` clamps rather than rejects.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    /// Inclusive calendar date "YYYY-MM-DD", empty = unbounded
    pub date_from: String,
    pub date_to: String,
    /// Author substring passed straight to the commits endpoint
    pub author: String,
    pub per_page: u32,
    /// Free-text relevance query, empty = semantic pass disabled
    pub semantic_query: String,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            date_from: String::new(),
            date_to: String::new(),
            author: String::new(),
            per_page: DEFAULT_PER_PAGE,
            semantic_query: String::new(),
        }
    }
}

impl FilterOptions {
    /// Clamp the page size into [1, 100]; non-positive input becomes the default
    pub fn validate(&mut self) {
        if self.per_page == 0 {
            self.per_page = DEFAULT_PER_PAGE;
        }
        if self.per_page > MAX_PER_PAGE {
            self.per_page = MAX_PER_PAGE;
        }
    }

    pub fn has_semantic_filter(&self) -> bool {
        !self.semantic_query.is_empty()
    }
}

// ── Per-repository commit window ──

/// A repository's resolved branch plus its accumulated, paginated commits
#[derive(Debug, Clone)]
pub struct RepoCommits {
    pub repository: Repository,
    pub branch: String,
    /// Append-only: pages are concatenated in the order they arrive
    pub commits: Vec<Commit>,
    /// Highest page fetched so far, monotonically non-decreasing
    pub page: u32,
    /// Heuristic: the last fetch returned exactly `per_page` commits
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn repo(name_with_owner: &str) -> Repository {
        Repository {
            name: "trail".to_string(),
            name_with_owner: name_with_owner.to_string(),
            description: String::new(),
            url: String::new(),
            pushed_at: None,
            default_branch: "main".to_string(),
        }
    }

    #[test]
    fn owner_and_repo_name_split() {
        let r = repo("octocat/trail");
        assert_eq!(r.owner(), "octocat");
        assert_eq!(r.repo_name(), "trail");
    }

    #[test]
    fn repo_name_falls_back_to_name_field() {
        let r = repo("octocat");
        assert_eq!(r.owner(), "octocat");
        assert_eq!(r.repo_name(), "trail");
    }

    #[test]
    fn time_since_push_unknown_without_timestamp() {
        assert_eq!(repo("a/b").time_since_push(), "unknown");
    }

    #[test]
    fn duration_formatting_buckets() {
        assert_eq!(format_duration(Duration::seconds(20)), "just now");
        assert_eq!(format_duration(Duration::minutes(1)), "1 minute ago");
        assert_eq!(format_duration(Duration::minutes(45)), "45 minutes ago");
        assert_eq!(format_duration(Duration::hours(3)), "3 hours ago");
        assert_eq!(format_duration(Duration::days(1)), "1 day ago");
        assert_eq!(format_duration(Duration::days(13)), "1 week ago");
        assert_eq!(format_duration(Duration::days(60)), "2 months ago");
        assert_eq!(format_duration(Duration::days(800)), "2 years ago");
    }

    #[test]
    fn short_sha_truncates_to_seven() {
        let c = Commit {
            sha: "abc123def456".to_string(),
            message: String::new(),
            author: String::new(),
            email: String::new(),
            date: None,
            url: String::new(),
        };
        assert_eq!(c.short_sha(), "abc123d");
    }

    #[test]
    fn short_sha_keeps_short_input() {
        let c = Commit {
            sha: "abc".to_string(),
            message: String::new(),
            author: String::new(),
            email: String::new(),
            date: None,
            url: String::new(),
        };
        assert_eq!(c.short_sha(), "abc");
    }

    #[test]
    fn message_line_helpers() {
        let c = Commit {
            sha: String::new(),
            message: "Fix parser\n\nHandles empty input.\nAdds a test.".to_string(),
            author: String::new(),
            email: String::new(),
            date: None,
            url: String::new(),
        };
        assert_eq!(c.first_line(), "Fix parser");
        assert!(c.has_multiple_lines());
        assert_eq!(c.extra_line_count(), 3);
    }

    #[test]
    fn single_line_message_has_no_extra_lines() {
        let c = Commit {
            sha: String::new(),
            message: "Fix parser\n".to_string(),
            author: String::new(),
            email: String::new(),
            date: None,
            url: String::new(),
        };
        assert!(!c.has_multiple_lines());
        assert_eq!(c.extra_line_count(), 0);
    }

    #[test]
    fn formatted_date_renders_minutes() {
        let c = Commit {
            sha: String::new(),
            message: String::new(),
            author: String::new(),
            email: String::new(),
            date: Some(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()),
            url: String::new(),
        };
        assert_eq!(c.formatted_date(), "2024-03-09 14:05");
    }

    #[test]
    fn author_with_email_formats() {
        let mut c = Commit {
            sha: String::new(),
            message: String::new(),
            author: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            date: None,
            url: String::new(),
        };
        assert_eq!(c.author_with_email(), "Jane <jane@example.com>");
        c.email.clear();
        assert_eq!(c.author_with_email(), "Jane");
    }

    // ── validate ──

    #[test]
    fn per_page_zero_defaults_to_fifty() {
        let mut f = FilterOptions {
            per_page: 0,
            ..FilterOptions::default()
        };
        f.validate();
        assert_eq!(f.per_page, 50);
    }

    #[test]
    fn per_page_above_max_clamps_to_hundred() {
        let mut f = FilterOptions {
            per_page: 250,
            ..FilterOptions::default()
        };
        f.validate();
        assert_eq!(f.per_page, 100);
    }

    #[test]
    fn per_page_in_range_unchanged() {
        for n in [1, 50, 100] {
            let mut f = FilterOptions {
                per_page: n,
                ..FilterOptions::default()
            };
            f.validate();
            assert_eq!(f.per_page, n);
        }
    }

    #[test]
    fn semantic_filter_flag() {
        let mut f = FilterOptions::default();
        assert!(!f.has_semantic_filter());
        f.semantic_query = "auth refactor".to_string();
        assert!(f.has_semantic_filter());
    }
}
