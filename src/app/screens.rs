use crate::model::{FilterOptions, Repository};
use std::collections::{BTreeSet, HashMap, HashSet};

// ── Repository selection ──

/// Multi-select list over the repository catalog, with type-to-filter
#[derive(Debug, Default)]
pub struct RepoSelect {
    /// Cursor position within the visible (filtered) list
    pub cursor: usize,
    /// Catalog indices of the chosen repositories
    pub selected: BTreeSet<usize>,
    pub filter: String,
    /// Whether keystrokes currently edit the filter
    pub filtering: bool,
}

impl RepoSelect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog indices that match the current filter, in catalog order
    pub fn visible(&self, catalog: &[Repository]) -> Vec<usize> {
        if self.filter.is_empty() {
            return (0..catalog.len()).collect();
        }
        let needle = self.filter.to_lowercase();
        (0..catalog.len())
            .filter(|&i| {
                catalog[i].name_with_owner.to_lowercase().contains(&needle)
                    || catalog[i].description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn move_cursor(&mut self, delta: isize, visible_len: usize) {
        let max = visible_len.saturating_sub(1);
        let moved = self.cursor as isize + delta;
        self.cursor = moved.clamp(0, max as isize) as usize;
    }

    /// Toggle membership of the repository under the cursor
    pub fn toggle_current(&mut self, catalog: &[Repository]) {
        let visible = self.visible(catalog);
        if let Some(&idx) = visible.get(self.cursor) {
            if !self.selected.remove(&idx) {
                self.selected.insert(idx);
            }
        }
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter.push(c);
        self.cursor = 0;
    }

    pub fn pop_filter_char(&mut self) {
        self.filter.pop();
        self.cursor = 0;
    }

    /// The chosen subset in catalog order; this order is the feed order for
    /// the rest of the session
    pub fn selection(&self, catalog: &[Repository]) -> Vec<Repository> {
        self.selected
            .iter()
            .filter_map(|&i| catalog.get(i).cloned())
            .collect()
    }
}

// ── Filter configuration ──

/// One selected repository's fetched branch list
#[derive(Debug, Clone)]
pub struct RepoBranches {
    pub repo: Repository,
    pub branches: Vec<String>,
}

pub const FIELD_DATE_FROM: usize = 0;
pub const FIELD_DATE_TO: usize = 1;
pub const FIELD_AUTHOR: usize = 2;
pub const FIELD_PER_PAGE: usize = 3;
pub const FIELD_SEMANTIC: usize = 4;
pub const FIELD_COUNT_BASE: usize = 5;

/// The filter form: five text fields followed by one branch row per
/// selected repository
#[derive(Debug)]
pub struct FilterForm {
    pub inputs: [String; FIELD_COUNT_BASE],
    pub focused: usize,
    pub repo_branches: Vec<RepoBranches>,
    /// Chosen index into each repository's branch list
    pub branch_idx: Vec<usize>,
}

impl FilterForm {
    /// Build the form with branch rows pre-selected on each repository's
    /// default branch (index 0 when the default is absent from its list)
    pub fn new(repo_branches: Vec<RepoBranches>, seed: &FilterOptions) -> Self {
        let branch_idx = repo_branches.iter().map(default_branch_index).collect();
        let mut inputs: [String; FIELD_COUNT_BASE] = Default::default();
        inputs[FIELD_DATE_FROM] = seed.date_from.clone();
        inputs[FIELD_DATE_TO] = seed.date_to.clone();
        inputs[FIELD_AUTHOR] = seed.author.clone();
        inputs[FIELD_PER_PAGE] = seed.per_page.to_string();
        inputs[FIELD_SEMANTIC] = seed.semantic_query.clone();

        Self {
            inputs,
            focused: 0,
            repo_branches,
            branch_idx,
        }
    }

    pub fn field_count(&self) -> usize {
        FIELD_COUNT_BASE + self.repo_branches.len()
    }

    pub fn next_field(&mut self) {
        self.focused = (self.focused + 1) % self.field_count();
    }

    pub fn prev_field(&mut self) {
        self.focused = self
            .focused
            .checked_sub(1)
            .unwrap_or(self.field_count() - 1);
    }

    /// Index of the focused branch row, if focus is past the text fields
    pub fn branch_row(&self) -> Option<usize> {
        self.focused.checked_sub(FIELD_COUNT_BASE)
    }

    /// Cycle the focused repository's branch choice. Modulo the branch
    /// count in either direction; a no-op for an empty branch list.
    pub fn cycle_branch(&mut self, delta: isize) {
        let Some(row) = self.branch_row() else { return };
        let Some(rb) = self.repo_branches.get(row) else { return };
        let count = rb.branches.len();
        if count == 0 {
            return;
        }
        let idx = &mut self.branch_idx[row];
        *idx = (*idx as isize + delta).rem_euclid(count as isize) as usize;
    }

    pub fn insert_char(&mut self, c: char) {
        if self.focused < FIELD_COUNT_BASE {
            self.inputs[self.focused].push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.focused < FIELD_COUNT_BASE {
            self.inputs[self.focused].pop();
        }
    }

    /// Validated filter options from the current field values. A page size
    /// that fails to parse becomes 0 and clamps to the default.
    pub fn filters(&self) -> FilterOptions {
        let mut filters = FilterOptions {
            date_from: self.inputs[FIELD_DATE_FROM].trim().to_string(),
            date_to: self.inputs[FIELD_DATE_TO].trim().to_string(),
            author: self.inputs[FIELD_AUTHOR].trim().to_string(),
            per_page: self.inputs[FIELD_PER_PAGE].trim().parse().unwrap_or(0),
            semantic_query: self.inputs[FIELD_SEMANTIC].trim().to_string(),
        };
        filters.validate();
        filters
    }

    /// Branch name currently shown for a row; falls back to the repository
    /// default when the index is out of range
    pub fn branch_name(&self, row: usize) -> &str {
        let rb = &self.repo_branches[row];
        rb.branches
            .get(self.branch_idx[row])
            .map(String::as_str)
            .unwrap_or(&rb.repo.default_branch)
    }

    /// Repository key → chosen branch, captured at submission
    pub fn branch_map(&self) -> HashMap<String, String> {
        self.repo_branches
            .iter()
            .enumerate()
            .map(|(row, rb)| {
                (
                    rb.repo.name_with_owner.clone(),
                    self.branch_name(row).to_string(),
                )
            })
            .collect()
    }
}

fn default_branch_index(rb: &RepoBranches) -> usize {
    rb.branches
        .iter()
        .position(|b| *b == rb.repo.default_branch)
        .unwrap_or(0)
}

// ── Browsing ──

/// Per-screen state of the commit view
#[derive(Debug, Default)]
pub struct Browse {
    /// Global commit indices with the detail box open
    pub expanded: HashSet<usize>,
    /// Transient message (load-more failures, scorer notices)
    pub notice: Option<String>,
}

impl Browse {
    pub fn new(notice: Option<String>) -> Self {
        Self {
            expanded: HashSet::new(),
            notice,
        }
    }

    pub fn toggle_expanded(&mut self, index: usize) {
        if !self.expanded.remove(&index) {
            self.expanded.insert(index);
        }
    }
}
