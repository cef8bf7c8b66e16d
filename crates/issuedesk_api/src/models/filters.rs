//! Listing filters and their query-string encoding.

use std::fmt;
use std::str::FromStr;

use super::issue::{IssuePriority, IssueSeverity, IssueStatus, ParseEnumError};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A select filter: either everything or one specific value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice<T> {
    All,
    Only(T),
}

impl<T> Default for Choice<T> {
    fn default() -> Self {
        Choice::All
    }
}

impl<T> Choice<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Choice::All => None,
            Choice::Only(value) => Some(value),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => f.write_str("all"),
            Choice::Only(value) => value.fmt(f),
        }
    }
}

impl<T: FromStr<Err = ParseEnumError>> FromStr for Choice<T> {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            Ok(Choice::All)
        } else {
            value.parse().map(Choice::Only)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ParseEnumError {
                kind: "order",
                value: value.to_string(),
                expected: "asc, desc".to_string(),
            }),
        }
    }
}

/// Active listing filters. Owned by the issues slice; views only propose patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFilters {
    pub search: Option<String>,
    pub status: Choice<IssueStatus>,
    pub priority: Choice<IssuePriority>,
    pub severity: Choice<IssueSeverity>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

impl Default for IssueFilters {
    fn default() -> Self {
        Self {
            search: None,
            status: Choice::All,
            priority: Choice::All,
            severity: Choice::All,
            page: Some(DEFAULT_PAGE),
            limit: Some(DEFAULT_PAGE_SIZE),
            sort_by: None,
            order: None,
        }
    }
}

/// Partial update for [`IssueFilters`]; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFiltersPatch {
    pub search: Option<String>,
    pub status: Option<Choice<IssueStatus>>,
    pub priority: Option<Choice<IssuePriority>>,
    pub severity: Option<Choice<IssueSeverity>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

impl IssueFiltersPatch {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    /// True when the patch narrows or widens the result set, as opposed to paging through it.
    pub fn changes_selection(&self) -> bool {
        self.search.is_some()
            || self.status.is_some()
            || self.priority.is_some()
            || self.severity.is_some()
    }
}

impl IssueFilters {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Shallow merge: every field present in the patch replaces the current one.
    pub fn merge(&mut self, patch: IssueFiltersPatch) {
        if let Some(search) = patch.search {
            self.search = Some(search);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(severity) = patch.severity {
            self.severity = severity;
        }
        if let Some(page) = patch.page {
            self.page = Some(page);
        }
        if let Some(limit) = patch.limit {
            self.limit = Some(limit);
        }
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = Some(sort_by);
        }
        if let Some(order) = patch.order {
            self.order = Some(order);
        }
    }

    /// Query parameters for `GET /api/issues`. Empty search, `all` selects and zero paging are omitted.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|text| !text.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(status) = self.status.as_option() {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.priority.as_option() {
            params.push(("priority", priority.as_str().to_string()));
        }
        if let Some(severity) = self.severity.as_option() {
            params.push(("severity", severity.as_str().to_string()));
        }
        if let Some(page) = self.page.filter(|page| *page > 0) {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(sort_by) = self.sort_by.as_deref().filter(|text| !text.is_empty()) {
            params.push(("sortBy", sort_by.to_string()));
        }
        if let Some(order) = self.order {
            params.push(("order", order.as_str().to_string()));
        }
        params
    }
}
