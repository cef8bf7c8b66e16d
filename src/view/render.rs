//! Plain-text rendering of slice state for the terminal.

use chrono::{DateTime, Local, Utc};

use issuedesk_api::{Issue, IssueCounts, IssueFilters, IssueStatus, PaginationInfo, User};

use crate::store::{AuthState, IssuesState};
use crate::text::{fit_width, single_line};

const TITLE_WIDTH: usize = 48;
const ID_WIDTH: usize = 24;

fn format_timestamp(parsed: Option<DateTime<Utc>>, raw: &str) -> String {
    parsed
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| {
            if raw.trim().is_empty() {
                "-".to_string()
            } else {
                raw.trim().to_string()
            }
        })
}

pub fn issue_row(issue: &Issue) -> String {
    format!(
        "{:<id$}  {:<11}  {:<8}  {:<8}  {}",
        fit_width(&issue.id, ID_WIDTH),
        issue.status.as_str(),
        issue.priority.as_str(),
        issue.severity.as_str(),
        fit_width(&single_line(&issue.title), TITLE_WIDTH),
        id = ID_WIDTH,
    )
}

pub fn issue_table(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "No issues found.".to_string();
    }
    let mut lines = Vec::with_capacity(issues.len() + 1);
    lines.push(format!(
        "{:<id$}  {:<11}  {:<8}  {:<8}  {}",
        "ID",
        "STATUS",
        "PRIORITY",
        "SEVERITY",
        "TITLE",
        id = ID_WIDTH,
    ));
    lines.extend(issues.iter().map(issue_row));
    lines.join("\n")
}

pub fn issue_detail(issue: &Issue) -> String {
    let description = issue.description.trim();
    format!(
        "{title}\n\
         id:        {id}\n\
         status:    {status}\n\
         priority:  {priority}\n\
         severity:  {severity}\n\
         created:   {created}\n\
         updated:   {updated}\n\n\
         {description}",
        title = single_line(&issue.title),
        id = issue.id,
        status = issue.status,
        priority = issue.priority,
        severity = issue.severity,
        created = format_timestamp(issue.created(), &issue.created_at),
        updated = format_timestamp(issue.updated(), &issue.updated_at),
        description = if description.is_empty() {
            "(no description)"
        } else {
            description
        },
    )
}

pub fn counts_line(counts: &IssueCounts) -> String {
    let parts: Vec<String> = IssueStatus::ALL
        .iter()
        .map(|status| format!("{}: {}", status, counts.count(*status)))
        .collect();
    format!("{}  (total {})", parts.join("  "), counts.total)
}

pub fn pagination_line(pagination: &PaginationInfo) -> String {
    let noun = if pagination.total_items == 1 { "issue" } else { "issues" };
    format!(
        "Page {} of {} ({} {})",
        pagination.current_page,
        pagination.total_pages.max(1),
        pagination.total_items,
        noun
    )
}

pub fn filters_line(filters: &IssueFilters, search_text: &str) -> String {
    let search = search_text.trim();
    format!(
        "search: {}  status: {}  priority: {}  severity: {}",
        if search.is_empty() { "-" } else { search },
        filters.status,
        filters.priority,
        filters.severity,
    )
}

pub fn error_banner(message: &str) -> String {
    format!("error: {}", single_line(message))
}

pub fn user_line(user: &User) -> String {
    if user.name.as_deref().is_some_and(|name| !name.trim().is_empty()) {
        format!("{} <{}>", user.display(), user.email)
    } else {
        user.email.clone()
    }
}

pub fn session_line(auth: &AuthState) -> String {
    match (auth.is_authenticated(), auth.user()) {
        (true, Some(user)) => format!("Signed in as {}", user_line(user)),
        (true, None) => "Signed in (stored session)".to_string(),
        (false, _) => "Not signed in".to_string(),
    }
}

/// Full dashboard screen: filters, counts, list, pagination and any error with a retry hint.
pub fn dashboard_screen(state: &IssuesState, search_text: &str) -> String {
    let mut sections = vec![filters_line(&state.filters, search_text)];
    if let Some(counts) = &state.counts {
        sections.push(counts_line(counts));
    }
    if let Some(error) = &state.error {
        sections.push(format!("{}  (type 'retry' to try again)", error_banner(error)));
    }
    if state.loading && state.issues.is_empty() {
        sections.push("Loading issues...".to_string());
    } else {
        sections.push(issue_table(&state.issues));
    }
    if let Some(pagination) = &state.pagination {
        sections.push(pagination_line(pagination));
    }
    sections.join("\n\n")
}
