mod envelope;
mod filters;
mod issue;
mod user;

pub use envelope::{Envelope, Page, PaginationInfo};
pub use filters::{Choice, IssueFilters, IssueFiltersPatch, SortOrder, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
pub use issue::{
    Issue, IssueCounts, IssuePatch, IssuePriority, IssueSeverity, IssueStatus, NewIssue,
    ParseEnumError,
};
pub use user::{AuthPayload, Credentials, User};
