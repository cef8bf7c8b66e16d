//! Typed client for the issue tracker REST API used by the issuedesk app.

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod issues;
pub mod models;

pub use auth::AuthService;
pub use client::ApiClient;
pub use config::ApiConfig;
pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use error::{ApiError, Result};
pub use issues::IssueService;
pub use models::{
    AuthPayload, Choice, Credentials, Envelope, Issue, IssueCounts, IssueFilters,
    IssueFiltersPatch, IssuePatch, IssuePriority, IssueSeverity, IssueStatus, NewIssue, Page,
    PaginationInfo, ParseEnumError, SortOrder, User, DEFAULT_PAGE, DEFAULT_PAGE_SIZE,
};
