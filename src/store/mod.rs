//! Application state container: the auth and issues slices.
//!
//! Each slice keeps its state in a `watch` channel and changes it only by folding
//! actions through a pure `reduce`. Asynchronous intents dispatch a `Pending`
//! action, await one service call, then dispatch `Fulfilled` or `Rejected`.

pub mod auth;
pub mod fold;
pub mod issues;

use issuedesk_api::{ApiClient, AuthService, IssueFilters, IssueService};

pub use auth::{AuthAction, AuthSlice, AuthState, Session};
pub use issues::{IssuesAction, IssuesSlice, IssuesState, StatusChange};

/// Lifecycle of one in-flight asynchronous operation.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncPhase<T> {
    Pending,
    Fulfilled(T),
    Rejected(String),
}

impl<T> AsyncPhase<T> {
    /// Folds a finished call into its terminal phase.
    pub fn settle(outcome: Result<T, String>) -> Self {
        match outcome {
            Ok(value) => AsyncPhase::Fulfilled(value),
            Err(message) => AsyncPhase::Rejected(message),
        }
    }
}

/// Explicit store handed to every view; cloning shares the same slices.
#[derive(Clone)]
pub struct AppStore {
    pub auth: AuthSlice,
    pub issues: IssuesSlice,
}

impl AppStore {
    pub fn new(client: ApiClient, default_filters: IssueFilters) -> Self {
        let credentials = client.credentials().clone();
        Self {
            auth: AuthSlice::new(AuthService::new(client.clone()), credentials),
            issues: IssuesSlice::new(IssueService::new(client), default_filters),
        }
    }
}
