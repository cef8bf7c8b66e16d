//! Issues slice: list, detail, counts and filters, plus the CRUD intents.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use issuedesk_api::{
    Envelope, Issue, IssueCounts, IssueFilters, IssueFiltersPatch, IssuePatch, IssueService,
    NewIssue, PaginationInfo,
};
use log::{debug, warn};
use tokio::sync::watch;

use super::fold;
use super::AsyncPhase;
use crate::text::scrub_secrets;

const FETCH_ISSUES_FAILED: &str = "Failed to fetch issues";
const FETCH_ISSUE_FAILED: &str = "Failed to fetch issue";
const FETCH_COUNTS_FAILED: &str = "Failed to fetch counts";
const CREATE_FAILED: &str = "Failed to create issue";
const UPDATE_FAILED: &str = "Failed to update issue";
const STATUS_FAILED: &str = "Failed to update status";
const DELETE_FAILED: &str = "Failed to delete issue";

/// Status shortcuts backed by dedicated endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Resolve,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuesState {
    pub issues: Vec<Issue>,
    pub selected_issue: Option<Issue>,
    pub counts: Option<IssueCounts>,
    pub pagination: Option<PaginationInfo>,
    pub filters: IssueFilters,
    pub loading: bool,
    pub loading_counts: bool,
    pub loading_detail: bool,
    pub error: Option<String>,
    /// Bumped whenever `issues` changes, so views can tell a new list from a re-render.
    pub list_revision: u64,
    initial_filters: IssueFilters,
    latest_fetch: u64,
    detail_request: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IssuesAction {
    FetchIssues {
        seq: u64,
        phase: AsyncPhase<(Vec<Issue>, PaginationInfo)>,
    },
    FetchIssueById {
        id: String,
        phase: AsyncPhase<Issue>,
    },
    FetchIssueCounts(AsyncPhase<IssueCounts>),
    CreateIssue(AsyncPhase<Issue>),
    UpdateIssue(AsyncPhase<Issue>),
    ChangeStatus(AsyncPhase<Issue>),
    DeleteIssue {
        id: String,
        phase: AsyncPhase<()>,
    },
    SetFilters(IssueFiltersPatch),
    ClearFilters,
    ClearSelectedIssue,
    ClearError,
}

impl IssuesState {
    pub fn new(initial_filters: IssueFilters) -> Self {
        Self {
            issues: Vec::new(),
            selected_issue: None,
            counts: None,
            pagination: None,
            filters: initial_filters.clone(),
            loading: false,
            loading_counts: false,
            loading_detail: false,
            error: None,
            list_revision: 0,
            initial_filters,
            latest_fetch: 0,
            detail_request: None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Issue> {
        self.issues
            .iter()
            .find(|issue| issue.id == id)
            .or_else(|| self.selected_issue.as_ref().filter(|issue| issue.id == id))
    }

    /// Folds one action into the state. Returns false when the action was stale and ignored.
    pub fn reduce(&mut self, action: IssuesAction) -> bool {
        match action {
            IssuesAction::FetchIssues { seq, phase } => self.reduce_fetch(seq, phase),
            IssuesAction::FetchIssueById { id, phase } => self.reduce_detail(id, phase),
            IssuesAction::FetchIssueCounts(phase) => {
                match phase {
                    AsyncPhase::Pending => self.loading_counts = true,
                    AsyncPhase::Fulfilled(counts) => {
                        self.loading_counts = false;
                        self.counts = Some(counts);
                    }
                    AsyncPhase::Rejected(_) => self.loading_counts = false,
                }
                true
            }
            IssuesAction::CreateIssue(phase) => {
                match phase {
                    AsyncPhase::Pending => self.begin_blocking(),
                    AsyncPhase::Fulfilled(issue) => {
                        self.loading = false;
                        fold::prepend(&mut self.issues, issue);
                        self.list_revision += 1;
                    }
                    AsyncPhase::Rejected(message) => self.fail_blocking(message),
                }
                true
            }
            IssuesAction::UpdateIssue(phase) => {
                match phase {
                    AsyncPhase::Pending => self.begin_blocking(),
                    AsyncPhase::Fulfilled(issue) => {
                        self.loading = false;
                        self.apply_server_copy(issue);
                    }
                    AsyncPhase::Rejected(message) => self.fail_blocking(message),
                }
                true
            }
            IssuesAction::ChangeStatus(phase) => {
                match phase {
                    AsyncPhase::Pending => self.error = None,
                    AsyncPhase::Fulfilled(issue) => self.apply_server_copy(issue),
                    AsyncPhase::Rejected(message) => self.error = Some(message),
                }
                true
            }
            IssuesAction::DeleteIssue { id, phase } => {
                match phase {
                    AsyncPhase::Pending => self.error = None,
                    AsyncPhase::Fulfilled(()) => {
                        if fold::remove_by_id(&mut self.issues, &id) {
                            self.list_revision += 1;
                        }
                        if self.selected_issue.as_ref().map(|issue| issue.id.as_str())
                            == Some(id.as_str())
                        {
                            self.selected_issue = None;
                        }
                    }
                    AsyncPhase::Rejected(message) => self.error = Some(message),
                }
                true
            }
            IssuesAction::SetFilters(patch) => {
                self.filters.merge(patch);
                true
            }
            IssuesAction::ClearFilters => {
                self.filters = self.initial_filters.clone();
                true
            }
            IssuesAction::ClearSelectedIssue => {
                self.selected_issue = None;
                self.detail_request = None;
                self.loading_detail = false;
                true
            }
            IssuesAction::ClearError => {
                self.error = None;
                true
            }
        }
    }

    /// Only the most recently issued fetch may touch the list.
    fn reduce_fetch(&mut self, seq: u64, phase: AsyncPhase<(Vec<Issue>, PaginationInfo)>) -> bool {
        match phase {
            AsyncPhase::Pending => {
                self.latest_fetch = self.latest_fetch.max(seq);
                self.begin_blocking();
                true
            }
            _ if seq != self.latest_fetch => false,
            AsyncPhase::Fulfilled((issues, pagination)) => {
                self.loading = false;
                self.issues = issues;
                self.pagination = Some(pagination);
                self.list_revision += 1;
                true
            }
            AsyncPhase::Rejected(message) => {
                self.fail_blocking(message);
                true
            }
        }
    }

    /// A detail result lands only if it is still the one being waited for.
    fn reduce_detail(&mut self, id: String, phase: AsyncPhase<Issue>) -> bool {
        match phase {
            AsyncPhase::Pending => {
                self.loading_detail = true;
                self.error = None;
                self.detail_request = Some(id);
                true
            }
            _ if self.detail_request.as_deref() != Some(id.as_str()) => false,
            AsyncPhase::Fulfilled(issue) => {
                self.loading_detail = false;
                self.detail_request = None;
                self.selected_issue = Some(issue);
                true
            }
            AsyncPhase::Rejected(message) => {
                self.loading_detail = false;
                self.detail_request = None;
                self.error = Some(message);
                true
            }
        }
    }

    /// Replaces the list entry and the open detail with the server's copy, keeping both views identical.
    fn apply_server_copy(&mut self, issue: Issue) {
        if self
            .selected_issue
            .as_ref()
            .is_some_and(|selected| selected.id == issue.id)
        {
            self.selected_issue = Some(issue.clone());
        }
        if fold::replace_by_id(&mut self.issues, &issue) {
            self.list_revision += 1;
        }
    }

    fn begin_blocking(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn fail_blocking(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }
}

#[derive(Clone)]
pub struct IssuesSlice {
    service: IssueService,
    state: Arc<watch::Sender<IssuesState>>,
    fetch_seq: Arc<AtomicU64>,
}

impl IssuesSlice {
    pub fn new(service: IssueService, initial_filters: IssueFilters) -> Self {
        let (state, _) = watch::channel(IssuesState::new(initial_filters));
        Self {
            service,
            state: Arc::new(state),
            fetch_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn snapshot(&self) -> IssuesState {
        self.state.borrow().clone()
    }

    pub fn filters(&self) -> IssueFilters {
        self.state.borrow().filters.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<IssuesState> {
        self.state.subscribe()
    }

    /// Returns whether the action changed the state.
    pub fn dispatch(&self, action: IssuesAction) -> bool {
        self.state.send_if_modified(|state| state.reduce(action))
    }

    /// Replaces the list and pagination with the page matching `filters`.
    pub async fn fetch_issues(&self, filters: &IssueFilters) -> Result<Vec<Issue>, String> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.dispatch(IssuesAction::FetchIssues {
            seq,
            phase: AsyncPhase::Pending,
        });
        debug!("issues:fetch start seq={} params={}", seq, filters.to_query().len());

        let outcome = self
            .service
            .list(filters)
            .await
            .and_then(|page| page.into_parts())
            .map_err(|err| {
                warn!("issues:fetch failed: {}", scrub_secrets(&err.to_string()));
                err.user_message(FETCH_ISSUES_FAILED)
            });
        let issues = outcome.as_ref().map(|(issues, _)| issues.clone()).map_err(Clone::clone);
        let applied = self.dispatch(IssuesAction::FetchIssues {
            seq,
            phase: AsyncPhase::settle(outcome),
        });
        if !applied {
            debug!("issues:fetch seq={} superseded by a newer request", seq);
        }
        issues
    }

    /// Fetches with the slice's current filters; the "Try again" path.
    pub async fn refresh(&self) -> Result<Vec<Issue>, String> {
        let filters = self.filters();
        self.fetch_issues(&filters).await
    }

    pub async fn fetch_issue_by_id(&self, id: &str) -> Result<Issue, String> {
        let id = id.trim().to_string();
        self.dispatch(IssuesAction::FetchIssueById {
            id: id.clone(),
            phase: AsyncPhase::Pending,
        });
        let outcome = self
            .service
            .get(&id)
            .await
            .and_then(Envelope::into_data)
            .map_err(|err| err.user_message(FETCH_ISSUE_FAILED));
        self.dispatch(IssuesAction::FetchIssueById {
            id,
            phase: AsyncPhase::settle(outcome.clone()),
        });
        outcome
    }

    /// Best effort: a failure keeps the previous counts and never sets `error`.
    pub async fn fetch_issue_counts(&self) -> Option<IssueCounts> {
        self.dispatch(IssuesAction::FetchIssueCounts(AsyncPhase::Pending));
        let outcome = self
            .service
            .counts()
            .await
            .and_then(Envelope::into_data)
            .map_err(|err| {
                debug!("issues:counts skipped: {}", scrub_secrets(&err.to_string()));
                err.user_message(FETCH_COUNTS_FAILED)
            });
        let counts = outcome.as_ref().ok().copied();
        self.dispatch(IssuesAction::FetchIssueCounts(AsyncPhase::settle(outcome)));
        counts
    }

    /// Prepends the created issue locally. Callers refresh counts themselves.
    pub async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, String> {
        self.dispatch(IssuesAction::CreateIssue(AsyncPhase::Pending));
        let outcome = self
            .service
            .create(issue)
            .await
            .and_then(Envelope::into_data)
            .map_err(|err| err.user_message(CREATE_FAILED));
        self.dispatch(IssuesAction::CreateIssue(AsyncPhase::settle(outcome.clone())));
        outcome
    }

    pub async fn update_issue(&self, id: &str, patch: &IssuePatch) -> Result<Issue, String> {
        self.dispatch(IssuesAction::UpdateIssue(AsyncPhase::Pending));
        let outcome = self
            .service
            .update(id.trim(), patch)
            .await
            .and_then(Envelope::into_data)
            .map_err(|err| err.user_message(UPDATE_FAILED));
        self.dispatch(IssuesAction::UpdateIssue(AsyncPhase::settle(outcome.clone())));
        outcome
    }

    pub async fn change_status(&self, id: &str, change: StatusChange) -> Result<Issue, String> {
        self.dispatch(IssuesAction::ChangeStatus(AsyncPhase::Pending));
        let response = match change {
            StatusChange::Resolve => self.service.resolve(id.trim()).await,
            StatusChange::Close => self.service.close(id.trim()).await,
        };
        let outcome = response
            .and_then(Envelope::into_data)
            .map_err(|err| err.user_message(STATUS_FAILED));
        self.dispatch(IssuesAction::ChangeStatus(AsyncPhase::settle(outcome.clone())));
        outcome
    }

    pub async fn delete_issue(&self, id: &str) -> Result<(), String> {
        let id = id.trim().to_string();
        self.dispatch(IssuesAction::DeleteIssue {
            id: id.clone(),
            phase: AsyncPhase::Pending,
        });
        let outcome = self
            .service
            .delete(&id)
            .await
            .and_then(Envelope::into_success)
            .map(|_| ())
            .map_err(|err| err.user_message(DELETE_FAILED));
        self.dispatch(IssuesAction::DeleteIssue {
            id,
            phase: AsyncPhase::settle(outcome.clone()),
        });
        outcome
    }

    pub fn set_filters(&self, patch: IssueFiltersPatch) {
        self.dispatch(IssuesAction::SetFilters(patch));
    }

    pub fn clear_filters(&self) {
        self.dispatch(IssuesAction::ClearFilters);
    }

    pub fn clear_selected_issue(&self) {
        self.dispatch(IssuesAction::ClearSelectedIssue);
    }

    pub fn clear_error(&self) {
        self.dispatch(IssuesAction::ClearError);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fold::fixtures::issue;
    use issuedesk_api::{
        ApiClient, ApiConfig, Choice, IssuePriority, IssueSeverity, IssueStatus,
        MemoryCredentialStore,
    };
    use mockito::Matcher;

    fn page(total: u64) -> PaginationInfo {
        PaginationInfo {
            current_page: 1,
            total_pages: 1,
            total_items: total,
            items_per_page: 10,
            has_next_page: false,
            has_prev_page: false,
        }
    }

    fn slice(server: &mockito::Server) -> IssuesSlice {
        let client = ApiClient::new(
            ApiConfig::new(server.url()),
            Arc::new(MemoryCredentialStore::with_token("tok")),
        )
        .unwrap();
        IssuesSlice::new(IssueService::new(client), IssueFilters::default())
    }

    fn wire(issue: &Issue) -> String {
        serde_json::to_string(issue).unwrap()
    }

    fn envelope(issue: &Issue) -> String {
        format!(r#"{{"success":true,"message":"ok","data":{}}}"#, wire(issue))
    }

    fn list_body(issues: &[Issue]) -> String {
        let data: Vec<String> = issues.iter().map(wire).collect();
        format!(
            r#"{{"success":true,"message":"ok","data":[{}],"pagination":{{"currentPage":1,"totalPages":1,"totalItems":{},"itemsPerPage":10,"hasNextPage":false,"hasPrevPage":false}}}}"#,
            data.join(","),
            issues.len()
        )
    }

    fn loaded_state() -> IssuesState {
        let mut state = IssuesState::new(IssueFilters::default());
        state.reduce(IssuesAction::FetchIssues {
            seq: 1,
            phase: AsyncPhase::Pending,
        });
        state.reduce(IssuesAction::FetchIssues {
            seq: 1,
            phase: AsyncPhase::Fulfilled((vec![issue("a", "A"), issue("b", "B")], page(2))),
        });
        state
    }

    #[test]
    fn stale_fetch_response_is_discarded() {
        let mut state = IssuesState::new(IssueFilters::default());
        state.reduce(IssuesAction::FetchIssues { seq: 1, phase: AsyncPhase::Pending });
        state.reduce(IssuesAction::FetchIssues { seq: 2, phase: AsyncPhase::Pending });

        let newer = state.reduce(IssuesAction::FetchIssues {
            seq: 2,
            phase: AsyncPhase::Fulfilled((vec![issue("new", "Newer")], page(1))),
        });
        let older = state.reduce(IssuesAction::FetchIssues {
            seq: 1,
            phase: AsyncPhase::Fulfilled((vec![issue("old", "Older")], page(1))),
        });

        assert!(newer);
        assert!(!older);
        assert_eq!(state.issues[0].id, "new");
        assert!(!state.loading);
    }

    #[test]
    fn stale_failure_does_not_clobber_loading_or_error() {
        let mut state = IssuesState::new(IssueFilters::default());
        state.reduce(IssuesAction::FetchIssues { seq: 1, phase: AsyncPhase::Pending });
        state.reduce(IssuesAction::FetchIssues { seq: 2, phase: AsyncPhase::Pending });
        assert!(!state.reduce(IssuesAction::FetchIssues {
            seq: 1,
            phase: AsyncPhase::Rejected("boom".into()),
        }));
        assert!(state.loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn failed_fetch_keeps_stale_list_visible() {
        let mut state = loaded_state();
        state.reduce(IssuesAction::FetchIssues { seq: 2, phase: AsyncPhase::Pending });
        state.reduce(IssuesAction::FetchIssues {
            seq: 2,
            phase: AsyncPhase::Rejected(FETCH_ISSUES_FAILED.into()),
        });
        assert_eq!(state.issues.len(), 2);
        assert_eq!(state.error.as_deref(), Some(FETCH_ISSUES_FAILED));
        assert!(!state.loading);
    }

    #[test]
    fn update_keeps_list_and_detail_identical() {
        let mut state = loaded_state();
        state.reduce(IssuesAction::FetchIssueById { id: "b".into(), phase: AsyncPhase::Pending });
        state.reduce(IssuesAction::FetchIssueById {
            id: "b".into(),
            phase: AsyncPhase::Fulfilled(issue("b", "B")),
        });

        let mut patched = issue("b", "B renamed");
        patched.status = IssueStatus::InProgress;
        state.reduce(IssuesAction::UpdateIssue(AsyncPhase::Fulfilled(patched.clone())));

        assert_eq!(state.issues[1], patched);
        assert_eq!(state.selected_issue.as_ref(), Some(&patched));
    }

    #[test]
    fn delete_removes_entry_and_selected_detail() {
        let mut state = loaded_state();
        state.reduce(IssuesAction::FetchIssueById { id: "a".into(), phase: AsyncPhase::Pending });
        state.reduce(IssuesAction::FetchIssueById {
            id: "a".into(),
            phase: AsyncPhase::Fulfilled(issue("a", "A")),
        });
        state.reduce(IssuesAction::DeleteIssue { id: "a".into(), phase: AsyncPhase::Fulfilled(()) });

        assert!(state.issues.iter().all(|entry| entry.id != "a"));
        assert!(state.selected_issue.is_none());
    }

    #[test]
    fn detail_result_after_clear_is_dropped() {
        let mut state = IssuesState::new(IssueFilters::default());
        state.reduce(IssuesAction::FetchIssueById { id: "x".into(), phase: AsyncPhase::Pending });
        state.reduce(IssuesAction::ClearSelectedIssue);
        let applied = state.reduce(IssuesAction::FetchIssueById {
            id: "x".into(),
            phase: AsyncPhase::Fulfilled(issue("x", "X")),
        });
        assert!(!applied);
        assert!(state.selected_issue.is_none());
        assert!(!state.loading_detail);
    }

    #[test]
    fn counts_failure_is_silent() {
        let mut state = IssuesState::new(IssueFilters::default());
        state.reduce(IssuesAction::FetchIssueCounts(AsyncPhase::Pending));
        assert!(state.loading_counts);
        state.reduce(IssuesAction::FetchIssueCounts(AsyncPhase::Rejected("nope".into())));
        assert!(!state.loading_counts);
        assert!(state.error.is_none());
    }

    #[test]
    fn filters_merge_and_reset_to_initial() {
        let initial = IssueFilters::default().with_limit(25);
        let mut state = IssuesState::new(initial.clone());
        state.reduce(IssuesAction::SetFilters(IssueFiltersPatch {
            status: Some(Choice::Only(IssueStatus::Closed)),
            ..IssueFiltersPatch::default()
        }));
        assert_eq!(state.filters.status, Choice::Only(IssueStatus::Closed));
        assert_eq!(state.filters.limit, Some(25));

        state.reduce(IssuesAction::ClearFilters);
        assert_eq!(state.filters, initial);
    }

    #[tokio::test]
    async fn fetch_replaces_list_wholesale() {
        let mut server = mockito::Server::new_async().await;
        let mut open = issue("o1", "Open one");
        open.status = IssueStatus::Open;
        server
            .mock("GET", "/api/issues")
            .match_query(Matcher::UrlEncoded("status".into(), "Open".into()))
            .with_status(200)
            .with_body(list_body(&[open.clone()]))
            .create_async()
            .await;

        let issues = slice(&server);
        issues.dispatch(IssuesAction::CreateIssue(AsyncPhase::Fulfilled(issue("local", "L"))));
        issues.set_filters(IssueFiltersPatch {
            status: Some(Choice::Only(IssueStatus::Open)),
            ..IssueFiltersPatch::default()
        });
        let filters = issues.filters();
        issues.fetch_issues(&filters).await.unwrap();

        let state = issues.snapshot();
        assert_eq!(state.issues, vec![open]);
        assert_eq!(state.pagination.map(|p| p.total_items), Some(1));
    }

    #[tokio::test]
    async fn create_prepends_server_issue_without_refetch() {
        let mut server = mockito::Server::new_async().await;
        let created = issue("n1", "Fresh");
        let list = server
            .mock("GET", "/api/issues")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(list_body(&[issue("a", "A")]))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/api/issues")
            .with_status(201)
            .with_body(envelope(&created))
            .create_async()
            .await;

        let issues = slice(&server);
        issues.refresh().await.unwrap();
        issues
            .create_issue(&NewIssue {
                title: "Fresh".into(),
                description: String::new(),
                priority: IssuePriority::Medium,
                severity: IssueSeverity::Minor,
            })
            .await
            .unwrap();

        let state = issues.snapshot();
        assert_eq!(state.issues.first(), Some(&created));
        assert_eq!(state.issues.len(), 2);
        list.assert_async().await;
    }

    #[tokio::test]
    async fn failed_update_sets_error_and_keeps_entry() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/issues")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(list_body(&[issue("a", "A")]))
            .create_async()
            .await;
        server
            .mock("PUT", "/api/issues/a")
            .with_status(404)
            .with_body(r#"{"success":false,"message":"Issue not found"}"#)
            .create_async()
            .await;

        let issues = slice(&server);
        issues.refresh().await.unwrap();
        let patch = IssuePatch {
            title: Some("Nope".into()),
            ..IssuePatch::default()
        };
        assert_eq!(issues.update_issue("a", &patch).await.unwrap_err(), "Issue not found");

        let state = issues.snapshot();
        assert_eq!(state.issues[0].title, "A");
        assert_eq!(state.error.as_deref(), Some("Issue not found"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn change_status_updates_list_and_detail() {
        let mut server = mockito::Server::new_async().await;
        let mut resolved = issue("a", "A");
        resolved.status = IssueStatus::Resolved;
        server
            .mock("GET", "/api/issues/a")
            .with_status(200)
            .with_body(envelope(&issue("a", "A")))
            .create_async()
            .await;
        server
            .mock("PATCH", "/api/issues/a/resolve")
            .with_status(200)
            .with_body(envelope(&resolved))
            .create_async()
            .await;

        let issues = slice(&server);
        issues.dispatch(IssuesAction::CreateIssue(AsyncPhase::Fulfilled(issue("a", "A"))));
        issues.fetch_issue_by_id("a").await.unwrap();
        issues.change_status("a", StatusChange::Resolve).await.unwrap();

        let state = issues.snapshot();
        assert_eq!(state.issues[0].status, IssueStatus::Resolved);
        assert_eq!(state.selected_issue.map(|i| i.status), Some(IssueStatus::Resolved));
    }

    #[tokio::test]
    async fn delete_failure_reports_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/issues/a")
            .with_status(403)
            .with_body(r#"{"success":false,"message":"Not allowed to delete this issue"}"#)
            .create_async()
            .await;

        let issues = slice(&server);
        issues.dispatch(IssuesAction::CreateIssue(AsyncPhase::Fulfilled(issue("a", "A"))));
        let err = issues.delete_issue("a").await.unwrap_err();

        assert_eq!(err, "Not allowed to delete this issue");
        assert_eq!(issues.snapshot().issues.len(), 1);
    }

    #[tokio::test]
    async fn counts_are_idempotent_without_mutation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/issues/counts")
            .with_status(200)
            .with_body(r#"{"success":true,"message":"ok","data":{"Open":1,"In Progress":0,"Resolved":2,"Closed":0,"total":3}}"#)
            .expect(2)
            .create_async()
            .await;

        let issues = slice(&server);
        let first = issues.fetch_issue_counts().await;
        let second = issues.fetch_issue_counts().await;

        assert_eq!(first, second);
        assert_eq!(issues.snapshot().counts.map(|c| c.total), Some(3));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn counts_failure_keeps_previous_snapshot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/issues/counts")
            .with_status(500)
            .create_async()
            .await;

        let issues = slice(&server);
        let previous = IssueCounts {
            open: 4,
            total: 4,
            ..IssueCounts::default()
        };
        issues.dispatch(IssuesAction::FetchIssueCounts(AsyncPhase::Fulfilled(previous)));

        assert_eq!(issues.fetch_issue_counts().await, None);
        let state = issues.snapshot();
        assert_eq!(state.counts, Some(previous));
        assert!(state.error.is_none());
    }
}
