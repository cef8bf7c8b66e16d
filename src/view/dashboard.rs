//! Dashboard controller: local search text, modal state and the filter to fetch linkage.

use std::time::Duration;

use log::debug;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use issuedesk_api::{
    Choice, Issue, IssueFiltersPatch, IssuePriority, IssueSeverity, IssueStatus,
};

use super::debounce::Debouncer;
use super::forms::{EditForm, FormError, IssueForm};
use crate::store::{AppStore, IssuesSlice, StatusChange};

/// Which dialog the dashboard currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    Closed,
    Create,
    Edit(String),
    ConfirmDelete(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error("{0}")]
    Rejected(String),
    #[error("no {0} dialog is open")]
    NotOpen(&'static str),
}

pub struct Dashboard {
    store: AppStore,
    search_text: String,
    modal: Modal,
    search: Debouncer<String>,
    linkage: JoinHandle<()>,
}

impl Dashboard {
    /// Must be called inside a tokio runtime; spawns the debounced search linkage.
    pub fn new(store: AppStore, search_window: Duration) -> Self {
        let search_text = store.issues.filters().search.unwrap_or_default();
        let (search, settled) = Debouncer::seeded(search_window, search_text.clone());
        let linkage = tokio::spawn(follow_search(store.issues.clone(), settled));
        Self {
            store,
            search_text,
            modal: Modal::Closed,
            search,
            linkage,
        }
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    /// Loads the list for the current filters and the counts summary. Also the "Try again" action.
    pub async fn load(&self) -> Result<(), String> {
        let filters = self.store.issues.filters();
        let listed = self.store.issues.fetch_issues(&filters).await.map(|_| ());
        self.store.issues.fetch_issue_counts().await;
        listed
    }

    /// Updates the search box. The fetch happens once typing pauses for the debounce window.
    pub fn type_search(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.search.push(self.search_text.trim().to_string());
    }

    pub async fn select_status(&self, status: Choice<IssueStatus>) -> Result<(), String> {
        self.apply(IssueFiltersPatch {
            status: Some(status),
            ..IssueFiltersPatch::default()
        })
        .await
    }

    pub async fn select_priority(&self, priority: Choice<IssuePriority>) -> Result<(), String> {
        self.apply(IssueFiltersPatch {
            priority: Some(priority),
            ..IssueFiltersPatch::default()
        })
        .await
    }

    pub async fn select_severity(&self, severity: Choice<IssueSeverity>) -> Result<(), String> {
        self.apply(IssueFiltersPatch {
            severity: Some(severity),
            ..IssueFiltersPatch::default()
        })
        .await
    }

    pub async fn go_to_page(&self, page: u32) -> Result<(), String> {
        self.apply(IssueFiltersPatch {
            page: Some(page.max(1)),
            ..IssueFiltersPatch::default()
        })
        .await
    }

    pub async fn clear_filters(&mut self) -> Result<(), String> {
        self.search_text.clear();
        // Resets the debouncer's memory so retyping the old query fetches again.
        self.search.push(String::new());
        self.store.issues.clear_filters();
        self.load_list().await
    }

    pub fn open_create(&mut self) {
        self.modal = Modal::Create;
    }

    /// Opens the edit dialog for an issue present in the list or detail.
    pub fn open_edit(&mut self, id: &str) -> Option<EditForm> {
        let form = self.store.issues.snapshot().find(id).map(EditForm::from_issue)?;
        self.modal = Modal::Edit(id.to_string());
        Some(form)
    }

    pub fn request_delete(&mut self, id: &str) {
        self.modal = Modal::ConfirmDelete(id.to_string());
    }

    pub fn close_modal(&mut self) {
        self.modal = Modal::Closed;
    }

    pub async fn submit_create(&mut self, form: &IssueForm) -> Result<Issue, ActionError> {
        if self.modal != Modal::Create {
            return Err(ActionError::NotOpen("create"));
        }
        let new_issue = form.validate()?;
        let created = self
            .store
            .issues
            .create_issue(&new_issue)
            .await
            .map_err(ActionError::Rejected)?;
        self.modal = Modal::Closed;
        self.store.issues.fetch_issue_counts().await;
        Ok(created)
    }

    /// Sends only the changed fields. An unchanged form closes without a request.
    pub async fn submit_edit(&mut self, form: &EditForm) -> Result<Option<Issue>, ActionError> {
        if self.modal != Modal::Edit(form.issue_id().to_string()) {
            return Err(ActionError::NotOpen("edit"));
        }
        let patch = form.to_patch()?;
        if patch.is_empty() {
            self.modal = Modal::Closed;
            return Ok(None);
        }
        let updated = self
            .store
            .issues
            .update_issue(form.issue_id(), &patch)
            .await
            .map_err(ActionError::Rejected)?;
        self.modal = Modal::Closed;
        self.store.issues.fetch_issue_counts().await;
        Ok(Some(updated))
    }

    /// Deletes the issue awaiting confirmation and returns its id.
    pub async fn confirm_delete(&mut self) -> Result<String, ActionError> {
        let Modal::ConfirmDelete(id) = self.modal.clone() else {
            return Err(ActionError::NotOpen("delete"));
        };
        self.store
            .issues
            .delete_issue(&id)
            .await
            .map_err(ActionError::Rejected)?;
        self.modal = Modal::Closed;
        self.store.issues.fetch_issue_counts().await;
        Ok(id)
    }

    pub async fn change_status(&self, id: &str, change: StatusChange) -> Result<Issue, ActionError> {
        let issue = self
            .store
            .issues
            .change_status(id, change)
            .await
            .map_err(ActionError::Rejected)?;
        self.store.issues.fetch_issue_counts().await;
        Ok(issue)
    }

    /// Select changes apply immediately and always return to the first page.
    async fn apply(&self, mut patch: IssueFiltersPatch) -> Result<(), String> {
        if patch.changes_selection() {
            patch.page = Some(1);
        }
        self.store.issues.set_filters(patch);
        self.load_list().await
    }

    async fn load_list(&self) -> Result<(), String> {
        let filters = self.store.issues.filters();
        self.store.issues.fetch_issues(&filters).await.map(|_| ())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.linkage.abort();
    }
}

/// Folds each settled search value into the filters and refetches.
async fn follow_search(issues: IssuesSlice, mut settled: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = settled.recv().await {
        let current = issues.filters().search.unwrap_or_default();
        if current == text {
            continue;
        }
        issues.set_filters(IssueFiltersPatch {
            search: Some(text),
            page: Some(1),
            ..IssueFiltersPatch::default()
        });
        let filters = issues.filters();
        if let Err(message) = issues.fetch_issues(&filters).await {
            debug!("dashboard: search fetch failed: {}", message);
        }
    }
}
