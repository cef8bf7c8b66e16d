use serde_json::Value;

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{Envelope, Issue, IssueCounts, IssueFilters, IssuePatch, NewIssue, Page};

const ISSUES_PATH: &str = "/api/issues";

/// Maps issue intents onto the issues endpoints. One call per method, no caching.
#[derive(Clone)]
pub struct IssueService {
    client: ApiClient,
}

impl IssueService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &IssueFilters) -> Result<Page<Issue>> {
        self.client
            .get_with_query(ISSUES_PATH, &filters.to_query())
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Envelope<Issue>> {
        self.client.get(&issue_path(id)).await
    }

    pub async fn counts(&self) -> Result<Envelope<IssueCounts>> {
        self.client.get(&format!("{}/counts", ISSUES_PATH)).await
    }

    pub async fn create(&self, issue: &NewIssue) -> Result<Envelope<Issue>> {
        self.client.post(ISSUES_PATH, issue).await
    }

    pub async fn update(&self, id: &str, patch: &IssuePatch) -> Result<Envelope<Issue>> {
        self.client.put(&issue_path(id), patch).await
    }

    pub async fn resolve(&self, id: &str) -> Result<Envelope<Issue>> {
        let path = format!("{}/resolve", issue_path(id));
        self.client.patch(&path, Option::<&Value>::None).await
    }

    pub async fn close(&self, id: &str) -> Result<Envelope<Issue>> {
        let path = format!("{}/close", issue_path(id));
        self.client.patch(&path, Option::<&Value>::None).await
    }

    pub async fn delete(&self, id: &str) -> Result<Envelope<Value>> {
        self.client.delete(&issue_path(id)).await
    }
}

/// Ids are a single path segment; reserved characters are escaped.
fn issue_path(id: &str) -> String {
    format!("{}/{}", ISSUES_PATH, urlencoding::encode(id.trim()))
}
