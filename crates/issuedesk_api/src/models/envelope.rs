//! Response envelopes shared by every endpoint.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// `{ success, message, data }`. A `success: false` body is an application error even on HTTP 2xx.
#[derive(Debug, Deserialize, Clone)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Returns the payload, or the server's message as an application error.
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(ApiError::Application(self.message));
        }
        self.data.ok_or_else(|| {
            ApiError::Serialization("response envelope is missing its data".to_string())
        })
    }

    /// Checks the success flag only; for endpoints whose data is null.
    pub fn into_success(self) -> Result<String> {
        if self.success {
            Ok(self.message)
        } else {
            Err(ApiError::Application(self.message))
        }
    }
}

/// Listing envelope: `data` is the current page and `pagination` describes the rest.
#[derive(Debug, Deserialize, Clone)]
pub struct Page<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<PaginationInfo>,
}

impl<T> Page<T> {
    pub fn into_parts(self) -> Result<(Vec<T>, PaginationInfo)> {
        if !self.success {
            return Err(ApiError::Application(self.message));
        }
        let pagination = self
            .pagination
            .unwrap_or_else(|| PaginationInfo::single_page(self.data.len() as u64));
        Ok((self.data, pagination))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationInfo {
    fn single_page(items: u64) -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            total_items: items,
            items_per_page: items as u32,
            has_next_page: false,
            has_prev_page: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn failed_envelope_becomes_application_error() {
        let envelope: Envelope<Value> =
            serde_json::from_str(r#"{"success":false,"message":"Issue not found"}"#).unwrap();
        match envelope.into_data() {
            Err(ApiError::Application(message)) => assert_eq!(message, "Issue not found"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn null_data_is_fine_for_success_checks() {
        let envelope: Envelope<Value> =
            serde_json::from_str(r#"{"success":true,"message":"Issue deleted","data":null}"#)
                .unwrap();
        assert_eq!(envelope.into_success().unwrap(), "Issue deleted");
    }

    #[test]
    fn page_without_pagination_synthesizes_single_page() {
        let page: Page<u32> =
            serde_json::from_str(r#"{"success":true,"message":"ok","data":[1,2,3]}"#).unwrap();
        let (items, pagination) = page.into_parts().unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(pagination.total_items, 3);
        assert!(!pagination.has_next_page);
    }
}
