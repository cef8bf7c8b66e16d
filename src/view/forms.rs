//! Client-side form models. Validation runs before any intent is dispatched.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use issuedesk_api::{Credentials, Issue, IssuePatch, IssuePriority, IssueSeverity, IssueStatus, NewIssue};

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex"));

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Title is required")]
    TitleRequired,
}

fn validate_email(email: &str) -> Result<String, FormError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FormError::EmailRequired);
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(FormError::InvalidEmail);
    }
    Ok(email.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<Credentials, FormError> {
        let email = validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(FormError::PasswordRequired);
        }
        Ok(Credentials::new(email, self.password.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<Credentials, FormError> {
        let email = validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(FormError::PasswordRequired);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::PasswordTooShort);
        }
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        Ok(Credentials::new(email, self.password.clone()))
    }
}

/// "Add issue" modal fields.
#[derive(Debug, Clone)]
pub struct IssueForm {
    pub title: String,
    pub description: String,
    pub priority: IssuePriority,
    pub severity: IssueSeverity,
}

impl Default for IssueForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            priority: IssuePriority::Medium,
            severity: IssueSeverity::Minor,
        }
    }
}

impl IssueForm {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<NewIssue, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::TitleRequired);
        }
        Ok(NewIssue {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            priority: self.priority,
            severity: self.severity,
        })
    }
}

/// "Edit issue" modal, prefilled from the issue being edited.
#[derive(Debug, Clone)]
pub struct EditForm {
    original: Issue,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub severity: IssueSeverity,
}

impl EditForm {
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            original: issue.clone(),
            title: issue.title.clone(),
            description: issue.description.clone(),
            status: issue.status,
            priority: issue.priority,
            severity: issue.severity,
        }
    }

    pub fn issue_id(&self) -> &str {
        &self.original.id
    }

    /// Patch with only the fields that differ from the original issue.
    pub fn to_patch(&self) -> Result<IssuePatch, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::TitleRequired);
        }
        let description = self.description.trim();
        let original = &self.original;
        Ok(IssuePatch {
            title: (title != original.title).then(|| title.to_string()),
            description: (description != original.description.trim())
                .then(|| description.to_string()),
            status: (self.status != original.status).then_some(self.status),
            priority: (self.priority != original.priority).then_some(self.priority),
            severity: (self.severity != original.severity).then_some(self.severity),
        })
    }
}
