use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned when a status/priority/severity label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

fn label_key(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Exact string used on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let key = label_key(value);
                $name::ALL
                    .iter()
                    .copied()
                    .find(|candidate| label_key(candidate.as_str()) == key)
                    .ok_or_else(|| ParseEnumError {
                        kind: $kind,
                        value: value.to_string(),
                        expected: $name::ALL
                            .iter()
                            .map(|candidate| candidate.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

wire_enum!(IssueStatus, "status", {
    Open => "Open",
    InProgress => "In Progress",
    Resolved => "Resolved",
    Closed => "Closed",
});

wire_enum!(IssuePriority, "priority", {
    Low => "Low",
    Medium => "Medium",
    High => "High",
    Critical => "Critical",
});

wire_enum!(IssueSeverity, "severity", {
    Minor => "Minor",
    Major => "Major",
    Critical => "Critical",
});

/// Issue as returned by the API. Never mutated locally except by replacing it with a newer server copy.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub severity: IssueSeverity,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Issue {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.updated_at)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Request body for `POST /api/issues`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub priority: IssuePriority,
    pub severity: IssueSeverity,
}

/// Request body for `PUT /api/issues/{id}`; unset fields are left out of the JSON.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<IssuePriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<IssueSeverity>,
}

impl IssuePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.severity.is_none()
    }
}

/// Per-status totals from `GET /api/issues/counts`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueCounts {
    #[serde(rename = "Open", default)]
    pub open: u64,
    #[serde(rename = "In Progress", default)]
    pub in_progress: u64,
    #[serde(rename = "Resolved", default)]
    pub resolved: u64,
    #[serde(rename = "Closed", default)]
    pub closed: u64,
    #[serde(default)]
    pub total: u64,
}

impl IssueCounts {
    pub fn count(&self, status: IssueStatus) -> u64 {
        match status {
            IssueStatus::Open => self.open,
            IssueStatus::InProgress => self.in_progress,
            IssueStatus::Resolved => self.resolved,
            IssueStatus::Closed => self.closed,
        }
    }
}
