//! Wire types for the model-serving API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimal identity of a model from `GET /v1/models`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub id: i64,
}

/// Lifecycle state of a model instance.
///
/// Unknown states are kept verbatim in [`InstanceState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceState {
    Pending,
    Initializing,
    Scheduled,
    Downloading,
    Analyzing,
    Starting,
    Running,
    Unreachable,
    Error,
    Other(String),
}

impl InstanceState {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Initializing => "initializing",
            Self::Scheduled => "scheduled",
            Self::Downloading => "downloading",
            Self::Analyzing => "analyzing",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Unreachable => "unreachable",
            Self::Error => "error",
            Self::Other(s) => s,
        }
    }

    /// Whether an instance in this state should be deleted.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl From<String> for InstanceState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "initializing" => Self::Initializing,
            "scheduled" => Self::Scheduled,
            "downloading" => Self::Downloading,
            "analyzing" => Self::Analyzing,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "unreachable" => Self::Unreachable,
            "error" => Self::Error,
            _ => Self::Other(value),
        }
    }
}

impl From<InstanceState> for String {
    fn from(state: InstanceState) -> Self {
        match state {
            InstanceState::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployed unit of a model, from `GET /v1/models/{id}/instances`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInstance {
    pub id: i64,
    pub model_id: i64,
    #[serde(default)]
    pub model_name: String,
    pub state: InstanceState,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub state_message: String,
}

/// Pagination block of list responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
}

/// `{items: [...], pagination: {...}}` envelope shared by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> ListResponse<T> {
    /// Total reported by the server when it exceeds what was returned.
    #[must_use]
    pub fn truncated_total(&self) -> Option<u64> {
        let total = self.pagination?.total;
        (total > self.items.len() as u64).then_some(total)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
