//! Offline mutation records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::request::HttpMethod;
use crate::impl_wire_str_conversions;

/// Entity family a mutation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationDomain {
    Book,
    Note,
    Mindmap,
    Bookmark,
}

impl_wire_str_conversions!(MutationDomain {
    Book => "book",
    Note => "note",
    Mindmap => "mindmap",
    Bookmark => "bookmark",
});

impl MutationDomain {
    /// REST collection name for this domain
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Book => "books",
            Self::Note => "notes",
            Self::Mindmap => "mindmaps",
            Self::Bookmark => "bookmarks",
        }
    }
}

/// Write operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

impl_wire_str_conversions!(MutationAction {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

impl MutationAction {
    /// HTTP verb used to replay the action
    #[must_use]
    pub const fn method(self) -> HttpMethod {
        match self {
            Self::Create => HttpMethod::Post,
            Self::Update => HttpMethod::Put,
            Self::Delete => HttpMethod::Delete,
        }
    }

    /// Whether the payload must name an existing entity
    #[must_use]
    pub const fn targets_existing(self) -> bool {
        !matches!(self, Self::Create)
    }
}

/// A write waiting for the server to acknowledge it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMutation {
    pub id: String,
    pub domain: MutationDomain,
    pub action: MutationAction,
    pub payload: Value,
    pub enqueued_at_ms: i64,
}

impl QueuedMutation {
    /// New pending mutation with a time-ordered id
    pub fn new(
        domain: MutationDomain,
        action: MutationAction,
        payload: Value,
        enqueued_at_ms: i64,
    ) -> Self {
        Self { id: Uuid::now_v7().to_string(), domain, action, payload, enqueued_at_ms }
    }

    /// Server id of the entity the payload refers to
    ///
    /// Accepts string or integer `id` fields.
    pub fn target_id(&self) -> Option<String> {
        match self.payload.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Outcome of one flush pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    /// Ids acknowledged by the server and removed from the queue
    pub succeeded: Vec<String>,
    /// Ids that stay queued for the next flush
    pub still_pending: Vec<String>,
}

impl FlushReport {
    /// No mutation was left behind by this pass
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.still_pending.is_empty()
    }
}
