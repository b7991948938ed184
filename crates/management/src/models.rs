//! Audience domain types: workspaces, users, segments, subscribers, invitations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Tenancy ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Bearer token bound to one workspace and the user acting in it.
#[derive(Debug, Clone)]
pub struct ApiToken {
    pub token: String,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Acting workspace and user for one request. Every service call takes it
/// explicitly; it is resolved from the bearer token by the auth middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceContext {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
}

// ─── Segments ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Segment row for the index page.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub subscriber_count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentForm {
    #[serde(default)]
    pub name: Option<String>,
    /// HTML form method override (`PUT` / `DELETE`).
    #[serde(default, rename = "_method")]
    pub method: Option<String>,
}

impl SegmentForm {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            method: None,
        }
    }
}

/// Public JSON shape of a segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentResource {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Segment> for SegmentResource {
    fn from(segment: Segment) -> Self {
        Self {
            id: segment.id,
            name: segment.name,
            created_at: segment.created_at,
            updated_at: segment.updated_at,
        }
    }
}

// ─── Subscribers ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscriber {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSubscriberRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Body of the subscriber tag endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberTagsRequest {
    /// Segment ids; entries are parsed one by one so a bad entry is reported
    /// on its own `tags.N` field.
    #[serde(default)]
    pub tags: Vec<serde_json::Value>,
}

// ─── Invitations ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invitation {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Option<Uuid>,
    pub role: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvitationForm {
    #[serde(default)]
    pub email: Option<String>,
}

// ─── API envelopes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
