//! Ticket records and their wire/storage representations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a ticket. There is no enforced transition graph;
/// the only guarded transitions are claim and escalation, both of which go
/// through conditional updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    Pending,
    InProgress,
    Resolved,
    Escalated,
}

impl TicketStatus {
    /// Statuses the escalation sweep considers open.
    pub const OPEN: [TicketStatus; 2] = [TicketStatus::Pending, TicketStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Escalated => "escalated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TicketStatus::Pending),
            "in-progress" => Some(TicketStatus::InProgress),
            "resolved" => Some(TicketStatus::Resolved),
            "escalated" => Some(TicketStatus::Escalated),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TicketStatus::Pending | TicketStatus::InProgress)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TicketPriority::Low),
            "medium" => Some(TicketPriority::Medium),
            "high" => Some(TicketPriority::High),
            _ => None,
        }
    }

    /// Parse a priority supplied at creation time. Legacy clients still send
    /// "urgent"; it is normalized to high here and nowhere else.
    pub fn from_input(s: &str) -> Option<Self> {
        match s {
            "urgent" => Some(TicketPriority::High),
            other => Self::parse(other),
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One comment on a ticket. System comments form the audit trail and carry
/// no author reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    pub author_name: String,
    pub body: String,
    #[serde(rename = "isSystem")]
    pub is_system: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author_id: Uuid, author_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: Some(author_id),
            author_name: author_name.into(),
            body: body.into(),
            is_system: false,
            created_at: Utc::now(),
        }
    }

    pub fn system(body: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: None,
            author_name: "System".to_string(),
            body: body.into(),
            is_system: true,
            created_at: at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub subject: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "assignedAt", skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(rename = "inProgressAt", skip_serializing_if = "Option::is_none")]
    pub in_progress_at: Option<DateTime<Utc>>,
    #[serde(rename = "resolvedAt", skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(rename = "escalatedAt", skip_serializing_if = "Option::is_none")]
    pub escalated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Ticket {
    pub fn new(
        user_id: Uuid,
        subject: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        priority: TicketPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            subject: subject.into(),
            description: description.into(),
            category: category.into(),
            subcategory: String::new(),
            status: TicketStatus::Pending,
            priority,
            user_id,
            assigned_to: None,
            resolution: None,
            created_at: now,
            updated_at: now,
            assigned_at: None,
            in_progress_at: None,
            resolved_at: None,
            escalated_at: None,
            comments: Vec::new(),
        }
    }
}

/// Outcome of a conditional (compare-and-swap) write against a ticket.
/// `Conflict` means another actor got there first; callers outside the claim
/// endpoint treat it as "already handled", not as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,
    Conflict,
}

impl StatusUpdate {
    pub fn applied(&self) -> bool {
        matches!(self, StatusUpdate::Applied)
    }
}

/// Partial update applied by worker/admin management endpoints. `None`
/// leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<Uuid>,
    pub resolution: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub in_progress_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub escalated_at: Option<DateTime<Utc>>,
}

impl TicketPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.resolution.is_none()
            && self.assigned_at.is_none()
            && self.in_progress_at.is_none()
            && self.resolved_at.is_none()
            && self.escalated_at.is_none()
    }
}

/// Per-status ticket counts for dashboards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    #[serde(rename = "inProgress")]
    pub in_progress: i64,
    pub resolved: i64,
    pub escalated: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            TicketStatus::Pending,
            TicketStatus::InProgress,
            TicketStatus::Resolved,
            TicketStatus::Escalated,
        ] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TicketStatus::parse("closed"), None);
    }

    #[test]
    fn urgent_input_normalizes_to_high() {
        assert_eq!(TicketPriority::from_input("urgent"), Some(TicketPriority::High));
        assert_eq!(TicketPriority::from_input("medium"), Some(TicketPriority::Medium));
        // Only the creation path accepts "urgent"
        assert_eq!(TicketPriority::parse("urgent"), None);
    }

    #[test]
    fn patch_with_only_a_timestamp_is_not_empty() {
        assert!(TicketPatch::default().is_empty());
        let patch = TicketPatch {
            resolved_at: Some(Utc::now()),
            ..TicketPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn serde_uses_kebab_case_statuses() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }
}
