use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    General,
    Bug,
    Feature,
    Complaint,
}

impl Default for FeedbackKind {
    fn default() -> Self {
        FeedbackKind::General
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub message: String,
    pub kind: FeedbackKind,
    /// Optional 1-5 service rating; 4 and 5 star ratings feed back into the
    /// assigned worker's rewards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<Uuid>,
    pub status: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(
        user_id: Uuid,
        user_name: impl Into<String>,
        message: impl Into<String>,
        kind: FeedbackKind,
        rating: Option<i32>,
        ticket_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_name: user_name.into(),
            message: message.into(),
            kind,
            rating,
            ticket_id,
            status: "submitted".to_string(),
            created_at: Utc::now(),
        }
    }
}
