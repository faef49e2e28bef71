use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poll {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PollOption {
    pub id: i64,
    pub poll_id: i64,
    pub option_text: String,
    pub vote_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: i64,
    pub poll_id: i64,
    pub option_id: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One vote row joined with the text of the option it targets.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VoteDetail {
    pub id: i64,
    pub option_id: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub option_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollWithOptions {
    #[serde(flatten)]
    pub poll: Poll,
    pub poll_options: Vec<PollOption>,
}

/// Fields of a poll update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PollPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

// Request bodies keep every field optional so missing input surfaces as a
// 400 validation failure rather than a deserialization rejection.

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub options: Option<Vec<String>>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePollRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePollRequest {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub poll_id: Option<i64>,
    pub option_id: Option<i64>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteVoteRequest {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreatePollResponse {
    pub poll: Poll,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Serialize)]
pub struct DeletedPoll {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedVote {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct PollVotesResponse {
    pub poll_id: i64,
    pub total_votes: i64,
    pub votes: Vec<VoteDetail>,
}

/// Counter repair outcome for one option whose tally had drifted.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RepairedOption {
    pub option_id: i64,
    pub previous_count: i32,
    pub actual_count: i32,
}

#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    pub poll_id: i64,
    pub options_checked: usize,
    pub repaired: Vec<RepairedOption>,
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            message: message.into(),
            success: true,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: message.into(),
            success: false,
        }
    }
}
