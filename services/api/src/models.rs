//! API Models
//!
//! Request and response bodies for the session endpoints, documented with `utoipa`.

use chrono::{DateTime, Utc};
use mastery_core::IncompleteReason;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    InProgress,
    AwaitingAnswers,
    Mastered,
    Incomplete,
}

/// The checkpoint a learner is currently working on.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CheckpointView {
    #[schema(example = "Backpropagation")]
    pub topic: String,
    pub objectives: String,
    /// Zero-based position in the learning path.
    pub index: usize,
    pub status: CheckpointStatus,
    pub study_material: String,
    /// True when the material could not be gathered.
    pub material_unavailable: bool,
    /// The staged questions, present while answers are awaited.
    pub questions: Option<String>,
    /// The simplified explanation that followed the last failed attempt.
    pub explanation: Option<String>,
    pub last_score: u8,
    pub attempts: u32,
    pub remediation_rounds: u32,
    #[schema(example = "remediation_limit")]
    pub incomplete_reason: Option<String>,
}

/// How a finished checkpoint ended.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CheckpointResult {
    pub topic: String,
    pub status: CheckpointStatus,
    pub final_score: u8,
    pub attempts: u32,
    pub remediation_rounds: u32,
    pub incomplete_reason: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub completed: usize,
    pub total: usize,
    pub current: Option<CheckpointView>,
    pub results: Vec<CheckpointResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionSummary {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub current_topic: Option<String>,
    pub completed: usize,
    pub total: usize,
    pub mastered: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct CreateSessionPayload {
    /// Zero-based checkpoint to start from.
    #[serde(default)]
    #[schema(example = 0)]
    pub start_at: Option<usize>,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitAnswersPayload {
    #[schema(example = "1.A, 2.C, 3.B, 4.D, 5.A")]
    pub answers: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

pub fn reason_label(reason: IncompleteReason) -> String {
    match reason {
        IncompleteReason::Stalled => "stalled",
        IncompleteReason::RemediationLimit { .. } => "remediation_limit",
        IncompleteReason::Abandoned => "abandoned",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_status_serialization() {
        assert_eq!(
            serde_json::to_string(&CheckpointStatus::AwaitingAnswers).unwrap(),
            "\"awaiting_answers\""
        );
        let status: CheckpointStatus = serde_json::from_str("\"mastered\"").unwrap();
        assert_eq!(status, CheckpointStatus::Mastered);
        assert!(serde_json::from_str::<CheckpointStatus>("\"Mastered\"").is_err());
    }

    #[test]
    fn test_create_session_payload_start_at_is_optional() {
        let payload: CreateSessionPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.start_at, None);

        let payload: CreateSessionPayload = serde_json::from_str(r#"{"start_at": 2}"#).unwrap();
        assert_eq!(payload.start_at, Some(2));
    }

    #[test]
    fn test_submit_answers_payload_requires_answers() {
        let payload: SubmitAnswersPayload =
            serde_json::from_str(r#"{"answers": "1.A"}"#).unwrap();
        assert_eq!(payload.answers, "1.A");
        assert!(serde_json::from_str::<SubmitAnswersPayload>("{}").is_err());
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Session not found".to_string(),
        };

        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"Session not found"}"#);
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(reason_label(IncompleteReason::Stalled), "stalled");
        assert_eq!(
            reason_label(IncompleteReason::RemediationLimit { rounds: 3 }),
            "remediation_limit"
        );
        assert_eq!(reason_label(IncompleteReason::Abandoned), "abandoned");
    }

    #[test]
    fn test_checkpoint_view_serialization() {
        let view = CheckpointView {
            topic: "Backpropagation".to_string(),
            objectives: "Chain rule".to_string(),
            index: 0,
            status: CheckpointStatus::AwaitingAnswers,
            study_material: "## Backpropagation".to_string(),
            material_unavailable: false,
            questions: Some("1. Q".to_string()),
            explanation: None,
            last_score: 0,
            attempts: 0,
            remediation_rounds: 0,
            incomplete_reason: None,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "awaiting_answers");
        assert_eq!(json["questions"], "1. Q");
        assert!(json["explanation"].is_null());
    }
}
