//! Call attempt model: one invocation of the voice provider for a task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AgentId, CallId, TaskId};

/// Status of a call attempt.
///
/// Strict forward progression: Queued -> Ringing -> InProgress -> Ended.
/// `Ended` is absorbing. Updates arrive from two independent sources (polling
/// and webhooks) which may race or duplicate, so the tracker only ever applies
/// transitions that move forward (see `tracker`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Ringing,
    InProgress,
    Ended,
}

impl CallStatus {
    /// Position in the forward progression. Higher never goes back to lower.
    pub fn rank(self) -> u8 {
        match self {
            CallStatus::Queued => 0,
            CallStatus::Ringing => 1,
            CallStatus::InProgress => 2,
            CallStatus::Ended => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Ended)
    }
}

/// Who spoke a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Agent,
    Patient,
}

/// One turn of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Structured post-call analysis produced asynchronously by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Provider-extracted structured fields; shape is provider-defined.
    #[serde(default)]
    pub structured_data: serde_json::Value,
}

impl CallAnalysis {
    /// "Present" for reconciliation purposes means there is actual content,
    /// not just an empty object the provider emitted as a placeholder.
    pub fn is_populated(&self) -> bool {
        if self.summary.as_deref().is_some_and(|s| !s.is_empty()) {
            return true;
        }
        match &self.structured_data {
            serde_json::Value::Null => false,
            serde_json::Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}

/// A single call attempt. The provider-assigned `id` is the primary key.
///
/// `recording_url`, `transcript` and `analysis` each start absent and may be
/// filled in after `status` reaches `Ended` — the provider produces them
/// asynchronously, which is why the reconciliation poller exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAttempt {
    pub id: CallId,

    /// The task this call is driving forward, if any.
    pub task_id: Option<TaskId>,

    pub agent_id: AgentId,

    pub status: CallStatus,

    /// Opaque provider vocabulary. Interpreted only by the outcome
    /// classifier, never pattern-matched anywhere else.
    pub ended_reason: Option<String>,

    pub messages: Vec<TranscriptTurn>,

    pub recording_url: Option<String>,
    pub transcript: Option<String>,
    pub analysis: Option<CallAnalysis>,

    /// Set once by abuse detection, never cleared.
    pub has_abusive_language: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallAttempt {
    pub fn new(id: CallId, task_id: Option<TaskId>, agent_id: AgentId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            task_id,
            agent_id,
            status: CallStatus::Queued,
            ended_reason: None,
            messages: Vec::new(),
            recording_url: None,
            transcript: None,
            analysis: None,
            has_abusive_language: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Both asynchronous artifacts have arrived.
    pub fn artifacts_complete(&self) -> bool {
        self.recording_url.as_deref().is_some_and(|u| !u.is_empty())
            && self.analysis.as_ref().is_some_and(|a| a.is_populated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ranks_are_strictly_ordered() {
        assert!(CallStatus::Queued.rank() < CallStatus::Ringing.rank());
        assert!(CallStatus::Ringing.rank() < CallStatus::InProgress.rank());
        assert!(CallStatus::InProgress.rank() < CallStatus::Ended.rank());
    }

    #[test]
    fn empty_analysis_is_not_populated() {
        let a = CallAnalysis {
            summary: None,
            structured_data: serde_json::json!({}),
        };
        assert!(!a.is_populated());

        let b = CallAnalysis {
            summary: Some("Patient confirmed the appointment.".to_string()),
            structured_data: serde_json::Value::Null,
        };
        assert!(b.is_populated());
    }

    #[test]
    fn artifacts_complete_requires_both() {
        let now = Utc::now();
        let mut call = CallAttempt::new(
            CallId::new("c1"),
            None,
            crate::domain::AgentId::generate(),
            now,
        );
        assert!(!call.artifacts_complete());

        call.recording_url = Some("https://recordings/c1.wav".to_string());
        assert!(!call.artifacts_complete());

        call.analysis = Some(CallAnalysis {
            summary: Some("done".to_string()),
            structured_data: serde_json::Value::Null,
        });
        assert!(call.artifacts_complete());
    }

    #[test]
    fn status_serializes_kebab_case() {
        let s = serde_json::to_string(&CallStatus::InProgress).unwrap();
        assert_eq!(s, "\"in-progress\"");
    }
}
