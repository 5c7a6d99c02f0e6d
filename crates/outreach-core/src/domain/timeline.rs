//! Append-only audit records for a task: timeline events and retry history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AgentId, CallId};

/// Coarse tag recorded per attempt in retry history.
///
/// Derived from the raw provider `ended_reason` by the outcome classifier;
/// kept deliberately small so operators can scan history at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOutcomeTag {
    NoAnswer,
    Busy,
    Disconnected,
    Voicemail,
    Failed,
}

/// One recorded call attempt against a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based attempt number (equals `retry_count` after recording).
    pub attempt: u32,
    pub call_id: CallId,
    pub outcome: RetryOutcomeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Heterogeneous audit event. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineEvent {
    Created {
        at: DateTime<Utc>,
    },
    CallAttempt {
        at: DateTime<Utc>,
        call_id: CallId,
        outcome: RetryOutcomeTag,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<f64>,
    },
    Voicemail {
        at: DateTime<Utc>,
        call_id: CallId,
    },
    RetryScheduled {
        at: DateTime<Utc>,
        run_at: DateTime<Utc>,
        attempt: u32,
    },
    Escalated {
        at: DateTime<Utc>,
        reason: String,
        assigned_to: AgentId,
    },
    Completed {
        at: DateTime<Utc>,
        description: String,
    },
    Note {
        at: DateTime<Utc>,
        text: String,
    },
}

impl TimelineEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            TimelineEvent::Created { at }
            | TimelineEvent::CallAttempt { at, .. }
            | TimelineEvent::Voicemail { at, .. }
            | TimelineEvent::RetryScheduled { at, .. }
            | TimelineEvent::Escalated { at, .. }
            | TimelineEvent::Completed { at, .. }
            | TimelineEvent::Note { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_events_are_tagged() {
        let ev = TimelineEvent::Voicemail {
            at: Utc::now(),
            call_id: CallId::new("c9"),
        };
        let v: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "voicemail");
        assert_eq!(v["call_id"], "c9");
    }

    #[test]
    fn retry_tag_serializes_snake_case() {
        let s = serde_json::to_string(&RetryOutcomeTag::NoAnswer).unwrap();
        assert_eq!(s, "\"no_answer\"");
    }
}
