//! Task model: one unit of patient-outreach work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AgentId, CallId, TaskId};
use super::timeline::{RetryAttempt, RetryOutcomeTag, TimelineEvent};

/// Task status.
///
/// Terminal states are `Completed` and `Escalated`. An escalated task may be
/// manually reopened by a human later, but that sits outside this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Scheduled,
    Escalated,
    Completed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Escalated)
    }
}

/// A unit of work completed via zero or more call attempts.
///
/// Invariant: `retry_count <= max_retries` whenever the task is still in a
/// retry-pending state. Once the budget is exceeded the task must be
/// escalated; the engine enforces this, and `record_attempt` plus the budget
/// check are the only places `retry_count` moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,

    /// Incremented exactly once per recorded attempt.
    pub retry_count: u32,

    /// Retry budget (default 5, overridable per agent).
    pub max_retries: u32,

    /// Present only while a retry is pending.
    pub next_retry_at: Option<DateTime<Utc>>,

    /// Append-only attempt records.
    pub retry_history: Vec<RetryAttempt>,

    /// Append-only audit events.
    pub timeline: Vec<TimelineEvent>,

    /// Agent or staff member currently responsible.
    pub assigned_agent_id: AgentId,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_MAX_RETRIES: u32 = 5;

impl Task {
    pub fn new(id: TaskId, assigned_agent_id: AgentId, max_retries: u32, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            retry_count: 0,
            max_retries,
            next_retry_at: None,
            retry_history: Vec::new(),
            timeline: vec![TimelineEvent::Created { at: now }],
            assigned_agent_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record one call attempt: bump the counter and append to history.
    ///
    /// Must happen-before any budget check that could escalate in the same
    /// engine pass.
    pub fn record_attempt(
        &mut self,
        call_id: CallId,
        outcome: RetryOutcomeTag,
        duration_secs: Option<f64>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.retry_count += 1;
        self.retry_history.push(RetryAttempt {
            attempt: self.retry_count,
            call_id,
            outcome,
            duration_secs,
            at: now,
            note,
        });
        self.updated_at = now;
    }

    /// Has this call id already been recorded as an attempt?
    ///
    /// Used by the orchestrator to make completion processing idempotent per
    /// call id.
    pub fn has_attempt_for(&self, call_id: &CallId) -> bool {
        self.retry_history.iter().any(|a| &a.call_id == call_id)
    }

    /// Budget exhausted: no further retry may be scheduled.
    pub fn budget_exceeded(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    pub fn push_event(&mut self, event: TimelineEvent) {
        self.updated_at = event.at();
        self.timeline.push(event);
    }

    pub fn schedule_retry(&mut self, run_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.status = TaskStatus::Scheduled;
        self.next_retry_at = Some(run_at);
        self.updated_at = now;
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.next_retry_at = None;
        self.updated_at = now;
    }

    pub fn escalate(&mut self, staff_id: AgentId, now: DateTime<Utc>) {
        self.status = TaskStatus::Escalated;
        self.next_retry_at = None;
        self.assigned_agent_id = staff_id;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new(TaskId::generate(), AgentId::generate(), 2, Utc::now())
    }

    #[test]
    fn new_task_starts_pending_with_created_event() {
        let t = task();
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.retry_count, 0);
        assert_eq!(t.timeline.len(), 1);
        assert!(matches!(t.timeline[0], TimelineEvent::Created { .. }));
    }

    #[test]
    fn record_attempt_increments_exactly_once() {
        let mut t = task();
        let now = Utc::now();
        t.record_attempt(CallId::new("c1"), RetryOutcomeTag::NoAnswer, None, None, now);

        assert_eq!(t.retry_count, 1);
        assert_eq!(t.retry_history.len(), 1);
        assert_eq!(t.retry_history[0].attempt, 1);
        assert!(t.has_attempt_for(&CallId::new("c1")));
        assert!(!t.has_attempt_for(&CallId::new("c2")));
    }

    #[test]
    fn budget_exceeded_at_max_not_before() {
        let mut t = task();
        let now = Utc::now();
        t.record_attempt(CallId::new("c1"), RetryOutcomeTag::Busy, None, None, now);
        assert!(!t.budget_exceeded());
        t.record_attempt(CallId::new("c2"), RetryOutcomeTag::Busy, None, None, now);
        assert!(t.budget_exceeded());
    }

    #[test]
    fn terminal_transitions_clear_pending_retry() {
        let now = Utc::now();

        let mut t = task();
        t.schedule_retry(now + chrono::Duration::minutes(60), now);
        assert_eq!(t.status, TaskStatus::Scheduled);
        assert!(t.next_retry_at.is_some());

        t.complete(now);
        assert_eq!(t.status, TaskStatus::Completed);
        assert!(t.next_retry_at.is_none());

        let mut t = task();
        t.schedule_retry(now + chrono::Duration::minutes(60), now);
        let staff = AgentId::generate();
        t.escalate(staff, now);
        assert_eq!(t.status, TaskStatus::Escalated);
        assert_eq!(t.assigned_agent_id, staff);
        assert!(t.next_retry_at.is_none());
    }
}
