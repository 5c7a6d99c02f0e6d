//! Task engine: executes a `Decision` against a task.
//!
//! Each branch performs at most one status transition, and "record a retry
//! attempt" increments `retry_count` exactly once and happens-before the
//! budget check that may escalate in the same pass. Escalation always runs
//! the fallback resolver and reassigns the task to the resolved staff
//! member.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{CallAttempt, RetryOutcomeTag, Task, TimelineEvent};
use crate::fallback;
use crate::ports::{AgentDirectory, Clock};

use super::decision::{decide, Decision, DecisionInput};

/// Retry scheduling configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before a scheduled retry runs (voicemail and failures alike).
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(60 * 60),
        }
    }
}

/// What happened to the task, in a shape the caller can show an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Completed,
    RetryScheduled,
    Escalated,
    Voicemail,
    Flagged,
    /// Completion processing ran again for an already-handled call: no-op.
    AlreadyProcessed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTransition {
    pub kind: TransitionKind,
    /// Short human-readable message, suitable for direct operator display.
    pub message: String,
}

impl TaskTransition {
    pub fn already_processed() -> Self {
        Self {
            kind: TransitionKind::AlreadyProcessed,
            message: "Call already processed.".to_string(),
        }
    }
}

/// Retry/escalation engine.
///
/// Assumes well-formed inputs: by the time `process` runs, provider errors
/// have been absorbed at the orchestrator boundary and the outcome is a
/// defined classification.
pub struct TaskEngine {
    directory: Arc<dyn AgentDirectory>,
    clock: Arc<dyn Clock>,
    config: RetryConfig,
}

impl TaskEngine {
    pub fn new(
        directory: Arc<dyn AgentDirectory>,
        clock: Arc<dyn Clock>,
        config: RetryConfig,
    ) -> Self {
        Self {
            directory,
            clock,
            config,
        }
    }

    /// Apply the decision for one terminal call to its task.
    ///
    /// The caller guarantees this runs at most once per (task, call) pair;
    /// the orchestrator's per-call lock and attempt-id short-circuit provide
    /// that.
    pub fn process(
        &self,
        task: &mut Task,
        call: &CallAttempt,
        input: &DecisionInput,
    ) -> TaskTransition {
        let now = self.clock.now();
        let decision = decide(input);
        info!(task_id = %task.id, call_id = %call.id, ?decision, "task decision");

        match decision {
            Decision::EscalateAbuse => {
                let staff = self.escalate(task, "abusive language", now);
                TaskTransition {
                    kind: TransitionKind::Flagged,
                    message: format!(
                        "Abusive language detected. Task escalated to {staff} for review."
                    ),
                }
            }

            Decision::Complete => {
                task.complete(now);
                task.push_event(TimelineEvent::Completed {
                    at: now,
                    description: input.outcome.description.clone(),
                });
                TaskTransition {
                    kind: TransitionKind::Completed,
                    message: format!("{} Task completed.", input.outcome.description),
                }
            }

            Decision::RecordAndEscalate { tag } => {
                self.record(task, call, tag, now);
                let reason = format!("max retries reached, last outcome {}", tag_label(tag));
                self.escalate(task, &reason, now);
                TaskTransition {
                    kind: TransitionKind::Escalated,
                    message: format!(
                        "No retries left ({}/{}). Task escalated to staff.",
                        task.retry_count, task.max_retries
                    ),
                }
            }

            Decision::RecordAndSchedule { tag } => {
                self.record(task, call, tag, now);
                let run_at = now + chrono::Duration::from_std(self.config.retry_delay)
                    .unwrap_or_else(|_| chrono::Duration::minutes(60));
                task.schedule_retry(run_at, now);
                task.push_event(TimelineEvent::RetryScheduled {
                    at: now,
                    run_at,
                    attempt: task.retry_count,
                });

                if tag == RetryOutcomeTag::Voicemail {
                    TaskTransition {
                        kind: TransitionKind::Voicemail,
                        message: "Voicemail left. Retry scheduled.".to_string(),
                    }
                } else {
                    TaskTransition {
                        kind: TransitionKind::RetryScheduled,
                        message: format!(
                            "{} Retry {} of {} scheduled.",
                            input.outcome.description, task.retry_count, task.max_retries
                        ),
                    }
                }
            }

            Decision::EscalateFatal => {
                let reason = format!("non-retryable outcome: {}", input.outcome.title);
                self.escalate(task, &reason, now);
                TaskTransition {
                    kind: TransitionKind::Escalated,
                    message: format!("{} Task escalated to staff.", input.outcome.description),
                }
            }
        }
    }

    /// Record one attempt: retry-history entry plus its timeline event.
    /// Voicemail attempts get the voicemail event instead of the generic
    /// call-attempt one.
    fn record(
        &self,
        task: &mut Task,
        call: &CallAttempt,
        tag: RetryOutcomeTag,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        let duration_secs = call_duration_secs(call);
        task.record_attempt(call.id.clone(), tag, duration_secs, None, now);

        let event = if tag == RetryOutcomeTag::Voicemail {
            TimelineEvent::Voicemail {
                at: now,
                call_id: call.id.clone(),
            }
        } else {
            TimelineEvent::CallAttempt {
                at: now,
                call_id: call.id.clone(),
                outcome: tag,
                duration_secs,
            }
        };
        task.push_event(event);
    }

    fn escalate(
        &self,
        task: &mut Task,
        reason: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> crate::domain::AgentId {
        let staff = match self.directory.get(task.assigned_agent_id) {
            Some(agent) => fallback::resolve(&agent, self.directory.as_ref()),
            // Task assigned to an unknown agent: skip the per-agent chain
            // and go straight to the directory-wide steps.
            None => self
                .directory
                .staff_agents()
                .into_iter()
                .find(|p| p.is_active_staff())
                .map(|p| p.id)
                .unwrap_or_else(fallback::last_resort_staff_id),
        };
        task.escalate(staff, now);
        task.push_event(TimelineEvent::Escalated {
            at: now,
            reason: reason.to_string(),
            assigned_to: staff,
        });
        staff
    }
}

fn tag_label(tag: RetryOutcomeTag) -> &'static str {
    match tag {
        RetryOutcomeTag::NoAnswer => "no answer",
        RetryOutcomeTag::Busy => "busy",
        RetryOutcomeTag::Disconnected => "disconnected",
        RetryOutcomeTag::Voicemail => "voicemail",
        RetryOutcomeTag::Failed => "failed",
    }
}

/// Call length from transcript timestamps; None when there were no turns.
fn call_duration_secs(call: &CallAttempt) -> Option<f64> {
    let first = call.messages.first()?.timestamp;
    let last = call.messages.last()?.timestamp;
    Some((last - first).num_milliseconds() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{classify, retry_tag, AgentId, AgentKind, AgentProfile, CallId, TaskId, TaskStatus};
    use crate::ports::FixedClock;

    struct TwoAgentDirectory {
        voice: AgentProfile,
        staff: AgentProfile,
    }

    impl AgentDirectory for TwoAgentDirectory {
        fn get(&self, id: AgentId) -> Option<AgentProfile> {
            [&self.voice, &self.staff]
                .into_iter()
                .find(|a| a.id == id)
                .cloned()
        }

        fn staff_agents(&self) -> Vec<AgentProfile> {
            vec![self.staff.clone()]
        }
    }

    struct Fixture {
        engine: TaskEngine,
        task: Task,
        staff_id: AgentId,
    }

    fn fixture(max_retries: u32) -> Fixture {
        let staff = AgentProfile {
            id: AgentId::generate(),
            name: "Nurse Desk".to_string(),
            kind: AgentKind::Staff,
            active: true,
            phone_capable: false,
            fallback_staff_id: None,
            backup_staff_ids: Vec::new(),
            max_retries_override: None,
        };
        let voice = AgentProfile {
            id: AgentId::generate(),
            name: "Outreach Agent".to_string(),
            kind: AgentKind::Voice,
            active: true,
            phone_capable: true,
            fallback_staff_id: Some(staff.id),
            backup_staff_ids: Vec::new(),
            max_retries_override: None,
        };
        let staff_id = staff.id;
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let task = Task::new(TaskId::generate(), voice.id, max_retries, now);
        let engine = TaskEngine::new(
            Arc::new(TwoAgentDirectory { voice, staff }),
            Arc::new(FixedClock::new(now)),
            RetryConfig::default(),
        );
        Fixture {
            engine,
            task,
            staff_id,
        }
    }

    fn ended_call(id: &str) -> CallAttempt {
        let mut c = CallAttempt::new(CallId::new(id), None, AgentId::generate(), Utc::now());
        c.status = crate::domain::CallStatus::Ended;
        c
    }

    fn input_for(reason: &str, abusive: bool, task: &Task) -> DecisionInput {
        DecisionInput {
            outcome: classify(reason),
            tag: retry_tag(reason),
            abusive,
            retry_count: task.retry_count,
            max_retries: task.max_retries,
        }
    }

    #[test]
    fn success_completes_with_one_completed_event() {
        let mut f = fixture(5);
        let call = ended_call("c1");
        let input = input_for("assistant-ended-call", false, &f.task);

        let events_before = f.task.timeline.len();
        let t = f.engine.process(&mut f.task, &call, &input);

        assert_eq!(t.kind, TransitionKind::Completed);
        assert_eq!(f.task.status, TaskStatus::Completed);
        assert!(f.task.next_retry_at.is_none());
        assert_eq!(f.task.timeline.len(), events_before + 1);
        assert!(matches!(
            f.task.timeline.last(),
            Some(TimelineEvent::Completed { .. })
        ));
        // Success consumes no budget.
        assert_eq!(f.task.retry_count, 0);
    }

    #[test]
    fn no_answer_schedules_then_escalates_with_budget_two() {
        let mut f = fixture(2);

        let input = input_for("customer-did-not-answer", false, &f.task);
        let t = f.engine.process(&mut f.task, &ended_call("c1"), &input);
        assert_eq!(t.kind, TransitionKind::RetryScheduled);
        assert_eq!(f.task.status, TaskStatus::Scheduled);
        assert_eq!(f.task.retry_count, 1);
        assert!(f.task.next_retry_at.is_some());

        let input = input_for("customer-did-not-answer", false, &f.task);
        let t = f.engine.process(&mut f.task, &ended_call("c2"), &input);
        assert_eq!(t.kind, TransitionKind::Escalated);
        assert_eq!(f.task.status, TaskStatus::Escalated);
        assert_eq!(f.task.retry_count, 2);
        assert!(f.task.next_retry_at.is_none());
        assert_eq!(f.task.assigned_agent_id, f.staff_id);
    }

    #[test]
    fn abuse_escalates_even_on_success_without_consuming_budget() {
        let mut f = fixture(5);
        let input = input_for("assistant-ended-call", true, &f.task);

        let t = f.engine.process(&mut f.task, &ended_call("c1"), &input);

        assert_eq!(t.kind, TransitionKind::Flagged);
        assert_eq!(f.task.status, TaskStatus::Escalated);
        assert_eq!(f.task.retry_count, 0);
        assert_eq!(f.task.assigned_agent_id, f.staff_id);
    }

    #[test]
    fn five_voicemails_escalate_on_the_fifth() {
        let mut f = fixture(5);

        for i in 1..=4u32 {
            let input = input_for("voicemail", false, &f.task);
            let t = f
                .engine
                .process(&mut f.task, &ended_call(&format!("c{i}")), &input);
            assert_eq!(t.kind, TransitionKind::Voicemail, "attempt {i}");
            assert_eq!(f.task.retry_count, i);
        }

        let input = input_for("voicemail", false, &f.task);
        let t = f.engine.process(&mut f.task, &ended_call("c5"), &input);
        assert_eq!(t.kind, TransitionKind::Escalated);
        assert_eq!(f.task.status, TaskStatus::Escalated);
        assert_eq!(f.task.retry_count, 5);
    }

    #[test]
    fn voicemail_records_voicemail_event_not_call_attempt() {
        let mut f = fixture(5);
        let input = input_for("voicemail", false, &f.task);
        f.engine.process(&mut f.task, &ended_call("c1"), &input);

        assert!(f
            .task
            .timeline
            .iter()
            .any(|e| matches!(e, TimelineEvent::Voicemail { .. })));
        assert_eq!(f.task.retry_history[0].outcome, RetryOutcomeTag::Voicemail);
    }

    #[test]
    fn retry_count_never_exceeds_budget_outside_terminal_states() {
        let mut f = fixture(3);
        for i in 1..=3u32 {
            let input = input_for("customer-busy", false, &f.task);
            f.engine
                .process(&mut f.task, &ended_call(&format!("c{i}")), &input);
            if !f.task.status.is_terminal() {
                assert!(f.task.retry_count <= f.task.max_retries);
            }
        }
        assert_eq!(f.task.status, TaskStatus::Escalated);
    }
}
