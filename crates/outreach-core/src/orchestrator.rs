//! Call lifecycle orchestrator.
//!
//! Top-level coordinator: starts calls, ingests webhook events, drives the
//! call state tracker and the reconciliation poller, and on terminal state
//! hands the classified outcome to the retry/escalation engine.
//!
//! Concurrency model: no global lock. Each call id gets its own async mutex
//! from a lock map, so a webhook event and a poll for the same call are
//! serialized while unrelated calls proceed untouched. The reconciliation
//! sleep happens outside every lock and store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::abuse;
use crate::domain::{
    classify, retry_tag, AgentId, CallAttempt, CallId, CallStatus, OrchestrateError, Outcome,
    TaskId, TaskStatus, TranscriptTurn,
};
use crate::engine::{DecisionInput, RetryConfig, TaskEngine, TaskTransition};
use crate::ports::{
    AgentDirectory, CallConfig, CallStore, Clock, ProviderError, TaskStore, VoiceProvider,
};
use crate::reconcile::{self, ReconcilePolicy};
use crate::tracker;

/// Inbound webhook payload, validated into this shape at the boundary.
///
/// The provider delivers these at-least-once and possibly out of order
/// relative to polling; the tracker's monotonic rules absorb both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WebhookEvent {
    Started {
        call_id: CallId,
    },
    TranscriptDelta {
        call_id: CallId,
        turn: TranscriptTurn,
    },
    Ended {
        call_id: CallId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ended_reason: Option<String>,
    },
}

impl WebhookEvent {
    pub fn call_id(&self) -> &CallId {
        match self {
            WebhookEvent::Started { call_id }
            | WebhookEvent::TranscriptDelta { call_id, .. }
            | WebhookEvent::Ended { call_id, .. } => call_id,
        }
    }
}

/// What the caller knows about the patient being contacted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientContext {
    pub name: String,
    pub phone_number: String,
    /// What the call is meant to accomplish, in plain language.
    pub objective: String,
}

/// Local call status view, enriched with the classification once ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStatusView {
    pub call: CallAttempt,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bound on the provider call-start request.
    pub start_timeout: Duration,
    pub reconcile: ReconcilePolicy,
    pub retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_secs(10),
            reconcile: ReconcilePolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

pub struct CallOrchestrator {
    provider: Arc<dyn VoiceProvider>,
    tasks: Arc<dyn TaskStore>,
    calls: Arc<dyn CallStore>,
    directory: Arc<dyn AgentDirectory>,
    clock: Arc<dyn Clock>,
    engine: TaskEngine,
    config: OrchestratorConfig,

    /// Per-call-id serialization. Entries are created on first touch and
    /// kept for the process lifetime; call volume per process makes that
    /// acceptable.
    locks: Mutex<HashMap<CallId, Arc<Mutex<()>>>>,
}

impl CallOrchestrator {
    pub fn new(
        provider: Arc<dyn VoiceProvider>,
        tasks: Arc<dyn TaskStore>,
        calls: Arc<dyn CallStore>,
        directory: Arc<dyn AgentDirectory>,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
    ) -> Self {
        let engine = TaskEngine::new(
            Arc::clone(&directory),
            Arc::clone(&clock),
            config.retry.clone(),
        );
        Self {
            provider,
            tasks,
            calls,
            directory,
            clock,
            engine,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn call_lock(&self, id: &CallId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    /// Start an outbound call for a task.
    ///
    /// Validates the agent's calling capability and the patient phone number
    /// before touching the provider; every failure is a structured error,
    /// never a panic escaping to the caller.
    pub async fn start_outbound_call(
        &self,
        task_id: TaskId,
        agent_id: AgentId,
        patient: &PatientContext,
    ) -> Result<CallAttempt, OrchestrateError> {
        let agent = self
            .directory
            .get(agent_id)
            .ok_or(OrchestrateError::AgentNotFound(agent_id))?;
        if !agent.phone_capable || !agent.active {
            return Err(OrchestrateError::NotPhoneCapable(agent_id));
        }

        let mut task = self
            .tasks
            .find(task_id)
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?
            .ok_or(OrchestrateError::TaskNotFound(task_id))?;

        let to_number = normalize_phone(&patient.phone_number)?;
        let call_config = build_call_config(&agent.name, patient, to_number);

        let started = tokio::time::timeout(
            self.config.start_timeout,
            self.provider.start_call(call_config),
        )
        .await
        .map_err(|_| OrchestrateError::CallStartTimeout)?
        .map_err(|e| match e {
            ProviderError::Rejected(msg) => OrchestrateError::CallStartRejected(msg),
            other => OrchestrateError::Provider(other.to_string()),
        })?;

        let now = self.clock.now();
        let mut call = CallAttempt::new(started.id.clone(), Some(task_id), agent_id, now);
        tracker::apply_status(&mut call, started.status);
        self.calls
            .insert(call.clone())
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?;

        if task.status == TaskStatus::Pending || task.status == TaskStatus::Scheduled {
            task.status = TaskStatus::InProgress;
            task.next_retry_at = None;
            task.updated_at = now;
            self.tasks
                .update(&task)
                .await
                .map_err(|e| OrchestrateError::Store(e.to_string()))?;
        }

        info!(call_id = %call.id, task_id = %task_id, "outbound call started");
        Ok(call)
    }

    /// Ingest one webhook event.
    ///
    /// Events for unknown call ids are logged and discarded: one malformed
    /// or orphaned event must not take down ingestion for everything else.
    pub async fn handle_webhook_event(
        &self,
        event: WebhookEvent,
    ) -> Result<Option<TaskTransition>, OrchestrateError> {
        let call_id = event.call_id().clone();
        let lock = self.call_lock(&call_id).await;

        {
            let _guard = lock.lock().await;

            let Some(mut call) = self
                .calls
                .find(&call_id)
                .await
                .map_err(|e| OrchestrateError::Store(e.to_string()))?
            else {
                warn!(%call_id, "webhook event for unknown call id, discarding");
                return Ok(None);
            };

            match &event {
                WebhookEvent::Started { .. } => {
                    tracker::apply_status(&mut call, CallStatus::InProgress);
                }
                WebhookEvent::TranscriptDelta { turn, .. } => {
                    tracker::append_turn(&mut call, turn.clone());
                }
                WebhookEvent::Ended { ended_reason, .. } => {
                    tracker::apply_status(&mut call, CallStatus::Ended);
                    if call.ended_reason.is_none() {
                        call.ended_reason = ended_reason.clone();
                    }
                }
            }

            call.updated_at = self.clock.now();
            self.calls
                .update(&call)
                .await
                .map_err(|e| OrchestrateError::Store(e.to_string()))?;
        }
        // Guard dropped before completion processing re-acquires the lock.

        if matches!(event, WebhookEvent::Ended { .. }) {
            return self.process_call_completion(&call_id).await.map(Some);
        }
        Ok(None)
    }

    /// Terminal-state entry point: reconcile artifacts, detect abuse,
    /// classify the outcome, and drive the task engine.
    ///
    /// Safe to invoke more than once for the same call: a task that is
    /// already terminal, or that already has an attempt recorded for this
    /// call id, short-circuits to an `AlreadyProcessed` no-op.
    pub async fn process_call_completion(
        &self,
        call_id: &CallId,
    ) -> Result<TaskTransition, OrchestrateError> {
        let lock = self.call_lock(call_id).await;
        let _guard = lock.lock().await;

        let mut call = self
            .calls
            .find(call_id)
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?
            .ok_or_else(|| OrchestrateError::CallNotFound(call_id.clone()))?;

        if call.status != CallStatus::Ended {
            // Manual invocation can race the provider; check its view before
            // refusing. Provider failure here falls back to local state.
            match self.provider.get_call(call_id).await {
                Ok(snapshot) => tracker::merge_snapshot(&mut call, &snapshot),
                Err(err) => {
                    warn!(%call_id, %err, "status fetch failed, using local state")
                }
            }
            if call.status != CallStatus::Ended {
                return Err(OrchestrateError::CallNotEnded(call_id.clone()));
            }
        }

        call = reconcile::reconcile(&self.provider, &self.config.reconcile, call).await;

        if !call.has_abusive_language && abuse::detect(&call.messages) {
            call.has_abusive_language = true;
        }
        call.updated_at = self.clock.now();
        self.calls
            .update(&call)
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?;

        let Some(task_id) = call.task_id else {
            info!(%call_id, "call has no task attached, nothing to drive");
            return Ok(TaskTransition::already_processed());
        };

        let mut task = self
            .tasks
            .find(task_id)
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?
            .ok_or(OrchestrateError::TaskNotFound(task_id))?;

        if task.status.is_terminal() || task.has_attempt_for(call_id) {
            return Ok(TaskTransition::already_processed());
        }

        let reason = call.ended_reason.as_deref().unwrap_or("unknown");
        let input = DecisionInput {
            outcome: classify(reason),
            tag: retry_tag(reason),
            abusive: call.has_abusive_language,
            retry_count: task.retry_count,
            max_retries: task.max_retries,
        };

        let transition = self.engine.process(&mut task, &call, &input);
        self.tasks
            .update(&task)
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?;

        info!(%call_id, task_id = %task_id, kind = ?transition.kind, "call completion processed");
        Ok(transition)
    }

    /// Best-effort manual hangup.
    ///
    /// The local record is marked ended with reason `manually-canceled` even
    /// when the provider-side cancellation fails — the task workflow must be
    /// able to progress regardless.
    pub async fn end_call(&self, call_id: &CallId) -> Result<CallAttempt, OrchestrateError> {
        let lock = self.call_lock(call_id).await;
        let _guard = lock.lock().await;

        if let Err(err) = self.provider.end_call(call_id).await {
            warn!(%call_id, %err, "provider-side cancellation failed, ending locally");
        }

        let mut call = self
            .calls
            .find(call_id)
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?
            .ok_or_else(|| OrchestrateError::CallNotFound(call_id.clone()))?;

        tracker::apply_status(&mut call, CallStatus::Ended);
        if call.ended_reason.is_none() {
            call.ended_reason = Some("manually-canceled".to_string());
        }
        call.updated_at = self.clock.now();
        self.calls
            .update(&call)
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?;
        Ok(call)
    }

    /// Current call status, refreshed from the provider when reachable and
    /// served from the last persisted state when not.
    pub async fn get_call_status(
        &self,
        call_id: &CallId,
    ) -> Result<CallStatusView, OrchestrateError> {
        let lock = self.call_lock(call_id).await;
        let _guard = lock.lock().await;

        let mut call = self
            .calls
            .find(call_id)
            .await
            .map_err(|e| OrchestrateError::Store(e.to_string()))?
            .ok_or_else(|| OrchestrateError::CallNotFound(call_id.clone()))?;

        match self.provider.get_call(call_id).await {
            Ok(snapshot) => {
                tracker::merge_snapshot(&mut call, &snapshot);
                call.updated_at = self.clock.now();
                self.calls
                    .update(&call)
                    .await
                    .map_err(|e| OrchestrateError::Store(e.to_string()))?;
            }
            Err(err) => {
                warn!(%call_id, %err, "status fetch failed, serving last known state");
            }
        }

        let outcome = call.ended_reason.as_deref().map(classify);
        Ok(CallStatusView { call, outcome })
    }
}

/// Normalize a phone number to E.164.
///
/// Formatting characters are stripped; bare 10-digit numbers are assumed
/// NANP and prefixed `+1`; anything that does not end up as `+` followed by
/// 8-15 digits is rejected.
pub fn normalize_phone(raw: &str) -> Result<String, OrchestrateError> {
    let trimmed = raw.trim();
    let had_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if trimmed
        .chars()
        .any(|c| !c.is_ascii_digit() && !matches!(c, '+' | ' ' | '-' | '.' | '(' | ')'))
    {
        return Err(OrchestrateError::InvalidPhoneNumber(raw.to_string()));
    }

    let normalized = if had_plus {
        format!("+{digits}")
    } else if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        format!("+{digits}")
    };

    let digit_count = normalized.len() - 1;
    if !(8..=15).contains(&digit_count) {
        return Err(OrchestrateError::InvalidPhoneNumber(raw.to_string()));
    }
    Ok(normalized)
}

/// Assemble the run-time call configuration. Prompt construction proper is
/// a presentation concern; this just interpolates the fields the provider
/// needs.
fn build_call_config(agent_name: &str, patient: &PatientContext, to_number: String) -> CallConfig {
    CallConfig {
        to_number,
        first_message: format!(
            "Hello {}, this is {} calling from your medical practice.",
            patient.name, agent_name
        ),
        system_prompt: format!(
            "You are {}, an outreach assistant for a medical practice. \
             Objective for this call: {}",
            agent_name, patient.objective
        ),
    }
}
