//! Demo: run one outreach task against the simulated provider.
//!
//! First attempt goes unanswered (retry scheduled), second attempt succeeds
//! (task completed). Run with `RUST_LOG=debug` for the orchestrator's view.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use outreach_core::domain::{
    AgentId, AgentKind, AgentProfile, Speaker, Task, TaskId, TranscriptTurn, DEFAULT_MAX_RETRIES,
};
use outreach_core::engine::RetryConfig;
use outreach_core::impls::{
    InMemoryCallStore, InMemoryDirectory, InMemoryTaskStore, SimulatedProvider,
};
use outreach_core::observability::task_counts;
use outreach_core::ports::{SystemClock, TaskStore};
use outreach_core::{
    CallOrchestrator, OrchestratorConfig, PatientContext, ReconcilePolicy, WebhookEvent,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // (A) Directory: one voice agent, one staff member as escalation target.
    let staff = AgentProfile {
        id: AgentId::generate(),
        name: "Front Desk".to_string(),
        kind: AgentKind::Staff,
        active: true,
        phone_capable: false,
        fallback_staff_id: None,
        backup_staff_ids: Vec::new(),
        max_retries_override: None,
    };
    let agent = AgentProfile {
        id: AgentId::generate(),
        name: "Ava".to_string(),
        kind: AgentKind::Voice,
        active: true,
        phone_capable: true,
        fallback_staff_id: Some(staff.id),
        backup_staff_ids: Vec::new(),
        max_retries_override: None,
    };
    let agent_id = agent.id;

    // (B) Stores, provider, orchestrator.
    let tasks = Arc::new(InMemoryTaskStore::new());
    let provider = Arc::new(SimulatedProvider::new());
    let max_retries = agent.max_retries_override.unwrap_or(DEFAULT_MAX_RETRIES);
    let orchestrator = CallOrchestrator::new(
        provider.clone(),
        tasks.clone(),
        Arc::new(InMemoryCallStore::new()),
        Arc::new(InMemoryDirectory::new(vec![agent, staff])),
        Arc::new(SystemClock),
        OrchestratorConfig {
            start_timeout: Duration::from_secs(5),
            reconcile: ReconcilePolicy {
                max_attempts: 4,
                delay: Duration::from_millis(200),
            },
            retry: RetryConfig::default(),
        },
    );

    // (C) One outreach task.
    let task = Task::new(TaskId::generate(), agent_id, max_retries, Utc::now());
    let task_id = task.id;
    tasks.insert(task).await.expect("in-memory insert");
    let patient = PatientContext {
        name: "Jordan Reyes".to_string(),
        phone_number: "(555) 201-3344".to_string(),
        objective: "confirm Thursday's follow-up appointment".to_string(),
    };

    // (D) Attempt 1: nobody picks up.
    let call = orchestrator
        .start_outbound_call(task_id, agent_id, &patient)
        .await
        .expect("start call");
    println!("attempt 1 started: {}", call.id);

    provider
        .finish_call(&call.id, "customer-did-not-answer", Vec::new(), 0)
        .await;
    let transition = orchestrator
        .handle_webhook_event(WebhookEvent::Ended {
            call_id: call.id.clone(),
            ended_reason: Some("customer-did-not-answer".to_string()),
        })
        .await
        .expect("webhook")
        .expect("transition");
    println!("attempt 1 outcome: {}", transition.message);

    // (E) Attempt 2: the patient answers and confirms.
    let call = orchestrator
        .start_outbound_call(task_id, agent_id, &patient)
        .await
        .expect("start call");
    println!("attempt 2 started: {}", call.id);

    provider
        .finish_call(
            &call.id,
            "assistant-ended-call",
            vec![
                TranscriptTurn {
                    speaker: Speaker::Agent,
                    text: "Calling to confirm your Thursday follow-up.".to_string(),
                    timestamp: Utc::now(),
                },
                TranscriptTurn {
                    speaker: Speaker::Patient,
                    text: "Yes, I'll be there. Thank you.".to_string(),
                    timestamp: Utc::now(),
                },
            ],
            1,
        )
        .await;
    let transition = orchestrator
        .handle_webhook_event(WebhookEvent::Ended {
            call_id: call.id.clone(),
            ended_reason: Some("assistant-ended-call".to_string()),
        })
        .await
        .expect("webhook")
        .expect("transition");
    println!("attempt 2 outcome: {}", transition.message);

    // (F) Final state.
    let task = tasks
        .find(task_id)
        .await
        .expect("in-memory find")
        .expect("task exists");
    println!(
        "final: status={:?} retries={}/{} timeline_events={}",
        task.status,
        task.retry_count,
        task.max_retries,
        task.timeline.len()
    );
    println!("counts: {:?}", task_counts([&task]));
}
