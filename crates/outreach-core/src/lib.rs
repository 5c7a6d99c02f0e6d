//! outreach-core
//!
//! Call lifecycle orchestration for automated patient-outreach calls: start
//! an outbound call through a voice provider, track it to a terminal state
//! across racing webhook and polling feeds, reconcile asynchronously
//! produced artifacts, classify the outcome, and drive each task's
//! retry/escalation state machine.
//!
//! # Module layout
//! - **domain**: ids, tasks, call attempts, timeline records, the outcome
//!   classifier, error types
//! - **ports**: injected seams (voice provider, stores, clock)
//! - **tracker**: idempotent, monotonic application of call updates
//! - **reconcile**: bounded artifact re-fetch loop
//! - **engine**: retry/escalation decision + application
//! - **abuse** / **fallback**: transcript abuse detection, escalation
//!   target resolution
//! - **orchestrator**: the top-level coordinator tying it all together
//! - **impls**: in-memory adapters and a scriptable provider simulation
//! - **observability**: status count views

pub mod abuse;
pub mod domain;
pub mod engine;
pub mod fallback;
pub mod impls;
pub mod observability;
pub mod orchestrator;
pub mod ports;
pub mod reconcile;
pub mod tracker;

pub use engine::{TaskTransition, TransitionKind};
pub use orchestrator::{CallOrchestrator, OrchestratorConfig, PatientContext, WebhookEvent};
pub use reconcile::ReconcilePolicy;
