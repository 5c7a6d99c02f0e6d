//! Error types for the orchestration core.

use thiserror::Error;

use super::ids::{AgentId, CallId, TaskId};

/// Errors surfaced by the orchestrator and its ports.
///
/// Provider failures are converted into these variants at the orchestrator
/// boundary; nothing past that boundary (the retry/escalation engine in
/// particular) ever sees a raw provider error.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("call not found: {0}")]
    CallNotFound(CallId),

    /// Completion processing was invoked for a call that has not ended.
    #[error("call {0} has not ended yet")]
    CallNotEnded(CallId),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Configuration error: the agent exists but has no calling capability.
    #[error("agent {0} has no phone calling configured")]
    NotPhoneCapable(AgentId),

    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    /// The provider rejected the call-start request (bad number, quota, ...).
    #[error("could not start call: {0}")]
    CallStartRejected(String),

    /// The provider did not answer the call-start request in time.
    #[error("could not start call: provider timed out")]
    CallStartTimeout,

    /// Transient provider communication failure (outside the poller budget).
    #[error("provider error: {0}")]
    Provider(String),

    #[error("store error: {0}")]
    Store(String),
}
