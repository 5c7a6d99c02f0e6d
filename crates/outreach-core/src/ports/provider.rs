//! Voice provider port.
//!
//! The telephony/speech pipeline is a black box behind this trait: start a
//! call, fetch its current state, end it. The provider runs calls
//! asynchronously and may deliver artifacts (recording, analysis) well after
//! a call has ended; `CallSnapshot` therefore carries every field as
//! optional-or-growing and the tracker merges snapshots monotonically.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CallAnalysis, CallId, CallStatus, TranscriptTurn};

/// Errors at the provider boundary.
///
/// These never cross the orchestrator: they are converted into
/// `OrchestrateError` variants (or absorbed by the reconciliation budget)
/// before any business logic sees them.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the request (invalid number, quota, bad config).
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// Transient communication failure (timeout, 5xx).
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("unknown call id: {0}")]
    UnknownCall(CallId),
}

/// What the provider returns when a call is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedCall {
    pub id: CallId,
    pub status: CallStatus,
}

/// Point-in-time view of a call as reported by the provider.
///
/// `recording_url` and `analysis` may be absent even when `status` is
/// `Ended`; `messages` may lag or overlap with webhook-delivered turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub id: CallId,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub messages: Vec<TranscriptTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<CallAnalysis>,
}

/// Run-time configuration for one outbound call.
///
/// Prompt/template construction happens upstream; by the time it reaches
/// this port it is just strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// E.164 destination number.
    pub to_number: String,
    /// Opening line the agent speaks.
    pub first_message: String,
    /// System prompt for the voice agent.
    pub system_prompt: String,
}

#[async_trait]
pub trait VoiceProvider: Send + Sync {
    async fn start_call(&self, config: CallConfig) -> Result<StartedCall, ProviderError>;

    async fn get_call(&self, id: &CallId) -> Result<CallSnapshot, ProviderError>;

    /// Ask the provider to hang up. Returns whether the provider accepted.
    async fn end_call(&self, id: &CallId) -> Result<bool, ProviderError>;
}
