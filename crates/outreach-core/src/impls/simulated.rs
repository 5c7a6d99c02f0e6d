//! Scriptable provider simulation for tests and the demo CLI.
//!
//! Behaves like the real provider's asynchronous surface: calls progress
//! through statuses only when the test script advances them, artifacts can
//! be withheld for a configured number of fetches, and call starts can be
//! made to fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{CallAnalysis, CallId, CallStatus, TranscriptTurn};
use crate::ports::{CallConfig, CallSnapshot, ProviderError, StartedCall, VoiceProvider};

struct ScriptedCall {
    snapshot: CallSnapshot,
    /// Artifacts stay hidden for this many further `get_call`s.
    artifact_fetches_remaining: u32,
    pending_recording: Option<String>,
    pending_analysis: Option<CallAnalysis>,
}

#[derive(Default)]
pub struct SimulatedProvider {
    calls: Mutex<HashMap<CallId, ScriptedCall>>,
    next_id: AtomicU64,
    /// When set, every `start_call` is rejected with this message.
    reject_start: Option<String>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            reject_start: Some(message.into()),
            ..Self::default()
        }
    }

    /// Script the terminal state of a call: status `Ended` with the given
    /// reason and transcript. Artifacts become visible after
    /// `artifact_delay_fetches` further polls.
    pub async fn finish_call(
        &self,
        id: &CallId,
        ended_reason: &str,
        turns: Vec<TranscriptTurn>,
        artifact_delay_fetches: u32,
    ) {
        let mut calls = self.calls.lock().await;
        if let Some(call) = calls.get_mut(id) {
            call.snapshot.status = CallStatus::Ended;
            call.snapshot.ended_reason = Some(ended_reason.to_string());
            call.snapshot.messages = turns;
            call.artifact_fetches_remaining = artifact_delay_fetches;
            call.pending_recording = Some(format!("https://recordings.local/{id}.wav"));
            call.pending_analysis = Some(CallAnalysis {
                summary: Some(format!("Call ended: {ended_reason}")),
                structured_data: serde_json::json!({ "ended_reason": ended_reason }),
            });
        }
    }

    /// Script a call whose artifacts never arrive.
    pub async fn finish_call_without_artifacts(
        &self,
        id: &CallId,
        ended_reason: &str,
        turns: Vec<TranscriptTurn>,
    ) {
        self.finish_call(id, ended_reason, turns, u32::MAX).await;
    }

    pub async fn set_status(&self, id: &CallId, status: CallStatus) {
        let mut calls = self.calls.lock().await;
        if let Some(call) = calls.get_mut(id) {
            call.snapshot.status = status;
        }
    }
}

#[async_trait]
impl VoiceProvider for SimulatedProvider {
    async fn start_call(&self, _config: CallConfig) -> Result<StartedCall, ProviderError> {
        if let Some(message) = &self.reject_start {
            return Err(ProviderError::Rejected(message.clone()));
        }

        let id = CallId::new(format!(
            "sim-call-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1
        ));
        let snapshot = CallSnapshot {
            id: id.clone(),
            status: CallStatus::Queued,
            ended_reason: None,
            messages: Vec::new(),
            recording_url: None,
            transcript: None,
            analysis: None,
        };
        self.calls.lock().await.insert(
            id.clone(),
            ScriptedCall {
                snapshot,
                artifact_fetches_remaining: 0,
                pending_recording: None,
                pending_analysis: None,
            },
        );

        Ok(StartedCall {
            id,
            status: CallStatus::Queued,
        })
    }

    async fn get_call(&self, id: &CallId) -> Result<CallSnapshot, ProviderError> {
        let mut calls = self.calls.lock().await;
        let call = calls
            .get_mut(id)
            .ok_or_else(|| ProviderError::UnknownCall(id.clone()))?;

        if call.snapshot.status == CallStatus::Ended {
            if call.artifact_fetches_remaining == 0 {
                if let Some(url) = call.pending_recording.take() {
                    call.snapshot.recording_url = Some(url);
                }
                if let Some(analysis) = call.pending_analysis.take() {
                    call.snapshot.analysis = Some(analysis);
                }
            } else if call.artifact_fetches_remaining != u32::MAX {
                call.artifact_fetches_remaining -= 1;
            }
        }

        Ok(call.snapshot.clone())
    }

    async fn end_call(&self, id: &CallId) -> Result<bool, ProviderError> {
        let mut calls = self.calls.lock().await;
        match calls.get_mut(id) {
            Some(call) => {
                call.snapshot.status = CallStatus::Ended;
                Ok(true)
            }
            None => Err(ProviderError::UnknownCall(id.clone())),
        }
    }
}
