//! Artifact reconciliation poller.
//!
//! The provider can mark a call `ended` while its recording and structured
//! analysis are still being produced. This module closes that gap with a
//! bounded retry loop: re-fetch the call, merge what came back, stop early
//! once both artifacts are present, and give up after the budget — partial
//! data is acceptable and the retry/escalation decision must never be
//! blocked indefinitely on an artifact that may never arrive.
//!
//! The loop sleeps between attempts on its own tokio task path only; it
//! holds no store lock across the sleep, so other calls' webhooks proceed
//! unblocked.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::CallAttempt;
use crate::ports::VoiceProvider;
use crate::tracker;

/// Bounded retry policy for artifact reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcilePolicy {
    /// Maximum provider re-fetches.
    pub max_attempts: u32,

    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            delay: Duration::from_millis(2500),
        }
    }
}

/// Re-fetch `call` from the provider until its artifacts are complete or the
/// budget runs out, merging every snapshot through the tracker.
///
/// Transient provider errors consume an attempt and are retried; they never
/// abort reconciliation. Returns the call in whatever state was reached.
pub async fn reconcile(
    provider: &Arc<dyn VoiceProvider>,
    policy: &ReconcilePolicy,
    mut call: CallAttempt,
) -> CallAttempt {
    if call.artifacts_complete() {
        return call;
    }

    for attempt in 1..=policy.max_attempts {
        match provider.get_call(&call.id).await {
            Ok(snapshot) => {
                tracker::merge_snapshot(&mut call, &snapshot);
                if call.artifacts_complete() {
                    debug!(call_id = %call.id, attempt, "artifacts reconciled");
                    return call;
                }
            }
            Err(err) => {
                warn!(call_id = %call.id, attempt, %err, "reconcile fetch failed");
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    warn!(
        call_id = %call.id,
        has_recording = call.recording_url.is_some(),
        has_analysis = call.analysis.is_some(),
        "reconcile budget exhausted, proceeding with partial data"
    );
    call
}
