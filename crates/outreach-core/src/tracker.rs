//! Call state tracker: idempotent, monotonic application of provider updates.
//!
//! A call's status is fed from two independent sources — polling reads and
//! webhook pushes — which race and duplicate. The tracker is where those
//! feeds converge: transitions only ever move forward through
//! Queued -> Ringing -> InProgress -> Ended, regressions are logged and
//! ignored, repeats are no-ops, and `Ended` is absorbing. Transcript merges
//! are append-only and deduplicated so overlapping message sets from the two
//! sources don't double turns.

use tracing::{debug, warn};

use crate::domain::{CallAttempt, CallStatus, TranscriptTurn};
use crate::ports::CallSnapshot;

/// Apply a status update. Returns whether the update was applied.
///
/// Out-of-order updates (a webhook `ringing` arriving after a poll already
/// saw `in-progress`) are discarded, preserving monotonicity.
pub fn apply_status(call: &mut CallAttempt, status: CallStatus) -> bool {
    if status.rank() < call.status.rank() {
        warn!(
            call_id = %call.id,
            current = ?call.status,
            incoming = ?status,
            "ignoring out-of-order status update"
        );
        return false;
    }
    if status == call.status {
        return false;
    }
    debug!(call_id = %call.id, from = ?call.status, to = ?status, "call status transition");
    call.status = status;
    true
}

/// Append transcript turns, deduplicating against what is already recorded.
///
/// Identity is (ordinal, speaker, text): when polling and webhooks deliver
/// overlapping windows of the same conversation, a turn already present at
/// the same position is skipped rather than re-appended.
pub fn merge_turns(call: &mut CallAttempt, incoming: &[TranscriptTurn]) {
    for (ordinal, turn) in incoming.iter().enumerate() {
        let duplicate = call
            .messages
            .get(ordinal)
            .is_some_and(|existing| existing.speaker == turn.speaker && existing.text == turn.text);
        if duplicate {
            continue;
        }
        // Past the recorded prefix (or a genuinely different turn at this
        // position, which we keep both of): append.
        if ordinal >= call.messages.len() {
            call.messages.push(turn.clone());
        } else if !call
            .messages
            .iter()
            .any(|existing| existing.speaker == turn.speaker && existing.text == turn.text)
        {
            call.messages.push(turn.clone());
        }
    }
}

/// Append a single delta turn (webhook path). Duplicates of the last
/// recorded turn are dropped.
pub fn append_turn(call: &mut CallAttempt, turn: TranscriptTurn) {
    let duplicate = call
        .messages
        .last()
        .is_some_and(|last| last.speaker == turn.speaker && last.text == turn.text);
    if !duplicate {
        call.messages.push(turn);
    }
}

/// Merge a full provider snapshot into the local record.
///
/// Status goes through `apply_status`; artifact fields fill in but never
/// clear; `ended_reason` is first-write-wins (the reason reported at the
/// moment the call ended is authoritative).
pub fn merge_snapshot(call: &mut CallAttempt, snapshot: &CallSnapshot) {
    apply_status(call, snapshot.status);

    if call.ended_reason.is_none() {
        call.ended_reason = snapshot.ended_reason.clone();
    }

    merge_turns(call, &snapshot.messages);

    if call.recording_url.is_none() {
        call.recording_url = snapshot.recording_url.clone();
    }
    if call.transcript.is_none() {
        call.transcript = snapshot.transcript.clone();
    }
    if call.analysis.is_none() {
        call.analysis = snapshot.analysis.clone();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{AgentId, CallAnalysis, CallId, Speaker};

    fn call() -> CallAttempt {
        CallAttempt::new(CallId::new("c1"), None, AgentId::generate(), Utc::now())
    }

    fn turn(speaker: Speaker, text: &str) -> TranscriptTurn {
        TranscriptTurn {
            speaker,
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn status_moves_forward_only() {
        let mut c = call();

        assert!(apply_status(&mut c, CallStatus::Ringing));
        assert!(apply_status(&mut c, CallStatus::InProgress));

        // Regression: ignored, not applied.
        assert!(!apply_status(&mut c, CallStatus::Ringing));
        assert_eq!(c.status, CallStatus::InProgress);

        // Repeat: no-op.
        assert!(!apply_status(&mut c, CallStatus::InProgress));
    }

    #[test]
    fn ended_is_absorbing() {
        let mut c = call();
        assert!(apply_status(&mut c, CallStatus::Ended));

        for status in [CallStatus::Queued, CallStatus::Ringing, CallStatus::InProgress] {
            assert!(!apply_status(&mut c, status));
            assert_eq!(c.status, CallStatus::Ended);
        }
    }

    #[test]
    fn skipping_intermediate_states_is_allowed() {
        // A delayed webhook feed may never show `ringing` at all.
        let mut c = call();
        assert!(apply_status(&mut c, CallStatus::Ended));
    }

    #[test]
    fn overlapping_turn_sets_do_not_duplicate() {
        let mut c = call();
        let a = turn(Speaker::Agent, "Hello, this is the clinic.");
        let b = turn(Speaker::Patient, "Hi.");
        let d = turn(Speaker::Agent, "Calling to confirm Thursday.");

        merge_turns(&mut c, &[a.clone(), b.clone()]);
        assert_eq!(c.messages.len(), 2);

        // Poll delivers the full set again, plus one new turn.
        merge_turns(&mut c, &[a, b, d]);
        assert_eq!(c.messages.len(), 3);
        assert_eq!(c.messages[2].text, "Calling to confirm Thursday.");
    }

    #[test]
    fn delta_append_drops_exact_repeat_of_last_turn() {
        let mut c = call();
        let t = turn(Speaker::Patient, "Yes, that works.");
        append_turn(&mut c, t.clone());
        append_turn(&mut c, t);
        assert_eq!(c.messages.len(), 1);
    }

    #[test]
    fn snapshot_merge_fills_artifacts_without_clearing() {
        let mut c = call();

        let with_artifacts = CallSnapshot {
            id: c.id.clone(),
            status: CallStatus::Ended,
            ended_reason: Some("assistant-ended-call".to_string()),
            messages: Vec::new(),
            recording_url: Some("https://rec/c1.wav".to_string()),
            transcript: Some("full text".to_string()),
            analysis: Some(CallAnalysis {
                summary: Some("confirmed".to_string()),
                structured_data: serde_json::Value::Null,
            }),
        };
        merge_snapshot(&mut c, &with_artifacts);
        assert!(c.artifacts_complete());

        // A later, sparser snapshot must not erase anything.
        let sparse = CallSnapshot {
            id: c.id.clone(),
            status: CallStatus::Ended,
            ended_reason: None,
            messages: Vec::new(),
            recording_url: None,
            transcript: None,
            analysis: None,
        };
        merge_snapshot(&mut c, &sparse);
        assert!(c.artifacts_complete());
        assert_eq!(c.ended_reason.as_deref(), Some("assistant-ended-call"));
    }

    #[test]
    fn ended_reason_is_first_write_wins() {
        let mut c = call();
        c.ended_reason = Some("customer-ended-call".to_string());

        let snapshot = CallSnapshot {
            id: c.id.clone(),
            status: CallStatus::Ended,
            ended_reason: Some("assistant-ended-call".to_string()),
            messages: Vec::new(),
            recording_url: None,
            transcript: None,
            analysis: None,
        };
        merge_snapshot(&mut c, &snapshot);
        assert_eq!(c.ended_reason.as_deref(), Some("customer-ended-call"));
    }
}
