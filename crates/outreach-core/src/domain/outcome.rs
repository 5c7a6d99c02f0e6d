//! Outcome classifier: provider end reasons -> retry/escalation decision input.
//!
//! The provider reports why a call ended as a free-form vocabulary string.
//! That vocabulary drifts (new reasons appear without notice), so `classify`
//! is total: every string, including ones we have never seen, maps to a
//! defined outcome. Unknown reasons default to a retryable failure rather
//! than erroring, so the pipeline never stalls on vocabulary drift.
//!
//! This module is the only place end reasons are interpreted. Everything
//! downstream works off the derived `Outcome`.

use serde::{Deserialize, Serialize};

use super::timeline::RetryOutcomeTag;

/// Classified interpretation of why a call ended.
///
/// Derived, never persisted. The sole decision input for the retry/escalation
/// engine besides the abuse flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Short operator-facing label.
    pub title: String,

    /// One-sentence operator-facing description.
    pub description: String,

    pub can_retry: bool,
    pub is_success: bool,

    /// Voicemail marker: classified a success (the message was delivered)
    /// but routed through the retry path, because no human has confirmed
    /// receipt yet. See the engine.
    pub voicemail: bool,
}

impl Outcome {
    fn success(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            can_retry: false,
            is_success: true,
            voicemail: false,
        }
    }

    fn retryable(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            can_retry: true,
            is_success: false,
            voicemail: false,
        }
    }
}

/// Classify a provider end reason. Total over arbitrary strings.
pub fn classify(ended_reason: &str) -> Outcome {
    match ended_reason {
        "assistant-ended-call" => Outcome::success(
            "Call completed",
            "The agent completed the call objective and hung up.",
        ),
        "customer-ended-call" => Outcome::success(
            "Call completed",
            "The patient ended the call after the conversation.",
        ),
        "voicemail" => Outcome {
            title: "Voicemail left".to_string(),
            description: "Reached voicemail and left a message.".to_string(),
            can_retry: true,
            is_success: true,
            voicemail: true,
        },
        "customer-did-not-answer" => Outcome::retryable(
            "No answer",
            "The patient did not pick up.",
        ),
        "customer-busy" => Outcome::retryable(
            "Line busy",
            "The patient's line was busy.",
        ),
        "customer-did-not-give-microphone-permission" => Outcome::retryable(
            "No audio",
            "The patient's device did not provide audio.",
        ),
        "phone-call-provider-closed-websocket" => Outcome::retryable(
            "Call dropped",
            "The telephony connection dropped mid-call.",
        ),
        "manually-canceled" => Outcome::retryable(
            "Call canceled",
            "The call was canceled by an operator.",
        ),
        "exceeded-max-duration" => Outcome::retryable(
            "Call too long",
            "The call hit the maximum duration limit.",
        ),
        "silence-timed-out" => Outcome::retryable(
            "Silence timeout",
            "The call was ended after prolonged silence.",
        ),
        // Every pipeline/infrastructure error the provider reports starts
        // with this prefix.
        reason if reason.starts_with("pipeline-error") => Outcome::retryable(
            "Technical error",
            "A provider-side error ended the call.",
        ),
        // Vocabulary drift: unknown reasons are retryable failures, never
        // errors. The fatal (non-retryable, non-success) category is
        // intentionally empty today; any future fatal mapping escalates
        // one-shot in the engine.
        unknown => Outcome::retryable(
            "Call did not complete",
            &format!("The call ended without completing (reason: {unknown})."),
        ),
    }
}

/// Map a raw end reason to the coarse tag recorded in retry history.
pub fn retry_tag(ended_reason: &str) -> RetryOutcomeTag {
    match ended_reason {
        "customer-did-not-answer" => RetryOutcomeTag::NoAnswer,
        "customer-busy" => RetryOutcomeTag::Busy,
        "voicemail" => RetryOutcomeTag::Voicemail,
        "phone-call-provider-closed-websocket" | "manually-canceled" => {
            RetryOutcomeTag::Disconnected
        }
        _ => RetryOutcomeTag::Failed,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("assistant-ended-call")]
    #[case("customer-ended-call")]
    fn success_reasons_are_terminal(#[case] reason: &str) {
        let o = classify(reason);
        assert!(o.is_success);
        assert!(!o.can_retry);
        assert!(!o.voicemail);
    }

    #[test]
    fn voicemail_is_success_but_flagged_for_retry_routing() {
        let o = classify("voicemail");
        assert!(o.is_success);
        assert!(o.voicemail);
        assert!(o.can_retry);
    }

    #[rstest]
    #[case("customer-did-not-answer")]
    #[case("customer-busy")]
    #[case("silence-timed-out")]
    #[case("exceeded-max-duration")]
    #[case("pipeline-error-openai-llm-failed")]
    fn known_failures_are_retryable(#[case] reason: &str) {
        let o = classify(reason);
        assert!(o.can_retry);
        assert!(!o.is_success);
    }

    #[test]
    fn classify_is_total_over_unknown_reasons() {
        // Future vocabulary must not stall the pipeline.
        let o = classify("some-reason-added-by-provider-next-quarter");
        assert!(o.can_retry);
        assert!(!o.is_success);
        assert!(o.description.contains("some-reason-added-by-provider-next-quarter"));
    }

    #[rstest]
    #[case("customer-did-not-answer", RetryOutcomeTag::NoAnswer)]
    #[case("customer-busy", RetryOutcomeTag::Busy)]
    #[case("voicemail", RetryOutcomeTag::Voicemail)]
    #[case("phone-call-provider-closed-websocket", RetryOutcomeTag::Disconnected)]
    #[case("pipeline-error-whatever", RetryOutcomeTag::Failed)]
    #[case("never-seen-before", RetryOutcomeTag::Failed)]
    fn retry_tags_map_raw_reasons(#[case] reason: &str, #[case] expected: RetryOutcomeTag) {
        assert_eq!(retry_tag(reason), expected);
    }
}
