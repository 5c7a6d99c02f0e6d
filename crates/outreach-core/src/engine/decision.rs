//! Pure decision logic: classified outcome -> next action for the task.
//!
//! `decide` is a pure function over its input; it performs no IO and mutates
//! nothing. Executing the decision (mutating the task, resolving fallback
//! staff, persisting) is `TaskEngine::process` in this module's sibling.

use crate::domain::{Outcome, RetryOutcomeTag};

/// Everything the decision needs. Assembled by the orchestrator after
/// reconciliation, abuse detection and classification have run.
#[derive(Debug, Clone)]
pub struct DecisionInput {
    pub outcome: Outcome,

    /// Coarse tag for retry-history records, pre-mapped from the raw reason.
    pub tag: RetryOutcomeTag,

    pub abusive: bool,
    pub retry_count: u32,
    pub max_retries: u32,
}

/// The next action for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Abuse is a one-shot escalation trigger: no attempt recorded, no
    /// budget consumed, outcome ignored.
    EscalateAbuse,

    /// Mark the task completed.
    Complete,

    /// Record the attempt, then escalate: this attempt exhausted the budget.
    RecordAndEscalate { tag: RetryOutcomeTag },

    /// Record the attempt, then schedule a retry.
    RecordAndSchedule { tag: RetryOutcomeTag },

    /// Non-retryable, non-success: escalate without consuming budget.
    EscalateFatal,
}

pub fn decide(input: &DecisionInput) -> Decision {
    if input.abusive {
        return Decision::EscalateAbuse;
    }

    // Voicemail: classified a success (message delivered) but routed through
    // the retry path until a human confirms receipt. Counts against budget.
    if input.outcome.voicemail {
        return record_with_budget_check(input, RetryOutcomeTag::Voicemail);
    }

    if input.outcome.is_success {
        return Decision::Complete;
    }

    if input.outcome.can_retry {
        return record_with_budget_check(input, input.tag);
    }

    Decision::EscalateFatal
}

/// The attempt is recorded first; the budget check sees the post-increment
/// count. With `max_retries = 2`, the second failed attempt escalates.
fn record_with_budget_check(input: &DecisionInput, tag: RetryOutcomeTag) -> Decision {
    if input.retry_count + 1 >= input.max_retries {
        Decision::RecordAndEscalate { tag }
    } else {
        Decision::RecordAndSchedule { tag }
    }
}
