//! Fallback resolver: which human receives an escalated task.
//!
//! Deterministic priority chain, each step falling through on failure:
//! 1. the agent's configured primary fallback, if it resolves to an active
//!    staff member;
//! 2. the first usable entry in the agent's ordered backup list;
//! 3. the first active staff agent in the directory (stable sort order);
//! 4. a hardcoded last-resort identity.
//!
//! Step 4 means this function never fails: escalation is the safety valve of
//! the whole system and must not itself be blockable by bad configuration.

use ulid::Ulid;

use crate::domain::{AgentId, AgentProfile};
use crate::ports::AgentDirectory;

/// Last-resort escalation target (the practice's on-call inbox identity).
/// Fixed ULID so the id is stable across processes.
const LAST_RESORT_STAFF: Ulid = Ulid::from_parts(0, 1);

pub fn last_resort_staff_id() -> AgentId {
    AgentId::from_ulid(LAST_RESORT_STAFF)
}

/// Resolve the staff member an escalation from `agent` should go to.
pub fn resolve(agent: &AgentProfile, directory: &dyn AgentDirectory) -> AgentId {
    // 1. Configured primary fallback.
    if let Some(primary) = agent.fallback_staff_id
        && let Some(profile) = directory.get(primary)
        && profile.is_active_staff()
    {
        return profile.id;
    }

    // 2. Ordered backup list.
    for &backup in &agent.backup_staff_ids {
        if let Some(profile) = directory.get(backup)
            && profile.is_active_staff()
        {
            return profile.id;
        }
    }

    // 3. Any active staff agent; staff_agents() is sorted by id, so this is
    // deterministic.
    if let Some(profile) = directory
        .staff_agents()
        .into_iter()
        .find(|p| p.is_active_staff())
    {
        return profile.id;
    }

    // 4. Never fail.
    last_resort_staff_id()
}
