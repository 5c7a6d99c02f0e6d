//! Agent directory entries: voice agents and human staff.

use serde::{Deserialize, Serialize};

use super::ids::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// An AI voice agent that places calls.
    Voice,
    /// A human staff member; the only valid escalation target.
    Staff,
}

/// One entry in the agent directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: AgentId,
    pub name: String,
    pub kind: AgentKind,
    pub active: bool,

    /// Whether this agent has outbound calling configured (provider
    /// credentials + caller number). Checked before every call start.
    pub phone_capable: bool,

    /// Preferred human to receive escalations from this agent.
    pub fallback_staff_id: Option<AgentId>,

    /// Ordered backups consulted when the primary fallback is unusable.
    pub backup_staff_ids: Vec<AgentId>,

    /// Per-agent override of the task retry budget.
    pub max_retries_override: Option<u32>,
}

impl AgentProfile {
    pub fn is_active_staff(&self) -> bool {
        self.active && self.kind == AgentKind::Staff
    }
}
