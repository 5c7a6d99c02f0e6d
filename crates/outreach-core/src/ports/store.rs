//! Persistence ports: point lookups and updates only.
//!
//! The core never depends on storage query capabilities beyond find/insert/
//! update by id, so these traits stay narrow. In-memory implementations live
//! in `impls::memory`; a real deployment backs them with a database.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AgentId, AgentProfile, CallAttempt, CallId, Task, TaskId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    async fn insert(&self, task: Task) -> Result<(), StoreError>;

    /// Replace the stored row for `task.id`.
    async fn update(&self, task: &Task) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CallStore: Send + Sync {
    async fn find(&self, id: &CallId) -> Result<Option<CallAttempt>, StoreError>;

    async fn insert(&self, call: CallAttempt) -> Result<(), StoreError>;

    async fn update(&self, call: &CallAttempt) -> Result<(), StoreError>;
}

/// Read-only agent directory.
///
/// Synchronous on purpose: the fallback resolver must be able to run as a
/// pure function over it, and every implementation we care about is a lookup
/// table.
pub trait AgentDirectory: Send + Sync {
    fn get(&self, id: AgentId) -> Option<AgentProfile>;

    /// All staff-type agents in a stable order (sorted by id), so fallback
    /// selection is deterministic.
    fn staff_agents(&self) -> Vec<AgentProfile>;
}
