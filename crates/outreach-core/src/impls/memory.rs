//! In-memory store implementations (development and tests).
//!
//! `tokio::sync::Mutex` over hash maps; every method locks, copies, and
//! releases. A deployment replaces these with database-backed adapters —
//! nothing in the core depends on more than these point operations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{AgentId, AgentProfile, CallAttempt, CallId, Task, TaskId};
use crate::ports::{AgentDirectory, CallStore, StoreError, TaskStore};

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<Mutex<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().await.get(&id).cloned())
    }

    async fn insert(&self, task: Task) -> Result<(), StoreError> {
        self.tasks.lock().await.insert(task.id, task);
        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        if !tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound(task.id.to_string()));
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCallStore {
    calls: Arc<Mutex<HashMap<CallId, CallAttempt>>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallStore for InMemoryCallStore {
    async fn find(&self, id: &CallId) -> Result<Option<CallAttempt>, StoreError> {
        Ok(self.calls.lock().await.get(id).cloned())
    }

    async fn insert(&self, call: CallAttempt) -> Result<(), StoreError> {
        self.calls.lock().await.insert(call.id.clone(), call);
        Ok(())
    }

    async fn update(&self, call: &CallAttempt) -> Result<(), StoreError> {
        let mut calls = self.calls.lock().await;
        if !calls.contains_key(&call.id) {
            return Err(StoreError::NotFound(call.id.to_string()));
        }
        calls.insert(call.id.clone(), call.clone());
        Ok(())
    }
}

/// Immutable agent directory built at construction.
pub struct InMemoryDirectory {
    agents: HashMap<AgentId, AgentProfile>,
}

impl InMemoryDirectory {
    pub fn new(agents: Vec<AgentProfile>) -> Self {
        Self {
            agents: agents.into_iter().map(|a| (a.id, a)).collect(),
        }
    }
}

impl AgentDirectory for InMemoryDirectory {
    fn get(&self, id: AgentId) -> Option<AgentProfile> {
        self.agents.get(&id).cloned()
    }

    fn staff_agents(&self) -> Vec<AgentProfile> {
        let mut staff: Vec<AgentProfile> = self
            .agents
            .values()
            .filter(|a| a.kind == crate::domain::AgentKind::Staff)
            .cloned()
            .collect();
        // Stable order: fallback selection must be deterministic.
        staff.sort_by_key(|a| a.id);
        staff
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn task_store_round_trips() {
        let store = InMemoryTaskStore::new();
        let task = Task::new(TaskId::generate(), AgentId::generate(), 5, Utc::now());
        let id = task.id;

        store.insert(task.clone()).await.unwrap();
        let found = store.find(id).await.unwrap().unwrap();
        assert_eq!(found.id, id);

        let mut updated = found;
        updated.retry_count = 3;
        store.update(&updated).await.unwrap();
        assert_eq!(store.find(id).await.unwrap().unwrap().retry_count, 3);
    }

    #[tokio::test]
    async fn updating_missing_rows_is_an_error() {
        let store = InMemoryTaskStore::new();
        let task = Task::new(TaskId::generate(), AgentId::generate(), 5, Utc::now());
        assert!(matches!(
            store.update(&task).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
