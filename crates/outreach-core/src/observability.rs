//! Status views for dashboards and operator tooling.

use serde::{Deserialize, Serialize};

use crate::domain::{Task, TaskStatus};

/// Task counts by status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub scheduled: usize,
    pub escalated: usize,
    pub completed: usize,
}

pub fn task_counts<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> TaskCounts {
    let mut counts = TaskCounts::default();
    for task in tasks {
        match task.status {
            TaskStatus::Pending => counts.pending += 1,
            TaskStatus::InProgress => counts.in_progress += 1,
            TaskStatus::Scheduled => counts.scheduled += 1,
            TaskStatus::Escalated => counts.escalated += 1,
            TaskStatus::Completed => counts.completed += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{AgentId, TaskId};

    #[test]
    fn counts_group_by_status() {
        let now = Utc::now();
        let agent = AgentId::generate();
        let mut a = Task::new(TaskId::generate(), agent, 5, now);
        let b = Task::new(TaskId::generate(), agent, 5, now);
        a.complete(now);

        let counts = task_counts([&a, &b]);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.escalated, 0);
    }
}
