use serde::Serialize;

use crate::models::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    #[serde(rename = "in-progress")]
    pub in_progress: usize,
    pub completed: usize,
    #[serde(rename = "on-hold")]
    pub on_hold: usize,
}

impl StatusCounts {
    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
            TaskStatus::OnHold => self.on_hold,
        }
    }

    fn bump(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::OnHold => self.on_hold += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub urgent: usize,
}

impl PriorityCounts {
    pub fn get(&self, priority: TaskPriority) -> usize {
        match priority {
            TaskPriority::Low => self.low,
            TaskPriority::Medium => self.medium,
            TaskPriority::High => self.high,
            TaskPriority::Urgent => self.urgent,
        }
    }

    fn bump(&mut self, priority: TaskPriority) {
        match priority {
            TaskPriority::Low => self.low += 1,
            TaskPriority::Medium => self.medium += 1,
            TaskPriority::High => self.high += 1,
            TaskPriority::Urgent => self.urgent += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub by_status: StatusCounts,
    pub by_priority: PriorityCounts,
    pub completed_percentage: u32,
}

impl TaskStats {
    pub fn compute(tasks: &[Task]) -> Self {
        let mut stats = TaskStats {
            total: tasks.len(),
            ..TaskStats::default()
        };
        for task in tasks {
            stats.by_status.bump(task.status);
            stats.by_priority.bump(task.priority);
        }
        if stats.total > 0 {
            let ratio = stats.by_status.completed as f64 / stats.total as f64;
            stats.completed_percentage = (ratio * 100.0).round() as u32;
        }
        stats
    }
}
