use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskPriority, TaskStatus};

/// Filter criteria for the task list. Every non-empty criterion must match
/// (AND); inside a criterion any member matches (OR).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub statuses: Vec<TaskStatus>,
    #[serde(default)]
    pub priorities: Vec<TaskPriority>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

impl FilterCriteria {
    pub fn has_active_filters(&self) -> bool {
        !self.search.is_empty()
            || !self.statuses.is_empty()
            || !self.priorities.is_empty()
            || !self.category_ids.is_empty()
            || !self.tag_ids.is_empty()
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn toggle_status(&mut self, status: TaskStatus) {
        toggle(&mut self.statuses, status);
    }

    pub fn toggle_priority(&mut self, priority: TaskPriority) {
        toggle(&mut self.priorities, priority);
    }

    pub fn toggle_category(&mut self, category_id: &str) {
        toggle(&mut self.category_ids, category_id.to_string());
    }

    pub fn toggle_tag(&mut self, tag_id: &str) {
        toggle(&mut self.tag_ids, tag_id.to_string());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn matches(&self, task: &Task) -> bool {
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if !self.category_ids.is_empty() {
            match &task.category_id {
                Some(id) if self.category_ids.contains(id) => {}
                _ => return false,
            }
        }
        if !self.tag_ids.is_empty() && !task.tag_ids.iter().any(|id| self.tag_ids.contains(id)) {
            return false;
        }
        true
    }

    /// Keeps the input order.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        tasks.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}

fn toggle<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if let Some(index) = items.iter().position(|existing| *existing == item) {
        items.remove(index);
    } else {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_task(
        id: &str,
        status: TaskStatus,
        priority: TaskPriority,
        category: Option<&str>,
        tags: &[&str],
    ) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            description: None,
            status,
            priority,
            category_id: category.map(str::to_string),
            tag_ids: tags.iter().map(|t| t.to_string()).collect(),
            due_date: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            comments: Vec::new(),
            order: 0,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            make_task("1", TaskStatus::Pending, TaskPriority::Low, Some("A"), &["x"]),
            make_task("2", TaskStatus::Completed, TaskPriority::High, Some("B"), &[]),
        ]
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn empty_criteria_returns_everything_in_order() {
        let tasks = sample();
        let criteria = FilterCriteria::default();
        assert!(!criteria.has_active_filters());
        assert_eq!(ids(&criteria.apply(&tasks)), vec!["1", "2"]);
    }

    #[test]
    fn status_filter_selects_members() {
        let mut criteria = FilterCriteria::default();
        criteria.toggle_status(TaskStatus::Completed);
        assert!(criteria.has_active_filters());
        assert_eq!(ids(&criteria.apply(&sample())), vec!["2"]);
    }

    #[test]
    fn tag_filter_is_any_of() {
        let mut criteria = FilterCriteria::default();
        criteria.toggle_tag("x");
        assert_eq!(ids(&criteria.apply(&sample())), vec!["1"]);
        criteria.toggle_tag("y");
        assert_eq!(ids(&criteria.apply(&sample())), vec!["1"]);
    }

    #[test]
    fn category_filter_excludes_uncategorized() {
        let mut tasks = sample();
        tasks.push(make_task("3", TaskStatus::Pending, TaskPriority::Low, None, &[]));
        let mut criteria = FilterCriteria::default();
        criteria.toggle_category("A");
        criteria.toggle_category("B");
        assert_eq!(ids(&criteria.apply(&tasks)), vec!["1", "2"]);
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let mut tasks = sample();
        tasks[1].description = Some("Quarterly REPORT draft".to_string());
        let mut criteria = FilterCriteria::default();
        criteria.set_search("report");
        assert_eq!(ids(&criteria.apply(&tasks)), vec!["2"]);
        criteria.set_search("TASK-1");
        assert_eq!(ids(&criteria.apply(&tasks)), vec!["1"]);
    }

    #[test]
    fn criteria_are_anded() {
        let mut criteria = FilterCriteria::default();
        criteria.toggle_status(TaskStatus::Pending);
        criteria.toggle_priority(TaskPriority::High);
        assert!(criteria.apply(&sample()).is_empty());
    }

    #[test]
    fn toggling_twice_removes_and_clear_resets() {
        let mut criteria = FilterCriteria::default();
        criteria.toggle_priority(TaskPriority::Low);
        criteria.toggle_priority(TaskPriority::Low);
        assert!(criteria.priorities.is_empty());
        criteria.set_search("x");
        criteria.toggle_tag("t");
        criteria.clear();
        assert_eq!(criteria, FilterCriteria::default());
    }
}
