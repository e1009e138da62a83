use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Timestamp = DateTime<Utc>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    OnHold,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::OnHold => "on-hold",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::OnHold => "On Hold",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" | "progress" | "started" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "on-hold" | "hold" => Ok(TaskStatus::OnHold),
            other => Err(format!("unknown status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "urgent" => Ok(TaskPriority::Urgent),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Weak references to [`Tag`] ids. Stored under `tags` in the JSON document.
    #[serde(rename = "tags", default)]
    pub tag_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub order: usize,
}

impl Task {
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_ids.iter().any(|id| id == tag_id)
    }
}

/// Caller-supplied fields for a new task. The repository fills in id,
/// creation time, comments and order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update merged shallowly over an existing task.
///
/// `Some(None)` on a clearable field removes the value; `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub category_id: Option<Option<String>>,
    pub tag_ids: Option<Vec<String>>,
    pub due_date: Option<Option<String>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn priority(priority: TaskPriority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTag {
    pub name: String,
    pub color: String,
}

/// The whole persisted aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default = "Utc::now")]
    pub last_updated: Timestamp,
}

impl AppState {
    pub fn empty(now: Timestamp) -> Self {
        Self {
            tasks: Vec::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            last_updated: now,
        }
    }

    pub fn category_name(&self, id: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    pub fn tag_names(&self, task: &Task) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|tag| task.has_tag(&tag.id))
            .map(|tag| tag.name.as_str())
            .collect()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::empty(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Id,
}

impl Language {
    /// Picks Indonesian when the OS locale is `id`/`in`, English otherwise.
    pub fn detect() -> Self {
        sys_locale::get_locale()
            .map(|locale| Self::from_locale(&locale))
            .unwrap_or_default()
    }

    pub fn from_locale(locale: &str) -> Self {
        let lang = locale
            .split(['-', '_', '.'])
            .next()
            .unwrap_or("")
            .to_lowercase();
        match lang.as_str() {
            "id" | "in" => Language::Id,
            _ => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::En => "en",
            Language::Id => "id",
        })
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "id" => Ok(Language::Id),
            other => Err(format!("unsupported language `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GeminiModel {
    #[default]
    #[serde(rename = "gemini-2.0-flash")]
    Flash20,
    #[serde(rename = "gemini-2.5-flash")]
    Flash25,
    #[serde(rename = "gemini-2.5-pro")]
    Pro25,
    #[serde(rename = "gemini-3-flash-preview")]
    Flash3Preview,
    #[serde(rename = "gemini-3-pro-preview")]
    Pro3Preview,
}

impl GeminiModel {
    pub const ALL: [GeminiModel; 5] = [
        GeminiModel::Flash20,
        GeminiModel::Flash25,
        GeminiModel::Pro25,
        GeminiModel::Flash3Preview,
        GeminiModel::Pro3Preview,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            GeminiModel::Flash20 => "gemini-2.0-flash",
            GeminiModel::Flash25 => "gemini-2.5-flash",
            GeminiModel::Pro25 => "gemini-2.5-pro",
            GeminiModel::Flash3Preview => "gemini-3-flash-preview",
            GeminiModel::Pro3Preview => "gemini-3-pro-preview",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GeminiModel::Flash20 => "Gemini 2.0 Flash",
            GeminiModel::Flash25 => "Gemini 2.5 Flash",
            GeminiModel::Pro25 => "Gemini 2.5 Pro",
            GeminiModel::Flash3Preview => "Gemini 3 Flash",
            GeminiModel::Pro3Preview => "Gemini 3 Pro",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GeminiModel::Flash20 => "Cost efficient (Recommended)",
            GeminiModel::Flash25 => "Speed optimized",
            GeminiModel::Pro25 => "Complex reasoning",
            GeminiModel::Flash3Preview => "Fast + powerful",
            GeminiModel::Pro3Preview => "Most intelligent",
        }
    }
}

impl FromStr for GeminiModel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        GeminiModel::ALL
            .into_iter()
            .find(|model| model.id() == value)
            .ok_or_else(|| format!("unknown model `{value}`"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub gemini_model: GeminiModel,
    #[serde(default = "Language::detect")]
    pub language: Language,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

impl Settings {
    /// `GEMINI_API_KEY` wins over the stored key; blank values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        let non_blank = |key: String| {
            let key = key.trim().to_string();
            (!key.is_empty()).then_some(key)
        };
        std::env::var("GEMINI_API_KEY")
            .ok()
            .and_then(non_blank)
            .or_else(|| self.gemini_api_key.clone().and_then(non_blank))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: GeminiModel::default(),
            language: Language::detect(),
            tick_seconds: default_tick_seconds(),
        }
    }
}

fn default_tick_seconds() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_priority_use_kebab_case_on_the_wire() {
        let value = serde_json::to_value(TaskStatus::InProgress).unwrap();
        assert_eq!(value, serde_json::json!("in-progress"));
        let value = serde_json::to_value(TaskStatus::OnHold).unwrap();
        assert_eq!(value, serde_json::json!("on-hold"));
        let back: TaskPriority = serde_json::from_value(serde_json::json!("urgent")).unwrap();
        assert_eq!(back, TaskPriority::Urgent);
    }

    #[test]
    fn status_parses_cli_aliases() {
        assert_eq!("in_progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("Done".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
        assert_eq!("hold".parse::<TaskStatus>(), Ok(TaskStatus::OnHold));
        assert!("later".parse::<TaskStatus>().is_err());
        assert!("critical".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn task_deserializes_browser_document_shape() {
        let json = r#"
        {
          "id": "1700000000000-abc123xyz",
          "title": "Write report",
          "status": "in-progress",
          "priority": "high",
          "categoryId": "cat-1",
          "tags": ["t1", "t2"],
          "createdAt": "2024-01-01T10:00:00.000Z",
          "startedAt": "2024-01-01T11:00:00.000Z",
          "comments": [
            { "id": "c1", "text": "halfway", "createdAt": "2024-01-01T12:00:00.000Z" }
          ],
          "order": 3
        }
        "#;

        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.category_id.as_deref(), Some("cat-1"));
        assert_eq!(task.tag_ids, vec!["t1", "t2"]);
        assert!(task.started_at.is_some());
        assert_eq!(task.completed_at, None);
        assert_eq!(task.comments.len(), 1);
        assert_eq!(task.order, 3);
        assert!(task.has_tag("t2"));
    }

    #[test]
    fn task_serialization_omits_absent_optionals() {
        let task = Task {
            id: "a".to_string(),
            title: "t".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Low,
            category_id: None,
            tag_ids: Vec::new(),
            due_date: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            comments: Vec::new(),
            order: 0,
        };
        let value = serde_json::to_value(&task).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("startedAt"));
        assert!(!obj.contains_key("categoryId"));
        assert!(obj.contains_key("tags"));
        assert!(obj.contains_key("createdAt"));
    }

    #[test]
    fn app_state_fills_missing_collections() {
        let state: AppState = serde_json::from_str("{}").expect("empty object is an empty state");
        assert!(state.tasks.is_empty());
        assert!(state.categories.is_empty());
        assert!(state.tags.is_empty());
    }

    #[test]
    fn task_patch_constructors() {
        assert!(TaskPatch::default().is_empty());
        let patch = TaskPatch::status(TaskStatus::Completed);
        assert_eq!(patch.status, Some(TaskStatus::Completed));
        assert!(!patch.is_empty());
        assert_eq!(
            TaskPatch::priority(TaskPriority::High).priority,
            Some(TaskPriority::High)
        );
    }

    #[test]
    fn language_from_locale() {
        assert_eq!(Language::from_locale("id-ID"), Language::Id);
        assert_eq!(Language::from_locale("in_ID.UTF-8"), Language::Id);
        assert_eq!(Language::from_locale("en-US"), Language::En);
        assert_eq!(Language::from_locale("fr"), Language::En);
    }

    #[test]
    fn gemini_model_ids_round_trip_through_from_str() {
        for model in GeminiModel::ALL {
            assert_eq!(model.id().parse::<GeminiModel>(), Ok(model));
            let value = serde_json::to_value(model).unwrap();
            assert_eq!(value, serde_json::json!(model.id()));
        }
        assert!("gpt-4".parse::<GeminiModel>().is_err());
        assert_eq!(GeminiModel::default().id(), "gemini-2.0-flash");
    }

    #[test]
    fn settings_serde_applies_defaults_for_missing_optional_fields() {
        let settings: Settings =
            serde_json::from_str(r#"{ "language": "id" }"#).expect("settings should deserialize");
        assert_eq!(settings.language, Language::Id);
        assert_eq!(settings.gemini_api_key, None);
        assert_eq!(settings.gemini_model, GeminiModel::Flash20);
        assert_eq!(settings.tick_seconds, 1);
    }
}
