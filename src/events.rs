use crate::models::AppState;

/// What a repository mutation did. Delivered to every subscriber together with
/// a snapshot of the state after the change.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateChange {
    TaskAdded { task_id: String },
    TaskUpdated { task_id: String },
    TaskDeleted { task_id: String },
    CommentAdded { task_id: String, comment_id: String },
    CommentDeleted { task_id: String, comment_id: String },
    CategoryAdded { category_id: String },
    CategoryDeleted { category_id: String },
    TagAdded { tag_id: String },
    TagDeleted { tag_id: String },
    Imported,
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

pub type Listener = std::sync::Arc<dyn Fn(&StateChange, &AppState) + Send + Sync>;

