pub mod ai;
#[cfg(feature = "app")]
mod cli;
pub mod clock;
pub mod commands;
pub mod events;
pub mod filters;
pub mod format;
pub mod logging;
pub mod models;
pub mod persist;
pub mod repository;
pub mod stats;
pub mod storage;
pub mod ticker;
pub mod transfer;

#[cfg(feature = "app")]
pub use crate::cli::{run, Cli};
pub use crate::clock::Clock;
pub use crate::events::{StateChange, SubscriptionId};
pub use crate::filters::FilterCriteria;
pub use crate::models::{
    AppState, Category, Comment, NewCategory, NewTag, NewTask, Tag, Task, TaskPatch, TaskPriority,
    TaskStatus,
};
pub use crate::persist::{open_repository, STORAGE_KEY};
pub use crate::repository::TaskRepository;
pub use crate::stats::TaskStats;
pub use crate::storage::{KeyValueStore, MemoryStore, Storage, StorageError};
