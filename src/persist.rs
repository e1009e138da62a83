//! Save-on-change persistence for the repository.
//!
//! Failures here are logged and swallowed: the in-memory state stays
//! authoritative and nothing is rolled back or retried.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock::Clock;
use crate::events::SubscriptionId;
use crate::models::AppState;
use crate::repository::TaskRepository;
use crate::storage::{KeyValueStore, StorageError};

pub const STORAGE_KEY: &str = "startower-flow-data";

/// Absent or empty values yield `default` silently; unreadable or malformed
/// ones log a warning first.
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, default: T) -> T {
    let text = match store.get(key) {
        Ok(Some(text)) if !text.trim().is_empty() => text,
        Ok(_) => return default,
        Err(err) => {
            log::warn!("failed to read storage key `{key}`: {err}");
            return default;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("failed to parse storage key `{key}`: {err}");
            default
        }
    }
}

/// Returns whether the value was written.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|json| store.set(key, &json));
    match result {
        Ok(()) => true,
        Err(err) => {
            log::error!("failed to save storage key `{key}`: {err}");
            false
        }
    }
}

pub fn clear(store: &dyn KeyValueStore, key: &str) {
    if let Err(err) = store.remove(key) {
        log::error!("failed to clear storage key `{key}`: {err}");
    }
}

/// Saves the full state under `key` after every repository change.
pub fn attach_persistence(
    repo: &TaskRepository,
    store: Arc<dyn KeyValueStore>,
    key: &str,
) -> SubscriptionId {
    let key = key.to_string();
    repo.subscribe(move |_change, state| {
        save(store.as_ref(), &key, state);
    })
}

/// Loads the state stored under `key` (or an empty one) and wires save-on-change.
pub fn open_repository(store: Arc<dyn KeyValueStore>, key: &str, clock: Clock) -> TaskRepository {
    let state = load(store.as_ref(), key, AppState::empty(clock.now()));
    log::info!(
        "state loaded key={key} tasks={} categories={} tags={}",
        state.tasks.len(),
        state.categories.len(),
        state.tags.len()
    );
    let repo = TaskRepository::with_clock(state, clock);
    attach_persistence(&repo, store, key);
    repo
}
