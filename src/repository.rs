use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::clock::Clock;
use crate::events::{Listener, StateChange, SubscriptionId};
use crate::filters::FilterCriteria;
use crate::models::{
    AppState, Category, Comment, NewCategory, NewTag, NewTask, Tag, Task, TaskPatch, TaskPriority,
    TaskStatus, Timestamp,
};
use crate::stats::TaskStats;
use crate::ticker::{start_ticker, Ticker};

/// Owns the task/category/tag collections and enforces their invariants:
/// dense `order`, status timestamps, and weak-reference cleanup.
///
/// Cheap to clone; clones share the same state and subscribers. Lookups that
/// miss are silent no-ops, reported only through the `bool`/`Option` return.
#[derive(Clone)]
pub struct TaskRepository {
    inner: Arc<Mutex<RepoData>>,
    listeners: Arc<Mutex<Listeners>>,
    delivery: Arc<Delivery>,
    clock: Clock,
}

struct RepoData {
    state: AppState,
    live_now: Option<watch::Receiver<Timestamp>>,
    /// Bumped under the state lock on every applied mutation.
    revision: u64,
}

/// Hands out notification turns in revision order.
#[derive(Default)]
struct Delivery {
    served: Mutex<u64>,
    turn: Condvar,
}

impl Delivery {
    fn wait_for(&self, revision: u64) -> Turn<'_> {
        let mut served = self.served.lock().expect("delivery poisoned");
        while *served + 1 != revision {
            served = self.turn.wait(served).expect("delivery poisoned");
        }
        Turn {
            delivery: self,
            revision,
        }
    }
}

/// Marks `revision` as delivered when dropped, even if a listener panicked.
struct Turn<'a> {
    delivery: &'a Delivery,
    revision: u64,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        let mut served = self
            .delivery
            .served
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *served = self.revision;
        self.delivery.turn.notify_all();
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Elapsed time between start and completion, or up to `now` while the task
/// is in progress. A started task that is neither completed nor in progress
/// reports zero.
pub fn task_duration(task: &Task, now: Timestamp) -> Duration {
    let Some(start) = task.started_at else {
        return Duration::zero();
    };
    let end = match task.completed_at {
        Some(completed) => completed,
        None if task.status == TaskStatus::InProgress => now,
        None => start,
    };
    end - start
}

fn apply_status_transition(task: &mut Task, next: TaskStatus, now: Timestamp) {
    if next == task.status {
        return;
    }
    match next {
        TaskStatus::InProgress if task.started_at.is_none() => task.started_at = Some(now),
        TaskStatus::Completed if task.completed_at.is_none() => task.completed_at = Some(now),
        TaskStatus::Pending => {
            task.started_at = None;
            task.completed_at = None;
        }
        _ => {}
    }
    task.status = next;
}

fn merge_patch(task: &mut Task, patch: TaskPatch, now: Timestamp) {
    if let Some(status) = patch.status {
        apply_status_transition(task, status, now);
    }
    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(category_id) = patch.category_id {
        task.category_id = category_id;
    }
    if let Some(tag_ids) = patch.tag_ids {
        task.tag_ids = tag_ids;
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
}

/// Sorts by `order` (stable) and renumbers to `0..n`.
fn repack_order(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.order);
    for (index, task) in tasks.iter_mut().enumerate() {
        task.order = index;
    }
}

impl TaskRepository {
    pub fn new(state: AppState) -> Self {
        Self::with_clock(state, Clock::System)
    }

    pub fn with_clock(mut state: AppState, clock: Clock) -> Self {
        repack_order(&mut state.tasks);
        Self {
            inner: Arc::new(Mutex::new(RepoData {
                state,
                live_now: None,
                revision: 0,
            })),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            delivery: Arc::new(Delivery::default()),
            clock,
        }
    }

    /// Tasks sorted ascending by `order`.
    pub fn tasks(&self) -> Vec<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.state.tasks.clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.state.categories.clone()
    }

    pub fn tags(&self) -> Vec<Tag> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.state.tags.clone()
    }

    pub fn last_updated(&self) -> Timestamp {
        let guard = self.inner.lock().expect("state poisoned");
        guard.state.last_updated
    }

    pub fn stats(&self) -> TaskStats {
        let guard = self.inner.lock().expect("state poisoned");
        TaskStats::compute(&guard.state.tasks)
    }

    pub fn filtered(&self, criteria: &FilterCriteria) -> Vec<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        criteria.apply(&guard.state.tasks)
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.state.tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn add_task(&self, fields: NewTask) -> Task {
        self.mutate(|state, now| {
            let task = Task {
                id: new_id(),
                title: fields.title,
                description: fields.description,
                status: fields.status,
                priority: fields.priority,
                category_id: fields.category_id,
                tag_ids: fields.tag_ids,
                due_date: fields.due_date,
                created_at: now,
                started_at: None,
                completed_at: None,
                comments: Vec::new(),
                order: state.tasks.len(),
            };
            state.tasks.push(task.clone());
            let change = StateChange::TaskAdded {
                task_id: task.id.clone(),
            };
            (task, change)
        })
    }

    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Option<Task> {
        self.try_mutate(|state, now| {
            let task = state.tasks.iter_mut().find(|t| t.id == id)?;
            merge_patch(task, patch, now);
            let change = StateChange::TaskUpdated {
                task_id: task.id.clone(),
            };
            Some((task.clone(), change))
        })
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) -> Option<Task> {
        self.update_task(id, TaskPatch::status(status))
    }

    pub fn set_priority(&self, id: &str, priority: TaskPriority) -> Option<Task> {
        self.update_task(id, TaskPatch::priority(priority))
    }

    pub fn delete_task(&self, id: &str) -> bool {
        self.try_mutate(|state, _| {
            let index = state.tasks.iter().position(|t| t.id == id)?;
            let removed = state.tasks.remove(index);
            repack_order(&mut state.tasks);
            Some(((), StateChange::TaskDeleted { task_id: removed.id }))
        })
        .is_some()
    }

    pub fn add_comment(&self, task_id: &str, text: &str) -> Option<Comment> {
        self.try_mutate(|state, now| {
            let task = state.tasks.iter_mut().find(|t| t.id == task_id)?;
            let comment = Comment {
                id: new_id(),
                text: text.to_string(),
                created_at: now,
            };
            task.comments.push(comment.clone());
            let change = StateChange::CommentAdded {
                task_id: task.id.clone(),
                comment_id: comment.id.clone(),
            };
            Some((comment, change))
        })
    }

    pub fn delete_comment(&self, task_id: &str, comment_id: &str) -> bool {
        self.try_mutate(|state, _| {
            let task = state.tasks.iter_mut().find(|t| t.id == task_id)?;
            let index = task.comments.iter().position(|c| c.id == comment_id)?;
            let removed = task.comments.remove(index);
            let change = StateChange::CommentDeleted {
                task_id: task.id.clone(),
                comment_id: removed.id,
            };
            Some(((), change))
        })
        .is_some()
    }

    pub fn add_category(&self, fields: NewCategory) -> Category {
        self.mutate(|state, _| {
            let category = Category {
                id: new_id(),
                name: fields.name,
                color: fields.color,
                icon: fields.icon,
            };
            state.categories.push(category.clone());
            let change = StateChange::CategoryAdded {
                category_id: category.id.clone(),
            };
            (category, change)
        })
    }

    /// Also clears `category_id` on every task that referenced it.
    pub fn delete_category(&self, id: &str) -> bool {
        self.try_mutate(|state, _| {
            let index = state.categories.iter().position(|c| c.id == id)?;
            let removed = state.categories.remove(index);
            for task in state
                .tasks
                .iter_mut()
                .filter(|t| t.category_id.as_deref() == Some(id))
            {
                task.category_id = None;
            }
            let change = StateChange::CategoryDeleted {
                category_id: removed.id,
            };
            Some(((), change))
        })
        .is_some()
    }

    pub fn add_tag(&self, fields: NewTag) -> Tag {
        self.mutate(|state, _| {
            let tag = Tag {
                id: new_id(),
                name: fields.name,
                color: fields.color,
            };
            state.tags.push(tag.clone());
            let change = StateChange::TagAdded {
                tag_id: tag.id.clone(),
            };
            (tag, change)
        })
    }

    /// Also removes the tag id (every occurrence) from every task.
    pub fn delete_tag(&self, id: &str) -> bool {
        self.try_mutate(|state, _| {
            let index = state.tags.iter().position(|t| t.id == id)?;
            let removed = state.tags.remove(index);
            for task in &mut state.tasks {
                task.tag_ids.retain(|tag_id| tag_id != id);
            }
            Some(((), StateChange::TagDeleted { tag_id: removed.id }))
        })
        .is_some()
    }

    /// Uses the ticker's time while one is attached, the repository clock otherwise.
    pub fn get_task_duration(&self, task: &Task) -> Duration {
        let now = self.display_now();
        // A tick taken before the task started must not read as negative.
        let now = task.started_at.map_or(now, |started| now.max(started));
        task_duration(task, now)
    }

    pub fn clear_all(&self) {
        self.mutate(|state, now| {
            *state = AppState::empty(now);
            ((), StateChange::Cleared)
        });
    }

    pub fn export_data(&self) -> AppState {
        let guard = self.inner.lock().expect("state poisoned");
        guard.state.clone()
    }

    /// Replaces the whole state. `last_updated` is always refreshed.
    pub fn import_data(&self, data: AppState) {
        self.mutate(|state, _| {
            *state = data;
            repack_order(&mut state.tasks);
            ((), StateChange::Imported)
        });
    }

    /// Listeners are called in mutation order, one change at a time, and
    /// may read the repository but must not mutate it.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateChange, &AppState) + Send + Sync + 'static,
    {
        let mut guard = self.listeners.lock().expect("listeners poisoned");
        let id = SubscriptionId(guard.next_id);
        guard.next_id += 1;
        guard.entries.push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self.listeners.lock().expect("listeners poisoned");
        let before = guard.entries.len();
        guard.entries.retain(|(entry_id, _)| *entry_id != id);
        guard.entries.len() != before
    }

    /// Starts the display ticker. Live durations follow it until the returned
    /// [`Ticker`] is detached or dropped.
    pub fn attach(&self, period: StdDuration) -> Ticker {
        let ticker = start_ticker(period);
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.live_now = Some(ticker.subscribe());
        ticker
    }

    fn display_now(&self) -> Timestamp {
        let guard = self.inner.lock().expect("state poisoned");
        match guard.live_now.as_ref() {
            // `has_changed` errors once the ticker side is gone.
            Some(rx) if rx.has_changed().is_ok() => *rx.borrow(),
            _ => self.clock.now(),
        }
    }

    /// Runs `f` under the state lock, refreshes `last_updated` and notifies
    /// subscribers after the lock is released.
    fn mutate<R>(&self, f: impl FnOnce(&mut AppState, Timestamp) -> (R, StateChange)) -> R {
        let now = self.clock.now();
        let (result, change, snapshot, revision) = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let (result, change) = f(&mut guard.state, now);
            guard.state.last_updated = now;
            guard.revision += 1;
            (result, change, guard.state.clone(), guard.revision)
        };
        self.deliver(revision, &change, &snapshot);
        result
    }

    /// Like [`Self::mutate`], but `f` may decline (target not found), in which
    /// case nothing is refreshed or announced.
    fn try_mutate<R>(
        &self,
        f: impl FnOnce(&mut AppState, Timestamp) -> Option<(R, StateChange)>,
    ) -> Option<R> {
        let now = self.clock.now();
        let (result, change, snapshot, revision) = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let (result, change) = f(&mut guard.state, now)?;
            guard.state.last_updated = now;
            guard.revision += 1;
            (result, change, guard.state.clone(), guard.revision)
        };
        self.deliver(revision, &change, &snapshot);
        Some(result)
    }

    /// Waits until every earlier revision has been announced, so clones
    /// mutating concurrently cannot deliver snapshots out of order.
    fn deliver(&self, revision: u64, change: &StateChange, snapshot: &AppState) {
        let _turn = self.delivery.wait_for(revision);
        self.notify(change, snapshot);
    }

    fn notify(&self, change: &StateChange, snapshot: &AppState) {
        log::debug!("state changed: {change:?}");
        let listeners: Vec<Listener> = {
            let guard = self.listeners.lock().expect("listeners poisoned");
            guard.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(change, snapshot);
        }
    }
}
