use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;

#[cfg(feature = "app")]
use crate::ai::ArticleGenerator;
use crate::clock::Clock;
use crate::filters::FilterCriteria;
use crate::models::{
    Category, Comment, GeminiModel, Language, NewCategory, NewTag, NewTask, Settings,
    SettingsFile, Tag, Task, TaskPatch, TaskPriority, TaskStatus,
};
use crate::persist::{open_repository, STORAGE_KEY};
use crate::repository::TaskRepository;
use crate::stats::TaskStats;
use crate::storage::{Storage, StorageError};
use crate::transfer::{default_export_path, export_to_file, import_from_file, parse_import};

pub const SETTINGS_SCHEMA_VERSION: u32 = 1;
const EXPORTS_DIR: &str = "exports";

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

pub trait CommandCtx {
    fn data_dir(&self) -> Result<PathBuf, StorageError>;

    fn clock(&self) -> Clock {
        Clock::System
    }
}

/// Context rooted at a fixed data directory.
pub struct DirCtx {
    data_dir: PathBuf,
}

impl DirCtx {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}

impl CommandCtx for DirCtx {
    fn data_dir(&self) -> Result<PathBuf, StorageError> {
        Ok(self.data_dir.clone())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub name: String,
    pub modified_at: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub tasks: usize,
    pub categories: usize,
    pub tags: usize,
    pub backup: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleOutput {
    pub content: String,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    /// `Some(None)` clears the stored key.
    pub gemini_api_key: Option<Option<String>>,
    pub gemini_model: Option<GeminiModel>,
    pub language: Option<Language>,
    pub tick_seconds: Option<u64>,
}

pub fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

pub fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn open_storage(ctx: &impl CommandCtx) -> Result<Storage, StorageError> {
    let storage = Storage::new(ctx.data_dir()?);
    storage.ensure_dirs()?;
    Ok(storage)
}

/// Loads the stored state and wires save-on-change into the data directory.
pub fn open_repository_impl(ctx: &impl CommandCtx) -> Result<TaskRepository, StorageError> {
    let storage = open_storage(ctx)?;
    Ok(open_repository(Arc::new(storage), STORAGE_KEY, ctx.clock()))
}

/// Exact id, then a unique id prefix.
pub fn resolve_task_id(repo: &TaskRepository, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("task id must not be empty".to_string());
    }
    let tasks = repo.tasks();
    if tasks.iter().any(|t| t.id == value) {
        return Ok(value.to_string());
    }
    let mut matches = tasks.iter().filter(|t| t.id.starts_with(value));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => Err(format!("ambiguous task id `{value}`")),
        _ => Err("task not found".to_string()),
    }
}

/// Accepts an id or a case-insensitive name.
pub fn resolve_category(repo: &TaskRepository, value: &str) -> Result<String, String> {
    let value = value.trim();
    repo.categories()
        .into_iter()
        .find(|c| c.id == value || c.name.eq_ignore_ascii_case(value))
        .map(|c| c.id)
        .ok_or_else(|| format!("unknown category `{value}`"))
}

pub fn resolve_tags(repo: &TaskRepository, values: &[String]) -> Result<Vec<String>, String> {
    let tags = repo.tags();
    values
        .iter()
        .map(|value| {
            let value = value.trim();
            tags.iter()
                .find(|t| t.id == value || t.name.eq_ignore_ascii_case(value))
                .map(|t| t.id.clone())
                .ok_or_else(|| format!("unknown tag `{value}`"))
        })
        .collect()
}

pub fn add_task_impl(repo: &TaskRepository, fields: NewTask) -> CommandResult<Task> {
    if fields.title.trim().is_empty() {
        return err("title must not be empty");
    }
    ok(repo.add_task(fields))
}

pub fn list_tasks_impl(repo: &TaskRepository, criteria: &FilterCriteria) -> CommandResult<Vec<Task>> {
    ok(repo.filtered(criteria))
}

pub fn show_task_impl(repo: &TaskRepository, task_id: &str) -> CommandResult<Task> {
    match repo.get_task(task_id) {
        Some(task) => ok(task),
        None => err("task not found"),
    }
}

pub fn update_task_impl(repo: &TaskRepository, task_id: &str, patch: TaskPatch) -> CommandResult<Task> {
    if patch.is_empty() {
        return err("nothing to update");
    }
    if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
        return err("title must not be empty");
    }
    match repo.update_task(task_id, patch) {
        Some(task) => ok(task),
        None => err("task not found"),
    }
}

pub fn set_status_impl(repo: &TaskRepository, task_id: &str, status: TaskStatus) -> CommandResult<Task> {
    match repo.set_status(task_id, status) {
        Some(task) => ok(task),
        None => err("task not found"),
    }
}

pub fn set_priority_impl(
    repo: &TaskRepository,
    task_id: &str,
    priority: TaskPriority,
) -> CommandResult<Task> {
    match repo.set_priority(task_id, priority) {
        Some(task) => ok(task),
        None => err("task not found"),
    }
}

pub fn delete_task_impl(repo: &TaskRepository, task_id: &str) -> CommandResult<bool> {
    if !repo.delete_task(task_id) {
        return err("task not found");
    }
    ok(true)
}

pub fn add_comment_impl(repo: &TaskRepository, task_id: &str, text: &str) -> CommandResult<Comment> {
    if text.trim().is_empty() {
        return err("comment must not be empty");
    }
    match repo.add_comment(task_id, text) {
        Some(comment) => ok(comment),
        None => err("task not found"),
    }
}

pub fn delete_comment_impl(
    repo: &TaskRepository,
    task_id: &str,
    comment_id: &str,
) -> CommandResult<bool> {
    if !repo.delete_comment(task_id, comment_id) {
        return err("comment not found");
    }
    ok(true)
}

pub fn add_category_impl(repo: &TaskRepository, fields: NewCategory) -> CommandResult<Category> {
    if fields.name.trim().is_empty() {
        return err("category name must not be empty");
    }
    ok(repo.add_category(fields))
}

pub fn list_categories_impl(repo: &TaskRepository) -> CommandResult<Vec<Category>> {
    ok(repo.categories())
}

pub fn delete_category_impl(repo: &TaskRepository, category_id: &str) -> CommandResult<bool> {
    if !repo.delete_category(category_id) {
        return err("category not found");
    }
    ok(true)
}

pub fn add_tag_impl(repo: &TaskRepository, fields: NewTag) -> CommandResult<Tag> {
    if fields.name.trim().is_empty() {
        return err("tag name must not be empty");
    }
    ok(repo.add_tag(fields))
}

pub fn list_tags_impl(repo: &TaskRepository) -> CommandResult<Vec<Tag>> {
    ok(repo.tags())
}

pub fn delete_tag_impl(repo: &TaskRepository, tag_id: &str) -> CommandResult<bool> {
    if !repo.delete_tag(tag_id) {
        return err("tag not found");
    }
    ok(true)
}

pub fn stats_impl(repo: &TaskRepository) -> CommandResult<TaskStats> {
    ok(repo.stats())
}

fn exports_dir(root: &Path) -> PathBuf {
    root.join(EXPORTS_DIR)
}

/// Writes the full state as pretty JSON. Returns the written path.
pub fn export_impl(
    ctx: &impl CommandCtx,
    repo: &TaskRepository,
    path: Option<PathBuf>,
) -> CommandResult<String> {
    let path = match path {
        Some(path) => path,
        None => match ctx.data_dir() {
            Ok(root) => default_export_path(&exports_dir(&root), "taskflow", "json", &Local::now()),
            Err(e) => return err(&format!("data_dir error: {e}")),
        },
    };
    if let Err(error) = export_to_file(&repo.export_data(), &path) {
        return err(&format!("export failed: {error}"));
    }
    ok(path.to_string_lossy().to_string())
}

/// Parses the whole file first; the current state is backed up and replaced
/// only when it is valid.
pub fn import_impl(
    ctx: &impl CommandCtx,
    repo: &TaskRepository,
    path: &Path,
) -> CommandResult<ImportSummary> {
    let data = match import_from_file(path) {
        Ok(data) => data,
        Err(error) => return err(&format!("import failed: {error}")),
    };
    let storage = match open_storage(ctx) {
        Ok(storage) => storage,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let backup = match storage.create_backup(STORAGE_KEY) {
        Ok(backup) => backup,
        Err(error) => return err(&format!("backup failed: {error}")),
    };
    let summary = ImportSummary {
        tasks: data.tasks.len(),
        categories: data.categories.len(),
        tags: data.tags.len(),
        backup,
    };
    repo.import_data(data);
    log::info!(
        "imported path={} tasks={} categories={} tags={}",
        path.display(),
        summary.tasks,
        summary.categories,
        summary.tags
    );
    ok(summary)
}

/// Backs up, then resets to an empty state. Returns the backup name.
pub fn clear_impl(ctx: &impl CommandCtx, repo: &TaskRepository) -> CommandResult<Option<String>> {
    let storage = match open_storage(ctx) {
        Ok(storage) => storage,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let backup = match storage.create_backup(STORAGE_KEY) {
        Ok(backup) => backup,
        Err(error) => return err(&format!("backup failed: {error}")),
    };
    repo.clear_all();
    ok(backup)
}

pub fn list_backups_impl(ctx: &impl CommandCtx) -> CommandResult<Vec<BackupEntry>> {
    let root = match ctx.data_dir() {
        Ok(path) => path,
        Err(e) => return err(&format!("data_dir error: {e}")),
    };
    let storage = Storage::new(root);

    // A missing backup directory just means no backups yet.
    let list = match storage.list_backups() {
        Ok(list) => list,
        Err(StorageError::Io(io)) if io.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(error) => return err(&format!("storage error: {error}")),
    };

    ok(list
        .into_iter()
        .map(|(name, modified_at)| BackupEntry { name, modified_at })
        .collect())
}

pub fn restore_backup_impl(
    ctx: &impl CommandCtx,
    repo: &TaskRepository,
    filename: &str,
) -> CommandResult<ImportSummary> {
    let storage = match open_storage(ctx) {
        Ok(storage) => storage,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let text = match storage.read_backup(filename) {
        Ok(text) => text,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let data = match parse_import(&text) {
        Ok(data) => data,
        Err(error) => return err(&format!("restore failed: {error}")),
    };
    let summary = ImportSummary {
        tasks: data.tasks.len(),
        categories: data.categories.len(),
        tags: data.tags.len(),
        backup: Some(filename.to_string()),
    };
    repo.import_data(data);
    log::info!("backup restored name={filename}");
    ok(summary)
}

fn read_settings(storage: &Storage) -> Settings {
    match storage.load_settings() {
        Ok(file) => file.settings,
        Err(StorageError::Io(io)) if io.kind() == std::io::ErrorKind::NotFound => {
            Settings::default()
        }
        Err(error) => {
            log::warn!("failed to load settings, using defaults: {error}");
            Settings::default()
        }
    }
}

/// Masks all but the last four characters of the stored key.
pub fn redact_settings(mut settings: Settings) -> Settings {
    settings.gemini_api_key = settings.gemini_api_key.map(|key| {
        let tail: String = key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{tail}")
    });
    settings
}

pub fn load_settings_impl(ctx: &impl CommandCtx) -> CommandResult<Settings> {
    match open_storage(ctx) {
        Ok(storage) => ok(read_settings(&storage)),
        Err(error) => err(&format!("storage error: {error}")),
    }
}

pub fn update_settings_impl(ctx: &impl CommandCtx, update: SettingsUpdate) -> CommandResult<Settings> {
    let storage = match open_storage(ctx) {
        Ok(storage) => storage,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let mut settings = read_settings(&storage);

    if let Some(key) = update.gemini_api_key {
        settings.gemini_api_key = key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
    }
    if let Some(model) = update.gemini_model {
        settings.gemini_model = model;
    }
    if let Some(language) = update.language {
        settings.language = language;
    }
    if let Some(tick_seconds) = update.tick_seconds {
        if tick_seconds == 0 {
            return err("tick_seconds must be at least 1");
        }
        settings.tick_seconds = tick_seconds;
    }

    let file = SettingsFile {
        schema_version: SETTINGS_SCHEMA_VERSION,
        settings: settings.clone(),
    };
    if let Err(error) = storage.save_settings(&file) {
        return err(&format!("storage error: {error}"));
    }
    ok(settings)
}

/// Generates the progress article and optionally writes it as Markdown.
#[cfg(feature = "app")]
pub async fn generate_article_impl(
    ctx: &impl CommandCtx,
    repo: &TaskRepository,
    generator: &ArticleGenerator,
    output: Option<&Path>,
) -> CommandResult<ArticleOutput> {
    let settings = match open_storage(ctx) {
        Ok(storage) => read_settings(&storage),
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let api_key = settings.resolve_api_key();
    let state = repo.export_data();
    let content = match generator
        .generate(
            api_key.as_deref(),
            settings.gemini_model,
            &state,
            settings.language,
        )
        .await
    {
        Ok(content) => content,
        Err(error) => return err(&error.to_string()),
    };

    let path = match output {
        Some(path) => {
            if let Err(error) = crate::transfer::write_markdown(&content, path) {
                return err(&format!("failed to save article: {error}"));
            }
            Some(path.to_string_lossy().to_string())
        }
        None => None,
    };
    ok(ArticleOutput { content, path })
}
