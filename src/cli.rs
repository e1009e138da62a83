//! Command-line front-end.
//!
//! Every subcommand maps onto one `*_impl` function in [`crate::commands`];
//! this module only parses arguments and renders results.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::ai::ArticleGenerator;
use crate::commands::{
    add_category_impl, add_comment_impl, add_tag_impl, add_task_impl, clear_impl, delete_category_impl,
    delete_comment_impl, delete_tag_impl, delete_task_impl, err, export_impl, generate_article_impl,
    import_impl, list_backups_impl, list_categories_impl, list_tags_impl, list_tasks_impl,
    load_settings_impl, ok, open_repository_impl, redact_settings, resolve_category, resolve_tags,
    resolve_task_id, restore_backup_impl, set_priority_impl, set_status_impl, show_task_impl,
    stats_impl, update_settings_impl, update_task_impl, CommandCtx, CommandResult, DirCtx,
    SettingsUpdate,
};
use crate::filters::FilterCriteria;
use crate::format::{format_date_time, format_duration, is_due_soon, is_overdue, parse_due_date};
use crate::models::{
    AppState, GeminiModel, Language, NewCategory, NewTag, NewTask, Task, TaskPatch, TaskPriority,
    TaskStatus,
};
use crate::repository::TaskRepository;

const DEFAULT_CATEGORY_COLOR: &str = "#6366f1";
const DEFAULT_TAG_COLOR: &str = "#10b981";
const DUE_SOON_HOURS: i64 = 24;

/// taskflow - personal task tracker
///
/// Tracks tasks with status, priority, categories, tags and comments, and
/// writes progress articles from completed work.
#[derive(Parser, Debug)]
#[command(name = "taskflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding data, settings, backups and logs
    #[arg(long, global = true, env = "TASKFLOW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print the raw command result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add(AddArgs),

    /// List tasks, optionally filtered
    List(ListArgs),

    /// Show one task with its comments
    Show {
        /// Task id or unique id prefix
        id: String,
    },

    /// Change fields of a task
    Update(UpdateArgs),

    /// Set the status of a task
    Status {
        id: String,
        /// pending, in-progress, completed or on-hold
        status: TaskStatus,
    },

    /// Set the priority of a task
    Priority {
        id: String,
        /// low, medium, high or urgent
        priority: TaskPriority,
    },

    /// Delete a task
    Delete { id: String },

    /// Task comments
    #[command(subcommand)]
    Comment(CommentCommands),

    /// Categories
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Tags
    #[command(subcommand)]
    Tag(TagCommands),

    /// Task counts and completion rate
    Stats,

    /// Export all data as JSON
    Export {
        /// Target file (defaults to `<data-dir>/exports/taskflow-<timestamp>.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with an exported JSON file
    Import { path: PathBuf },

    /// Delete all data (a backup is taken first)
    Clear {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// List backups, or restore one
    Backups {
        /// Backup file name to restore
        #[arg(long)]
        restore: Option<String>,
    },

    /// Generate a progress article from completed tasks
    Article {
        /// Save the article as Markdown
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show live durations of in-progress tasks
    Watch {
        /// Stop after this many ticks
        #[arg(long)]
        count: Option<u64>,
    },

    /// Show or change settings
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub title: String,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short, long)]
    pub priority: Option<TaskPriority>,
    #[arg(short, long)]
    pub status: Option<TaskStatus>,
    /// Category name or id
    #[arg(short, long)]
    pub category: Option<String>,
    /// Tag name or id (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
    /// Due date: YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Case-insensitive match on title and description
    #[arg(short, long)]
    pub search: Option<String>,
    #[arg(long = "status")]
    pub statuses: Vec<TaskStatus>,
    #[arg(long = "priority")]
    pub priorities: Vec<TaskPriority>,
    #[arg(long = "category")]
    pub categories: Vec<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,
    #[arg(long)]
    pub clear_description: bool,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    #[arg(long, conflicts_with = "clear_category")]
    pub category: Option<String>,
    #[arg(long)]
    pub clear_category: bool,
    /// Replaces the tag list (repeatable)
    #[arg(long = "tag", conflicts_with = "clear_tags")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub clear_tags: bool,
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    #[arg(long)]
    pub clear_due: bool,
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    /// Add a comment to a task
    Add { task_id: String, text: String },
    /// Delete a comment
    Delete { task_id: String, comment_id: String },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    Add {
        name: String,
        #[arg(long, default_value = DEFAULT_CATEGORY_COLOR)]
        color: String,
        #[arg(long)]
        icon: Option<String>,
    },
    List,
    /// Delete a category; tasks referencing it become uncategorized
    Delete { category: String },
}

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    Add {
        name: String,
        #[arg(long, default_value = DEFAULT_TAG_COLOR)]
        color: String,
    },
    List,
    /// Delete a tag and remove it from every task
    Delete { tag: String },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[arg(long, conflicts_with = "clear_api_key")]
    pub api_key: Option<String>,
    #[arg(long)]
    pub clear_api_key: bool,
    #[arg(long)]
    pub model: Option<GeminiModel>,
    /// en or id
    #[arg(long)]
    pub language: Option<Language>,
    /// Live-duration refresh period
    #[arg(long)]
    pub tick_seconds: Option<u64>,
    /// List the available Gemini models
    #[arg(long)]
    pub list_models: bool,
}

impl ConfigArgs {
    fn into_update(self) -> SettingsUpdate {
        let gemini_api_key = if self.clear_api_key {
            Some(None)
        } else {
            self.api_key.map(Some)
        };
        SettingsUpdate {
            gemini_api_key,
            gemini_model: self.model,
            language: self.language,
            tick_seconds: self.tick_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveDuration {
    id: String,
    title: String,
    duration_ms: i64,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    id: &'static str,
    name: &'static str,
    description: &'static str,
}

/// `--data-dir` / `TASKFLOW_DATA_DIR`, else the platform data directory.
pub fn resolve_data_dir(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.filter(|path| !path.as_os_str().is_empty()).or_else(|| {
        directories::ProjectDirs::from("dev", "taskflow", "taskflow")
            .map(|dirs| dirs.data_dir().to_path_buf())
    })
}

/// Normalizes user input to an RFC 3339 UTC timestamp.
fn normalize_due(value: &str) -> Result<String, String> {
    parse_due_date(value)
        .map(|at| at.to_rfc3339())
        .ok_or_else(|| format!("invalid due date `{value}`"))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn task_line(repo: &TaskRepository, state: &AppState, task: &Task) -> String {
    let mut line = format!(
        "{}  [{}] {:<6} {}",
        short_id(&task.id),
        task.status.label(),
        task.priority.as_str(),
        task.title
    );
    if let Some(name) = task.category_id.as_deref().and_then(|id| state.category_name(id)) {
        line.push_str(&format!("  @{name}"));
    }
    for tag in state.tag_names(task) {
        line.push_str(&format!(" #{tag}"));
    }
    if let Some(due) = task.due_date.as_deref().and_then(parse_due_date) {
        let now = chrono::Utc::now();
        let marker = if task.status == TaskStatus::Completed {
            ""
        } else if is_overdue(due, now) {
            " (overdue)"
        } else if is_due_soon(due, now, DUE_SOON_HOURS) {
            " (due soon)"
        } else {
            ""
        };
        line.push_str(&format!(
            "  due {}{marker}",
            due.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }
    if task.started_at.is_some() {
        line.push_str(&format!(
            "  {}",
            format_duration(repo.get_task_duration(task))
        ));
    }
    line
}

fn print_task_detail(repo: &TaskRepository, state: &AppState, task: &Task, language: Language) {
    println!("{}", task_line(repo, state, task));
    println!("  id:       {}", task.id);
    if let Some(description) = &task.description {
        println!("  notes:    {description}");
    }
    println!(
        "  created:  {}",
        format_date_time(&task.created_at.with_timezone(&Local), language)
    );
    if let Some(started) = task.started_at {
        println!(
            "  started:  {}",
            format_date_time(&started.with_timezone(&Local), language)
        );
    }
    if let Some(completed) = task.completed_at {
        println!(
            "  done:     {}",
            format_date_time(&completed.with_timezone(&Local), language)
        );
    }
    for comment in &task.comments {
        println!(
            "  - {} ({}, {})",
            comment.text,
            short_id(&comment.id),
            format_date_time(&comment.created_at.with_timezone(&Local), language)
        );
    }
}

/// Prints `result` and reports whether it succeeded.
fn emit<T: Serialize>(result: CommandResult<T>, json: bool, render: impl FnOnce(&T)) -> bool {
    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{text}"),
            Err(error) => eprintln!("error: failed to encode result: {error}"),
        }
        return result.ok;
    }
    match (&result.data, &result.error) {
        (Some(data), _) if result.ok => render(data),
        (_, Some(error)) => eprintln!("error: {error}"),
        _ => {}
    }
    result.ok
}

fn lookup<T>(value: Result<String, String>) -> Result<String, CommandResult<T>> {
    value.map_err(|message| err(&message))
}

impl Cli {
    pub fn run(self) -> ExitCode {
        let Some(data_dir) = resolve_data_dir(self.data_dir.clone()) else {
            eprintln!("error: no data directory; pass --data-dir or set TASKFLOW_DATA_DIR");
            return ExitCode::FAILURE;
        };

        #[cfg(not(test))]
        if let Err(error) = crate::logging::init_logging(&data_dir) {
            eprintln!("warning: file logging disabled: {error}");
        }

        let ctx = DirCtx::new(data_dir);
        let succeeded = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.dispatch(&ctx)),
            Err(error) => {
                eprintln!("error: failed to start runtime: {error}");
                false
            }
        };
        if succeeded {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    async fn dispatch(self, ctx: &DirCtx) -> bool {
        let json = self.json;
        let settings = load_settings_impl(ctx).data.unwrap_or_default();
        let language = settings.language;

        if let Commands::Config(args) = self.command {
            return run_config(ctx, args, json);
        }
        if let Commands::Backups { restore: None } = self.command {
            return emit(list_backups_impl(ctx), json, |list| {
                if list.is_empty() {
                    println!("no backups");
                }
                for entry in list {
                    println!("{}", entry.name);
                }
            });
        }

        let repo = match open_repository_impl(ctx) {
            Ok(repo) => repo,
            Err(error) => {
                return emit::<()>(err(&format!("storage error: {error}")), json, |_| {});
            }
        };

        match self.command {
            Commands::Add(args) => {
                let result = build_new_task(&repo, args)
                    .map(|fields| add_task_impl(&repo, fields))
                    .unwrap_or_else(|e| e);
                emit(result, json, |task| {
                    println!("added {} {}", short_id(&task.id), task.title)
                })
            }
            Commands::List(args) => {
                let result = match build_criteria(&repo, args) {
                    Ok(criteria) => list_tasks_impl(&repo, &criteria),
                    Err(e) => e,
                };
                let state = repo.export_data();
                emit(result, json, |tasks| {
                    if tasks.is_empty() {
                        println!("no tasks");
                    }
                    for task in tasks {
                        println!("{}", task_line(&repo, &state, task));
                    }
                })
            }
            Commands::Show { id } => {
                let result = match lookup(resolve_task_id(&repo, &id)) {
                    Ok(id) => show_task_impl(&repo, &id),
                    Err(e) => e,
                };
                let state = repo.export_data();
                emit(result, json, |task| {
                    print_task_detail(&repo, &state, task, language)
                })
            }
            Commands::Update(args) => {
                let result = build_patch(&repo, args)
                    .map(|(id, patch)| update_task_impl(&repo, &id, patch))
                    .unwrap_or_else(|e| e);
                emit(result, json, |task| {
                    println!("updated {} {}", short_id(&task.id), task.title)
                })
            }
            Commands::Status { id, status } => {
                let result = match lookup(resolve_task_id(&repo, &id)) {
                    Ok(id) => set_status_impl(&repo, &id, status),
                    Err(e) => e,
                };
                emit(result, json, |task| {
                    println!("{} is now {}", task.title, task.status.label())
                })
            }
            Commands::Priority { id, priority } => {
                let result = match lookup(resolve_task_id(&repo, &id)) {
                    Ok(id) => set_priority_impl(&repo, &id, priority),
                    Err(e) => e,
                };
                emit(result, json, |task| {
                    println!("{} is now {}", task.title, task.priority)
                })
            }
            Commands::Delete { id } => {
                let result = match lookup(resolve_task_id(&repo, &id)) {
                    Ok(id) => delete_task_impl(&repo, &id),
                    Err(e) => e,
                };
                emit(result, json, |_| println!("deleted"))
            }
            Commands::Comment(CommentCommands::Add { task_id, text }) => {
                let result = match lookup(resolve_task_id(&repo, &task_id)) {
                    Ok(id) => add_comment_impl(&repo, &id, &text),
                    Err(e) => e,
                };
                emit(result, json, |comment| {
                    println!("comment {} added", short_id(&comment.id))
                })
            }
            Commands::Comment(CommentCommands::Delete {
                task_id,
                comment_id,
            }) => {
                let result = match lookup(resolve_task_id(&repo, &task_id)) {
                    Ok(id) => {
                        // Comment ids may also be given as the short form shown by `show`.
                        let comment_id = repo
                            .get_task(&id)
                            .and_then(|task| {
                                task.comments
                                    .into_iter()
                                    .find(|c| c.id == comment_id || c.id.starts_with(&comment_id))
                            })
                            .map(|c| c.id)
                            .unwrap_or(comment_id);
                        delete_comment_impl(&repo, &id, &comment_id)
                    }
                    Err(e) => e,
                };
                emit(result, json, |_| println!("comment deleted"))
            }
            Commands::Category(CategoryCommands::Add { name, color, icon }) => emit(
                add_category_impl(&repo, NewCategory { name, color, icon }),
                json,
                |category| println!("category {} added", category.name),
            ),
            Commands::Category(CategoryCommands::List) => {
                emit(list_categories_impl(&repo), json, |categories| {
                    for category in categories {
                        println!("{}  {} ({})", short_id(&category.id), category.name, category.color);
                    }
                })
            }
            Commands::Category(CategoryCommands::Delete { category }) => {
                let result = match lookup(resolve_category(&repo, &category)) {
                    Ok(id) => delete_category_impl(&repo, &id),
                    Err(e) => e,
                };
                emit(result, json, |_| println!("category deleted"))
            }
            Commands::Tag(TagCommands::Add { name, color }) => emit(
                add_tag_impl(&repo, NewTag { name, color }),
                json,
                |tag| println!("tag {} added", tag.name),
            ),
            Commands::Tag(TagCommands::List) => emit(list_tags_impl(&repo), json, |tags| {
                for tag in tags {
                    println!("{}  #{} ({})", short_id(&tag.id), tag.name, tag.color);
                }
            }),
            Commands::Tag(TagCommands::Delete { tag }) => {
                let result = match resolve_tags(&repo, &[tag]) {
                    Ok(ids) => delete_tag_impl(&repo, &ids[0]),
                    Err(message) => err(&message),
                };
                emit(result, json, |_| println!("tag deleted"))
            }
            Commands::Stats => emit(stats_impl(&repo), json, |stats| {
                println!("total:      {}", stats.total);
                for status in TaskStatus::ALL {
                    println!("{:<11} {}", format!("{}:", status.label()), stats.by_status.get(status));
                }
                for priority in TaskPriority::ALL {
                    println!("{:<11} {}", format!("{priority}:"), stats.by_priority.get(priority));
                }
                println!("completed:  {}%", stats.completed_percentage);
            }),
            Commands::Export { output } => emit(export_impl(ctx, &repo, output), json, |path| {
                println!("exported to {path}")
            }),
            Commands::Import { path } => emit(import_impl(ctx, &repo, &path), json, |summary| {
                println!(
                    "imported {} tasks, {} categories, {} tags",
                    summary.tasks, summary.categories, summary.tags
                );
                if let Some(backup) = &summary.backup {
                    println!("previous data saved as {backup}");
                }
            }),
            Commands::Clear { yes } => {
                let result = if yes {
                    clear_impl(ctx, &repo)
                } else {
                    err("refusing to clear without --yes")
                };
                emit(result, json, |backup| match backup {
                    Some(name) => println!("cleared; previous data saved as {name}"),
                    None => println!("cleared"),
                })
            }
            Commands::Backups {
                restore: Some(name),
            } => emit(restore_backup_impl(ctx, &repo, &name), json, |summary| {
                println!("restored {} tasks from {name}", summary.tasks)
            }),
            Commands::Article { output } => {
                let generator = ArticleGenerator::new();
                let result = generate_article_impl(ctx, &repo, &generator, output.as_deref()).await;
                emit(result, json, |article| {
                    println!("{}", article.content);
                    if let Some(path) = &article.path {
                        eprintln!("saved to {path}");
                    }
                })
            }
            Commands::Watch { count } => watch(&repo, settings.tick_seconds, count, json).await,
            Commands::Config(_) | Commands::Backups { restore: None } => true,
        }
    }
}

fn build_new_task<T>(repo: &TaskRepository, args: AddArgs) -> Result<NewTask, CommandResult<T>> {
    let category_id = match args.category {
        Some(value) => Some(lookup(resolve_category(repo, &value))?),
        None => None,
    };
    let tag_ids = resolve_tags(repo, &args.tags).map_err(|message| err(&message))?;
    let due_date = match args.due {
        Some(value) => Some(normalize_due(&value).map_err(|message| err(&message))?),
        None => None,
    };
    Ok(NewTask {
        title: args.title.trim().to_string(),
        description: args.description,
        status: args.status.unwrap_or_default(),
        priority: args.priority.unwrap_or_default(),
        category_id,
        tag_ids,
        due_date,
    })
}

fn build_criteria<T>(
    repo: &TaskRepository,
    args: ListArgs,
) -> Result<FilterCriteria, CommandResult<T>> {
    let mut criteria = FilterCriteria::default();
    if let Some(search) = args.search {
        criteria.set_search(search);
    }
    criteria.statuses = args.statuses;
    criteria.priorities = args.priorities;
    for category in &args.categories {
        criteria
            .category_ids
            .push(lookup(resolve_category(repo, category))?);
    }
    criteria.tag_ids = resolve_tags(repo, &args.tags).map_err(|message| err(&message))?;
    Ok(criteria)
}

fn build_patch<T>(
    repo: &TaskRepository,
    args: UpdateArgs,
) -> Result<(String, TaskPatch), CommandResult<T>> {
    let id = lookup(resolve_task_id(repo, &args.id))?;
    let mut patch = TaskPatch {
        title: args.title.map(|t| t.trim().to_string()),
        status: args.status,
        priority: args.priority,
        ..TaskPatch::default()
    };
    if args.clear_description {
        patch.description = Some(None);
    } else if let Some(description) = args.description {
        patch.description = Some(Some(description));
    }
    if args.clear_category {
        patch.category_id = Some(None);
    } else if let Some(category) = args.category {
        patch.category_id = Some(Some(lookup(resolve_category(repo, &category))?));
    }
    if args.clear_tags {
        patch.tag_ids = Some(Vec::new());
    } else if !args.tags.is_empty() {
        patch.tag_ids = Some(resolve_tags(repo, &args.tags).map_err(|message| err(&message))?);
    }
    if args.clear_due {
        patch.due_date = Some(None);
    } else if let Some(due) = args.due {
        patch.due_date = Some(Some(normalize_due(&due).map_err(|message| err(&message))?));
    }
    Ok((id, patch))
}

fn run_config(ctx: &impl CommandCtx, args: ConfigArgs, json: bool) -> bool {
    if args.list_models {
        let models: Vec<ModelInfo> = GeminiModel::ALL
            .into_iter()
            .map(|model| ModelInfo {
                id: model.id(),
                name: model.name(),
                description: model.description(),
            })
            .collect();
        return emit(ok(models), json, |models| {
            for model in models {
                println!("{:<24} {} - {}", model.id, model.name, model.description);
            }
        });
    }

    let update = args.into_update();
    let changes = update.gemini_api_key.is_some()
        || update.gemini_model.is_some()
        || update.language.is_some()
        || update.tick_seconds.is_some();
    let result = if changes {
        update_settings_impl(ctx, update)
    } else {
        load_settings_impl(ctx)
    };
    let result = CommandResult {
        data: result.data.map(redact_settings),
        ..result
    };
    emit(result, json, |settings| {
        println!(
            "api key:      {}",
            settings.gemini_api_key.as_deref().unwrap_or("(not set)")
        );
        println!(
            "model:        {} ({})",
            settings.gemini_model.id(),
            settings.gemini_model.name()
        );
        println!("language:     {}", settings.language);
        println!("tick seconds: {}", settings.tick_seconds);
    })
}

async fn watch(repo: &TaskRepository, tick_seconds: u64, count: Option<u64>, json: bool) -> bool {
    let ticker = repo.attach(Duration::from_secs(tick_seconds.max(1)));
    let mut rx = ticker.subscribe();
    let mut ticks = 0u64;
    log::info!("watch started tick_seconds={tick_seconds}");

    while rx.changed().await.is_ok() {
        let live: Vec<LiveDuration> = repo
            .tasks()
            .into_iter()
            .filter(|task| task.status == TaskStatus::InProgress)
            .map(|task| LiveDuration {
                duration_ms: repo.get_task_duration(&task).num_milliseconds(),
                id: task.id,
                title: task.title,
            })
            .collect();

        if json {
            match serde_json::to_string(&ok(&live)) {
                Ok(text) => println!("{text}"),
                Err(error) => eprintln!("error: failed to encode result: {error}"),
            }
        } else {
            println!("-- {}", Local::now().format("%H:%M:%S"));
            if live.is_empty() {
                println!("no tasks in progress");
            }
            for entry in &live {
                println!(
                    "{}  {}  {}",
                    short_id(&entry.id),
                    format_duration(chrono::Duration::milliseconds(entry.duration_ms)),
                    entry.title
                );
            }
        }

        ticks += 1;
        if count.is_some_and(|limit| ticks >= limit) {
            break;
        }
    }

    ticker.detach();
    true
}

/// Parses the process arguments and runs the selected command.
pub fn run() -> ExitCode {
    Cli::parse().run()
}
