use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::format::{format_date, format_hours_minutes, format_long_date};
use crate::models::{AppState, GeminiModel, Language, Task, TaskStatus};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, thiserror::Error)]
pub enum ArticleError {
    #[error("{}", no_completed_message(.language))]
    NoCompletedTasks { language: Language },
    #[error("missing Gemini API key")]
    MissingApiKey,
    #[error("an article is already being generated")]
    Busy,
    /// Non-2xx answer. `message` is the server-provided text when present.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("No content generated")]
    NoContent,
    #[error("request failed: {0}")]
    Transport(String),
}

fn no_completed_message(language: &Language) -> &'static str {
    match language {
        Language::En => "No completed tasks found. Complete some tasks first!",
        Language::Id => {
            "Tidak ada task yang sudah selesai. Selesaikan beberapa task terlebih dahulu!"
        }
    }
}

/// A completed task with its weak references resolved to names.
#[derive(Debug, Clone)]
pub struct ArticleTask {
    pub task: Task,
    pub category_name: Option<String>,
    pub tag_names: Vec<String>,
}

pub fn collect_completed(state: &AppState) -> Vec<ArticleTask> {
    state
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .map(|task| ArticleTask {
            category_name: task
                .category_id
                .as_deref()
                .and_then(|id| state.category_name(id))
                .map(str::to_string),
            tag_names: state
                .tag_names(task)
                .into_iter()
                .map(str::to_string)
                .collect(),
            task: task.clone(),
        })
        .collect()
}

fn task_summary<Tz: TimeZone>(item: &ArticleTask, language: Language, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let task = &item.task;
    let mut summary = format!("- \"{}\"", task.title);
    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        summary.push_str(&format!(": {description}"));
    }
    summary.push_str(&format!(
        " [Priority: {}]",
        task.priority.as_str().to_uppercase()
    ));
    if let Some(category) = &item.category_name {
        summary.push_str(&format!(" [Category: {category}]"));
    }
    if !item.tag_names.is_empty() {
        summary.push_str(&format!(" [Tags: {}]", item.tag_names.join(", ")));
    }
    if let (Some(start), Some(end)) = (task.started_at, task.completed_at) {
        if let Some(duration) = format_hours_minutes(end - start) {
            summary.push_str(&format!(" [Duration: {duration}]"));
        }
    }
    if let Some(completed) = task.completed_at {
        let local = completed.with_timezone(&now.timezone());
        summary.push_str(&format!(" [Completed: {}]", format_date(&local, language)));
    }
    if !task.comments.is_empty() {
        let comments = task
            .comments
            .iter()
            .map(|c| format!("\"{}\"", c.text))
            .collect::<Vec<_>>()
            .join(", ");
        summary.push_str(&format!("\n  Notes/Comments: {comments}"));
    }
    summary
}

/// `<category>: <n> tasks completed`, one line per category in first-seen order.
fn category_summary(tasks: &[ArticleTask]) -> String {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in tasks {
        let name = item.category_name.as_deref().unwrap_or(UNCATEGORIZED);
        let count = counts.entry(name).or_insert_with(|| {
            order.push(name);
            0
        });
        *count += 1;
    }
    order
        .into_iter()
        .map(|name| format!("{name}: {} tasks completed", counts[name]))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt<Tz: TimeZone>(
    tasks: &[ArticleTask],
    language: Language,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: Display,
{
    let today = format_long_date(now, language);
    let tasks_summary = tasks
        .iter()
        .map(|item| task_summary(item, language, now))
        .collect::<Vec<_>>()
        .join("\n");
    let categories = category_summary(tasks);

    match language {
        Language::Id => format!(
            "Kamu adalah seorang penulis konten profesional yang menulis artikel untuk LinkedIn dan Medium. \
Buatkan sebuah artikel dalam Bahasa Indonesia yang menceritakan perjalanan produktivitas saya berdasarkan task-task yang sudah saya selesaikan.

Tanggal hari ini: {today}

Berikut task yang sudah selesai:
{tasks_summary}

Ringkasan per kategori:
{categories}

Panduan penulisan:
1. Gunakan gaya penulisan profesional tapi tetap casual dan storytelling
2. Buat artikel dengan struktur: Pendahuluan, Project/Kategori yang dikerjakan, Highlight harian, Refleksi, dan Penutup
3. Masukkan detail task secara natural dalam narasi
4. Gunakan markdown formatting (heading, bold, bullet points, emoji)
5. Panjang artikel sekitar 500-800 kata
6. Buat judul yang menarik dan engaging
7. Fokus pada pencapaian dan pembelajaran

Tulis artikel dalam format markdown:"
        ),
        Language::En => format!(
            "You are a professional content writer who writes articles for LinkedIn and Medium. \
Create an article in English that tells my productivity journey based on the tasks I've completed.

Today's date: {today}

Completed tasks:
{tasks_summary}

Summary by category:
{categories}

Writing guidelines:
1. Use a professional yet casual and storytelling writing style
2. Structure the article with: Introduction, Projects/Categories worked on, Daily highlights, Reflections, and Closing
3. Weave task details naturally into the narrative
4. Use markdown formatting (headings, bold, bullet points, emoji)
5. Article length around 500-800 words
6. Create an engaging and attractive title
7. Focus on achievements and learnings

Write the article in markdown format:"
        ),
    }
}

/// Validates the inputs and builds the prompt without touching the network.
pub fn prepare_prompt<Tz: TimeZone>(
    api_key: Option<&str>,
    state: &AppState,
    language: Language,
    now: &DateTime<Tz>,
) -> Result<String, ArticleError>
where
    Tz::Offset: Display,
{
    let tasks = collect_completed(state);
    if tasks.is_empty() {
        return Err(ArticleError::NoCompletedTasks { language });
    }
    if api_key.map(str::trim).unwrap_or("").is_empty() {
        return Err(ArticleError::MissingApiKey);
    }
    Ok(build_prompt(&tasks, language, now))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

pub fn request_url(model: GeminiModel) -> String {
    format!("{GEMINI_BASE_URL}/{}:generateContent", model.id())
}

pub fn request_body(prompt: &str) -> serde_json::Value {
    let config = GenerationConfig {
        temperature: 0.8,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 4096,
    };
    serde_json::json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ],
        "generationConfig": config,
    })
}

/// Maps an HTTP status and body to the generated text.
pub fn parse_response(status: u16, body: &str) -> Result<String, ArticleError> {
    let value: Option<serde_json::Value> = serde_json::from_str(body).ok();
    if !(200..300).contains(&status) {
        let message = value
            .as_ref()
            .and_then(|v| v["error"]["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("API request failed: {status}"));
        return Err(ArticleError::Api { status, message });
    }
    value
        .as_ref()
        .and_then(|v| v["candidates"][0]["content"]["parts"][0]["text"].as_str())
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or(ArticleError::NoContent)
}

/// Single-flight article client. A call made while another is outstanding
/// fails fast with [`ArticleError::Busy`].
#[derive(Debug, Default)]
pub struct ArticleGenerator {
    in_flight: AtomicBool,
}

/// Clears the in-flight flag on drop.
#[derive(Debug)]
pub struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl ArticleGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Result<InFlight<'_>, ArticleError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight {
                flag: &self.in_flight,
            })
            .map_err(|_| ArticleError::Busy)
    }

    #[cfg(feature = "app")]
    pub async fn generate(
        &self,
        api_key: Option<&str>,
        model: GeminiModel,
        state: &AppState,
        language: Language,
    ) -> Result<String, ArticleError> {
        use std::time::Duration;

        let _guard = self.try_begin()?;
        let now = chrono::Local::now();
        let prompt = prepare_prompt(api_key, state, language, &now)?;
        let api_key = api_key.map(str::trim).unwrap_or_default();

        log::info!(
            "article request model={} prompt_chars={}",
            model.id(),
            prompt.chars().count()
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| ArticleError::Transport(format!("failed to build http client: {err}")))?;

        let resp = client
            .post(request_url(model))
            .query(&[("key", api_key)])
            .json(&request_body(&prompt))
            .send()
            .await
            .map_err(|err| ArticleError::Transport(err.without_url().to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|err| ArticleError::Transport(format!("failed to read response: {err}")))?;

        let result = parse_response(status, &text);
        match &result {
            Ok(article) => log::info!("article generated chars={}", article.chars().count()),
            Err(err) => log::warn!("article request failed status={status}: {err}"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::models::{NewCategory, NewTag, NewTask};
    use crate::repository::TaskRepository;
    use chrono::{Duration, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()
    }

    fn completed_state() -> AppState {
        let clock = Clock::manual(start());
        let repo = TaskRepository::with_clock(AppState::empty(start()), clock.clone());
        let work = repo.add_category(NewCategory {
            name: "Work".to_string(),
            color: "#00f".to_string(),
            icon: None,
        });
        let focus = repo.add_tag(NewTag {
            name: "focus".to_string(),
            color: "green".to_string(),
        });

        let mut report = NewTask::titled("Ship report");
        report.description = Some("Q2 numbers".to_string());
        report.category_id = Some(work.id.clone());
        report.tag_ids = vec![focus.id.clone()];
        let report = repo.add_task(report);
        repo.set_status(&report.id, TaskStatus::InProgress);
        clock.advance(Duration::minutes(125));
        repo.set_status(&report.id, TaskStatus::Completed);
        repo.add_comment(&report.id, "sent to finance");

        let chores = repo.add_task(NewTask::titled("Water plants"));
        repo.set_status(&chores.id, TaskStatus::Completed);

        repo.add_task(NewTask::titled("Still pending"));
        repo.export_data()
    }

    #[test]
    fn prompt_lists_completed_tasks_with_resolved_details() {
        let state = completed_state();
        let tasks = collect_completed(&state);
        assert_eq!(tasks.len(), 2);

        let prompt = build_prompt(&tasks, Language::En, &start());
        assert!(prompt.contains("Today's date: Monday, June 3, 2024"));
        assert!(prompt.contains(
            "- \"Ship report\": Q2 numbers [Priority: MEDIUM] [Category: Work] [Tags: focus] [Duration: 2h 5m] [Completed: June 3, 2024]"
        ));
        assert!(prompt.contains("  Notes/Comments: \"sent to finance\""));
        assert!(prompt.contains("- \"Water plants\" [Priority: MEDIUM] [Completed: June 3, 2024]"));
        assert!(prompt.contains("Work: 1 tasks completed\nUncategorized: 1 tasks completed"));
        assert!(!prompt.contains("Still pending"));
    }

    #[test]
    fn indonesian_prompt_uses_localized_template() {
        let state = completed_state();
        let prompt = build_prompt(&collect_completed(&state), Language::Id, &start());
        assert!(prompt.starts_with("Kamu adalah seorang penulis konten profesional"));
        assert!(prompt.contains("Berikut task yang sudah selesai:"));
        assert!(prompt.contains("Juni"));
    }

    #[test]
    fn prepare_requires_completed_tasks_then_api_key() {
        let empty = AppState::empty(start());
        let err = prepare_prompt(Some("key"), &empty, Language::Id, &start()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tidak ada task yang sudah selesai. Selesaikan beberapa task terlebih dahulu!"
        );
        let err = prepare_prompt(Some("key"), &empty, Language::En, &start()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No completed tasks found. Complete some tasks first!"
        );

        let state = completed_state();
        assert!(matches!(
            prepare_prompt(Some("  "), &state, Language::En, &start()),
            Err(ArticleError::MissingApiKey)
        ));
        assert!(prepare_prompt(Some("key"), &state, Language::En, &start()).is_ok());
    }

    #[test]
    fn request_shape_matches_generate_content() {
        assert_eq!(
            request_url(GeminiModel::Pro25),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
        let body = request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn response_parsing_surfaces_server_messages() {
        let ok = r##"{"candidates":[{"content":{"parts":[{"text":"# Article"}]}}]}"##;
        assert_eq!(parse_response(200, ok).unwrap(), "# Article");

        let err = parse_response(400, r#"{"error":{"message":"API key not valid"}}"#).unwrap_err();
        assert_eq!(err.to_string(), "API key not valid");
        assert!(matches!(err, ArticleError::Api { status: 400, .. }));

        let err = parse_response(503, "<html>unavailable</html>").unwrap_err();
        assert_eq!(err.to_string(), "API request failed: 503");

        let err = parse_response(200, r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, ArticleError::NoContent));
        assert_eq!(err.to_string(), "No content generated");
    }

    #[test]
    fn overlapping_requests_are_rejected() {
        let generator = ArticleGenerator::new();
        let first = generator.try_begin().expect("idle generator");
        assert!(matches!(generator.try_begin(), Err(ArticleError::Busy)));
        drop(first);
        assert!(generator.try_begin().is_ok());
    }
}
