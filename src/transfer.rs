use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::models::AppState;
use crate::storage::{write_atomic, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid data file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write file: {0}")]
    Storage(#[from] StorageError),
}

/// `<dir>/<stem>-<YYYYmmdd-HHMMSS>.<ext>`
pub fn default_export_path<Tz: TimeZone>(
    dir: &Path,
    stem: &str,
    ext: &str,
    now: &DateTime<Tz>,
) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    let stamp = now.format("%Y%m%d-%H%M%S");
    dir.join(format!("{stem}-{stamp}.{ext}"))
}

pub fn export_json(state: &AppState) -> Result<String, TransferError> {
    Ok(serde_json::to_string_pretty(state)?)
}

pub fn export_to_file(state: &AppState, path: &Path) -> Result<(), TransferError> {
    let json = export_json(state)?;
    write_file(path, json.as_bytes())
}

/// The whole text must parse as an [`AppState`] document.
pub fn parse_import(text: &str) -> Result<AppState, TransferError> {
    Ok(serde_json::from_str(text)?)
}

pub fn import_from_file(path: &Path) -> Result<AppState, TransferError> {
    let text = fs::read_to_string(path)?;
    parse_import(&text)
}

pub fn write_markdown(content: &str, path: &Path) -> Result<(), TransferError> {
    write_file(path, content.as_bytes())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), TransferError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_atomic(path, bytes)?;
    log::info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTask;
    use crate::repository::TaskRepository;
    use chrono::Utc;

    #[test]
    fn export_is_pretty_and_imports_back() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TaskRepository::new(AppState::default());
        repo.add_task(NewTask::titled("exported"));
        let state = repo.export_data();

        let path = dir.path().join("nested").join("export.json");
        export_to_file(&state, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"tasks\""));
        assert!(text.contains("\"lastUpdated\""));

        let imported = import_from_file(&path).unwrap();
        assert_eq!(imported, state);
    }

    #[test]
    fn malformed_import_is_an_error() {
        let err = parse_import("{ not json").unwrap_err();
        assert!(matches!(err, TransferError::Json(_)));
        assert!(err.to_string().starts_with("invalid data file"));

        let err = parse_import(r#"{"tasks": [{"title": 3}]}"#).unwrap_err();
        assert!(matches!(err, TransferError::Json(_)));

        let missing = Path::new("/definitely/not/here.json");
        assert!(matches!(
            import_from_file(missing),
            Err(TransferError::Io(_))
        ));
    }

    #[test]
    fn markdown_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("article.md");
        write_markdown("# Title\n\nbody\n", &path).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "# Title\n\nbody\n");
    }

    #[test]
    fn default_export_path_embeds_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();
        let path = default_export_path(Path::new("/tmp/x"), "taskflow", "json", &now);
        assert_eq!(path, PathBuf::from("/tmp/x/taskflow-20240203-040506.json"));
    }
}
