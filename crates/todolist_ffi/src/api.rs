//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the to-do provider to Dart through FRB sync functions.
//! - Flatten core errors into message strings.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every call opens the configured database, runs one provider
//!   operation and closes it again.

use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;
use todolist_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ContentAddress,
    ContentValues, QueryRequest, Selection, Task, TodoProvider,
};

const DB_PATH_ENV: &str = "TODOLIST_DB_PATH";
const ENTRY_DB_FILE_NAME: &str = "todolist_entry.sqlite3";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns an empty string on success and the error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One list row as shown by the Flutter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoListItem {
    pub id: i64,
    pub task: String,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoListResponse {
    pub ok: bool,
    /// Rows in storage order; empty on failure.
    pub items: Vec<TodoListItem>,
    pub message: String,
}

/// Mutation response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoActionResponse {
    pub ok: bool,
    /// Content URI of the created row (add only).
    pub uri: Option<String>,
    /// Id of the created row (add only).
    pub id: Option<i64>,
    /// Rows removed (delete only).
    pub affected: u32,
    pub message: String,
}

impl TodoActionResponse {
    fn added(uri: String, id: Option<i64>) -> Self {
        Self {
            ok: true,
            uri: Some(uri),
            id,
            affected: 0,
            message: "Task added.".to_string(),
        }
    }

    fn deleted(affected: usize) -> Self {
        Self {
            ok: true,
            uri: None,
            id: None,
            affected: u32::try_from(affected).unwrap_or(u32::MAX),
            message: if affected == 0 {
                "No task deleted.".to_string()
            } else {
                "Task deleted.".to_string()
            },
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            uri: None,
            id: None,
            affected: 0,
            message: message.into(),
        }
    }
}

/// Adds a task from the entry field.
///
/// # FFI contract
/// - Whitespace-only text is rejected with `ok=false`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_add(text: String) -> TodoActionResponse {
    if text.trim().is_empty() {
        return TodoActionResponse::failure("todo_add failed: task text is empty");
    }
    let result = with_provider(|provider| {
        provider
            .insert(
                &ContentAddress::Collection.to_uri(),
                &ContentValues::with_task(text),
            )
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(uri) => {
            let id = match ContentAddress::parse(&uri) {
                Ok(ContentAddress::Item(id)) => Some(id),
                _ => None,
            };
            TodoActionResponse::added(uri, id)
        }
        Err(err) => TodoActionResponse::failure(format!("todo_add failed: {err}")),
    }
}

/// Lists every task in storage order.
///
/// # FFI contract
/// - Never panics; failures return `ok=false` and an empty list.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_list() -> TodoListResponse {
    let result = with_provider(|provider| {
        let rows = provider
            .query(&ContentAddress::Collection.to_uri(), &QueryRequest::all())
            .map_err(|err| err.to_string())?;
        rows.rows()
            .iter()
            .map(|row| Task::from_values(row).map_err(|err| err.to_string()))
            .collect::<Result<Vec<_>, _>>()
    });
    match result {
        Ok(tasks) => TodoListResponse {
            ok: true,
            message: format!("{} task(s).", tasks.len()),
            items: tasks
                .into_iter()
                .map(|task| TodoListItem {
                    id: task.id,
                    task: task.text,
                })
                .collect(),
        },
        Err(err) => TodoListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("todo_list failed: {err}"),
        },
    }
}

/// Deletes one task by id (the row's check action).
///
/// # FFI contract
/// - A missing id is not an error; `affected` is `0`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_delete(id: i64) -> TodoActionResponse {
    let result = with_provider(|provider| {
        provider
            .delete(&ContentAddress::Item(id).to_uri(), &Selection::all())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(affected) => TodoActionResponse::deleted(affected),
        Err(err) => TodoActionResponse::failure(format!("todo_delete failed: {err}")),
    }
}

/// Returns the MIME type of a content URI, or an empty string when the URI
/// is unsupported.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_content_type(uri: String) -> String {
    ContentAddress::parse(uri.trim())
        .map(|address| address.content_type().to_string())
        .unwrap_or_default()
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| db_path_from(std::env::var(DB_PATH_ENV).ok()))
        .clone()
}

fn db_path_from(configured: Option<String>) -> PathBuf {
    if let Some(raw) = configured {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(ENTRY_DB_FILE_NAME)
}

fn with_provider<T>(
    f: impl FnOnce(&TodoProvider) -> Result<T, String>,
) -> Result<T, String> {
    let provider = TodoProvider::open(resolve_db_path())
        .map_err(|err| format!("todo DB open failed: {err}"))?;
    let result = f(&provider);
    if let Err(err) = provider.close() {
        warn!("event=db_close module=ffi status=error error={err}");
    }
    result
}
