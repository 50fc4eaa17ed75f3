//! Task domain model.
//!
//! # Responsibility
//! - Define the one entity the list shows.
//! - Decode façade rows into tasks without silently defaulting bad data.

use crate::db::{KEY_ID, KEY_TASK};
use crate::provider::ContentValues;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned row identifier.
pub type TaskId = i64;

/// One to-do entry.
///
/// Serialized with the façade row shape: `{"id": .., "task": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "task")]
    pub text: String,
}

/// Row data read back from the façade could not be turned into a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDataError {
    MissingColumn(&'static str),
    InvalidId(String),
    InvalidText(String),
}

impl Display for TaskDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn(column) => write!(f, "row is missing column `{column}`"),
            Self::InvalidId(value) => write!(f, "invalid task id `{value}`"),
            Self::InvalidText(value) => write!(f, "invalid task text: {value}"),
        }
    }
}

impl Error for TaskDataError {}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Decodes one façade row.
    ///
    /// An id delivered as decimal text is accepted; anything non-numeric or
    /// negative is rejected.
    pub fn from_values(values: &ContentValues) -> Result<Self, TaskDataError> {
        let id = match values.get(KEY_ID) {
            Some(value) => parse_id(value)?,
            None => return Err(TaskDataError::MissingColumn(KEY_ID)),
        };
        let text = match values.get(KEY_TASK) {
            Some(Value::Text(text)) => text.clone(),
            Some(Value::Null) => return Err(TaskDataError::InvalidText("null".to_string())),
            Some(other) => return Err(TaskDataError::InvalidText(format!("{other:?}"))),
            None => return Err(TaskDataError::MissingColumn(KEY_TASK)),
        };
        Ok(Self { id, text })
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

fn parse_id(value: &Value) -> Result<TaskId, TaskDataError> {
    let id = match value {
        Value::Integer(id) => *id,
        Value::Text(text) => text
            .parse::<TaskId>()
            .map_err(|_| TaskDataError::InvalidId(text.clone()))?,
        other => return Err(TaskDataError::InvalidId(format!("{other:?}"))),
    };
    if id < 0 {
        return Err(TaskDataError::InvalidId(id.to_string()));
    }
    Ok(id)
}
