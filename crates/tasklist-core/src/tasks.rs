use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Opaque task identifier. Fresh ids are random UUIDs; ids read from disk
/// are kept verbatim whatever their format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Task entity as held in memory and persisted to the task file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// A missing or null flag means pending.
    #[serde(default, deserialize_with = "null_as_false")]
    pub completed: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Unset until the first edit or toggle.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    /// Keys this version does not know about, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Build a pending task. The title is expected to be normalized already.
    pub fn new(title: String) -> Self {
        Self {
            id: TaskId::generate(),
            title,
            completed: false,
            created_at: Utc::now(),
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub fn rename(&mut self, title: String) {
        self.title = title;
        self.updated_at = Some(Utc::now());
    }

    pub fn toggle(&mut self) {
        self.completed = !self.completed;
        self.updated_at = Some(Utc::now());
    }

    /// Case-insensitive substring match; `needle` must already be lower-cased.
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Trim a user-supplied title, rejecting blank input.
pub fn normalize_title(raw: &str) -> Result<String, TaskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Ordering applied to the derived view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Most recently created first.
    #[default]
    ByDate,
    /// Title A-Z, ignoring case.
    Alphabetical,
}

impl SortMode {
    pub fn toggle(self) -> Self {
        match self {
            SortMode::ByDate => SortMode::Alphabetical,
            SortMode::Alphabetical => SortMode::ByDate,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::ByDate => "by date",
            SortMode::Alphabetical => "A-Z",
        }
    }
}

/// Aggregate counters shown next to the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            pending: total - completed,
            completed,
        }
    }
}

/// Filter by `search` then sort by `mode`. Always returns owned copies.
pub fn query(tasks: &[Task], search: &str, mode: SortMode) -> Vec<Task> {
    let needle = search.trim().to_lowercase();
    let mut view: Vec<Task> = if needle.is_empty() {
        tasks.to_vec()
    } else {
        tasks.iter().filter(|t| t.matches(&needle)).cloned().collect()
    };

    // `sort_by` is stable, so ties keep collection order.
    match mode {
        SortMode::Alphabetical => {
            view.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        }
        SortMode::ByDate => view.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    view
}

/// Errors surfaced by task store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Title was blank after trimming.
    #[error("task title cannot be empty")]
    EmptyTitle,
    /// The referenced task no longer exists.
    #[error("task not found: {id}")]
    NotFound { id: String },
    /// The task file could not be parsed and was reset.
    #[error("task file was corrupt and has been reset: {reason}")]
    CorruptStorage { reason: String },
    /// Reading or writing the task file failed.
    #[error("task storage failure: {reason}")]
    StorageIo { reason: String },
}

/// Serde helpers accepting RFC 3339 as well as offset-less local ISO-8601
/// timestamps, which earlier task files contain.
mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        let naive: NaiveDateTime = raw
            .parse()
            .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))?;
        // Wall-clock times skipped by a DST change have no local instant.
        Ok(Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()))
    }

    pub mod option {
        use serde::de::Error as _;

        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| parse(&raw).map_err(D::Error::custom))
                .transpose()
        }
    }
}
