//! Task domain model.
//!
//! # Responsibility
//! - Define the single persisted record of the task list.
//! - Keep the on-disk JSON shape `{ id, text, status, tags }` stable.
//!
//! # Invariants
//! - `id` is the creation timestamp in epoch milliseconds and never changes
//!   once assigned.
//! - `status` defaults to `pending` when a record does not carry one.
//! - `tags` is omitted while empty; a missing or `null` array reads as empty.
//! - Fields unknown to this model are preserved through read/write cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Primary key of a task: creation time in epoch milliseconds.
pub type TaskId = i64;

/// Task lifecycle state.
///
/// Stored as lowercase strings. Listing order depends on the string form
/// (`pending` sorts after `done` when descending), not on any rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not finished yet. Default for new and legacy records.
    #[default]
    Pending,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Returns the persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }

    /// Returns the opposite status.
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Done,
            Self::Done => Self::Pending,
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            other => Err(TaskValidationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Caller-side validation failures.
///
/// The store itself accepts any text; these rules belong to use-case callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskValidationError {
    #[error("task text cannot be empty")]
    EmptyText,
    #[error("unknown task status `{0}`; expected pending|done")]
    UnknownStatus(String),
    #[error("tag cannot be empty")]
    EmptyTag,
    #[error("tag `{0}` must be a single word")]
    InvalidTag(String),
}

/// Checks the caller convention that a tag is one non-empty word.
pub fn validate_tag(tag: &str) -> Result<(), TaskValidationError> {
    if tag.is_empty() {
        return Err(TaskValidationError::EmptyTag);
    }
    if tag.chars().any(char::is_whitespace) {
        return Err(TaskValidationError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// The persisted task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Assigned by the repository on first insert when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    pub text: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Labels in the order they were added, without duplicates.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
    /// Fields written by other schema versions. Round-tripped untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Creates a pending task without an id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            status: TaskStatus::Pending,
            tags: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Creates a pending task with a caller-provided id.
    ///
    /// Used for upserts and for tests that need deterministic ordering.
    pub fn with_id(id: TaskId, text: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::new(text)
        }
    }

    /// Returns a copy with the given status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Checks the caller convention that task text is not blank.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.text.trim().is_empty() {
            return Err(TaskValidationError::EmptyText);
        }
        Ok(())
    }

    /// Returns a copy carrying `tag`, unless it is already present.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Creation time derived from the id, when the id is assigned and in range.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.id.and_then(DateTime::from_timestamp_millis)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{validate_tag, Task, TaskStatus, TaskValidationError};
    use serde_json::json;

    #[test]
    fn status_round_trips_through_string_form() {
        for status in [TaskStatus::Pending, TaskStatus::Done] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert_eq!(
            "open".parse::<TaskStatus>().unwrap_err(),
            TaskValidationError::UnknownStatus("open".to_string())
        );
    }

    #[test]
    fn toggled_flips_between_pending_and_done() {
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.toggled(), TaskStatus::Pending);
    }

    #[test]
    fn record_without_status_decodes_as_pending() {
        let task: Task = serde_json::from_value(json!({ "id": 7, "text": "legacy" })).unwrap();
        assert_eq!(task.id, Some(7));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.extra.is_empty());
    }

    #[test]
    fn unknown_fields_survive_encode() {
        let task: Task = serde_json::from_value(json!({
            "id": 1,
            "text": "a",
            "status": "done",
            "priority": 2
        }))
        .unwrap();
        let encoded = serde_json::to_value(&task).unwrap();
        assert_eq!(encoded["priority"], json!(2));
        assert_eq!(encoded["status"], json!("done"));
    }

    #[test]
    fn tags_decode_from_array_or_null() {
        let tagged: Task =
            serde_json::from_value(json!({ "text": "a", "tags": ["home", "work"] })).unwrap();
        assert_eq!(tagged.tags, vec!["home", "work"]);
        assert!(tagged.extra.is_empty());

        let null: Task = serde_json::from_value(json!({ "text": "b", "tags": null })).unwrap();
        assert!(null.tags.is_empty());
    }

    #[test]
    fn empty_tags_are_not_encoded() {
        let encoded = serde_json::to_value(Task::with_id(1, "a")).unwrap();
        assert!(encoded.get("tags").is_none());

        let encoded = serde_json::to_value(Task::with_id(1, "a").with_tag("home")).unwrap();
        assert_eq!(encoded["tags"], json!(["home"]));
    }

    #[test]
    fn with_tag_skips_duplicates() {
        let task = Task::new("a").with_tag("home").with_tag("work").with_tag("home");
        assert_eq!(task.tags, vec!["home", "work"]);
    }

    #[test]
    fn validate_tag_requires_one_word() {
        assert!(validate_tag("home").is_ok());
        assert_eq!(validate_tag(""), Err(TaskValidationError::EmptyTag));
        assert_eq!(
            validate_tag("two words"),
            Err(TaskValidationError::InvalidTag("two words".to_string()))
        );
    }

    #[test]
    fn new_task_omits_id_until_assigned() {
        let encoded = serde_json::to_value(Task::new("draft")).unwrap();
        assert!(encoded.get("id").is_none());
        assert_eq!(encoded["status"], json!("pending"));
    }

    #[test]
    fn validate_rejects_blank_text() {
        assert_eq!(
            Task::new("   ").validate(),
            Err(TaskValidationError::EmptyText)
        );
        assert!(Task::new("buy milk").validate().is_ok());
    }

    #[test]
    fn created_at_uses_id_milliseconds() {
        let task = Task::with_id(86_400_000, "tomorrow");
        let created = task.created_at().unwrap();
        assert_eq!(created.format("%Y-%m-%d").to_string(), "1970-01-02");
        assert!(Task::new("no id").created_at().is_none());
    }
}
