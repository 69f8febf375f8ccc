//! Store-independent task mutations.
//!
//! # Responsibility
//! - Provide the explicit commit handle used by read-modify-write operations.
//! - Hold mutation rules (status toggle, explicit status, tag edits) as plain
//!   functions.
//!
//! # Invariants
//! - A mutation persists only when it calls [`TaskCommit::commit`].
//! - An absent record never produces a commit from the built-in mutators.

use crate::model::task::{Task, TaskStatus};

/// Staging slot handed to a mutator during a read-modify-write.
///
/// The last committed record wins when `commit` is called more than once.
#[derive(Debug, Default)]
pub struct TaskCommit {
    staged: Option<Task>,
}

impl TaskCommit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `task` to be written when the surrounding transaction commits.
    pub fn commit(&mut self, task: Task) {
        self.staged = Some(task);
    }

    pub fn is_committed(&self) -> bool {
        self.staged.is_some()
    }

    /// Returns the staged record, if any.
    pub fn into_staged(self) -> Option<Task> {
        self.staged
    }
}

/// Flips `pending` <-> `done` and commits. Does nothing for an absent record.
pub fn toggle_status(task: Option<Task>, commit: &mut TaskCommit) {
    if let Some(mut task) = task {
        task.status = task.status.toggled();
        commit.commit(task);
    }
}

/// Builds a mutator that sets an explicit status.
///
/// Commits even when the status is already `status`, so the write is
/// observable the same way a toggle is.
pub fn set_status(status: TaskStatus) -> impl FnOnce(Option<Task>, &mut TaskCommit) {
    move |task, commit| {
        if let Some(mut task) = task {
            task.status = status;
            commit.commit(task);
        }
    }
}

/// Builds a mutator that appends `tag` unless the task already carries it.
pub fn add_tag(tag: impl Into<String>) -> impl FnOnce(Option<Task>, &mut TaskCommit) {
    let tag = tag.into();
    move |task, commit| {
        if let Some(task) = task {
            commit.commit(task.with_tag(tag));
        }
    }
}

/// Builds a mutator that drops `tag`. Commits the record unchanged when the
/// tag is not there.
pub fn remove_tag(tag: impl Into<String>) -> impl FnOnce(Option<Task>, &mut TaskCommit) {
    let tag = tag.into();
    move |task, commit| {
        if let Some(mut task) = task {
            task.tags.retain(|existing| *existing != tag);
            commit.commit(task);
        }
    }
}
