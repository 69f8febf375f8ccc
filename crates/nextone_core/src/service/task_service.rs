//! Task use-case service.
//!
//! # Responsibility
//! - Provide create/toggle/status/tag/delete/list entry points for callers.
//! - Apply caller-side rules (trimmed, non-empty text, one-word tags) before
//!   persistence.
//! - Read and write the selection through an injected scratch store.
//!
//! # Invariants
//! - Service APIs never bypass repository transactions.
//! - Status and tag changes go through `get_and_modify` with store-independent
//!   mutators.

use crate::model::mutation::{add_tag, remove_tag, set_status, toggle_status};
use crate::model::task::{validate_tag, Task, TaskId, TaskStatus, TaskValidationError};
use crate::repo::task_repo::{RepoError, TaskRepository};
use crate::scratch::{read_selection, write_selection, ScratchError, ScratchStore};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] TaskValidationError),
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Scratch(#[from] ScratchError),
    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Use-case wrapper over a task repository.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates a pending task from user input.
    ///
    /// # Contract
    /// - Text is trimmed; blank text is rejected with `EmptyText`.
    /// - The repository assigns the id.
    pub fn create_task(&self, text: &str) -> ServiceResult<Task> {
        let task = Task::new(text.trim());
        task.validate()?;
        Ok(self.repo.put(task)?)
    }

    /// Flips `pending` <-> `done`.
    pub fn toggle_task(&self, id: TaskId) -> ServiceResult<Task> {
        self.repo
            .get_and_modify(id, toggle_status)?
            .ok_or(ServiceError::TaskNotFound(id))
    }

    pub fn set_task_status(&self, id: TaskId, status: TaskStatus) -> ServiceResult<Task> {
        self.repo
            .get_and_modify(id, set_status(status))?
            .ok_or(ServiceError::TaskNotFound(id))
    }

    /// Attaches a trimmed, single-word tag. Adding a present tag is a no-op
    /// write.
    pub fn add_tag(&self, id: TaskId, tag: &str) -> ServiceResult<Task> {
        let tag = tag.trim();
        validate_tag(tag)?;
        self.repo
            .get_and_modify(id, add_tag(tag))?
            .ok_or(ServiceError::TaskNotFound(id))
    }

    pub fn remove_tag(&self, id: TaskId, tag: &str) -> ServiceResult<Task> {
        self.repo
            .get_and_modify(id, remove_tag(tag.trim()))?
            .ok_or(ServiceError::TaskNotFound(id))
    }

    /// Deletes a task. Returns `false` when it did not exist.
    pub fn delete_task(&self, id: TaskId) -> ServiceResult<bool> {
        Ok(self.repo.delete(id)?)
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<Option<Task>> {
        Ok(self.repo.get(id)?)
    }

    /// Lists tasks in `by_status` descending order.
    pub fn list_tasks(&self) -> ServiceResult<Vec<Task>> {
        Ok(self.repo.list_all()?)
    }

    /// Pretty JSON array of every task in listing order.
    pub fn export_json(&self) -> ServiceResult<String> {
        let tasks = self.repo.list_all()?;
        Ok(serde_json::to_string_pretty(&tasks)?)
    }

    /// Marks `id` as the selected task.
    ///
    /// Existence is checked once here; later deletes may leave the selection
    /// stale.
    pub fn select_task(&self, scratch: &mut dyn ScratchStore, id: TaskId) -> ServiceResult<()> {
        if self.repo.get(id)?.is_none() {
            return Err(ServiceError::TaskNotFound(id));
        }
        write_selection(scratch, id)?;
        Ok(())
    }

    pub fn selected_task(&self, scratch: &dyn ScratchStore) -> Option<TaskId> {
        read_selection(scratch)
    }
}
