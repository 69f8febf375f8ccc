//! Core of the nextone task list.
//! Owns the versioned task store, its repository, and the use cases on top.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod render;
pub mod repo;
pub mod scratch;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::migrations::{latest_version, SCHEMA_VERSION};
pub use db::{open_store, open_store_in_memory, DbError, MigrationError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::mutation::{add_tag, remove_tag, set_status, toggle_status, TaskCommit};
pub use model::task::{validate_tag, Task, TaskId, TaskStatus, TaskValidationError};
pub use render::{parse_task_id, render_all, render_task, task_anchor, RenderedList};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use scratch::{JsonFileScratchStore, MemoryScratchStore, ScratchError, ScratchStore};
pub use service::task_service::{ServiceError, ServiceResult, TaskService};
