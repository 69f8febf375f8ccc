//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the task data access contract.
//! - Isolate SQLite and JSON encoding details from services and callers.
//!
//! # Invariants
//! - Repositories are only constructed over migrated, verified connections.
//! - A missing id is a soft outcome (`None` / `false`), not an error.

pub mod task_repo;
