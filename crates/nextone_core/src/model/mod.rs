//! Task domain model.
//!
//! # Responsibility
//! - Define the persisted task record and its status enum.
//! - Keep mutation rules independent of storage mechanics.
//!
//! # Invariants
//! - Every task is identified by its creation timestamp (`TaskId`).
//! - Deletion is immediate; there are no tombstones.

pub mod mutation;
pub mod task;
