//! Domain model for named word entries.
//!
//! # Responsibility
//! - Define the data structures exchanged between store and callers.
//!
//! # Invariants
//! - Every entry is identified by its unique `name`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod word;
