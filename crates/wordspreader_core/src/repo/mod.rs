//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define name-keyed data access contracts for words and tags.
//! - Isolate SQLite query details from the store service.
//!
//! # Invariants
//! - Repository writes validate input before any SQL mutation.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateKey`) in
//!   addition to DB transport errors.

pub mod cursor;
pub mod word_repo;
