//! Core persistence for WordSpreader.
//! Named text snippets with shared tags, stored in SQLite.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::word::{FieldUpdate, Word, WordUpdate, WordValidationError};
pub use repo::cursor::Cursor;
pub use repo::word_repo::{
    RepoError, RepoResult, SqliteWordRepository, TagNameIter, WordIter, WordRepository,
};
pub use service::word_service::WordStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
