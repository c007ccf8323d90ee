//! Word store use-case service.
//!
//! # Responsibility
//! - Expose the create/fetch/list/update/rename/delete surface callers use.
//! - Order composite updates: fields first, rename second.
//! - Emit metadata-only diagnostic events for each operation.
//!
//! # Invariants
//! - Absence is `None` for reads and `RepoError::NotFound` for mutations.
//! - A failed rename inside `update` does not undo the field change that was
//!   already committed by the same call.
//! - Word content and names are never written to logs.

use crate::db::{open_db, open_db_in_memory};
use crate::model::word::{Word, WordUpdate};
use crate::repo::word_repo::{
    RepoError, RepoResult, SqliteWordRepository, TagNameIter, WordIter, WordRepository,
};
use log::debug;
use std::path::Path;
use std::time::Instant;

/// Persistence facade for words and their tags.
pub struct WordStore<R: WordRepository = SqliteWordRepository> {
    repo: R,
}

impl WordStore<SqliteWordRepository> {
    /// Opens (or creates) a word database file, applying migrations first.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let conn = open_db(path)?;
        Ok(Self::new(SqliteWordRepository::try_new(conn)?))
    }

    /// Opens a fresh in-memory word database.
    pub fn open_in_memory() -> RepoResult<Self> {
        let conn = open_db_in_memory()?;
        Ok(Self::new(SqliteWordRepository::try_new(conn)?))
    }
}

impl<R: WordRepository> WordStore<R> {
    /// Creates a store using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Borrows the backing repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates one word and returns it as persisted.
    ///
    /// # Errors
    /// - `DuplicateKey` when `name` is already used.
    /// - `Validation` for an empty name or a blank tag.
    pub fn create<I, S>(
        &mut self,
        name: impl Into<String>,
        content: impl Into<String>,
        tags: I,
    ) -> RepoResult<Word>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let started_at = Instant::now();
        let word = Word::new(name, content, tags);
        let result = self.repo.create_word(&word).and_then(|()| {
            self.repo.get_word(&word.name)?.ok_or_else(|| {
                RepoError::InvalidData("created word not found in read-back".to_string())
            })
        });
        trace_op("word_create", started_at, &result);
        result
    }

    /// Gets one word by name; `None` when no such word exists.
    pub fn fetch(&self, name: &str) -> RepoResult<Option<Word>> {
        self.repo.get_word(name)
    }

    /// Lazily lists words by name, optionally restricted to one exact tag.
    ///
    /// The sequence is single-pass and borrows the store until dropped.
    pub fn list(&self, tag: Option<&str>) -> WordIter<'_> {
        self.repo.list_words(tag)
    }

    /// Lazily lists every tag name in ascending order.
    pub fn all_tag_names(&self) -> TagNameIter<'_> {
        self.repo.list_tag_names()
    }

    /// Finds words whose name matches a SQL `LIKE` pattern (`%`, `_`).
    pub fn search(&self, pattern: &str) -> RepoResult<Vec<Word>> {
        self.repo.search_words(pattern)
    }

    /// Returns the number of stored words.
    pub fn count(&self) -> RepoResult<u64> {
        self.repo.count_words()
    }

    /// Renames one word, keeping content and tags.
    ///
    /// # Errors
    /// - `DuplicateKey` when `new_name` is taken, including `old_name` itself.
    /// - `NotFound` when `old_name` does not exist.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.rename_word(old_name, new_name);
        trace_op("word_rename", started_at, &result);
        result
    }

    /// Applies a composite update.
    ///
    /// Content and tags are committed first in one transaction. A rename to a
    /// different name follows as its own step and may still fail with
    /// `DuplicateKey`, leaving the field change in place.
    ///
    /// # Errors
    /// - `NotFound` when `name` does not exist, even if nothing was requested.
    pub fn update(&mut self, name: &str, update: WordUpdate) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.apply_update(name, update);
        trace_op("word_update", started_at, &result);
        result
    }

    /// Replaces content only.
    pub fn set_content(&mut self, name: &str, content: impl Into<String>) -> RepoResult<()> {
        self.update(name, WordUpdate::content(content))
    }

    /// Replaces the tag set only; an empty iterator clears every tag.
    pub fn set_tags<I, S>(&mut self, name: &str, tags: I) -> RepoResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update(name, WordUpdate::tags(tags))
    }

    /// Deletes one word and any tag no other word references.
    ///
    /// # Errors
    /// - `NotFound` when the word does not exist.
    pub fn delete(&mut self, name: &str) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_word(name);
        trace_op("word_delete", started_at, &result);
        result
    }

    fn apply_update(&mut self, name: &str, update: WordUpdate) -> RepoResult<()> {
        let WordUpdate {
            content,
            tags,
            new_name,
        } = update;

        let content = content.into_value();
        let tags = tags.into_value();
        let fields_changed = content.is_some() || tags.is_some();
        if fields_changed {
            self.repo
                .update_word_fields(name, content.as_deref(), tags.as_ref())?;
        }

        match new_name {
            Some(new_name) if new_name != name => self.repo.rename_word(name, &new_name),
            _ if !fields_changed && self.repo.get_word(name)?.is_none() => {
                Err(RepoError::NotFound(name.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn trace_op<T>(event: &'static str, started_at: Instant, result: &RepoResult<T>) {
    match result {
        Ok(_) => debug!(
            "event={event} module=store status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => debug!(
            "event={event} module=store status=error duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
}
