//! Word/tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide name-keyed persistence APIs over `words`, `tags` and `word_tags`.
//! - Own tag resolution and orphan-tag cleanup.
//! - Map SQLite constraint failures to semantic errors.
//!
//! # Invariants
//! - Every mutation runs in one `IMMEDIATE` transaction; early returns roll
//!   back on drop.
//! - No tag row survives a mutation without a referencing word.
//! - Word and tag names are compared exactly (`BINARY` collation).

use crate::db::migrations::WORD_TABLES;
use crate::db::DbError;
use crate::model::word::{validate_name, validate_tags, Word, WordValidationError};
use crate::repo::cursor::{Cursor, DEFAULT_PAGE_SIZE};
use log::debug;
use rusqlite::{
    ffi, params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row,
    TransactionBehavior,
};
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

const WORD_SELECT_SQL: &str = "SELECT id, name, content FROM words";
/// Upper bound on `?` binds in one `IN (...)` list, well under SQLite's limit.
const MAX_BINDS_PER_STATEMENT: usize = 500;

pub type RepoResult<T> = Result<T, RepoError>;

/// Lazy sequence of words.
pub type WordIter<'a> = Box<dyn Iterator<Item = RepoResult<Word>> + 'a>;
/// Lazy sequence of tag names.
pub type TagNameIter<'a> = Box<dyn Iterator<Item = RepoResult<String>> + 'a>;

/// Repository error for word persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Caller input failed entry hygiene checks; no SQL ran.
    Validation(WordValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Name already taken by another word.
    DuplicateKey(String),
    /// No word with this name.
    NotFound(String),
    /// Required table is missing from the connection schema.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid word.
    InvalidData(String),
}

impl RepoError {
    /// Stable machine-readable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_input",
            Self::Db(_) => "db_error",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::NotFound(_) => "not_found",
            Self::MissingRequiredTable(_) => "schema_missing",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey(name) => {
                write!(f, "name `{name}` is already taken, pick another name")
            }
            Self::NotFound(name) => write!(f, "word not found: `{name}`"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted word data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WordValidationError> for RepoError {
    fn from(value: WordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for name-keyed word operations.
pub trait WordRepository {
    /// Inserts a new word and links its tags, creating missing tag rows.
    fn create_word(&mut self, word: &Word) -> RepoResult<()>;
    /// Gets one word by exact name.
    fn get_word(&self, name: &str) -> RepoResult<Option<Word>>;
    /// Streams words sorted by name, optionally limited to one exact tag.
    fn list_words(&self, tag: Option<&str>) -> WordIter<'_>;
    /// Streams every stored tag name in ascending order.
    fn list_tag_names(&self) -> TagNameIter<'_>;
    /// Returns words whose name matches a SQL `LIKE` pattern.
    fn search_words(&self, pattern: &str) -> RepoResult<Vec<Word>>;
    /// Returns the number of stored words.
    fn count_words(&self) -> RepoResult<u64>;
    /// Changes the natural key of one word.
    fn rename_word(&mut self, old_name: &str, new_name: &str) -> RepoResult<()>;
    /// Replaces content and/or tags; `None` leaves that field unchanged.
    fn update_word_fields(
        &mut self,
        name: &str,
        content: Option<&str>,
        tags: Option<&BTreeSet<String>>,
    ) -> RepoResult<()>;
    /// Hard-deletes one word and any tag it leaves unreferenced.
    fn delete_word(&mut self, name: &str) -> RepoResult<()>;
}

/// SQLite-backed word repository. Owns its connection.
pub struct SqliteWordRepository {
    conn: Connection,
}

impl SqliteWordRepository {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when migrations were not applied.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_word_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Borrows the underlying connection for read-only inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Streams words with an explicit page size.
    pub fn word_cursor(&self, tag: Option<&str>, page_size: u32) -> Cursor<'_, Word> {
        Cursor::new(
            &self.conn,
            fetch_word_page,
            word_sort_key,
            tag.map(str::to_string),
        )
        .with_page_size(page_size)
    }

    /// Streams tag names with an explicit page size.
    pub fn tag_name_cursor(&self, page_size: u32) -> Cursor<'_, String> {
        Cursor::new(&self.conn, fetch_tag_name_page, String::as_str, None)
            .with_page_size(page_size)
    }
}

impl WordRepository for SqliteWordRepository {
    fn create_word(&mut self, word: &Word) -> RepoResult<()> {
        word.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if word_id(&tx, &word.name)?.is_some() {
            return Err(RepoError::DuplicateKey(word.name.clone()));
        }

        tx.execute(
            "INSERT INTO words (name, content) VALUES (?1, ?2);",
            params![word.name.as_str(), word.content.as_str()],
        )
        .map_err(|err| map_name_conflict(err, &word.name))?;
        let id = tx.last_insert_rowid();

        let tag_ids = resolve_tags(&tx, &word.tags)?;
        link_tags(&tx, id, &tag_ids)?;

        tx.commit()?;
        Ok(())
    }

    fn get_word(&self, name: &str) -> RepoResult<Option<Word>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{WORD_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_word_row(&self.conn, row)?));
        }

        Ok(None)
    }

    fn list_words(&self, tag: Option<&str>) -> WordIter<'_> {
        Box::new(self.word_cursor(tag, DEFAULT_PAGE_SIZE))
    }

    fn list_tag_names(&self) -> TagNameIter<'_> {
        Box::new(self.tag_name_cursor(DEFAULT_PAGE_SIZE))
    }

    fn search_words(&self, pattern: &str) -> RepoResult<Vec<Word>> {
        let mut stmt = self.conn.prepare(&format!(
            "{WORD_SELECT_SQL} WHERE name LIKE ?1 ORDER BY name ASC;"
        ))?;
        let mut rows = stmt.query([pattern])?;
        let mut words = Vec::new();
        while let Some(row) = rows.next()? {
            words.push(parse_word_row(&self.conn, row)?);
        }
        Ok(words)
    }

    fn count_words(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM words;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative word count `{count}`")))
    }

    fn rename_word(&mut self, old_name: &str, new_name: &str) -> RepoResult<()> {
        validate_name(new_name)?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Checked before existence of `old_name`, so renaming onto itself is a
        // collision rather than a no-op.
        if word_id(&tx, new_name)?.is_some() {
            return Err(RepoError::DuplicateKey(new_name.to_string()));
        }
        let Some(id) = word_id(&tx, old_name)? else {
            return Err(RepoError::NotFound(old_name.to_string()));
        };

        tx.execute(
            "UPDATE words SET name = ?2 WHERE id = ?1;",
            params![id, new_name],
        )
        .map_err(|err| map_name_conflict(err, new_name))?;

        tx.commit()?;
        Ok(())
    }

    fn update_word_fields(
        &mut self,
        name: &str,
        content: Option<&str>,
        tags: Option<&BTreeSet<String>>,
    ) -> RepoResult<()> {
        if let Some(tags) = tags {
            validate_tags(tags)?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(id) = word_id(&tx, name)? else {
            return Err(RepoError::NotFound(name.to_string()));
        };

        if let Some(content) = content {
            tx.execute(
                "UPDATE words SET content = ?2 WHERE id = ?1;",
                params![id, content],
            )?;
        }

        if let Some(tags) = tags {
            let previous = tag_ids_for_word(&tx, id)?;
            tx.execute("DELETE FROM word_tags WHERE word_id = ?1;", [id])?;
            let resolved = resolve_tags(&tx, tags)?;
            link_tags(&tx, id, &resolved)?;

            let dropped: Vec<i64> = previous
                .into_iter()
                .filter(|tag_id| !resolved.contains(tag_id))
                .collect();
            delete_orphan_tags(&tx, &dropped)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_word(&mut self, name: &str) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(id) = word_id(&tx, name)? else {
            return Err(RepoError::NotFound(name.to_string()));
        };

        let previous = tag_ids_for_word(&tx, id)?;
        // `word_tags` rows go with the word via ON DELETE CASCADE.
        tx.execute("DELETE FROM words WHERE id = ?1;", [id])?;
        delete_orphan_tags(&tx, &previous)?;

        tx.commit()?;
        Ok(())
    }
}

fn fetch_word_page(
    conn: &Connection,
    tag: Option<&str>,
    after: Option<&str>,
    limit: u32,
) -> RepoResult<Vec<Word>> {
    let mut stmt = conn.prepare(&format!(
        "{WORD_SELECT_SQL}
         WHERE (?1 IS NULL OR EXISTS (
                SELECT 1
                FROM word_tags wt
                INNER JOIN tags t ON t.id = wt.tag_id
                WHERE wt.word_id = words.id
                  AND t.name = ?1
               ))
           AND (?2 IS NULL OR name > ?2)
         ORDER BY name ASC
         LIMIT ?3;"
    ))?;
    let mut rows = stmt.query(params![tag, after, i64::from(limit)])?;
    let mut words = Vec::new();
    while let Some(row) = rows.next()? {
        words.push(parse_word_row(conn, row)?);
    }
    Ok(words)
}

fn fetch_tag_name_page(
    conn: &Connection,
    _filter: Option<&str>,
    after: Option<&str>,
    limit: u32,
) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name
         FROM tags
         WHERE (?1 IS NULL OR name > ?1)
         ORDER BY name ASC
         LIMIT ?2;",
    )?;
    let mut rows = stmt.query(params![after, i64::from(limit)])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get(0)?);
    }
    Ok(names)
}

fn word_sort_key(word: &Word) -> &str {
    &word.name
}

fn parse_word_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Word> {
    let id: i64 = row.get("id")?;
    let word = Word {
        name: row.get("name")?,
        content: row.get("content")?,
        tags: load_tag_names(conn, id)?,
    };
    word.validate().map_err(|err| {
        RepoError::InvalidData(format!("word row {id} fails validation: {err}"))
    })?;
    Ok(word)
}

fn load_tag_names(conn: &Connection, word_id: i64) -> RepoResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM word_tags wt
         INNER JOIN tags t ON t.id = wt.tag_id
         WHERE wt.word_id = ?1;",
    )?;
    let mut rows = stmt.query([word_id])?;
    let mut tags = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tags.insert(row.get(0)?);
    }
    Ok(tags)
}

fn word_id(conn: &Connection, name: &str) -> RepoResult<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM words WHERE name = ?1;", [name], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(id)
}

fn tag_ids_for_word(conn: &Connection, word_id: i64) -> RepoResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT tag_id FROM word_tags WHERE word_id = ?1;")?;
    let mut rows = stmt.query([word_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

/// Maps tag names to row ids, inserting only the names not stored yet.
///
/// Callers hold an `IMMEDIATE` transaction, so no other writer can insert the
/// same name between the lookup and the insert. A unique-constraint hit here
/// is therefore reported as `DuplicateKey` rather than retried.
fn resolve_tags(conn: &Connection, tags: &BTreeSet<String>) -> RepoResult<Vec<i64>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let names: Vec<&String> = tags.iter().collect();
    let mut existing = HashMap::with_capacity(tags.len());
    for chunk in names.chunks(MAX_BINDS_PER_STATEMENT) {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, name FROM tags WHERE name IN ({});",
            placeholders(chunk.len())
        ))?;
        let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
        while let Some(row) = rows.next()? {
            existing.insert(row.get::<_, String>(1)?, row.get::<_, i64>(0)?);
        }
    }

    let mut ids = Vec::with_capacity(tags.len());
    let mut created = 0usize;
    let mut insert = conn.prepare("INSERT INTO tags (name) VALUES (?1);")?;
    for tag in tags {
        if let Some(id) = existing.get(tag) {
            ids.push(*id);
            continue;
        }

        insert
            .execute([tag.as_str()])
            .map_err(|err| map_name_conflict(err, tag))?;
        ids.push(conn.last_insert_rowid());
        created += 1;
    }

    debug!(
        "event=tag_resolve module=repo status=ok requested={} created={}",
        tags.len(),
        created
    );
    Ok(ids)
}

fn link_tags(conn: &Connection, word_id: i64, tag_ids: &[i64]) -> RepoResult<()> {
    let mut stmt = conn.prepare("INSERT INTO word_tags (word_id, tag_id) VALUES (?1, ?2);")?;
    for tag_id in tag_ids {
        stmt.execute(params![word_id, tag_id])?;
    }
    Ok(())
}

/// Deletes the given tags when no word references them any more.
///
/// Only the candidate ids are re-counted, not the whole table.
fn delete_orphan_tags(conn: &Connection, candidates: &[i64]) -> RepoResult<usize> {
    if candidates.is_empty() {
        return Ok(0);
    }

    let mut removed = 0usize;
    for chunk in candidates.chunks(MAX_BINDS_PER_STATEMENT) {
        removed += conn.execute(
            &format!(
                "DELETE FROM tags
                 WHERE id IN ({})
                   AND NOT EXISTS (
                        SELECT 1 FROM word_tags wt WHERE wt.tag_id = tags.id
                   );",
                placeholders(chunk.len())
            ),
            params_from_iter(chunk.iter()),
        )?;
    }

    debug!(
        "event=tag_orphan_cleanup module=repo status=ok candidates={} removed={}",
        candidates.len(),
        removed
    );
    Ok(removed)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

fn map_name_conflict(err: rusqlite::Error, name: &str) -> RepoError {
    if is_unique_violation(&err) {
        RepoError::DuplicateKey(name.to_string())
    } else {
        err.into()
    }
}

fn ensure_word_connection_ready(conn: &Connection) -> RepoResult<()> {
    for table in WORD_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
