//! Lazy, keyset-paged read cursor.
//!
//! # Responsibility
//! - Stream query results page by page instead of materializing them.
//!
//! # Invariants
//! - Pages are requested strictly after the last yielded sort key, so every
//!   row is yielded at most once and the sequence is finite.
//! - The cursor borrows the connection; callers holding it cannot mutate the
//!   store through the same handle until it is dropped.
//! - All pages are read inside one deferred read transaction, opened on the
//!   first fetch when no other transaction is active and ended on drop.
//! - After the first error the cursor is exhausted.

use crate::repo::word_repo::RepoResult;
use rusqlite::{Connection, Transaction};
use std::collections::VecDeque;

/// Rows fetched per page by default.
pub const DEFAULT_PAGE_SIZE: u32 = 64;

/// Loads one page: `(conn, filter, after_key, limit)`.
pub type PageFetcher<T> = fn(&Connection, Option<&str>, Option<&str>, u32) -> RepoResult<Vec<T>>;

/// Single-pass iterator over rows ordered by a unique text key.
pub struct Cursor<'conn, T> {
    conn: &'conn Connection,
    read_tx: Option<Transaction<'conn>>,
    fetch_page: PageFetcher<T>,
    sort_key: fn(&T) -> &str,
    filter: Option<String>,
    after: Option<String>,
    page_size: u32,
    buffered: VecDeque<T>,
    exhausted: bool,
}

impl<'conn, T> Cursor<'conn, T> {
    pub(crate) fn new(
        conn: &'conn Connection,
        fetch_page: PageFetcher<T>,
        sort_key: fn(&T) -> &str,
        filter: Option<String>,
    ) -> Self {
        Self {
            conn,
            read_tx: None,
            fetch_page,
            sort_key,
            filter,
            after: None,
            page_size: DEFAULT_PAGE_SIZE,
            buffered: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Overrides how many rows each underlying query fetches.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn load_next_page(&mut self) -> RepoResult<()> {
        if self.read_tx.is_none() && self.conn.is_autocommit() {
            self.read_tx = Some(self.conn.unchecked_transaction()?);
        }

        let page = (self.fetch_page)(
            self.conn,
            self.filter.as_deref(),
            self.after.as_deref(),
            self.page_size,
        )?;

        if page.len() < self.page_size as usize {
            self.exhausted = true;
            self.read_tx = None;
        }
        if let Some(last) = page.last() {
            self.after = Some((self.sort_key)(last).to_string());
        }
        self.buffered.extend(page);
        Ok(())
    }
}

impl<T> Iterator for Cursor<'_, T> {
    type Item = RepoResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffered.is_empty() && !self.exhausted {
            if let Err(err) = self.load_next_page() {
                self.exhausted = true;
                self.read_tx = None;
                return Some(Err(err));
            }
        }
        self.buffered.pop_front().map(Ok)
    }
}
