use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::{BookStore, CachedAt, QuoteStore, SyncLog};
use crate::models::{Book, Quote};

/// Schema version written to `PRAGMA user_version` once all migrations ran.
pub const SCHEMA_VERSION: i64 = 3;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS books (
    isbn TEXT PRIMARY KEY NOT NULL,
    authors TEXT NOT NULL DEFAULT '[]',
    categories TEXT NOT NULL DEFAULT '[]',
    long_description TEXT,
    page_count INTEGER NOT NULL DEFAULT 0,
    short_description TEXT,
    status TEXT NOT NULL DEFAULT '',
    thumbnail_url TEXT,
    title TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS quotes (
    local_id INTEGER PRIMARY KEY AUTOINCREMENT,
    id INTEGER NOT NULL,
    category TEXT NOT NULL,
    quote TEXT NOT NULL,
    author TEXT NOT NULL,
    description TEXT NOT NULL
);
";

// Version 1 did not enforce unique API ids. Collapse duplicates onto the
// newest row first so the unique index cannot fail on old databases.
const SCHEMA_V2: &str = "
DELETE FROM quotes
WHERE local_id NOT IN (SELECT MAX(local_id) FROM quotes GROUP BY id);
CREATE UNIQUE INDEX IF NOT EXISTS index_quotes_id ON quotes (id);
CREATE INDEX IF NOT EXISTS index_quotes_category ON quotes (category COLLATE NOCASE);
";

const SCHEMA_V3: &str = "
CREATE TABLE IF NOT EXISTS sync_log (
    name TEXT PRIMARY KEY NOT NULL,
    synced_at TEXT NOT NULL
);
";

const BOOK_COLUMNS: &str = "isbn, authors, categories, long_description, page_count, \
                            short_description, status, thumbnail_url, title";

const QUOTE_COLUMNS: &str = "local_id, id, category, quote, author, description";

/// SQLite-backed implementation of the book and quote stores.
///
/// One connection guarded by a mutex; callers are expected to reach it
/// through `store::blocking` rather than from async code directly.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        debug!(path = %path.display(), "Opened cache database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn schema_version(&self) -> Result<i64> {
        user_version(&self.conn())
    }

    pub fn book_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .context("Failed to count books")?;
        Ok(count as usize)
    }

    /// Every cached quote's API id, ascending.
    pub fn quote_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM quotes ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()
            .context("Failed to read quote ids")?;
        Ok(ids)
    }
}

fn user_version(conn: &Connection) -> Result<i64> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Failed to read schema version")
}

fn migrate(conn: &Connection) -> Result<()> {
    let from = user_version(conn)?;
    let steps: [(i64, &str); 3] = [(1, SCHEMA_V1), (2, SCHEMA_V2), (3, SCHEMA_V3)];

    for (version, sql) in steps {
        if from >= version {
            continue;
        }
        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            sql, version
        ))
        .with_context(|| format!("Failed to migrate cache schema to version {}", version))?;
    }

    if from < SCHEMA_VERSION {
        info!(from, to = SCHEMA_VERSION, "Migrated cache schema");
    }
    Ok(())
}

fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        isbn: row.get(0)?,
        authors: json_column(row, 1)?,
        categories: json_column(row, 2)?,
        long_description: row.get(3)?,
        page_count: row.get(4)?,
        short_description: row.get(5)?,
        status: row.get(6)?,
        thumbnail_url: row.get(7)?,
        title: row.get(8)?,
    })
}

fn quote_from_row(row: &Row<'_>) -> rusqlite::Result<Quote> {
    Ok(Quote {
        local_id: row.get(0)?,
        id: row.get(1)?,
        category: row.get(2)?,
        quote: row.get(3)?,
        author: row.get(4)?,
        description: row.get(5)?,
    })
}

impl SyncLog for SqliteStore {
    fn record_sync(&self, name: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO sync_log (name, synced_at) VALUES (?1, ?2)",
                params![name, at.to_rfc3339()],
            )
            .with_context(|| format!("Failed to record sync time for {}", name))?;
        Ok(())
    }

    fn last_sync(&self, name: &str) -> Result<Option<CachedAt>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT synced_at FROM sync_log WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read sync time for {}", name))?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(ts) => Ok(Some(CachedAt::new(ts.with_timezone(&Utc)))),
            Err(e) => {
                warn!(cache = name, error = %e, "Ignoring unparseable sync time");
                Ok(None)
            }
        }
    }
}

impl BookStore for SqliteStore {
    fn insert_books(&self, books: &[Book]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO books ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                BOOK_COLUMNS
            ))?;
            for book in books {
                stmt.execute(params![
                    book.isbn,
                    serde_json::to_string(&book.authors)?,
                    serde_json::to_string(&book.categories)?,
                    book.long_description,
                    book.page_count,
                    book.short_description,
                    book.status,
                    book.thumbnail_url,
                    book.title,
                ])
                .with_context(|| format!("Failed to insert book {}", book.isbn))?;
            }
        }
        tx.commit().context("Failed to commit book insert")?;
        Ok(())
    }

    fn all_books(&self) -> Result<Vec<Book>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM books ORDER BY rowid", BOOK_COLUMNS))?;
        let books = stmt
            .query_map([], book_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read books")?;
        Ok(books)
    }

    fn book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let book = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {} FROM books WHERE isbn = ?1 COLLATE NOCASE LIMIT 1",
                    BOOK_COLUMNS
                ),
                params![isbn],
                book_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to look up book {}", isbn))?;
        Ok(book)
    }

    fn clear_books(&self) -> Result<()> {
        self.conn()
            .execute("DELETE FROM books", [])
            .context("Failed to clear books")?;
        Ok(())
    }
}

impl QuoteStore for SqliteStore {
    fn insert_quotes(&self, quotes: &[Quote]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO quotes (id, category, quote, author, description) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for quote in quotes {
                stmt.execute(params![
                    quote.id,
                    quote.category,
                    quote.quote,
                    quote.author,
                    quote.description,
                ])
                .with_context(|| format!("Failed to insert quote {}", quote.id))?;
            }
        }
        tx.commit().context("Failed to commit quote insert")?;
        Ok(())
    }

    fn all_quotes(&self) -> Result<Vec<Quote>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM quotes ORDER BY id ASC", QUOTE_COLUMNS))?;
        let quotes = stmt
            .query_map([], quote_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read quotes")?;
        Ok(quotes)
    }

    fn quote_by_id(&self, id: i64) -> Result<Option<Quote>> {
        let quote = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM quotes WHERE id = ?1", QUOTE_COLUMNS),
                params![id],
                quote_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to look up quote {}", id))?;
        Ok(quote)
    }

    fn quotes_by_category(&self, category: &str) -> Result<Vec<Quote>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM quotes WHERE category = ?1 COLLATE NOCASE ORDER BY id ASC",
            QUOTE_COLUMNS
        ))?;
        let quotes = stmt
            .query_map(params![category], quote_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read quotes for category {}", category))?;
        Ok(quotes)
    }

    fn clear_quotes(&self) -> Result<()> {
        self.conn()
            .execute("DELETE FROM quotes", [])
            .context("Failed to clear quotes")?;
        Ok(())
    }

    fn quote_count_for_category(&self, category: Option<&str>) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = match category {
            Some(c) => conn.query_row(
                "SELECT COUNT(*) FROM quotes WHERE category = ?1 COLLATE NOCASE",
                params![c],
                |row| row.get(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0)),
        }
        .context("Failed to count quotes")?;
        Ok(count as usize)
    }
}
