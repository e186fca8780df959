use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, ErrorCode, OpenFlags, Statement, TransactionBehavior};
use thiserror::Error;

use crate::report::Reporter;
use crate::schema::quote_identifier;
use crate::variations;

/// Source values per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 100;

pub const VARIATIONS_SUFFIX: &str = "_variations";

/// Name of the derived table for `table`.
pub fn variations_table(table: &str) -> String {
    format!("{}{}", table, VARIATIONS_SUFFIX)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create {table}_variations")]
    SchemaCreation {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to read distinct values of {column} from {table}")]
    SourceRead {
        table: String,
        column: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to insert variation {variation:?} for {original:?} into {table}_variations")]
    Insert {
        table: String,
        original: String,
        variation: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to write batch into {table}_variations")]
    Batch {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to count rows of {table}_variations")]
    Count {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Result of a single `INSERT OR IGNORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// Counters for one `process` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariationStats {
    /// Distinct values read, NULL and empty included.
    pub found: usize,
    /// Values that went through the generator.
    pub processed: usize,
    /// NULL or empty values.
    pub skipped: usize,
    pub inserted: usize,
    pub already_present: usize,
    /// Rows rejected by a constraint other than the uniqueness one.
    pub conflicts: usize,
    pub commits: usize,
    /// Row count of the derived table after the pass.
    pub total_variations: u64,
}

/// Writes the variations of one column into `<table>_variations`.
///
/// Table and column names are interpolated into SQL as quoted identifiers;
/// callers must check them against the real schema first (see
/// `schema::validate`). Only the inserted values are bound as parameters.
pub struct VariationStore<'r> {
    conn: Connection,
    reporter: &'r dyn Reporter,
    batch_size: usize,
}

impl<'r> VariationStore<'r> {
    /// Open an existing SQLite file. Missing files are an error, never created.
    pub fn open(path: &Path, reporter: &'r dyn Reporter) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_connection(conn, reporter))
    }

    pub fn from_connection(conn: Connection, reporter: &'r dyn Reporter) -> Self {
        Self {
            conn,
            reporter,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Commit every `batch_size` source values. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Generate and store the variations of every distinct value of
    /// `column` in `table`.
    ///
    /// Consumes the store: the connection is closed before this returns,
    /// on success and on failure alike. Batches committed before a failure
    /// stay committed; rerunning is safe because of the unique constraint.
    pub fn process(mut self, table: &str, column: &str) -> Result<VariationStats, StoreError> {
        let result = self.run(table, column);
        if let Err(err) = &result {
            self.reporter.failed(table, err);
        }

        let VariationStore { conn, reporter, .. } = self;
        if let Err((_, err)) = conn.close() {
            reporter.close_failed(table, &err);
        }
        result
    }

    fn run(&mut self, table: &str, column: &str) -> Result<VariationStats, StoreError> {
        self.ensure_schema(table)?;
        let values = self.distinct_values(table, column)?;

        let mut stats = VariationStats {
            found: values.len(),
            ..Default::default()
        };
        self.reporter.found(table, values.len());

        let insert_sql = format!(
            "INSERT OR IGNORE INTO {} (original_text, variation) VALUES (?1, ?2)",
            quote_identifier(&variations_table(table))
        );
        let batch_err = |source: rusqlite::Error| StoreError::Batch {
            table: table.to_string(),
            source,
        };

        let mut seen = 0;
        for chunk in values.chunks(self.batch_size) {
            let tx = self
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(batch_err)?;
            {
                let mut stmt = tx.prepare(&insert_sql).map_err(batch_err)?;
                for value in chunk {
                    seen += 1;
                    match value.as_deref().filter(|v| !v.is_empty()) {
                        Some(original) => {
                            insert_all(&mut stmt, self.reporter, table, original, &mut stats)?;
                            stats.processed += 1;
                        }
                        None => stats.skipped += 1,
                    }
                    self.reporter.value_done(table);
                }
            }
            tx.commit().map_err(batch_err)?;
            stats.commits += 1;
            self.reporter.batch_committed(table, seen);
        }

        stats.total_variations = self.count_variations(table)?;
        self.reporter.finished(table, stats.total_variations);
        Ok(stats)
    }

    fn ensure_schema(&self, table: &str) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                  id INTEGER PRIMARY KEY AUTOINCREMENT,
                  original_text TEXT,
                  variation TEXT,
                  UNIQUE(original_text, variation)
                );
                "#,
                quote_identifier(&variations_table(table))
            ))
            .map_err(|source| StoreError::SchemaCreation {
                table: table.to_string(),
                source,
            })
    }

    /// Distinct values as text; integers and reals arrive in their text form.
    fn distinct_values(&self, table: &str, column: &str) -> Result<Vec<Option<String>>, StoreError> {
        let read = || -> rusqlite::Result<Vec<Option<String>>> {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT DISTINCT CAST({} AS TEXT) FROM {}",
                quote_identifier(column),
                quote_identifier(table)
            ))?;
            let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;
            let mut acc = Vec::new();
            for r in rows {
                acc.push(r?);
            }
            Ok(acc)
        };
        read().map_err(|source| StoreError::SourceRead {
            table: table.to_string(),
            column: column.to_string(),
            source,
        })
    }

    fn count_variations(&self, table: &str) -> Result<u64, StoreError> {
        self.conn
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM {}",
                    quote_identifier(&variations_table(table))
                ),
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|source| StoreError::Count {
                table: table.to_string(),
                source,
            })
    }
}

fn insert_all(
    stmt: &mut Statement<'_>,
    reporter: &dyn Reporter,
    table: &str,
    original: &str,
    stats: &mut VariationStats,
) -> Result<(), StoreError> {
    for variation in variations::generate(original) {
        match insert_variation(stmt, original, &variation) {
            Ok(InsertOutcome::Inserted) => stats.inserted += 1,
            Ok(InsertOutcome::AlreadyPresent) => stats.already_present += 1,
            Err(err) if is_constraint_violation(&err) => {
                stats.conflicts += 1;
                reporter.row_conflict(table, original, &variation, &err);
            }
            Err(source) => {
                return Err(StoreError::Insert {
                    table: table.to_string(),
                    original: original.to_string(),
                    variation,
                    source,
                })
            }
        }
    }
    Ok(())
}

fn insert_variation(
    stmt: &mut Statement<'_>,
    original: &str,
    variation: &str,
) -> rusqlite::Result<InsertOutcome> {
    let changed = stmt.execute(params![original, variation])?;
    Ok(if changed == 0 {
        InsertOutcome::AlreadyPresent
    } else {
        InsertOutcome::Inserted
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
