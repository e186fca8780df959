//! Table and column discovery for a source database.
//!
//! Identifiers cannot be bound as SQL parameters, so the store interpolates
//! them, quoted. Everything that reaches the store goes through `validate`
//! first.

use anyhow::{bail, Result};
use rusqlite::{Connection, Row};

use crate::store::VARIATIONS_SUFFIX;

/// User tables, in creation order. SQLite internals are left out.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Tables worth offering as a source: derived `*_variations` tables are left out.
pub fn source_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut tables = list_tables(conn)?;
    tables.retain(|t| !t.ends_with(VARIATIONS_SUFFIX));
    Ok(tables)
}

/// Column names of `table`, in declaration order.
///
/// `table` must already be one of `list_tables`.
pub fn list_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
    let rows = stmt.query_map([], |row: &Row| -> rusqlite::Result<String> { row.get(1) })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Accept `table`/`column` only when both exist verbatim in the database.
pub fn validate(conn: &Connection, table: &str, column: &str) -> Result<()> {
    let tables = list_tables(conn)?;
    if !tables.iter().any(|t| t == table) {
        bail!("table `{}` does not exist", table);
    }
    let columns = list_columns(conn, table)?;
    if !columns.iter().any(|c| c == column) {
        bail!("column `{}` does not exist in table `{}`", column, table);
    }
    Ok(())
}

/// Double-quote an identifier so keywords and odd names are safe in SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE products (id INTEGER PRIMARY KEY AUTOINCREMENT, description TEXT, price REAL);
            CREATE TABLE "odd name" (value TEXT);
            CREATE TABLE "order" ("group" TEXT);
            CREATE TABLE products_variations (id INTEGER PRIMARY KEY, original_text TEXT, variation TEXT);
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_list_tables_skips_internal() {
        // AUTOINCREMENT creates sqlite_sequence.
        assert_eq!(
            list_tables(&conn()).unwrap(),
            vec!["products", "odd name", "order", "products_variations"]
        );
    }

    #[test]
    fn test_source_tables_skip_derived() {
        assert_eq!(
            source_tables(&conn()).unwrap(),
            vec!["products", "odd name", "order"]
        );
    }

    #[test]
    fn test_list_columns() {
        let conn = conn();
        assert_eq!(
            list_columns(&conn, "products").unwrap(),
            vec!["id", "description", "price"]
        );
        assert_eq!(list_columns(&conn, "odd name").unwrap(), vec!["value"]);
    }

    #[test]
    fn test_validate() {
        let conn = conn();
        assert!(validate(&conn, "products", "description").is_ok());
        assert!(validate(&conn, "products", "missing").is_err());
        assert!(validate(&conn, "missing", "description").is_err());
        assert!(validate(&conn, "products; DROP TABLE products", "description").is_err());
        assert!(validate(&conn, "odd name", "value").is_ok());
        assert!(validate(&conn, "order", "group").is_ok());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("group"), "\"group\"");
        assert_eq!(quote_identifier("odd name"), "\"odd name\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
