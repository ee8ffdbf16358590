//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for elements and
//!   cells.
//! - Isolate SQLite query details and position arithmetic from service
//!   orchestration.
//!
//! # Invariants
//! - Element writes must pass `Element::validate()` before persistence.
//! - Every multi-row position mutation commits one immediate
//!   transaction or leaves its scopes unchanged.
//! - Repository APIs return semantic errors (`NotFound`,
//!   `ScopeConflict`) in addition to DB transport errors.

use rusqlite::Connection;

pub mod cell_repo;
pub mod element_repo;

pub(crate) fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
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

pub(crate) fn table_has_column(
    conn: &Connection,
    table: &str,
    column: &str,
) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
}
