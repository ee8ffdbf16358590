//! Cell repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for page cells.
//! - Own the atomic find-or-create used by scope resolution.
//!
//! # Invariants
//! - At most one cell exists per `(page_uuid, name)`; concurrent
//!   first-use resolution reuses the winner's row.
//! - Cell rows are never deleted by this engine.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::element::{Cell, CellId, PageId};
use crate::repo::{schema_version, table_exists, table_has_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CELL_SELECT_SQL: &str = "SELECT
    cell_uuid,
    page_uuid,
    name,
    created_at,
    updated_at
FROM cells";

pub type CellRepoResult<T> = Result<T, CellRepoError>;

/// Errors from cell repository operations.
#[derive(Debug)]
pub enum CellRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target cell does not exist.
    NotFound(CellId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for CellRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "cell not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "cell repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "cell repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "cell repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid cell data: {message}"),
        }
    }
}

impl Error for CellRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for CellRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CellRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for cell operations.
pub trait CellRepository {
    /// Fetches the `(page, name)` cell or creates it atomically.
    fn find_or_create(&self, page_uuid: PageId, name: &str) -> CellRepoResult<Cell>;
    /// Loads one cell by id.
    fn get_cell(&self, cell_uuid: CellId) -> CellRepoResult<Option<Cell>>;
    /// Loads one cell by page and name.
    fn find_by_name(&self, page_uuid: PageId, name: &str) -> CellRepoResult<Option<Cell>>;
    /// Lists all cells of one page, by name.
    fn list_for_page(&self, page_uuid: PageId) -> CellRepoResult<Vec<Cell>>;
}

/// SQLite-backed cell repository.
#[derive(Debug)]
pub struct SqliteCellRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCellRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> CellRepoResult<Self> {
        ensure_cell_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CellRepository for SqliteCellRepository<'_> {
    fn find_or_create(&self, page_uuid: PageId, name: &str) -> CellRepoResult<Cell> {
        // INSERT OR IGNORE keyed on the (page_uuid, name) unique index
        // makes concurrent first-use idempotent: the loser observes and
        // reuses the winner's row.
        self.conn.execute(
            "INSERT OR IGNORE INTO cells (cell_uuid, page_uuid, name)
             VALUES (?1, ?2, ?3);",
            params![Uuid::new_v4().to_string(), page_uuid.to_string(), name],
        )?;

        self.find_by_name(page_uuid, name)?.ok_or_else(|| {
            CellRepoError::InvalidData(format!(
                "cell `{name}` on page {page_uuid} missing after find-or-create"
            ))
        })
    }

    fn get_cell(&self, cell_uuid: CellId) -> CellRepoResult<Option<Cell>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CELL_SELECT_SQL} WHERE cell_uuid = ?1;"))?;
        let mut rows = stmt.query([cell_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_cell_row(row)?));
        }
        Ok(None)
    }

    fn find_by_name(&self, page_uuid: PageId, name: &str) -> CellRepoResult<Option<Cell>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CELL_SELECT_SQL} WHERE page_uuid = ?1 AND name = ?2;"
        ))?;
        stmt.query_row(params![page_uuid.to_string(), name], |row| {
            Ok(parse_cell_row(row))
        })
        .optional()?
        .transpose()
    }

    fn list_for_page(&self, page_uuid: PageId) -> CellRepoResult<Vec<Cell>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CELL_SELECT_SQL} WHERE page_uuid = ?1 ORDER BY name ASC;"
        ))?;
        let mut rows = stmt.query([page_uuid.to_string()])?;
        let mut cells = Vec::new();
        while let Some(row) = rows.next()? {
            cells.push(parse_cell_row(row)?);
        }
        Ok(cells)
    }
}

fn parse_cell_row(row: &Row<'_>) -> CellRepoResult<Cell> {
    let uuid_text: String = row.get("cell_uuid")?;
    let uuid = parse_uuid(&uuid_text, "cells.cell_uuid")?;
    let page_text: String = row.get("page_uuid")?;
    let page_uuid = parse_uuid(&page_text, "cells.page_uuid")?;

    Ok(Cell {
        uuid,
        page_uuid,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> CellRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| CellRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_cell_connection_ready(conn: &Connection) -> CellRepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(CellRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "cells")? {
        return Err(CellRepoError::MissingRequiredTable("cells"));
    }

    for column in ["cell_uuid", "page_uuid", "name", "created_at", "updated_at"] {
        if !table_has_column(conn, "cells", column)? {
            return Err(CellRepoError::MissingRequiredColumn {
                table: "cells",
                column,
            });
        }
    }

    Ok(())
}
