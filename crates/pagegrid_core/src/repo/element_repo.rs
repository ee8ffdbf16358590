//! Element repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for placed and trashed elements.
//! - Own all position arithmetic: allocation, renumbering and reorder
//!   stay inside the repository boundary.
//!
//! # Invariants
//! - Active positions in one scope are exactly the dense sequence
//!   `1..count` after every committed operation.
//! - Multi-row mutations run under one immediate transaction; a failed
//!   operation leaves every touched scope unchanged.
//! - A collision on the scope/position unique index is reported as
//!   `ScopeConflict`, never masked.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::layout::InsertPosition;
use crate::model::element::{Element, ElementId, ElementValidationError, PageId, Scope};
use crate::repo::{schema_version, table_exists, table_has_column};
use rusqlite::{params, Connection, ErrorCode, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ELEMENT_SELECT_SQL: &str = "SELECT
    element_uuid,
    page_uuid,
    cell_uuid,
    name,
    position,
    created_at,
    updated_at
FROM elements";

/// Retry budget exhausted by services before surfacing `ScopeConflict`.
pub const SCOPE_CONFLICT_RETRY_BUDGET: u32 = 3;

pub type ElementRepoResult<T> = Result<T, ElementRepoError>;

/// Errors from element repository operations.
#[derive(Debug)]
pub enum ElementRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Record failed write-path validation.
    Validation(ElementValidationError),
    /// Target element does not exist.
    NotFound(ElementId),
    /// Element exists and is active, but belongs to another scope.
    NotInScope {
        element_uuid: ElementId,
        scope: Scope,
    },
    /// Concurrent allocation collided on the scope/position index.
    ScopeConflict(Scope),
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

impl Display for ElementRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "element not found: {id}"),
            Self::NotInScope {
                element_uuid,
                scope,
            } => write!(f, "element {element_uuid} is not a member of {scope}"),
            Self::ScopeConflict(scope) => {
                write!(f, "concurrent position allocation detected in {scope}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "element repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "element repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "element repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid element data: {message}"),
        }
    }
}

impl Error for ElementRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ElementRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ElementValidationError> for ElementRepoError {
    fn from(value: ElementValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for ElementRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for element placement operations.
pub trait ElementRepository {
    /// Inserts a new element and allocates its position per `mode`.
    ///
    /// The record's `position` is ignored; the stored one is returned.
    fn insert_placed(&self, element: &Element, mode: InsertPosition)
        -> ElementRepoResult<Element>;
    /// Loads one element by id.
    fn get_element(
        &self,
        element_uuid: ElementId,
        include_trashed: bool,
    ) -> ElementRepoResult<Option<Element>>;
    /// Lists active elements of one scope ordered by position.
    fn list_scope(&self, scope: &Scope) -> ElementRepoResult<Vec<Element>>;
    /// Lists elements of one page across all its scopes.
    fn list_page(&self, page_uuid: PageId, include_trashed: bool)
        -> ElementRepoResult<Vec<Element>>;
    /// Moves one element into `scope`, allocating per `mode`.
    ///
    /// The source scope (if the element was active) is renumbered in
    /// the same transaction as the target allocation.
    fn move_to_scope(
        &self,
        element_uuid: ElementId,
        scope: &Scope,
        mode: InsertPosition,
    ) -> ElementRepoResult<Element>;
    /// Clears the element's position and renumbers its former scope.
    ///
    /// Trashing an already-trashed element is a no-op.
    fn trash_element(&self, element_uuid: ElementId) -> ElementRepoResult<Element>;
    /// Assigns positions `1..` following `ordered` within one scope.
    ///
    /// Trashed ids are adopted into the scope (the untrash-by-reorder
    /// path); active members not listed keep their relative order after
    /// the listed ids.
    fn reorder_scope(
        &self,
        scope: &Scope,
        ordered: &[ElementId],
    ) -> ElementRepoResult<Vec<Element>>;
}

/// SQLite-backed element repository.
#[derive(Debug)]
pub struct SqliteElementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteElementRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ElementRepoResult<Self> {
        ensure_element_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ElementRepository for SqliteElementRepository<'_> {
    fn insert_placed(
        &self,
        element: &Element,
        mode: InsertPosition,
    ) -> ElementRepoResult<Element> {
        element.validate()?;

        let scope = element.scope();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let position = match mode {
            InsertPosition::Bottom => max_position(&tx, &scope)? + 1,
            InsertPosition::Top => {
                shift_scope_positions(&tx, &scope)?;
                1
            }
        };

        tx.execute(
            "INSERT INTO elements (element_uuid, page_uuid, cell_uuid, name, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                element.uuid.to_string(),
                element.page_uuid.to_string(),
                element.cell_uuid.map(|value| value.to_string()),
                element.name.as_str(),
                position,
            ],
        )
        .map_err(|err| map_position_conflict(err, &scope))?;

        let created = load_required_element(&tx, element.uuid)?;
        tx.commit()?;
        Ok(created)
    }

    fn get_element(
        &self,
        element_uuid: ElementId,
        include_trashed: bool,
    ) -> ElementRepoResult<Option<Element>> {
        load_optional_element(self.conn, element_uuid, include_trashed)
    }

    fn list_scope(&self, scope: &Scope) -> ElementRepoResult<Vec<Element>> {
        list_scope_elements(self.conn, scope)
    }

    fn list_page(
        &self,
        page_uuid: PageId,
        include_trashed: bool,
    ) -> ElementRepoResult<Vec<Element>> {
        let sql = if include_trashed {
            format!(
                "{ELEMENT_SELECT_SQL}
                 WHERE page_uuid = ?1
                 ORDER BY position IS NULL ASC,
                          COALESCE(cell_uuid, '') ASC,
                          position ASC,
                          element_uuid ASC;"
            )
        } else {
            format!(
                "{ELEMENT_SELECT_SQL}
                 WHERE page_uuid = ?1
                   AND position IS NOT NULL
                 ORDER BY COALESCE(cell_uuid, '') ASC,
                          position ASC;"
            )
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([page_uuid.to_string()])?;
        let mut elements = Vec::new();
        while let Some(row) = rows.next()? {
            elements.push(parse_element_row(row)?);
        }
        Ok(elements)
    }

    fn move_to_scope(
        &self,
        element_uuid: ElementId,
        scope: &Scope,
        mode: InsertPosition,
    ) -> ElementRepoResult<Element> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let element = load_optional_element(&tx, element_uuid, true)?
            .ok_or(ElementRepoError::NotFound(element_uuid))?;
        let source_scope = element.scope();
        let was_active = !element.is_trashed();

        clear_position(&tx, element_uuid)?;
        if was_active {
            compact_scope(&tx, &source_scope)?;
        }

        let position = match mode {
            InsertPosition::Bottom => max_position(&tx, scope)? + 1,
            InsertPosition::Top => {
                shift_scope_positions(&tx, scope)?;
                1
            }
        };

        tx.execute(
            "UPDATE elements
             SET page_uuid = ?2,
                 cell_uuid = ?3,
                 position = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE element_uuid = ?1;",
            params![
                element_uuid.to_string(),
                scope.page_uuid.to_string(),
                scope.cell_uuid.map(|value| value.to_string()),
                position,
            ],
        )
        .map_err(|err| map_position_conflict(err, scope))?;

        let moved = load_required_element(&tx, element_uuid)?;
        tx.commit()?;
        Ok(moved)
    }

    fn trash_element(&self, element_uuid: ElementId) -> ElementRepoResult<Element> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let element = load_optional_element(&tx, element_uuid, true)?
            .ok_or(ElementRepoError::NotFound(element_uuid))?;
        if element.is_trashed() {
            return Ok(element);
        }

        let scope = element.scope();
        clear_position(&tx, element_uuid)?;
        compact_scope(&tx, &scope)?;

        let trashed = load_required_element(&tx, element_uuid)?;
        tx.commit()?;
        Ok(trashed)
    }

    fn reorder_scope(
        &self,
        scope: &Scope,
        ordered: &[ElementId],
    ) -> ElementRepoResult<Vec<Element>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let mut listed = HashSet::new();
        for element_uuid in ordered {
            if !listed.insert(*element_uuid) {
                return Err(ElementRepoError::InvalidData(format!(
                    "duplicate element id {element_uuid} in reorder request"
                )));
            }
        }

        let mut adopted = Vec::new();
        for element_uuid in ordered {
            let element = load_optional_element(&tx, *element_uuid, true)?
                .ok_or(ElementRepoError::NotFound(*element_uuid))?;
            if element.is_trashed() {
                adopted.push(*element_uuid);
            } else if element.scope() != *scope {
                return Err(ElementRepoError::NotInScope {
                    element_uuid: *element_uuid,
                    scope: *scope,
                });
            }
        }

        // Unlisted active members follow the listed ids in their prior
        // relative order, keeping the scope dense.
        let mut final_order = ordered.to_vec();
        for element in list_scope_elements(&tx, scope)? {
            if !listed.contains(&element.uuid) {
                final_order.push(element.uuid);
            }
        }

        // Clear-then-assign keeps the unique position index satisfied
        // between the two passes.
        for element_uuid in &final_order {
            clear_position(&tx, *element_uuid)?;
        }
        for element_uuid in &adopted {
            tx.execute(
                "UPDATE elements
                 SET page_uuid = ?2,
                     cell_uuid = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE element_uuid = ?1;",
                params![
                    element_uuid.to_string(),
                    scope.page_uuid.to_string(),
                    scope.cell_uuid.map(|value| value.to_string()),
                ],
            )?;
        }
        for (index, element_uuid) in final_order.iter().enumerate() {
            set_position(&tx, *element_uuid, index as i64 + 1)
                .map_err(|err| map_position_conflict(err, scope))?;
        }

        let mut elements = Vec::with_capacity(final_order.len());
        for element_uuid in &final_order {
            elements.push(load_required_element(&tx, *element_uuid)?);
        }
        tx.commit()?;
        Ok(elements)
    }
}

// The empty string mirrors COALESCE(cell_uuid, '') in the scope index,
// so one parameterized condition covers celled and uncelled scopes.
fn scope_cell_key(scope: &Scope) -> String {
    scope
        .cell_uuid
        .map(|value| value.to_string())
        .unwrap_or_default()
}

fn max_position(conn: &Connection, scope: &Scope) -> ElementRepoResult<i64> {
    let max = conn.query_row(
        "SELECT COALESCE(MAX(position), 0)
         FROM elements
         WHERE page_uuid = ?1
           AND COALESCE(cell_uuid, '') = ?2
           AND position IS NOT NULL;",
        params![scope.page_uuid.to_string(), scope_cell_key(scope)],
        |row| row.get(0),
    )?;
    Ok(max)
}

/// Shifts every active position in the scope up by one (top insertion).
///
/// Runs as a two-step sign flip so the partial unique index stays
/// satisfied while rows are updated one at a time.
fn shift_scope_positions(conn: &Connection, scope: &Scope) -> ElementRepoResult<()> {
    conn.execute(
        "UPDATE elements
         SET position = -(position + 1),
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE page_uuid = ?1
           AND COALESCE(cell_uuid, '') = ?2
           AND position IS NOT NULL;",
        params![scope.page_uuid.to_string(), scope_cell_key(scope)],
    )?;
    conn.execute(
        "UPDATE elements
         SET position = -position
         WHERE page_uuid = ?1
           AND COALESCE(cell_uuid, '') = ?2
           AND position < 0;",
        params![scope.page_uuid.to_string(), scope_cell_key(scope)],
    )?;
    Ok(())
}

/// Renumbers a scope's active elements to the dense sequence `1..n`.
///
/// Ascending assignment is collision-free under the unique index:
/// target `i` is never held by a not-yet-renumbered row.
fn compact_scope(conn: &Connection, scope: &Scope) -> ElementRepoResult<()> {
    let elements = list_scope_elements(conn, scope)?;
    for (index, element) in elements.iter().enumerate() {
        let target = index as i64 + 1;
        if element.position != Some(target) {
            set_position(conn, element.uuid, target)?;
        }
    }
    Ok(())
}

fn set_position(conn: &Connection, element_uuid: ElementId, position: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE elements
         SET position = ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE element_uuid = ?1;",
        params![element_uuid.to_string(), position],
    )?;
    Ok(())
}

fn clear_position(conn: &Connection, element_uuid: ElementId) -> ElementRepoResult<()> {
    conn.execute(
        "UPDATE elements
         SET position = NULL,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE element_uuid = ?1;",
        [element_uuid.to_string()],
    )?;
    Ok(())
}

fn list_scope_elements(conn: &Connection, scope: &Scope) -> ElementRepoResult<Vec<Element>> {
    let mut stmt = conn.prepare(&format!(
        "{ELEMENT_SELECT_SQL}
         WHERE page_uuid = ?1
           AND COALESCE(cell_uuid, '') = ?2
           AND position IS NOT NULL
         ORDER BY position ASC;"
    ))?;
    let mut rows = stmt.query(params![scope.page_uuid.to_string(), scope_cell_key(scope)])?;
    let mut elements = Vec::new();
    while let Some(row) = rows.next()? {
        elements.push(parse_element_row(row)?);
    }
    Ok(elements)
}

fn load_optional_element(
    conn: &Connection,
    element_uuid: ElementId,
    include_trashed: bool,
) -> ElementRepoResult<Option<Element>> {
    let mut stmt = conn.prepare(&format!(
        "{ELEMENT_SELECT_SQL}
         WHERE element_uuid = ?1
           AND (?2 = 1 OR position IS NOT NULL);"
    ))?;
    let mut rows = stmt.query(params![
        element_uuid.to_string(),
        i64::from(include_trashed)
    ])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_element_row(row)?));
    }
    Ok(None)
}

fn load_required_element(conn: &Connection, element_uuid: ElementId) -> ElementRepoResult<Element> {
    load_optional_element(conn, element_uuid, true)?
        .ok_or(ElementRepoError::NotFound(element_uuid))
}

fn map_position_conflict(err: rusqlite::Error, scope: &Scope) -> ElementRepoError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation
            && message.contains("idx_elements_scope_position")
        {
            return ElementRepoError::ScopeConflict(*scope);
        }
    }
    err.into()
}

fn parse_element_row(row: &Row<'_>) -> ElementRepoResult<Element> {
    let uuid_text: String = row.get("element_uuid")?;
    let uuid = parse_uuid(&uuid_text, "elements.element_uuid")?;
    let page_text: String = row.get("page_uuid")?;
    let page_uuid = parse_uuid(&page_text, "elements.page_uuid")?;
    let cell_uuid = row
        .get::<_, Option<String>>("cell_uuid")?
        .map(|value| parse_uuid(&value, "elements.cell_uuid"))
        .transpose()?;

    let position: Option<i64> = row.get("position")?;
    if let Some(position) = position {
        if position < 1 {
            return Err(ElementRepoError::InvalidData(format!(
                "invalid position `{position}` in elements.position"
            )));
        }
    }

    Ok(Element {
        uuid,
        page_uuid,
        cell_uuid,
        name: row.get("name")?,
        position,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> ElementRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| ElementRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_element_connection_ready(conn: &Connection) -> ElementRepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(ElementRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "elements")? {
        return Err(ElementRepoError::MissingRequiredTable("elements"));
    }

    for column in [
        "element_uuid",
        "page_uuid",
        "cell_uuid",
        "name",
        "position",
        "created_at",
        "updated_at",
    ] {
        if !table_has_column(conn, "elements", column)? {
            return Err(ElementRepoError::MissingRequiredColumn {
                table: "elements",
                column,
            });
        }
    }

    Ok(())
}
