//! Element, cell and scope records.
//!
//! # Responsibility
//! - Define the canonical placement records shared by repo and service
//!   layers.
//! - Provide lifecycle helpers for the trash/restore state transition.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another element or cell.
//! - `position` is the source of truth for trash state: `None` means
//!   trashed, `Some(_)` means active.
//! - Active positions form a dense 1-based sequence within one scope.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for an element.
pub type ElementId = Uuid;

/// Stable identifier for a cell.
pub type CellId = Uuid;

/// Stable identifier for a page. Page records themselves live outside
/// this engine; only the id is stored on elements and cells.
pub type PageId = Uuid;

/// The composite key under which position uniqueness and density hold.
///
/// `cell_uuid = None` is the page-level uncelled bucket, itself a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub page_uuid: PageId,
    pub cell_uuid: Option<CellId>,
}

impl Scope {
    /// Page-level uncelled scope.
    pub fn page(page_uuid: PageId) -> Self {
        Self {
            page_uuid,
            cell_uuid: None,
        }
    }

    /// Cell-bound scope within a page.
    pub fn cell(page_uuid: PageId, cell_uuid: CellId) -> Self {
        Self {
            page_uuid,
            cell_uuid: Some(cell_uuid),
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.cell_uuid {
            Some(cell_uuid) => write!(f, "page {} cell {cell_uuid}", self.page_uuid),
            None => write!(f, "page {} uncelled", self.page_uuid),
        }
    }
}

/// Validation failures for element write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValidationError {
    /// Element name is blank after trim.
    BlankName,
    /// Element name still carries a `#cell` suffix; callers must resolve
    /// compound names before persistence.
    UnresolvedCompoundName(String),
}

impl Display for ElementValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "element name must not be blank"),
            Self::UnresolvedCompoundName(name) => {
                write!(f, "element name `{name}` must not contain `#`")
            }
        }
    }
}

impl Error for ElementValidationError {}

/// One content block instance belonging to a page and optional cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Stable global ID, assigned at creation, immutable.
    pub uuid: ElementId,
    /// Owning page. Mutable only via restore/move operations.
    pub page_uuid: PageId,
    /// Owning cell within the page. `None` means page-level, uncelled.
    pub cell_uuid: Option<CellId>,
    /// Layout-declared element type name, immutable after creation.
    pub name: String,
    /// Dense 1-based rank among active siblings. `None` while trashed.
    pub position: Option<i64>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Element {
    /// Creates an unplaced element record with a generated stable ID.
    ///
    /// The record stays unplaced (`position = None`) until a repository
    /// insert allocates its position; elements are never persisted in
    /// this state.
    pub fn new(page_uuid: PageId, cell_uuid: Option<CellId>, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            page_uuid,
            cell_uuid,
            name: name.into(),
            position: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Returns the scope this element currently belongs to.
    ///
    /// For trashed elements this is the last scope before trashing; it
    /// is retained for audit and as the default restore target.
    pub fn scope(&self) -> Scope {
        Scope {
            page_uuid: self.page_uuid,
            cell_uuid: self.cell_uuid,
        }
    }

    /// Whether the element is detached from ordering.
    pub fn is_trashed(&self) -> bool {
        self.position.is_none()
    }

    /// Checks write-path invariants on the record itself.
    pub fn validate(&self) -> Result<(), ElementValidationError> {
        if self.name.trim().is_empty() {
            return Err(ElementValidationError::BlankName);
        }
        if self.name.contains('#') {
            return Err(ElementValidationError::UnresolvedCompoundName(
                self.name.clone(),
            ));
        }
        Ok(())
    }
}

/// A named sub-region of a page, declared by the page's layout.
///
/// Created lazily the first time an element references it; at most one
/// cell exists per `(page_uuid, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub uuid: CellId,
    pub page_uuid: PageId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Cell {
    /// Returns the scope formed by this cell.
    pub fn scope(&self) -> Scope {
        Scope::cell(self.page_uuid, self.uuid)
    }
}
