//! Trash/restore use-case service.
//!
//! # Responsibility
//! - Transition elements between active (scoped, positioned) and
//!   trashed (position cleared, excluded from ordering).
//! - Validate restore targets before delegating position allocation.
//!
//! # Invariants
//! - Trashing keeps the element's last scope on the record for audit;
//!   it never participates in ordering again until restored.
//! - Restore always produces a valid, collision-free position: the
//!   element lands at the bottom of the target scope.
//! - A restore target cell must exist and belong to the target page.
//! - Scope-conflict collisions on the restore allocation are retried
//!   against re-read state before they surface to callers.

use crate::layout::InsertPosition;
use crate::model::element::{CellId, Element, ElementId, PageId, Scope};
use crate::repo::cell_repo::{CellRepoError, CellRepository};
use crate::repo::element_repo::{ElementRepoError, ElementRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from trash/restore operations.
#[derive(Debug)]
pub enum TrashError {
    /// Target element does not exist.
    ElementNotFound(ElementId),
    /// Restore target cell does not exist.
    CellNotFound(CellId),
    /// Restore was requested for an element that is still active.
    NotTrashed(ElementId),
    /// Restore target cell does not belong to the target page.
    InvalidScope {
        page_uuid: PageId,
        cell_uuid: CellId,
    },
    /// Element repository failure.
    Elements(ElementRepoError),
    /// Cell repository failure.
    Cells(CellRepoError),
}

impl Display for TrashError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ElementNotFound(id) => write!(f, "element not found: {id}"),
            Self::CellNotFound(id) => write!(f, "cell not found: {id}"),
            Self::NotTrashed(id) => write!(f, "element is not trashed: {id}"),
            Self::InvalidScope {
                page_uuid,
                cell_uuid,
            } => write!(
                f,
                "cell {cell_uuid} does not belong to page {page_uuid}"
            ),
            Self::Elements(err) => write!(f, "{err}"),
            Self::Cells(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrashError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Elements(err) => Some(err),
            Self::Cells(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ElementRepoError> for TrashError {
    fn from(value: ElementRepoError) -> Self {
        match value {
            ElementRepoError::NotFound(element_uuid) => Self::ElementNotFound(element_uuid),
            other => Self::Elements(other),
        }
    }
}

impl From<CellRepoError> for TrashError {
    fn from(value: CellRepoError) -> Self {
        match value {
            CellRepoError::NotFound(cell_uuid) => Self::CellNotFound(cell_uuid),
            other => Self::Cells(other),
        }
    }
}

/// Trash/restore controller over element and cell repositories.
pub struct TrashService<E, C>
where
    E: ElementRepository,
    C: CellRepository,
{
    elements: E,
    cells: C,
}

impl<E, C> TrashService<E, C>
where
    E: ElementRepository,
    C: CellRepository,
{
    /// Creates a controller from repository implementations.
    pub fn new(elements: E, cells: C) -> Self {
        Self { elements, cells }
    }

    /// Detaches an element from ordering.
    ///
    /// The former scope is renumbered in the same transaction so its
    /// remaining positions stay dense. Trashing a trashed element is a
    /// no-op.
    pub fn trash(&self, element_uuid: ElementId) -> Result<Element, TrashError> {
        let trashed = self.elements.trash_element(element_uuid)?;
        info!(
            "event=element_trash module=trash status=ok element={element_uuid} scope=\"{}\"",
            trashed.scope()
        );
        Ok(trashed)
    }

    /// Restores a trashed element into `target`, defaulting to its
    /// prior scope.
    ///
    /// The element lands at the bottom of the target scope with a
    /// freshly allocated position. Fails with `InvalidScope` when the
    /// target cell belongs to a different page, and with `NotTrashed`
    /// when the element is still active.
    pub fn restore(
        &self,
        element_uuid: ElementId,
        target: Option<Scope>,
    ) -> Result<Element, TrashError> {
        let element = self
            .elements
            .get_element(element_uuid, true)?
            .ok_or(TrashError::ElementNotFound(element_uuid))?;
        if !element.is_trashed() {
            return Err(TrashError::NotTrashed(element_uuid));
        }

        let scope = target.unwrap_or_else(|| element.scope());
        if let Some(cell_uuid) = scope.cell_uuid {
            let cell = self
                .cells
                .get_cell(cell_uuid)?
                .ok_or(TrashError::CellNotFound(cell_uuid))?;
            if cell.page_uuid != scope.page_uuid {
                return Err(TrashError::InvalidScope {
                    page_uuid: scope.page_uuid,
                    cell_uuid,
                });
            }
        }

        let restored = super::with_scope_retry("trash", &scope, || {
            self.elements
                .move_to_scope(element_uuid, &scope, InsertPosition::Bottom)
        })?;
        info!(
            "event=element_restore module=trash status=ok element={element_uuid} scope=\"{scope}\" position={}",
            restored.position.unwrap_or_default()
        );
        Ok(restored)
    }
}
