//! Placement use-case service: scope resolution, create, paste, reorder.
//!
//! # Responsibility
//! - Resolve compound element names against the page's layout and
//!   materialize cells on first use.
//! - Orchestrate position allocation for create/paste/reorder requests.
//! - Enforce the clipboard paste contract: copy duplicates, cut moves
//!   and then drops its clipboard entry.
//!
//! # Invariants
//! - Elements are always born active: every create/paste path ends in
//!   an allocated position.
//! - Scope-conflict collisions are retried against re-read state before
//!   they surface to callers.

use crate::layout::{LayoutDefinition, LayoutRegistry};
use crate::model::clipboard::{Clipboard, ClipboardAction};
use crate::model::element::{Cell, Element, ElementId, PageId, Scope};
use crate::model::name::{ElementName, ElementNameError};
use crate::model::page::Page;
use crate::repo::cell_repo::{CellRepoError, CellRepository};
use crate::repo::element_repo::{ElementRepoError, ElementRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from placement service operations.
#[derive(Debug)]
pub enum PlacementError {
    /// Raw element name failed the `name` / `name#cell` grammar.
    InvalidName(ElementNameError),
    /// Compound name references a cell the page's layout does not
    /// declare. Not retried; the caller decides whether to fall back
    /// to the uncelled scope.
    UndeclaredCell {
        page_uuid: PageId,
        cell_name: String,
    },
    /// Referenced element does not exist (or a clipboard entry went
    /// stale because its element was removed).
    ElementNotFound(ElementId),
    /// Paste referenced an id with no clipboard entry.
    NotInClipboard(ElementId),
    /// Element repository failure, including an exhausted scope-conflict
    /// retry budget.
    Elements(ElementRepoError),
    /// Cell repository failure.
    Cells(CellRepoError),
}

impl Display for PlacementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::UndeclaredCell {
                page_uuid,
                cell_name,
            } => write!(
                f,
                "cell `{cell_name}` is not declared by the layout of page {page_uuid}"
            ),
            Self::ElementNotFound(id) => write!(f, "element not found: {id}"),
            Self::NotInClipboard(id) => write!(f, "element not in clipboard: {id}"),
            Self::Elements(err) => write!(f, "{err}"),
            Self::Cells(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlacementError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            Self::Elements(err) => Some(err),
            Self::Cells(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ElementNameError> for PlacementError {
    fn from(value: ElementNameError) -> Self {
        Self::InvalidName(value)
    }
}

impl From<ElementRepoError> for PlacementError {
    fn from(value: ElementRepoError) -> Self {
        match value {
            ElementRepoError::NotFound(element_uuid) => Self::ElementNotFound(element_uuid),
            // Reorder rejects foreign members the same way as unknown ids.
            ElementRepoError::NotInScope { element_uuid, .. } => {
                Self::ElementNotFound(element_uuid)
            }
            other => Self::Elements(other),
        }
    }
}

impl From<CellRepoError> for PlacementError {
    fn from(value: CellRepoError) -> Self {
        Self::Cells(value)
    }
}

/// Placement service facade over element/cell repositories and the
/// layout registry.
pub struct PlacementService<E, C, L>
where
    E: ElementRepository,
    C: CellRepository,
    L: LayoutRegistry,
{
    elements: E,
    cells: C,
    layouts: L,
}

impl<E, C, L> PlacementService<E, C, L>
where
    E: ElementRepository,
    C: CellRepository,
    L: LayoutRegistry,
{
    /// Creates a service from repository implementations and a registry.
    pub fn new(elements: E, cells: C, layouts: L) -> Self {
        Self {
            elements,
            cells,
            layouts,
        }
    }

    /// Resolves a raw element declaration to its target cell and plain
    /// name.
    ///
    /// # Contract
    /// - `"article"` resolves to `(None, "article")` regardless of the
    ///   layout's cell declarations.
    /// - `"article#header"` (or an explicit `cell_override`) requires
    ///   `header` to be declared by the page's layout; the cell row is
    ///   fetched or created on first use.
    /// - `cell_override` takes precedence over a `#cell` suffix.
    pub fn resolve_scope(
        &self,
        page: &Page,
        raw_name: &str,
        cell_override: Option<&str>,
    ) -> Result<(Option<Cell>, String), PlacementError> {
        let parsed = ElementName::parse(raw_name)?;
        let cell_name = cell_override.or(parsed.cell.as_deref());
        let cell = self.resolve_cell(page, cell_name)?;
        Ok((cell, parsed.element))
    }

    /// Creates a new element on the page, allocated per the layout's
    /// insertion mode.
    pub fn create_element(
        &self,
        page: &Page,
        raw_name: &str,
        cell_override: Option<&str>,
    ) -> Result<Element, PlacementError> {
        let (cell, plain_name) = self.resolve_scope(page, raw_name, cell_override)?;
        let mode = self.layout_definition(page).insert_at;

        let element = Element::new(page.uuid, cell.as_ref().map(|cell| cell.uuid), plain_name);
        let scope = element.scope();
        let created =
            self.with_scope_retry(&scope, || self.elements.insert_placed(&element, mode))?;

        info!(
            "event=element_create module=placement status=ok element={} scope=\"{scope}\" position={}",
            created.uuid,
            created.position.unwrap_or_default()
        );
        Ok(created)
    }

    /// Pastes a clipboard entry onto the page.
    ///
    /// Copy entries duplicate the source element (same name, new id) and
    /// stay on the clipboard; cut entries move the original element and
    /// are removed after the move commits. A stale entry whose element
    /// no longer exists surfaces `ElementNotFound` so the caller can
    /// prune it.
    pub fn paste_from_clipboard(
        &self,
        clipboard: &mut Clipboard,
        element_uuid: ElementId,
        page: &Page,
        cell_override: Option<&str>,
    ) -> Result<Element, PlacementError> {
        let entry = clipboard
            .get(element_uuid)
            .ok_or(PlacementError::NotInClipboard(element_uuid))?;
        let source = self
            .elements
            .get_element(element_uuid, true)?
            .ok_or(PlacementError::ElementNotFound(element_uuid))?;

        let cell = self.resolve_cell(page, cell_override)?;
        let mode = self.layout_definition(page).insert_at;
        let scope = cell
            .as_ref()
            .map(Cell::scope)
            .unwrap_or_else(|| Scope::page(page.uuid));

        let pasted = match entry.action {
            ClipboardAction::Copy => {
                let duplicate = Element::new(scope.page_uuid, scope.cell_uuid, source.name);
                self.with_scope_retry(&scope, || self.elements.insert_placed(&duplicate, mode))?
            }
            ClipboardAction::Cut => {
                let moved = self.with_scope_retry(&scope, || {
                    self.elements.move_to_scope(element_uuid, &scope, mode)
                })?;
                clipboard.remove(element_uuid);
                moved
            }
        };

        info!(
            "event=element_paste module=placement status=ok element={} action={:?} scope=\"{scope}\"",
            pasted.uuid, entry.action
        );
        Ok(pasted)
    }

    /// Resolves clipboard entries to elements belonging to the page,
    /// in clipboard insertion order.
    ///
    /// Feeds the "available to paste" render path; stale ids are
    /// skipped here and surface on paste instead.
    pub fn clipboard_items_for_page(
        &self,
        clipboard: &Clipboard,
        page_uuid: PageId,
    ) -> Result<Vec<Element>, PlacementError> {
        let mut items = Vec::new();
        for entry in clipboard.entries() {
            if let Some(element) = self.elements.get_element(entry.element_uuid, true)? {
                if element.page_uuid == page_uuid {
                    items.push(element);
                }
            }
        }
        Ok(items)
    }

    /// Reassigns scope positions to follow `ordered`.
    ///
    /// Unknown ids and active elements of other scopes are rejected;
    /// trashed ids are adopted into the scope and become active.
    pub fn reorder(
        &self,
        scope: &Scope,
        ordered: &[ElementId],
    ) -> Result<Vec<Element>, PlacementError> {
        let elements =
            self.with_scope_retry(scope, || self.elements.reorder_scope(scope, ordered))?;
        info!(
            "event=scope_reorder module=placement status=ok scope=\"{scope}\" count={}",
            elements.len()
        );
        Ok(elements)
    }

    /// Active elements of one scope ordered by position.
    pub fn list_scope(&self, scope: &Scope) -> Result<Vec<Element>, PlacementError> {
        Ok(self.elements.list_scope(scope)?)
    }

    /// Elements of one page across all its scopes, trashed last when
    /// included.
    pub fn list_page(
        &self,
        page_uuid: PageId,
        include_trashed: bool,
    ) -> Result<Vec<Element>, PlacementError> {
        Ok(self.elements.list_page(page_uuid, include_trashed)?)
    }

    fn resolve_cell(
        &self,
        page: &Page,
        cell_name: Option<&str>,
    ) -> Result<Option<Cell>, PlacementError> {
        let Some(cell_name) = cell_name else {
            return Ok(None);
        };

        if !self.layout_definition(page).declares_cell(cell_name) {
            return Err(PlacementError::UndeclaredCell {
                page_uuid: page.uuid,
                cell_name: cell_name.to_string(),
            });
        }

        Ok(Some(self.cells.find_or_create(page.uuid, cell_name)?))
    }

    // Unknown layouts behave as empty definitions: no declared cells,
    // bottom insertion.
    fn layout_definition(&self, page: &Page) -> LayoutDefinition {
        self.layouts
            .layout_for(&page.layout)
            .unwrap_or_else(|| LayoutDefinition::new(page.layout.clone()))
    }

    fn with_scope_retry<T>(
        &self,
        scope: &Scope,
        operation: impl FnMut() -> Result<T, ElementRepoError>,
    ) -> Result<T, PlacementError> {
        Ok(super::with_scope_retry("placement", scope, operation)?)
    }
}
