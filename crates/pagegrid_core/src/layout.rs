//! Layout registry contract and in-memory implementation.
//!
//! # Responsibility
//! - Expose the layout metadata the engine consumes: declared cell
//!   names and the default insertion mode per layout.
//!
//! # Invariants
//! - The registry is read-only from the engine's perspective; layout
//!   definitions are owned by the external page/layout store.
//! - An unknown layout behaves as an empty definition: no declared
//!   cells, bottom insertion.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Where newly created or pasted elements land within a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    /// New element becomes position 1; siblings shift down by one.
    Top,
    /// New element is appended after the last active sibling.
    #[default]
    Bottom,
}

/// Declared metadata for one page layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDefinition {
    /// Layout name, matched against `Page::layout`.
    pub name: String,
    /// Cell names this layout declares. Elements may only target these.
    pub cells: BTreeSet<String>,
    /// Default insertion mode for every scope on pages of this layout.
    pub insert_at: InsertPosition,
}

impl LayoutDefinition {
    /// Creates a definition with no cells and bottom insertion.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a declared cell name.
    pub fn with_cell(mut self, cell: impl Into<String>) -> Self {
        self.cells.insert(cell.into());
        self
    }

    /// Sets the insertion mode.
    pub fn insert_at(mut self, insert_at: InsertPosition) -> Self {
        self.insert_at = insert_at;
        self
    }

    /// Whether this layout declares the given cell name.
    pub fn declares_cell(&self, cell_name: &str) -> bool {
        self.cells.contains(cell_name)
    }
}

/// Read-only source of layout metadata.
pub trait LayoutRegistry {
    /// Returns the definition for a layout name, if registered.
    fn layout_for(&self, layout_name: &str) -> Option<LayoutDefinition>;
}

/// Fixed in-process registry, populated once at startup by the caller.
#[derive(Debug, Clone, Default)]
pub struct StaticLayoutRegistry {
    layouts: HashMap<String, LayoutDefinition>,
}

impl StaticLayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one layout definition, replacing any same-named one.
    pub fn register(&mut self, definition: LayoutDefinition) {
        self.layouts.insert(definition.name.clone(), definition);
    }
}

impl LayoutRegistry for StaticLayoutRegistry {
    fn layout_for(&self, layout_name: &str) -> Option<LayoutDefinition> {
        self.layouts.get(layout_name).cloned()
    }
}

impl<R: LayoutRegistry> LayoutRegistry for &R {
    fn layout_for(&self, layout_name: &str) -> Option<LayoutDefinition> {
        (**self).layout_for(layout_name)
    }
}

#[cfg(test)]
mod tests {
    use super::{InsertPosition, LayoutDefinition, LayoutRegistry, StaticLayoutRegistry};

    #[test]
    fn registry_returns_registered_definition() {
        let mut registry = StaticLayoutRegistry::new();
        registry.register(
            LayoutDefinition::new("news")
                .with_cell("header")
                .insert_at(InsertPosition::Top),
        );

        let definition = registry.layout_for("news").unwrap();
        assert!(definition.declares_cell("header"));
        assert!(!definition.declares_cell("footer"));
        assert_eq!(definition.insert_at, InsertPosition::Top);

        assert_eq!(registry.layout_for("unknown"), None);
    }

    #[test]
    fn insertion_mode_defaults_to_bottom() {
        assert_eq!(
            LayoutDefinition::new("standard").insert_at,
            InsertPosition::Bottom
        );
    }
}
