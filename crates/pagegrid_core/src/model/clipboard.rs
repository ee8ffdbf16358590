//! Session-scoped clipboard state.
//!
//! # Responsibility
//! - Record elements marked for copy or cut, pending paste.
//! - Keep at most one entry per element id, in insertion order.
//!
//! # Invariants
//! - The clipboard lives for one user session and is never persisted.
//! - A later copy/cut for an already-present id replaces the existing
//!   entry in place; ids never duplicate.
//! - Paste semantics (move vs. duplicate) live in the placement
//!   service; this structure only tracks membership and intent.

use crate::model::element::ElementId;
use serde::{Deserialize, Serialize};

/// Intent recorded for a clipboard entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardAction {
    /// Paste duplicates the element; the entry survives the paste.
    Copy,
    /// Paste moves the element; the entry is removed after the paste.
    Cut,
}

/// One pending copy/cut marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    pub element_uuid: ElementId,
    pub action: ClipboardAction,
}

/// Ordered clipboard for one session, passed by reference into each
/// placement request rather than held as ambient global state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clipboard {
    entries: Vec<ClipboardEntry>,
}

impl Clipboard {
    /// Creates an empty clipboard, typically at session start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an element for copy-paste.
    pub fn copy(&mut self, element_uuid: ElementId) {
        self.put(element_uuid, ClipboardAction::Copy);
    }

    /// Marks an element for cut-paste.
    pub fn cut(&mut self, element_uuid: ElementId) {
        self.put(element_uuid, ClipboardAction::Cut);
    }

    /// Whether an entry for the id exists.
    pub fn contains(&self, element_uuid: ElementId) -> bool {
        self.get(element_uuid).is_some()
    }

    /// Returns the entry for the id, if present.
    pub fn get(&self, element_uuid: ElementId) -> Option<ClipboardEntry> {
        self.entries
            .iter()
            .copied()
            .find(|entry| entry.element_uuid == element_uuid)
    }

    /// Removes the entry for the id. Returns whether one was present.
    pub fn remove(&mut self, element_uuid: ElementId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.element_uuid != element_uuid);
        self.entries.len() != before
    }

    /// Entries in insertion order, oldest first.
    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries, typically at session end.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn put(&mut self, element_uuid: ElementId, action: ClipboardAction) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.element_uuid == element_uuid)
        {
            Some(entry) => entry.action = action,
            None => self.entries.push(ClipboardEntry {
                element_uuid,
                action,
            }),
        }
    }
}
