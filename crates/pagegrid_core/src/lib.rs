//! Placement and clipboard engine for page-built content.
//! This crate is the single source of truth for ordering invariants:
//! active element positions stay a dense 1..N sequence per scope.

pub mod db;
pub mod layout;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use layout::{InsertPosition, LayoutDefinition, LayoutRegistry, StaticLayoutRegistry};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::clipboard::{Clipboard, ClipboardAction, ClipboardEntry};
pub use model::element::{
    Cell, CellId, Element, ElementId, ElementValidationError, PageId, Scope,
};
pub use model::name::{ElementName, ElementNameError};
pub use model::page::Page;
pub use repo::cell_repo::{CellRepoError, CellRepoResult, CellRepository, SqliteCellRepository};
pub use repo::element_repo::{
    ElementRepoError, ElementRepoResult, ElementRepository, SqliteElementRepository,
    SCOPE_CONFLICT_RETRY_BUDGET,
};
pub use service::placement_service::{PlacementError, PlacementService};
pub use service::trash_service::{TrashError, TrashService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
