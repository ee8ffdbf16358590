//! Domain model for element placement.
//!
//! # Responsibility
//! - Define the canonical element/cell/scope records used by the engine.
//! - Keep parsing and session-state structures free of storage details.
//!
//! # Invariants
//! - Every element and cell is identified by a stable UUID.
//! - Trash state is represented by a cleared position, not a hard delete.

pub mod clipboard;
pub mod element;
pub mod name;
pub mod page;
