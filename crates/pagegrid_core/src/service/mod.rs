//! Engine use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs: create,
//!   paste, reorder, trash and restore.
//! - Keep transport/rendering layers decoupled from storage details.

pub mod placement_service;
pub mod trash_service;

use crate::model::element::Scope;
use crate::repo::element_repo::{ElementRepoError, SCOPE_CONFLICT_RETRY_BUDGET};
use log::warn;

/// Runs `operation`, retrying scope-conflict collisions against re-read
/// state until the budget is exhausted. Every allocation path (create,
/// paste, reorder, restore) goes through here.
pub(crate) fn with_scope_retry<T>(
    module: &'static str,
    scope: &Scope,
    mut operation: impl FnMut() -> Result<T, ElementRepoError>,
) -> Result<T, ElementRepoError> {
    let mut attempt = 1;
    loop {
        match operation() {
            Err(ElementRepoError::ScopeConflict(conflict_scope))
                if attempt < SCOPE_CONFLICT_RETRY_BUDGET =>
            {
                warn!(
                    "event=scope_conflict module={module} status=retry scope=\"{conflict_scope}\" attempt={attempt}"
                );
                attempt += 1;
            }
            Err(err) => {
                if matches!(err, ElementRepoError::ScopeConflict(_)) {
                    warn!(
                        "event=scope_conflict module={module} status=exhausted scope=\"{scope}\" attempts={attempt}"
                    );
                }
                return Err(err);
            }
            Ok(value) => return Ok(value),
        }
    }
}
