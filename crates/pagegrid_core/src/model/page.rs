//! Page handle used by placement operations.
//!
//! Page CRUD lives outside this engine; operations only need the page
//! identity and its layout name to consult the layout registry.

use crate::model::element::PageId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lightweight reference to an externally managed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Stable page id, owned by the external page store.
    pub uuid: PageId,
    /// Layout name used to look up declared cells and insertion mode.
    pub layout: String,
}

impl Page {
    /// Creates a page handle with a generated id.
    pub fn new(layout: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), layout)
    }

    /// Creates a page handle for an existing external page id.
    pub fn with_id(uuid: PageId, layout: impl Into<String>) -> Self {
        Self {
            uuid,
            layout: layout.into(),
        }
    }
}
