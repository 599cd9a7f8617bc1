//! Mutation intents consumed from the editing surface / dispatch layer.
//!
//! A closed tagged union with exhaustive handling in the mutation engine;
//! the variants mirror the action shapes the surface dispatches.

use serde::{Deserialize, Serialize};

use crate::model::structure::ContentLocations;
use crate::state::PageId;

/// One mutation intent against a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditAction {
    /// Insert `content` at a page-global offset. The structural qualifiers
    /// are opaque to the engine and carried for the caller's reporting.
    Insert {
        page_id: PageId,
        content: String,
        offset: usize,
        structure_node_index: usize,
        structure_local_offset: usize,
    },

    /// Delete the half-open range described by `locations`.
    Delete {
        page_id: PageId,
        locations: ContentLocations,
    },

    /// Replace the half-open range described by `locations` with `content`.
    Replace {
        page_id: PageId,
        content: String,
        locations: ContentLocations,
    },
}

impl EditAction {
    pub fn insert(
        page_id: PageId,
        content: impl Into<String>,
        offset: usize,
        structure_node_index: usize,
        structure_local_offset: usize,
    ) -> Self {
        EditAction::Insert {
            page_id,
            content: content.into(),
            offset,
            structure_node_index,
            structure_local_offset,
        }
    }

    pub fn delete(page_id: PageId, locations: ContentLocations) -> Self {
        EditAction::Delete { page_id, locations }
    }

    pub fn replace(page_id: PageId, content: impl Into<String>, locations: ContentLocations) -> Self {
        EditAction::Replace {
            page_id,
            content: content.into(),
            locations,
        }
    }

    pub fn page_id(&self) -> &PageId {
        match self {
            EditAction::Insert { page_id, .. }
            | EditAction::Delete { page_id, .. }
            | EditAction::Replace { page_id, .. } => page_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::Location;

    #[test]
    fn test_page_id_accessor() {
        let id = PageId::from("page-1");
        let action = EditAction::insert(id.clone(), "hi", 0, 0, 0);
        assert_eq!(action.page_id(), &id);

        let locations = ContentLocations::new(Location::new(0, 0), Location::new(2, 0));
        let action = EditAction::delete(id.clone(), locations);
        assert_eq!(action.page_id(), &id);
    }
}
