//! The explicit page map owned by the dispatch layer.
//!
//! The engine itself only ever sees one snapshot at a time; this store is
//! the caller-owned association of page identifier to current snapshot,
//! replaced wholesale on each successful mutation.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PageOptions;
use crate::model::action::EditAction;
use crate::model::mutation;
use crate::model::page::{PageContent, PageError};

/// Identifier for one page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub String);

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        PageId(id.to_string())
    }
}

impl From<String> for PageId {
    fn from(id: String) -> Self {
        PageId(id)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All open pages, keyed by identifier.
#[derive(Debug, Default)]
pub struct PageStore {
    pages: HashMap<PageId, PageContent>,
}

impl PageStore {
    pub fn new() -> Self {
        PageStore {
            pages: HashMap::new(),
        }
    }

    /// Seed a page from its initial text and publish the first snapshot.
    pub fn open_page(
        &mut self,
        page_id: PageId,
        text: &str,
        options: PageOptions,
    ) -> Result<&PageContent, PageError> {
        let page = PageContent::from_text(text, options)?;
        Ok(match self.pages.entry(page_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(page);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(page),
        })
    }

    /// The current snapshot of a page, if open.
    pub fn page(&self, page_id: &PageId) -> Option<&PageContent> {
        self.pages.get(page_id)
    }

    /// Drop a page, returning its final snapshot.
    pub fn close_page(&mut self, page_id: &PageId) -> Option<PageContent> {
        self.pages.remove(page_id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Apply a mutation intent to the page it names. The stored snapshot is
    /// replaced only after the whole mutation has succeeded; on error the
    /// prior snapshot remains published.
    pub fn dispatch(&mut self, action: &EditAction) -> Result<&PageContent, PageError> {
        match self.pages.entry(action.page_id().clone()) {
            Entry::Vacant(entry) => Err(PageError::UnknownPage {
                page_id: entry.key().0.clone(),
            }),
            Entry::Occupied(mut entry) => {
                let next = mutation::apply_action(entry.get(), action)?;
                entry.insert(next);
                Ok(entry.into_mut())
            }
        }
    }
}
