//! Bridging between page-global offsets and the structural-block addressing
//! used by the external structural tree.
//!
//! The piece table never interprets structural semantics: a structure node
//! index is an opaque tag carried alongside offsets. The structural tree
//! owns the index → starting-offset mapping and lends it to the locator as
//! a pure function.

use serde::{Deserialize, Serialize};

use crate::model::page::PageError;

/// A point addressed both in page-global offset space and in structural
/// block space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Page-global byte offset.
    pub content_offset: usize,
    /// Opaque tag naming the structural block containing the point.
    pub structure_node_index: usize,
}

impl Location {
    pub fn new(content_offset: usize, structure_node_index: usize) -> Self {
        Location {
            content_offset,
            structure_node_index,
        }
    }
}

/// A half-open range of locations, as carried by delete and replace intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLocations {
    pub start: Location,
    pub end: Location,
}

impl ContentLocations {
    pub fn new(start: Location, end: Location) -> Self {
        ContentLocations { start, end }
    }

    /// The page-global byte range the locations describe.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start.content_offset..self.end.content_offset
    }
}

/// A structural point: block index plus the offset local to that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralLocation {
    pub structure_node_index: usize,
    pub local_offset: usize,
}

/// The structural tree's view of where each block's content begins,
/// supplied by the collaborator that owns the blocks.
///
/// Contract: indices `0..node_count()` resolve to `Some` starting offset,
/// and starting offsets are non-decreasing in index order (blocks appear in
/// document order), which is what lets the reverse lookup binary-search.
pub trait StructureMap {
    fn node_count(&self) -> usize;

    /// Page-global offset at which the block's content begins.
    fn node_start_offset(&self, structure_node_index: usize) -> Option<usize>;
}

impl StructureMap for [usize] {
    fn node_count(&self) -> usize {
        self.len()
    }

    fn node_start_offset(&self, structure_node_index: usize) -> Option<usize> {
        self.get(structure_node_index).copied()
    }
}

impl StructureMap for Vec<usize> {
    fn node_count(&self) -> usize {
        self.len()
    }

    fn node_start_offset(&self, structure_node_index: usize) -> Option<usize> {
        self.get(structure_node_index).copied()
    }
}

/// Resolve a block-relative offset to a page-global offset.
pub fn to_global_offset<M: StructureMap + ?Sized>(
    map: &M,
    structure_node_index: usize,
    local_offset: usize,
) -> Result<usize, PageError> {
    let start = map
        .node_start_offset(structure_node_index)
        .ok_or(PageError::UnknownStructureNode { structure_node_index })?;
    Ok(start + local_offset)
}

/// Resolve a page-global offset to the block containing it: the last block
/// whose starting offset does not exceed the offset.
pub fn to_structural_location<M: StructureMap + ?Sized>(
    map: &M,
    global_offset: usize,
) -> Result<StructuralLocation, PageError> {
    let count = map.node_count();

    // partition point over "block starts at or before the offset"
    let mut lo = 0;
    let mut hi = count;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let start = map
            .node_start_offset(mid)
            .ok_or(PageError::UnknownStructureNode { structure_node_index: mid })?;
        if start <= global_offset {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    if lo == 0 {
        // empty map, or the offset precedes the first block
        return Err(PageError::UnknownStructureNode { structure_node_index: 0 });
    }

    let structure_node_index = lo - 1;
    let start = map
        .node_start_offset(structure_node_index)
        .ok_or(PageError::UnknownStructureNode { structure_node_index })?;
    Ok(StructuralLocation {
        structure_node_index,
        local_offset: global_offset - start,
    })
}
