//! Immutable page snapshots: the buffers, the piece tree, and the read
//! surface the rendering collaborator consumes.
//!
//! A snapshot is never mutated after it is published. Every mutation builds
//! a private successor (sharing unchanged buffers by `Arc` and carrying the
//! node pool forward) and the caller swaps it in wholesale, so readers see
//! either the old or the new snapshot in full.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::config::PageOptions;
use crate::model::buffer::{BufferCursor, NewlineFormat, TextBuffer};
use crate::model::piece_tree::{Color, PieceNode, PieceTree, SENTINEL};

/// Where the most recent insert ended, enabling the sequential-typing fast
/// path. Cleared by any delete or replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastInsert {
    /// Node whose span the insert extended or created.
    pub node: usize,
    /// Page offset at which the inserted text ended.
    pub offset: usize,
}

/// The piece table for a single page.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub(crate) buffers: Vec<Arc<TextBuffer>>,
    pub(crate) newline: NewlineFormat,
    pub(crate) tree: PieceTree,
    pub(crate) last_insert: Option<LastInsert>,
    pub(crate) options: PageOptions,
}

impl PageContent {
    /// Seed a page from its initial text: one read-only original buffer, one
    /// empty add-buffer, and a tree holding a single piece over the original
    /// (none when the text is empty). The newline format is fixed here for
    /// the page's lifetime.
    pub fn from_text(text: &str, options: PageOptions) -> Result<Self, PageError> {
        options.validate()?;
        let newline = options.newline.unwrap_or_else(|| NewlineFormat::detect(text));
        let original = TextBuffer::original(text, newline);

        let mut tree = PieceTree::new();
        if !original.is_empty() {
            let piece = PieceNode::piece(
                0,
                BufferCursor::default(),
                original.end_cursor(),
                original.len(),
                original.line_feed_count(),
            );
            tree.insert_after(SENTINEL, piece);
        }

        tracing::debug!(
            "page loaded: {} bytes, {} line feeds, {:?} newlines",
            original.len(),
            original.line_feed_count(),
            newline
        );

        Ok(PageContent {
            buffers: vec![Arc::new(original), Arc::new(TextBuffer::add_buffer())],
            newline,
            tree,
            last_insert: None,
            options,
        })
    }

    pub fn newline(&self) -> NewlineFormat {
        self.newline
    }

    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    /// Total page length in bytes.
    pub fn len(&self) -> usize {
        self.tree.char_count()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Number of lines (line feeds plus one).
    pub fn line_count(&self) -> usize {
        self.tree.line_feed_count() + 1
    }

    /// The backing buffers; index 0 is always the read-only original.
    pub fn buffers(&self) -> &[Arc<TextBuffer>] {
        &self.buffers
    }

    pub(crate) fn buffer(&self, index: usize) -> &TextBuffer {
        &self.buffers[index]
    }

    pub fn tree(&self) -> &PieceTree {
        &self.tree
    }

    /// Where the most recent insert ended, if the snapshot is still tracking
    /// one.
    pub fn last_insert(&self) -> Option<LastInsert> {
        self.last_insert
    }

    /// In-order pieces of the snapshot, each resolvable to a literal slice
    /// via [`PageContent::piece_text`]. This is the artifact the rendering
    /// collaborator consumes.
    pub fn pieces(&self) -> impl Iterator<Item = PieceView> + '_ {
        self.tree.iter().map(move |index| {
            let n = self.tree.node(index);
            let start = self.buffers[n.buffer_index].offset_of(n.start);
            PieceView {
                node_index: index,
                buffer_index: n.buffer_index,
                range: start..start + n.length,
                length: n.length,
                line_feed_count: n.line_feed_count,
                color: n.color,
            }
        })
    }

    /// The literal text a piece references.
    pub fn piece_text(&self, piece: &PieceView) -> &str {
        &self.buffers[piece.buffer_index].content()[piece.range.clone()]
    }

    /// The page's full text, concatenated in piece order.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len());
        for piece in self.pieces() {
            out.push_str(self.piece_text(&piece));
        }
        out
    }

    /// Debugging aid: checks the tree invariants plus every piece span
    /// against its backing buffer.
    pub fn validate(&self) -> Result<(), PageError> {
        self.tree
            .validate()
            .map_err(|detail| PageError::CorruptTree { detail })?;

        if !self.buffers[0].is_read_only() {
            return Err(PageError::CorruptTree {
                detail: "buffer 0 is not read-only".to_string(),
            });
        }
        for (index, buffer) in self.buffers.iter().enumerate().skip(1) {
            if buffer.is_read_only() {
                return Err(PageError::CorruptTree {
                    detail: format!("add-buffer {index} is read-only"),
                });
            }
        }

        for index in self.tree.iter() {
            let n = self.tree.node(index);
            let buffer = self.buffers.get(n.buffer_index).ok_or_else(|| PageError::CorruptTree {
                detail: format!("node {index} references missing buffer {}", n.buffer_index),
            })?;
            let start = buffer.offset_of(n.start);
            let end = buffer.offset_of(n.end);
            if end < start || end > buffer.len() {
                return Err(PageError::CorruptTree {
                    detail: format!("node {index} span {start}..{end} escapes its buffer"),
                });
            }
            if end - start != n.length {
                return Err(PageError::CorruptTree {
                    detail: format!(
                        "node {index} length {} disagrees with cursors ({start}..{end})",
                        n.length
                    ),
                });
            }
            if n.end.line - n.start.line != n.line_feed_count {
                return Err(PageError::CorruptTree {
                    detail: format!(
                        "node {index} line_feed_count {} disagrees with cursors",
                        n.line_feed_count
                    ),
                });
            }
        }
        Ok(())
    }
}

/// One in-order piece of a snapshot, resolved to a byte range of its buffer.
/// Rendering reads these fields for layout and must not reach further into
/// the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceView {
    pub node_index: usize,
    pub buffer_index: usize,
    pub range: Range<usize>,
    pub length: usize,
    pub line_feed_count: usize,
    pub color: Color,
}

/// Error type for every fallible page operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// An offset lies beyond the page's total length.
    OffsetOutOfRange { offset: usize, len: usize },
    /// A range's start lies after its end.
    RangeOutOfOrder { start: usize, end: usize },
    /// A line number lies beyond the page's line count.
    LineOutOfRange { line: usize, line_count: usize },
    /// A mutation offset splits a UTF-8 code point.
    NotCharBoundary { offset: usize },
    /// An append targeted the read-only original buffer.
    ReadOnlyBuffer { buffer_index: usize },
    /// An append targeted a buffer index the page does not have.
    UnknownBuffer { buffer_index: usize },
    /// The structural locator was asked about a node its map does not hold.
    UnknownStructureNode { structure_node_index: usize },
    /// A dispatch named a page the store does not hold.
    UnknownPage { page_id: String },
    /// Rejected page options.
    InvalidOptions(String),
    /// An internal invariant violation; not a caller error.
    CorruptTree { detail: String },
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::OffsetOutOfRange { offset, len } => {
                write!(f, "offset {offset} is out of range for page of length {len}")
            }
            PageError::RangeOutOfOrder { start, end } => {
                write!(f, "range start {start} lies after end {end}")
            }
            PageError::LineOutOfRange { line, line_count } => {
                write!(f, "line {line} is out of range for page with {line_count} lines")
            }
            PageError::NotCharBoundary { offset } => {
                write!(f, "offset {offset} is not a character boundary")
            }
            PageError::ReadOnlyBuffer { buffer_index } => {
                write!(f, "buffer {buffer_index} is read-only")
            }
            PageError::UnknownBuffer { buffer_index } => {
                write!(f, "no buffer with index {buffer_index}")
            }
            PageError::UnknownStructureNode { structure_node_index } => {
                write!(f, "unknown structure node {structure_node_index}")
            }
            PageError::UnknownPage { page_id } => write!(f, "unknown page {page_id:?}"),
            PageError::InvalidOptions(msg) => write!(f, "invalid page options: {msg}"),
            PageError::CorruptTree { detail } => write!(f, "piece tree invariant violated: {detail}"),
        }
    }
}

impl std::error::Error for PageError {}
