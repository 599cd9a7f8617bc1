//! The mutation engine: pure snapshot-in, snapshot-out state transitions.
//!
//! Each operation validates its inputs, builds a private successor snapshot,
//! and publishes it only by returning it. Nothing the caller can observe is
//! touched before the whole mutation has succeeded.

use std::ops::Range;
use std::sync::Arc;

use crate::model::action::EditAction;
use crate::model::buffer::{BufferCursor, TextBuffer};
use crate::model::page::{LastInsert, PageContent, PageError};
use crate::model::piece_tree::{NodePosition, PieceNode, SENTINEL};

/// Insert `text` at a page-global byte offset, returning the successor
/// snapshot. Inserting empty text is a no-op.
pub fn insert_content(page: &PageContent, offset: usize, text: &str) -> Result<PageContent, PageError> {
    tracing::debug!("insert_content: offset={}, len={}", offset, text.len());
    let len = page.len();
    if offset > len {
        return Err(PageError::OffsetOutOfRange { offset, len });
    }
    if text.is_empty() {
        return Ok(page.clone());
    }
    ensure_char_boundary(page, offset)?;

    let mut next = page.clone();

    // Fast path: the previous insert ended exactly here and its piece still
    // ends at the tail of a mutable buffer, so the piece can be widened in
    // place instead of growing the tree.
    if let Some(last) = page.last_insert() {
        if last.offset == offset {
            let n = page.tree().node(last.node);
            let buffer = page.buffer(n.buffer_index);
            if !buffer.is_read_only() && buffer.offset_of(n.end) == buffer.len() {
                tracing::trace!("widening node {} in place", last.node);
                let buffer_index = n.buffer_index;
                let (span_start, span_end) = append_to_add_buffer(&mut next, buffer_index, text)?;
                let added_lfs = span_end.line - span_start.line;
                {
                    let node = next.tree.node_mut(last.node);
                    node.end = span_end;
                    node.length += text.len();
                    node.line_feed_count += added_lfs;
                }
                next.tree
                    .update_metadata_upward(last.node, text.len() as isize, added_lfs as isize);
                next.last_insert = Some(LastInsert {
                    node: last.node,
                    offset: offset + text.len(),
                });
                return Ok(next);
            }
        }
    }

    // General path: append to the tail add-buffer and splice a new piece.
    let buffer_index = tail_add_buffer(&mut next);
    let (span_start, span_end) = append_to_add_buffer(&mut next, buffer_index, text)?;
    let line_feeds = span_end.line - span_start.line;
    let piece = PieceNode::piece(buffer_index, span_start, span_end, text.len(), line_feeds);

    let inserted = if next.tree.is_empty() {
        next.tree.insert_after(SENTINEL, piece)
    } else if offset == len {
        let anchor = next.tree.last_node();
        next.tree.insert_after(anchor, piece)
    } else {
        let pos = next.tree.node_at(offset).ok_or_else(|| PageError::CorruptTree {
            detail: "offset lookup resolved to the sentinel".to_string(),
        })?;
        if pos.remainder == 0 {
            next.tree.insert_before(pos.node, piece)
        } else {
            tracing::trace!("splitting node {} at {}", pos.node, pos.remainder);
            split_and_insert(&mut next, pos, piece)
        }
    };

    next.last_insert = Some(LastInsert {
        node: inserted,
        offset: offset + text.len(),
    });
    Ok(next)
}

/// Delete the half-open byte range `[start, end)`, returning the successor
/// snapshot. Deleting an empty range is a no-op (beyond clearing the insert
/// cache, as every delete does). Buffers keep their bytes; only the pieces
/// referencing them are removed or narrowed.
pub fn delete_content(page: &PageContent, range: Range<usize>) -> Result<PageContent, PageError> {
    tracing::debug!("delete_content: range={}..{}", range.start, range.end);
    let len = page.len();
    if range.start > range.end {
        return Err(PageError::RangeOutOfOrder {
            start: range.start,
            end: range.end,
        });
    }
    if range.end > len {
        return Err(PageError::OffsetOutOfRange { offset: range.end, len });
    }

    let mut next = page.clone();
    next.last_insert = None;
    if range.is_empty() {
        return Ok(next);
    }
    ensure_char_boundary(page, range.start)?;
    ensure_char_boundary(page, range.end)?;

    let corrupt = || PageError::CorruptTree {
        detail: "offset lookup resolved to the sentinel".to_string(),
    };
    let start_pos = next.tree.node_at(range.start).ok_or_else(corrupt)?;
    let end_pos = next.tree.node_at(range.end).ok_or_else(corrupt)?;

    if start_pos.node == end_pos.node {
        let node_index = start_pos.node;
        let n = next.tree.node(node_index).clone();
        let (head_keep, tail_drop) = (start_pos.remainder, end_pos.remainder);

        if head_keep == 0 && tail_drop == n.length {
            next.tree.delete_node(node_index);
        } else if head_keep == 0 {
            trim_head(&mut next, node_index, tail_drop);
        } else if tail_drop == n.length {
            trim_tail(&mut next, node_index, head_keep);
        } else {
            // carve the middle out: keep the head, split off the tail
            let tail_piece = {
                let buffer = next.buffer(n.buffer_index);
                let piece_start = buffer.offset_of(n.start);
                let tail_start = buffer.cursor_at(piece_start + tail_drop);
                PieceNode::piece(
                    n.buffer_index,
                    tail_start,
                    n.end,
                    n.length - tail_drop,
                    n.end.line - tail_start.line,
                )
            };
            trim_tail(&mut next, node_index, head_keep);
            next.tree.insert_after(node_index, tail_piece);
        }
    } else {
        let mut doomed = Vec::new();

        if start_pos.remainder == 0 {
            doomed.push(start_pos.node);
        } else {
            trim_tail(&mut next, start_pos.node, start_pos.remainder);
        }

        let mut x = next.tree.successor(start_pos.node);
        while x != end_pos.node {
            doomed.push(x);
            x = next.tree.successor(x);
        }

        let end_length = next.tree.node(end_pos.node).length;
        if end_pos.remainder == end_length {
            doomed.push(end_pos.node);
        } else if end_pos.remainder > 0 {
            trim_head(&mut next, end_pos.node, end_pos.remainder);
        }

        for node_index in doomed {
            next.tree.delete_node(node_index);
        }
    }

    Ok(next)
}

/// Replace the half-open byte range with `text`: a delete followed by an
/// insert at the range start, composed on the intermediate snapshot.
pub fn replace_content(page: &PageContent, range: Range<usize>, text: &str) -> Result<PageContent, PageError> {
    tracing::debug!(
        "replace_content: range={}..{}, len={}",
        range.start,
        range.end,
        text.len()
    );
    let deleted = delete_content(page, range.clone())?;
    insert_content(&deleted, range.start, text)
}

/// Apply one mutation intent. Page resolution is the store's job; the
/// intent's structural qualifiers are opaque here.
pub fn apply_action(page: &PageContent, action: &EditAction) -> Result<PageContent, PageError> {
    match action {
        EditAction::Insert { content, offset, .. } => insert_content(page, *offset, content),
        EditAction::Delete { locations, .. } => delete_content(page, locations.range()),
        EditAction::Replace { content, locations, .. } => replace_content(page, locations.range(), content),
    }
}

/// Append `text` to the add-buffer at `buffer_index` and publish the
/// successor buffer into the snapshot being built. Errors when the index is
/// unknown or names a read-only buffer.
fn append_to_add_buffer(
    next: &mut PageContent,
    buffer_index: usize,
    text: &str,
) -> Result<(BufferCursor, BufferCursor), PageError> {
    let buffer = next
        .buffers
        .get(buffer_index)
        .ok_or(PageError::UnknownBuffer { buffer_index })?;
    if buffer.is_read_only() {
        return Err(PageError::ReadOnlyBuffer { buffer_index });
    }
    let (appended, span_start, span_end) = buffer.appended(text, next.newline);
    next.buffers[buffer_index] = Arc::new(appended);
    Ok((span_start, span_end))
}

/// Index of the add-buffer the general path should append to, retiring the
/// tail buffer once it has reached the configured capacity.
fn tail_add_buffer(next: &mut PageContent) -> usize {
    let tail = next.buffers.len() - 1;
    if next.buffers[tail].is_read_only() || next.buffers[tail].len() >= next.options.add_buffer_capacity {
        tracing::trace!("starting add-buffer {}", next.buffers.len());
        next.buffers.push(Arc::new(TextBuffer::add_buffer()));
        return next.buffers.len() - 1;
    }
    tail
}

/// Split the piece at `pos` and place `piece` between the two halves.
/// Returns the index of the middle (inserted) node.
fn split_and_insert(next: &mut PageContent, pos: NodePosition, piece: PieceNode) -> usize {
    let n = next.tree.node(pos.node).clone();
    let split = {
        let buffer = next.buffer(n.buffer_index);
        buffer.cursor_at(buffer.offset_of(n.start) + pos.remainder)
    };

    let tail_length = n.length - pos.remainder;
    let tail_line_feeds = n.end.line - split.line;
    let tail_piece = PieceNode::piece(n.buffer_index, split, n.end, tail_length, tail_line_feeds);

    {
        let node = next.tree.node_mut(pos.node);
        node.end = split;
        node.length = pos.remainder;
        node.line_feed_count -= tail_line_feeds;
    }
    next.tree
        .update_metadata_upward(pos.node, -(tail_length as isize), -(tail_line_feeds as isize));

    let middle = next.tree.insert_after(pos.node, piece);
    next.tree.insert_after(middle, tail_piece);
    middle
}

/// Narrow `node` to drop its first `drop` bytes.
fn trim_head(next: &mut PageContent, node_index: usize, drop: usize) {
    let n = next.tree.node(node_index).clone();
    let new_start = {
        let buffer = next.buffer(n.buffer_index);
        buffer.cursor_at(buffer.offset_of(n.start) + drop)
    };
    let removed_lfs = new_start.line - n.start.line;
    {
        let node = next.tree.node_mut(node_index);
        node.start = new_start;
        node.length -= drop;
        node.line_feed_count -= removed_lfs;
    }
    next.tree
        .update_metadata_upward(node_index, -(drop as isize), -(removed_lfs as isize));
}

/// Narrow `node` to keep only its first `keep` bytes.
fn trim_tail(next: &mut PageContent, node_index: usize, keep: usize) {
    let n = next.tree.node(node_index).clone();
    let new_end = {
        let buffer = next.buffer(n.buffer_index);
        buffer.cursor_at(buffer.offset_of(n.start) + keep)
    };
    let removed_len = n.length - keep;
    let removed_lfs = n.end.line - new_end.line;
    {
        let node = next.tree.node_mut(node_index);
        node.end = new_end;
        node.length = keep;
        node.line_feed_count -= removed_lfs;
    }
    next.tree
        .update_metadata_upward(node_index, -(removed_len as isize), -(removed_lfs as isize));
}

/// Mutation offsets must not split a UTF-8 code point. Piece boundaries
/// always sit on character boundaries, so only an offset interior to a
/// piece needs the byte-level check.
fn ensure_char_boundary(page: &PageContent, offset: usize) -> Result<(), PageError> {
    let Some(pos) = page.tree().node_at(offset) else {
        return Ok(());
    };
    let n = page.tree().node(pos.node);
    if pos.remainder == 0 || pos.remainder == n.length {
        return Ok(());
    }
    let buffer = page.buffer(n.buffer_index);
    let piece_start = buffer.offset_of(n.start);
    if buffer.content().is_char_boundary(piece_start + pos.remainder) {
        Ok(())
    } else {
        Err(PageError::NotCharBoundary { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageOptions;
    use crate::model::buffer::NewlineFormat;

    fn page(text: &str) -> PageContent {
        PageContent::from_text(text, PageOptions::default()).unwrap()
    }

    fn checked(page: PageContent) -> PageContent {
        page.validate().expect("snapshot must stay consistent");
        page
    }

    #[test]
    fn test_insert_into_middle_splits() {
        let page = page("hello world");
        let next = checked(insert_content(&page, 5, " there").unwrap());
        assert_eq!(next.text(), "hello there world");
        assert_eq!(next.pieces().count(), 3);
        // the prior snapshot is untouched
        assert_eq!(page.text(), "hello world");
    }

    #[test]
    fn test_insert_at_start_and_end() {
        let page = page("middle");
        let next = checked(insert_content(&page, 0, ">>").unwrap());
        assert_eq!(next.text(), ">>middle");
        let next = checked(insert_content(&next, next.len(), "<<").unwrap());
        assert_eq!(next.text(), ">>middle<<");
    }

    #[test]
    fn test_insert_into_empty_page() {
        let page = page("");
        let next = checked(insert_content(&page, 0, "first").unwrap());
        assert_eq!(next.text(), "first");
        assert_eq!(next.pieces().count(), 1);
    }

    #[test]
    fn test_insert_empty_text_is_noop() {
        let page = page("abc");
        let next = insert_content(&page, 1, "").unwrap();
        assert_eq!(next.text(), "abc");
        assert_eq!(next.tree().nodes().len(), page.tree().nodes().len());
    }

    #[test]
    fn test_insert_out_of_range() {
        let page = page("abc");
        assert!(matches!(
            insert_content(&page, 4, "x"),
            Err(PageError::OffsetOutOfRange { offset: 4, len: 3 })
        ));
    }

    #[test]
    fn test_insert_rejects_split_code_point() {
        let page = page("héllo");
        // 'é' occupies bytes 1..3
        assert!(matches!(
            insert_content(&page, 2, "x"),
            Err(PageError::NotCharBoundary { offset: 2 })
        ));
        assert!(insert_content(&page, 3, "x").is_ok());
    }

    #[test]
    fn test_sequential_typing_reuses_one_node() {
        let mut current = page("hello world");
        let mut offset = 5;
        for ch in [" ", "t", "h", "e", "r", "e"] {
            current = checked(insert_content(&current, offset, ch).unwrap());
            offset += 1;
        }
        assert_eq!(current.text(), "hello there world");
        // first insert splits into three pieces; the rest widen in place
        assert_eq!(current.pieces().count(), 3);
        assert_eq!(current.last_insert().map(|l| l.offset), Some(11));
    }

    #[test]
    fn test_fast_path_counts_appended_line_feeds() {
        let base = page("");
        let a = checked(insert_content(&base, 0, "one").unwrap());
        let b = checked(insert_content(&a, 3, "\ntwo\n").unwrap());
        assert_eq!(b.text(), "one\ntwo\n");
        assert_eq!(b.line_count(), 3);
        assert_eq!(b.pieces().count(), 1);
    }

    #[test]
    fn test_crlf_pair_split_across_inserts() {
        let options = PageOptions {
            newline: Some(NewlineFormat::Crlf),
            ..PageOptions::default()
        };
        let base = PageContent::from_text("", options).unwrap();
        let a = checked(insert_content(&base, 0, "ab\r").unwrap());
        assert_eq!(a.line_count(), 1);
        // the LF lands right after the CR in the same add-buffer
        let b = checked(insert_content(&a, 3, "\ncd").unwrap());
        assert_eq!(b.text(), "ab\r\ncd");
        assert_eq!(b.line_count(), 2);
    }

    #[test]
    fn test_delete_clears_insert_cache() {
        let page = page("hello");
        let typed = insert_content(&page, 5, "!").unwrap();
        assert!(typed.last_insert().is_some());
        let cut = delete_content(&typed, 0..1).unwrap();
        assert!(cut.last_insert().is_none());
    }

    #[test]
    fn test_delete_within_one_node() {
        let page = page("hello world");
        // head
        let next = checked(delete_content(&page, 0..6).unwrap());
        assert_eq!(next.text(), "world");
        // tail
        let next = checked(delete_content(&page, 5..11).unwrap());
        assert_eq!(next.text(), "hello");
        // middle
        let next = checked(delete_content(&page, 2..9).unwrap());
        assert_eq!(next.text(), "herld");
        // everything
        let next = checked(delete_content(&page, 0..11).unwrap());
        assert_eq!(next.text(), "");
        assert!(next.is_empty());
        assert_eq!(next.tree().root(), SENTINEL);
        assert_eq!(next.pieces().count(), 0);
    }

    #[test]
    fn test_delete_across_nodes() {
        let base = page("aaa");
        let built = insert_content(&base, 3, "bbb").unwrap();
        let built = insert_content(&built, 0, "ccc").unwrap();
        let built = checked(insert_content(&built, 4, "ddd").unwrap());
        assert_eq!(built.text(), "cccadddaabbb");

        let next = checked(delete_content(&built, 2..10).unwrap());
        assert_eq!(next.text(), "ccbb");

        let next = checked(delete_content(&built, 0..built.len()).unwrap());
        assert!(next.is_empty());
    }

    #[test]
    fn test_delete_at_piece_boundary() {
        let base = page("abc");
        let built = checked(insert_content(&base, 3, "def").unwrap());
        // range ends exactly where the second piece begins
        let next = checked(delete_content(&built, 1..3).unwrap());
        assert_eq!(next.text(), "adef");
        // range starts exactly at the boundary
        let next = checked(delete_content(&built, 3..5).unwrap());
        assert_eq!(next.text(), "abcf");
    }

    #[test]
    fn test_delete_empty_range_is_noop() {
        let page = page("abc");
        let next = delete_content(&page, 2..2).unwrap();
        assert_eq!(next.text(), "abc");
        assert_eq!(next.tree().nodes().len(), page.tree().nodes().len());
    }

    #[test]
    fn test_delete_rejects_bad_ranges() {
        let page = page("abc");
        assert!(matches!(
            delete_content(&page, 2..1),
            Err(PageError::RangeOutOfOrder { start: 2, end: 1 })
        ));
        assert!(matches!(
            delete_content(&page, 1..9),
            Err(PageError::OffsetOutOfRange { offset: 9, len: 3 })
        ));
    }

    #[test]
    fn test_replace() {
        let page = page("hello world");
        let next = checked(replace_content(&page, 6..11, "there").unwrap());
        assert_eq!(next.text(), "hello there");
        // replace with empty text degenerates to a delete
        let next = checked(replace_content(&page, 5..11, "").unwrap());
        assert_eq!(next.text(), "hello");
        // replace of an empty range degenerates to an insert
        let next = checked(replace_content(&page, 5..5, ",").unwrap());
        assert_eq!(next.text(), "hello, world");
    }

    #[test]
    fn test_add_buffer_rollover() {
        let options = PageOptions {
            add_buffer_capacity: 4,
            ..PageOptions::default()
        };
        let base = PageContent::from_text("", options).unwrap();
        let mut current = base;
        for _ in 0..6 {
            // prepending keeps the fast path out of play
            current = checked(insert_content(&current, 0, "xxx").unwrap());
        }
        assert_eq!(current.len(), 18);
        // original plus several retired add-buffers
        assert!(current.buffers().len() > 2, "expected rollover, got {} buffers", current.buffers().len());
        for buffer in current.buffers().iter().skip(1) {
            assert!(!buffer.is_read_only());
        }
    }

    #[test]
    fn test_snapshot_sharing_leaves_history_valid() {
        let v0 = page("base");
        let v1 = insert_content(&v0, 4, " plus").unwrap();
        let v2 = delete_content(&v1, 0..2).unwrap();
        let v3 = insert_content(&v2, v2.len(), " end").unwrap();
        assert_eq!(v0.text(), "base");
        assert_eq!(v1.text(), "base plus");
        assert_eq!(v2.text(), "se plus");
        assert_eq!(v3.text(), "se plus end");
        for page in [&v0, &v1, &v2, &v3] {
            page.validate().unwrap();
        }
    }
}
