//! Offset ↔ (line, column) translation over the tree's aggregate counts.

use serde::{Deserialize, Serialize};

use crate::model::page::{PageContent, PageError};
use crate::model::piece_tree::SENTINEL;

/// A page-level position: 0-indexed line and byte column within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

/// Translate a page offset to a (line, column) position. The line is the
/// number of line terminators strictly before the offset; the column is the
/// distance from that line's starting offset.
pub fn offset_to_position(page: &PageContent, offset: usize) -> Result<Position, PageError> {
    let len = page.len();
    if offset > len {
        return Err(PageError::OffsetOutOfRange { offset, len });
    }
    let line = line_feeds_before(page, offset)?;
    let line_start = start_offset_of_line(page, line)?;
    Ok(Position {
        line,
        column: offset - line_start,
    })
}

/// Translate a (line, column) position back to a page offset: the line's
/// starting offset plus the column, clamped to the page end. Columns may run
/// past piece boundaries; the tree descent absorbs them.
pub fn position_to_offset(page: &PageContent, position: Position) -> Result<usize, PageError> {
    let line_start = start_offset_of_line(page, position.line)?;
    Ok((line_start + position.column).min(page.len()))
}

/// Line terminators strictly before `offset`, by `left_line_feed_count`
/// descent plus cursor math inside the landing piece.
fn line_feeds_before(page: &PageContent, mut offset: usize) -> Result<usize, PageError> {
    let tree = page.tree();
    let mut x = tree.root();
    if x == SENTINEL {
        return Ok(0);
    }
    let mut lines = 0;
    loop {
        let n = tree.node(x);
        if offset < n.left_char_count {
            x = n.left;
            continue;
        }
        if offset < n.left_char_count + n.length || n.right == SENTINEL {
            lines += n.left_line_feed_count;
            let remainder = (offset - n.left_char_count).min(n.length);
            if remainder == 0 {
                return Ok(lines);
            }
            let buffer = page.buffer(n.buffer_index);
            let piece_start = buffer.offset_of(n.start);
            let cursor = buffer.cursor_at(piece_start + remainder);
            return Ok(lines + (cursor.line - n.start.line));
        }
        lines += n.left_line_feed_count + n.line_feed_count;
        offset -= n.left_char_count + n.length;
        x = n.right;
    }
}

/// Page offset at which `line` begins: 0 for the first line, otherwise the
/// offset just past the line's preceding terminator.
fn start_offset_of_line(page: &PageContent, line: usize) -> Result<usize, PageError> {
    if line == 0 {
        return Ok(0);
    }
    let tree = page.tree();
    let total_lines = tree.line_feed_count() + 1;
    if line >= total_lines {
        return Err(PageError::LineOutOfRange {
            line,
            line_count: total_lines,
        });
    }

    // find the line-th terminator and return the offset just after it
    let mut remaining = line;
    let mut x = tree.root();
    let mut acc = 0;
    loop {
        if x == SENTINEL {
            // the aggregate counts promised more terminators than exist
            return Err(PageError::CorruptTree {
                detail: format!("line descent for line {line} ran off the tree"),
            });
        }
        let n = tree.node(x);
        if remaining <= n.left_line_feed_count {
            x = n.left;
        } else if remaining <= n.left_line_feed_count + n.line_feed_count {
            let k = remaining - n.left_line_feed_count;
            let buffer = page.buffer(n.buffer_index);
            let piece_start = buffer.offset_of(n.start);
            let after_terminator = buffer.line_starts()[n.start.line + k];
            return Ok(acc + n.left_char_count + (after_terminator - piece_start));
        } else {
            acc += n.left_char_count + n.length;
            remaining -= n.left_line_feed_count + n.line_feed_count;
            x = n.right;
        }
    }
}
