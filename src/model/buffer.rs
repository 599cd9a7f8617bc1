//! String buffers and line-start bookkeeping for the piece table.
//!
//! A page owns one read-only original buffer (its content at load time) plus
//! append-only add-buffers that accumulate inserted text. Pieces in the tree
//! reference spans of these buffers by (line, column) cursors, so every
//! buffer tracks the byte offsets at which its lines begin.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Newline convention of a page, fixed once when the page is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum NewlineFormat {
    /// Unix-style `\n` terminators
    Lf,
    /// Windows-style `\r\n` terminators
    Crlf,
}

impl NewlineFormat {
    /// Detect the newline format of initial content: CRLF if any CR-LF pair
    /// is present, LF otherwise.
    pub fn detect(text: &str) -> Self {
        if text.as_bytes().windows(2).any(|pair| pair == b"\r\n") {
            NewlineFormat::Crlf
        } else {
            NewlineFormat::Lf
        }
    }

    /// The literal terminator sequence.
    pub fn as_str(&self) -> &'static str {
        match self {
            NewlineFormat::Lf => "\n",
            NewlineFormat::Crlf => "\r\n",
        }
    }
}

/// A position inside one buffer: a line index into the buffer's line starts
/// and a byte column within that line. Line-relative, not page-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferCursor {
    pub line: usize,
    pub column: usize,
}

impl BufferCursor {
    pub fn new(line: usize, column: usize) -> Self {
        BufferCursor { line, column }
    }
}

/// A backing buffer for the piece table: either the read-only original
/// content or a mutable add-buffer that only ever grows at its tail.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    read_only: bool,
    content: String,
    line_starts: Vec<usize>,
}

impl TextBuffer {
    /// The read-only original buffer holding a page's initial content.
    pub fn original(text: impl Into<String>, newline: NewlineFormat) -> Self {
        let content = text.into();
        let mut line_starts = vec![0];
        scan_line_starts(&content, 0, newline, &mut line_starts);
        TextBuffer {
            read_only: true,
            content,
            line_starts,
        }
    }

    /// A new, empty add-buffer.
    pub fn add_buffer() -> Self {
        TextBuffer {
            read_only: false,
            content: String::new(),
            line_starts: vec![0],
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Length of the buffer content in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Byte offsets at which lines begin. `line_starts()[0]` is always 0;
    /// each later entry is the offset immediately after a terminator.
    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    /// Number of complete line terminators in the buffer.
    pub fn line_feed_count(&self) -> usize {
        self.line_starts.len() - 1
    }

    /// Successor buffer with `text` appended at the tail, plus the cursors
    /// bracketing the appended span.
    ///
    /// Only the appended suffix is rescanned for terminators. The scan backs
    /// up one byte in CRLF mode so a CR stranded at the old tail pairs with
    /// a leading LF in `text` and is counted as a single terminator.
    pub fn appended(&self, text: &str, newline: NewlineFormat) -> (TextBuffer, BufferCursor, BufferCursor) {
        debug_assert!(!self.read_only, "append to a read-only buffer");
        let old_len = self.content.len();
        let mut content = String::with_capacity(old_len + text.len());
        content.push_str(&self.content);
        content.push_str(text);

        let mut line_starts = self.line_starts.clone();
        let scan_from = match newline {
            NewlineFormat::Crlf => old_len.saturating_sub(1),
            NewlineFormat::Lf => old_len,
        };
        scan_line_starts(&content, scan_from, newline, &mut line_starts);

        let next = TextBuffer {
            read_only: false,
            content,
            line_starts,
        };
        let span_start = next.cursor_at(old_len);
        let span_end = next.end_cursor();
        (next, span_start, span_end)
    }

    /// Byte offset of `cursor` within the buffer.
    pub fn offset_of(&self, cursor: BufferCursor) -> usize {
        self.line_starts[cursor.line] + cursor.column
    }

    /// Cursor for a byte offset, with the column measured from the start of
    /// the line containing the offset.
    pub fn cursor_at(&self, offset: usize) -> BufferCursor {
        debug_assert!(offset <= self.content.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        BufferCursor {
            line,
            column: offset - self.line_starts[line],
        }
    }

    /// Cursor just past the final byte of the buffer.
    pub fn end_cursor(&self) -> BufferCursor {
        self.cursor_at(self.content.len())
    }
}

/// Extend `line_starts` with every line start found at or after `from`.
/// Entries produced are strictly greater than `from`, so rescanning a
/// boundary byte never duplicates an existing entry.
fn scan_line_starts(content: &str, from: usize, newline: NewlineFormat, line_starts: &mut Vec<usize>) {
    let bytes = content.as_bytes();
    match newline {
        NewlineFormat::Lf => {
            for (i, &byte) in bytes.iter().enumerate().skip(from) {
                if byte == b'\n' {
                    line_starts.push(i + 1);
                }
            }
        }
        NewlineFormat::Crlf => {
            let mut i = from;
            while i + 1 < bytes.len() {
                if bytes[i] == b'\r' && bytes[i + 1] == b'\n' {
                    line_starts.push(i + 2);
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }
}
