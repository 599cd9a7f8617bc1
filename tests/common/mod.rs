//! Shadow-model harness: every mutation is applied both to the engine and to
//! a plain `String`, and the two are compared after each step.

use pagetext::{delete_content, insert_content, replace_content, NewlineFormat, PageContent, PageOptions};

pub struct ShadowPage {
    pub page: PageContent,
    pub shadow: String,
}

impl ShadowPage {
    pub fn new(text: &str) -> Self {
        Self::with_options(text, PageOptions::default())
    }

    pub fn with_options(text: &str, options: PageOptions) -> Self {
        let page = PageContent::from_text(text, options).expect("page must load");
        ShadowPage {
            page,
            shadow: text.to_string(),
        }
    }

    /// Clamp an arbitrary offset into the document and snap it down to a
    /// character boundary of the shadow text.
    pub fn snap(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.shadow.len());
        while !self.shadow.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    pub fn insert(&mut self, offset: usize, text: &str) {
        self.page = insert_content(&self.page, offset, text).expect("insert must succeed");
        self.shadow.insert_str(offset, text);
    }

    pub fn delete(&mut self, start: usize, end: usize) {
        self.page = delete_content(&self.page, start..end).expect("delete must succeed");
        self.shadow.replace_range(start..end, "");
    }

    pub fn replace(&mut self, start: usize, end: usize, text: &str) {
        self.page = replace_content(&self.page, start..end, text).expect("replace must succeed");
        self.shadow.replace_range(start..end, text);
    }

    fn shadow_line_feeds(&self) -> usize {
        match self.page.newline() {
            NewlineFormat::Lf => self.shadow.matches('\n').count(),
            NewlineFormat::Crlf => self.shadow.matches("\r\n").count(),
        }
    }

    /// The engine must agree with the shadow on content, length, line count
    /// and its own internal invariants.
    pub fn assert_consistent(&self) {
        assert_eq!(self.page.text(), self.shadow, "piece tree diverged from shadow string");
        assert_eq!(self.page.len(), self.shadow.len());
        assert_eq!(self.page.line_count(), self.shadow_line_feeds() + 1);
        self.page.validate().expect("snapshot invariants must hold");
    }
}
