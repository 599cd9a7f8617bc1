//! Page-level options supplied by the host when a page is loaded.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::buffer::NewlineFormat;
use crate::model::page::PageError;

/// Options fixed per page at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PageOptions {
    /// Newline format override. `None` detects the format from the initial
    /// text (CRLF if any CR-LF pair is present, LF otherwise).
    pub newline: Option<NewlineFormat>,

    /// Byte size at which the tail add-buffer is retired and a new one
    /// started. Bounds line-start rescans and keeps buffer cursors small.
    pub add_buffer_capacity: usize,
}

impl Default for PageOptions {
    fn default() -> Self {
        PageOptions {
            newline: None,
            add_buffer_capacity: 64 * 1024,
        }
    }
}

impl PageOptions {
    pub fn validate(&self) -> Result<(), PageError> {
        if self.add_buffer_capacity == 0 {
            return Err(PageError::InvalidOptions(
                "add_buffer_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
