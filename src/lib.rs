//! pagetext — a piece-table text storage engine for editable documents.
//!
//! Content is stored as an ordered sequence of spans ("pieces") into
//! append-only backing buffers, indexed by a red-black tree whose nodes
//! carry left-subtree character and line-feed counts. Edits never rewrite
//! buffer contents; they narrow, split, or splice the pieces referencing
//! them, and every mutation yields a new immutable snapshot that shares
//! unchanged state with its predecessor.
//!
//! ```
//! use pagetext::{insert_content, offset_to_position, PageContent, PageOptions, Position};
//!
//! let page = PageContent::from_text("hello world", PageOptions::default()).unwrap();
//! let page = insert_content(&page, 5, " there").unwrap();
//! assert_eq!(page.text(), "hello there world");
//! assert_eq!(offset_to_position(&page, 6).unwrap(), Position::new(0, 6));
//! ```

pub mod config;
pub mod model;
pub mod state;

pub use config::PageOptions;
pub use model::action::EditAction;
pub use model::buffer::{BufferCursor, NewlineFormat, TextBuffer};
pub use model::mutation::{apply_action, delete_content, insert_content, replace_content};
pub use model::page::{LastInsert, PageContent, PageError, PieceView};
pub use model::piece_tree::{Color, NodePosition, PieceNode, PieceTree, SENTINEL};
pub use model::position::{offset_to_position, position_to_offset, Position};
pub use model::structure::{
    to_global_offset, to_structural_location, ContentLocations, Location, StructuralLocation,
    StructureMap,
};
pub use state::{PageId, PageStore};
