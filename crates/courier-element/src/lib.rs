//! Canonical element-tree data model shared across courier crates.
//!
//! Hosts hand the composition engine a tree of [`Element`] nodes produced by
//! an external parser. The engine only reads the tree; nothing here mutates
//! after construction. The [`markup`] module carries the inline text encoding
//! helpers (escaping plus mention markers) used when element content is
//! lowered into a platform text body.

pub mod element;
pub mod markup;

pub use element::{Element, ElementKind};
pub use markup::{channel_marker, escape_text, mention_all_marker, mention_marker, unescape_text};
