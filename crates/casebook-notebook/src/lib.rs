//! Casebook Notebook
//!
//! The note canvas of an investigation: free-form notes and entity references
//! on a positionable surface, connected by edges.
//!
//! # Core Concepts
//!
//! - [`NotebookDocument`]: nodes, edges and viewport with editing operations
//! - [`CanvasNode`]: closed union of [`NoteNode`] and [`EntityRefNode`]
//! - [`DocumentCodec`]: defensive hydration from stored JSON and serialization back
//! - [`DocumentHash`]: fingerprint of a serialized canvas, used to skip no-op saves
//! - [`MentionLinker`]: turns a mention click into an entity node next to the note
//!
//! # Example
//!
//! ```rust
//! use casebook_notebook::{DocumentCodec, NotebookDocument, Position};
//!
//! let mut doc = NotebookDocument::new();
//! let a = doc.add_note(Position::new(0.0, 0.0)).unwrap();
//! let b = doc.add_note(Position::new(200.0, 0.0)).unwrap();
//! doc.connect(&a, &b).unwrap();
//!
//! let codec = DocumentCodec::new();
//! let stored = codec.serialize(&doc);
//! let restored = codec.hydrate(&stored, doc.version()).document;
//! assert_eq!(restored, doc);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod codec;
mod document;
mod error;
mod hash;
mod mention;
mod rich_text;

pub use codec::{DocumentCodec, HydrationReport};
pub use document::{
    CanvasEdge, CanvasNode, EdgeKind, EntityRefNode, NoteNode, NotebookDocument, Position, Viewport,
    DEFAULT_NOTE_TITLE, VIEWPORT_SUBJECT,
};
pub use error::NotebookError;
pub use hash::DocumentHash;
pub use mention::{suggest_mentions, MentionLink, MentionLinker, DEFAULT_SUGGESTION_LIMIT};
pub use rich_text::RichText;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
