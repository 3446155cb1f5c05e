//! Editbuf Core - the editable-text kernel of a source code editor
//!
//! # Overview
//!
//! `editbuf-core` keeps three things consistent under continuous small edits:
//!
//! - a line-oriented text buffer ([`Document`]) with Unicode-correct glyph segmentation and
//!   display-column measurement,
//! - a per-line cache of resumable tokenizer states used for incremental syntax highlighting,
//! - a bounded undo/redo history ([`UndoList`] / [`RedoList`]), driven by an [`EditSession`].
//!
//! Rendering, layout and the concrete tokenizers live elsewhere; they talk to the kernel
//! through [`Document`] queries and the [`Syntaxer`] trait.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditSession (edits + undo/redo)            │  ← Editing API
//! ├─────────────────────────────────────────────┤
//! │  Document (lines, caches, events, files)    │  ← Queries / highlighting driver
//! ├───────────────────────┬─────────────────────┤
//! │  Glyph / column model │  Syntaxer contract  │  ← Pure per-line functions
//! ├───────────────────────┴─────────────────────┤
//! │  Encodings & line endings                   │  ← Bytes ↔ lines
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Coordinates
//!
//! Positions inside a line come in three flavours, each with its own newtype so they cannot be
//! mixed up: [`CharPos`] (Unicode scalar offset), [`GlyphIndex`] (extended grapheme cluster)
//! and [`Column`] (display cell; tabs and wide glyphs span several).
//!
//! # Quick Start
//!
//! ```rust
//! use editbuf_core::{BufferCoord, CharPos, Column, Document, EditSession};
//! use std::sync::Arc;
//!
//! let document = Arc::new(Document::from_text("fn main() {\n\tlet x = 1;\n}"));
//! assert_eq!(document.count(), 3);
//! assert_eq!(document.char_to_column(1, CharPos(1)), Column(4));
//!
//! let mut session = EditSession::new(Arc::clone(&document));
//! session.insert_text(BufferCoord::new(1, 11), " // one").unwrap();
//! assert_eq!(document.line(1).as_deref(), Some("\tlet x = 1; // one"));
//!
//! session.undo();
//! assert_eq!(document.line(1).as_deref(), Some("\tlet x = 1;"));
//! ```
//!
//! # Module Description
//!
//! - [`coords`] - char / glyph / column newtypes and buffer coordinates
//! - [`glyph`] - glyph segmentation and column measurement
//! - [`line_ending`] - line break detection and splitting
//! - [`encoding`] - byte order marks, detection, strict decoding and encoding
//! - [`syntax`] - syntax states and the resumable [`Syntaxer`] contract
//! - [`document`] - the line store and fixed-point re-highlighting
//! - [`undo`] - bounded undo/redo lists
//! - [`session`] - edits recorded against the change log
//! - [`options`] - document and history settings
//! - [`error`] - error types

pub mod coords;
pub mod document;
pub mod encoding;
pub mod error;
pub mod glyph;
pub mod line_ending;
pub mod options;
pub mod session;
pub mod syntax;
pub mod undo;

pub use coords::{BufferCoord, CharPos, Column, GlyphIndex};
pub use document::{Document, DocumentEvent, DocumentListener, ListenerId, UpdateGuard};
pub use editbuf_lang::{CommentConfig, ProgrammingLanguage};
pub use encoding::{EncodingHint, TextEncoding};
pub use error::{EditError, FileError};
pub use glyph::{CellMetrics, FixedMetrics, FontMetrics, GlyphColumns, GlyphMetrics, LineGlyphs};
pub use line_ending::LineEnding;
pub use options::{DocumentOptions, UndoLimits};
pub use session::EditSession;
pub use syntax::{
    LexMode, SyntaxState, Syntaxer, Token, TokenAttribute, TokenType, line_end_state,
    tokenize_line,
};
pub use undo::{ChangeReason, RedoList, SelectionMode, UndoItem, UndoList};
