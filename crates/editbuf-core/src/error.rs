use crate::coords::BufferCoord;
use crate::encoding::TextEncoding;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced while loading or saving a [`Document`](crate::Document).
///
/// A failed load leaves the document untouched.
pub enum FileError {
    #[error("I/O error on '{}': {source}", path.display())]
    /// Reading or writing the file failed.
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    #[error("file looks binary (NUL byte at offset {offset})")]
    /// The content contains NUL bytes and is not UTF-16/UTF-32.
    BinaryFile {
        /// Byte offset of the first NUL byte.
        offset: usize,
    },

    #[error("requested {requested} but the file starts with a {found} byte order mark")]
    /// An explicitly requested encoding contradicts the byte order mark in the file.
    BomMismatch {
        /// The encoding the caller asked for.
        requested: TextEncoding,
        /// The encoding announced by the byte order mark.
        found: TextEncoding,
    },

    #[error("malformed {encoding} sequence at byte offset {offset}")]
    /// The bytes are not valid in the chosen encoding.
    Malformed {
        /// The encoding used for decoding.
        encoding: TextEncoding,
        /// Byte offset of the first undecodable sequence (best effort).
        offset: usize,
    },

    #[error("character {ch:?} cannot be represented in {encoding}")]
    /// A character of the document has no representation in the target encoding.
    Unmappable {
        /// The target encoding.
        encoding: TextEncoding,
        /// The first offending character.
        ch: char,
    },

    #[error("unknown encoding '{0}'")]
    /// The encoding label is not recognized.
    UnknownEncoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`EditSession`](crate::EditSession) operations.
pub enum EditError {
    #[error("position {line}:{ch} is outside the document")]
    /// The position names a line that does not exist or a char past the end of its line.
    InvalidPosition {
        /// Line index.
        line: usize,
        /// Char offset.
        ch: usize,
    },

    #[error("range {start}..{end} is reversed")]
    /// The end of a range lies before its start.
    InvalidRange {
        /// Range start.
        start: BufferCoord,
        /// Range end.
        end: BufferCoord,
    },
}
