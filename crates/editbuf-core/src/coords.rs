//! Coordinate spaces.
//!
//! A line is addressed in three different units that are easy to confuse:
//!
//! - [`CharPos`]: index into the line's `char` (Unicode scalar value) sequence
//! - [`GlyphIndex`]: index of a user-perceived glyph (extended grapheme cluster)
//! - [`Column`]: display column, where tabs and wide glyphs cover several columns
//!
//! Each space gets its own newtype so a char offset can't be passed where a column is
//! expected.

use std::fmt;

macro_rules! coordinate {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub usize);

        impl $name {
            /// The zero coordinate.
            pub const ZERO: Self = Self(0);

            /// Wrap a raw value.
            pub const fn new(value: usize) -> Self {
                Self(value)
            }

            /// The raw value.
            pub const fn get(self) -> usize {
                self.0
            }

            /// Add `n` units, saturating at `usize::MAX`.
            pub const fn saturating_add(self, n: usize) -> Self {
                Self(self.0.saturating_add(n))
            }

            /// Subtract `n` units, saturating at zero.
            pub const fn saturating_sub(self, n: usize) -> Self {
                Self(self.0.saturating_sub(n))
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

coordinate!(
    /// Offset into a line's `char` sequence.
    CharPos
);

coordinate!(
    /// Index of a glyph (extended grapheme cluster) within a line.
    GlyphIndex
);

coordinate!(
    /// Display column within a line.
    Column
);

/// A position in the document buffer: a line index plus a char offset within that line.
///
/// Both components are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferCoord {
    /// Line index (0-based).
    pub line: usize,
    /// Char offset within the line.
    pub ch: CharPos,
}

impl BufferCoord {
    /// Create a coordinate.
    pub const fn new(line: usize, ch: usize) -> Self {
        Self {
            line,
            ch: CharPos(ch),
        }
    }
}

impl fmt::Display for BufferCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.ch)
    }
}
