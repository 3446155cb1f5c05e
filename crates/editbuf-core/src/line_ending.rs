//! Line ending helpers.
//!
//! `editbuf-core` stores every line without its line break. Each line loaded from text
//! remembers the break that followed it, so files with mixed line endings are written back
//! byte-for-byte; lines created by editing use the document's preferred [`LineEnding`].

/// A newline sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
    /// Classic Mac OS CR (`'\r'`).
    Cr,
}

impl LineEnding {
    /// The platform's native line ending.
    pub const fn native() -> Self {
        if cfg!(windows) { Self::Crlf } else { Self::Lf }
    }

    /// The newline sequence as a string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Length of the sequence in chars.
    pub const fn len_chars(self) -> usize {
        match self {
            Self::Crlf => 2,
            Self::Lf | Self::Cr => 1,
        }
    }

    /// Detect the line ending of a source text.
    ///
    /// Policy: the first line break found wins. Text without any line break yields `None`.
    pub fn detect_in_text(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let idx = bytes.iter().position(|b| *b == b'\n' || *b == b'\r')?;
        Some(match bytes[idx] {
            b'\n' => Self::Lf,
            _ if bytes.get(idx + 1) == Some(&b'\n') => Self::Crlf,
            _ => Self::Cr,
        })
    }
}

/// Split `text` into lines, remembering the break that ended each one.
///
/// The final line has `None` as its ending. CR, LF and CRLF are all recognized; a CR
/// immediately followed by LF is one CRLF break. `N` line breaks always produce `N + 1`
/// lines, so a text ending with a break produces a trailing empty line.
pub fn split_lines(text: &str) -> Vec<(&str, Option<LineEnding>)> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let ending = match bytes[i] {
            b'\n' => Some(LineEnding::Lf),
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => Some(LineEnding::Crlf),
            b'\r' => Some(LineEnding::Cr),
            _ => None,
        };
        match ending {
            Some(ending) => {
                lines.push((&text[start..i], Some(ending)));
                i += ending.as_str().len();
                start = i;
            }
            None => i += 1,
        }
    }
    lines.push((&text[start..], None));
    lines
}
