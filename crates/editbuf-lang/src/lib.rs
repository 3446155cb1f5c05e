#![warn(missing_docs)]
//! `editbuf-lang` - language identity for `editbuf` documents.
//!
//! Maps file names to a [`ProgrammingLanguage`] and each language to the comment delimiters
//! its tokenizer recognizes. Dependency-free so every other crate can use it.

use std::path::Path;

/// Languages with a tokenizer front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProgrammingLanguage {
    /// C and C++ sources and headers.
    Cpp,
    /// Anything without a dedicated front-end.
    #[default]
    Text,
}

impl ProgrammingLanguage {
    /// Human readable name, as shown in a status bar.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cpp => "C/C++",
            Self::Text => "Text",
        }
    }

    /// Detect the language from a file name.
    ///
    /// Matching is done on the extension, case-insensitively. Unknown extensions (and files
    /// without one) map to [`ProgrammingLanguage::Text`].
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return Self::Text;
        };
        match ext.to_ascii_lowercase().as_str() {
            "c" | "h" | "cpp" | "cc" | "cxx" | "c++" | "cp" | "hpp" | "hh" | "hxx" | "h++"
            | "inl" | "ino" => Self::Cpp,
            _ => Self::Text,
        }
    }

    /// Comment delimiters for this language.
    pub fn comment_config(self) -> CommentConfig {
        match self {
            Self::Cpp => CommentConfig::C_STYLE,
            Self::Text => CommentConfig::NONE,
        }
    }
}

/// Comment delimiters of a language. Tokenizers match these literally, and editors use them
/// for toggle-comment commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommentConfig {
    /// Starts a comment that runs to the end of the line.
    pub line: Option<&'static str>,
    /// Opening and closing delimiters of a block comment.
    pub block: Option<(&'static str, &'static str)>,
}

impl CommentConfig {
    /// No comments at all (plain text).
    pub const NONE: Self = Self {
        line: None,
        block: None,
    };

    /// `//` line comments and `/* */` block comments.
    pub const C_STYLE: Self = Self {
        line: Some("//"),
        block: Some(("/*", "*/")),
    };

    /// Opening block delimiter, if the language has block comments.
    pub fn block_open(&self) -> Option<&'static str> {
        self.block.map(|(open, _)| open)
    }

    /// Closing block delimiter, if the language has block comments.
    pub fn block_close(&self) -> Option<&'static str> {
        self.block.map(|(_, close)| close)
    }
}
