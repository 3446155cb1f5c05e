//! `editbuf-syntax` - resumable per-line tokenizers for `editbuf-core`.
//!
//! Every tokenizer here implements [`editbuf_core::Syntaxer`]: it lexes one line at a time,
//! starting from the [`editbuf_core::SyntaxState`] the line above ended in, and reports the
//! state its own line ends in. The document caches those states and re-lexes only until they
//! stop changing (see [`editbuf_core::Document::rescan`]).
//!
//! ```
//! use editbuf_core::{Document, LexMode};
//! use editbuf_syntax::CppSyntaxer;
//!
//! let document = Document::from_text("int a = 1;\n/* open\nint b;");
//! let mut syntaxer = CppSyntaxer::new();
//! document.rescan_stale(&mut syntaxer);
//! assert_eq!(document.syntax_state(2).unwrap().mode, LexMode::BlockComment);
//! ```

pub mod cpp;
pub mod text;

pub use cpp::{CppSyntaxer, CppTokenId};
pub use text::TextSyntaxer;

use editbuf_core::Syntaxer;
use editbuf_lang::ProgrammingLanguage;
use std::path::Path;

/// A fresh tokenizer for `language`.
pub fn syntaxer_for_language(language: ProgrammingLanguage) -> Box<dyn Syntaxer> {
    tracing::debug!(language = language.name(), "creating syntaxer");
    match language {
        ProgrammingLanguage::Cpp => Box::new(CppSyntaxer::new()),
        ProgrammingLanguage::Text => Box::new(TextSyntaxer::new()),
    }
}

/// A fresh tokenizer chosen from the extension of `path`.
pub fn syntaxer_for_path(path: impl AsRef<Path>) -> Box<dyn Syntaxer> {
    syntaxer_for_language(ProgrammingLanguage::from_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_picks_by_extension() {
        assert_eq!(syntaxer_for_path("src/main.cc").language(), ProgrammingLanguage::Cpp);
        assert_eq!(syntaxer_for_path("notes.txt").language(), ProgrammingLanguage::Text);
        assert_eq!(
            syntaxer_for_language(ProgrammingLanguage::Cpp).comment_config(),
            ProgrammingLanguage::Cpp.comment_config()
        );
    }
}
