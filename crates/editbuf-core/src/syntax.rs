//! Resumable per-line tokenizing.
//!
//! A [`Syntaxer`] lexes one line at a time. The only thing carried from one line to the next
//! is a [`SyntaxState`], so lexing a line is a pure function
//! `(previous state, line text) -> (tokens, next state)`; see [`tokenize_line`].
//!
//! [`Document`](crate::Document) caches the end state of every line and uses it to re-lex
//! incrementally: after an edit only the lines whose end state actually changes need to be
//! visited again.

use crate::coords::CharPos;
use editbuf_lang::{CommentConfig, ProgrammingLanguage};
use std::collections::HashSet;
use std::sync::Arc;

/// Lexical mode that may stay open across a line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LexMode {
    /// Ordinary code.
    #[default]
    Plain,
    /// Inside a `/* ... */` comment.
    BlockComment,
    /// Inside a `//` comment whose line ended with a backslash.
    LineComment,
    /// Inside a string literal whose line ended with a backslash.
    String,
    /// Inside a raw string literal; the delimiter is in [`SyntaxState::raw_delimiter`].
    RawString,
    /// Inside a preprocessor directive continued with a backslash.
    Directive,
    /// Inside a block comment that started within a preprocessor directive.
    DirectiveComment,
    /// Inside the body of a macro definition continued with a backslash.
    MacroBody,
}

/// Everything a [`Syntaxer`] needs to resume lexing at the start of the next line.
///
/// Cheap to clone, and compared for equality to detect the highlighting fixed point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SyntaxState {
    /// Open lexical construct.
    pub mode: LexMode,
    /// Nesting depth of `(`.
    pub parenthesis_level: u32,
    /// Nesting depth of `[`.
    pub bracket_level: u32,
    /// Nesting depth of `{`.
    pub brace_level: u32,
    /// Nesting depth of indent blocks (folding regions).
    pub block_level: u32,
    /// Blocks opened on this line and not closed on it.
    pub block_started: u32,
    /// Blocks closed on this line that were opened on an earlier line.
    pub block_ended: u32,
    /// Closing delimiter of an unterminated raw string (`delim` of `R"delim(`).
    pub raw_delimiter: Option<Arc<str>>,
    /// Whether lexing is inside a `#define` body, so closing a comment or string resumes it.
    pub in_macro: bool,
}

impl SyntaxState {
    /// State at the start of a document.
    pub fn initial() -> Self {
        Self::default()
    }

    /// Copy of this state as seen at the start of the next line: per-line counters reset.
    pub fn carried_over(&self) -> Self {
        Self {
            block_started: 0,
            block_ended: 0,
            ..self.clone()
        }
    }
}

/// Language-neutral token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Comment text.
    Comment,
    /// Identifier.
    Identifier,
    /// Reserved word, or a user type promoted to keyword highlighting.
    Keyword,
    /// Numeric literal.
    Number,
    /// Preprocessor directive.
    Preprocessor,
    /// Whitespace.
    Space,
    /// String literal.
    String,
    /// Escape sequence inside a string.
    StringEscape,
    /// Character literal.
    Character,
    /// Operator or punctuation.
    Symbol,
    /// Anything the lexer could not classify.
    Invalid,
    /// Plain text.
    Default,
}

/// Named highlighting slot a token belongs to; a theme maps names to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenAttribute {
    /// Slot name, e.g. `"Hex"` or `"Comment"`.
    pub name: &'static str,
    /// Classification of the slot.
    pub token_type: TokenType,
}

impl TokenAttribute {
    /// Create an attribute.
    pub const fn new(name: &'static str, token_type: TokenType) -> Self {
        Self { name, token_type }
    }
}

/// A resumable line lexer.
///
/// Usage per line:
///
/// ```text
/// syntaxer.set_state(&previous_line_end_state);   // or reset_state() for line 0
/// syntaxer.set_line(text, line_number);
/// while !syntaxer.eol() {
///     use(syntaxer.token(), syntaxer.token_pos(), syntaxer.token_attribute());
///     syntaxer.next();
/// }
/// cache(syntaxer.state());
/// ```
///
/// Implementations must make progress: while `eol()` is false the current token is never
/// empty. Drivers treat an empty token as a fatal bug.
pub trait Syntaxer: Send {
    /// Language handled by this syntaxer.
    fn language(&self) -> ProgrammingLanguage;

    /// Prime the lexer with the end state of the previous line.
    fn set_state(&mut self, state: &SyntaxState);

    /// Prime the lexer with [`SyntaxState::initial`].
    fn reset_state(&mut self) {
        self.set_state(&SyntaxState::initial());
    }

    /// Load a line and lex its first token.
    fn set_line(&mut self, text: &str, line_number: usize);

    /// Advance to the next token.
    fn next(&mut self);

    /// Whether the line is exhausted.
    fn eol(&self) -> bool;

    /// Text of the current token.
    fn token(&self) -> &str;

    /// Char offset of the current token in the line.
    fn token_pos(&self) -> CharPos;

    /// Attribute of the current token.
    fn token_attribute(&self) -> TokenAttribute;

    /// Current state; after the last token this is the state to cache for the line.
    fn state(&self) -> SyntaxState;

    /// Whether `word` is a reserved word of the language.
    fn is_keyword(&self, word: &str) -> bool;

    /// All reserved words of the language.
    fn keywords(&self) -> HashSet<&'static str> {
        HashSet::new()
    }

    /// Comment tokens of the language.
    fn comment_config(&self) -> CommentConfig {
        self.language().comment_config()
    }

    /// Whether `state` is inside an unterminated comment.
    fn is_comment_not_finished(&self, state: &SyntaxState) -> bool {
        matches!(
            state.mode,
            LexMode::BlockComment | LexMode::LineComment | LexMode::DirectiveComment
        )
    }

    /// Whether `state` is inside an unterminated string.
    fn is_string_not_finished(&self, state: &SyntaxState) -> bool {
        matches!(state.mode, LexMode::String | LexMode::RawString)
    }

    /// Text shown after a collapsed fold that starts on `line`.
    fn fold_string(&self, _line: &str) -> String {
        " ... }".to_string()
    }
}

/// One token produced by [`tokenize_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text.
    pub text: String,
    /// Char offset of the token in its line.
    pub pos: CharPos,
    /// Highlighting slot.
    pub attribute: TokenAttribute,
}

impl Token {
    /// Classification of the token.
    pub fn token_type(&self) -> TokenType {
        self.attribute.token_type
    }
}

/// Lex `text` starting from `previous` (the end state of the line above, `None` for the
/// first line). Returns the tokens and the end state of the line.
///
/// # Panics
///
/// Panics if the syntaxer reports an empty token before the end of the line, since looping
/// on such a syntaxer would never terminate.
pub fn tokenize_line(
    syntaxer: &mut dyn Syntaxer,
    previous: Option<&SyntaxState>,
    text: &str,
    line_number: usize,
) -> (Vec<Token>, SyntaxState) {
    let mut tokens = Vec::new();
    drive_line(syntaxer, previous, text, line_number, |syntaxer| {
        tokens.push(Token {
            text: syntaxer.token().to_string(),
            pos: syntaxer.token_pos(),
            attribute: syntaxer.token_attribute(),
        });
    });
    (tokens, syntaxer.state())
}

/// End state of `text` lexed from `previous`, without collecting tokens.
pub fn line_end_state(
    syntaxer: &mut dyn Syntaxer,
    previous: Option<&SyntaxState>,
    text: &str,
    line_number: usize,
) -> SyntaxState {
    drive_line(syntaxer, previous, text, line_number, |_| {});
    syntaxer.state()
}

fn drive_line(
    syntaxer: &mut dyn Syntaxer,
    previous: Option<&SyntaxState>,
    text: &str,
    line_number: usize,
    mut on_token: impl FnMut(&dyn Syntaxer),
) {
    match previous {
        Some(state) => syntaxer.set_state(state),
        None => syntaxer.reset_state(),
    }
    syntaxer.set_line(text, line_number);

    let mut last_end = CharPos::ZERO;
    while !syntaxer.eol() {
        let token = syntaxer.token();
        let pos = syntaxer.token_pos();
        assert!(
            !token.is_empty() && pos >= last_end,
            "syntaxer for {} made no progress at line {line_number}, char {pos}",
            syntaxer.language().name(),
        );
        last_end = pos.saturating_add(token.chars().count());
        on_token(&*syntaxer);
        syntaxer.next();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A deliberately tiny syntaxer: `{`/`}` nest, `/*` ... `*/` comments span lines.

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct BraceSyntaxer {
        state: SyntaxState,
        chars: Vec<char>,
        text: String,
        offsets: Vec<usize>,
        run: usize,
        token_pos: usize,
        attribute: Option<TokenAttribute>,
    }

    const COMMENT: TokenAttribute = TokenAttribute::new("Comment", TokenType::Comment);
    const SYMBOL: TokenAttribute = TokenAttribute::new("Symbol", TokenType::Symbol);
    const TEXT: TokenAttribute = TokenAttribute::new("Text", TokenType::Default);

    impl BraceSyntaxer {
        fn next_in_comment(&mut self) {
            let end = (self.run..self.chars.len().saturating_sub(1))
                .find(|&i| self.chars[i] == '*' && self.chars[i + 1] == '/');
            match end {
                Some(i) => {
                    self.run = i + 2;
                    self.state.mode = LexMode::Plain;
                }
                None => self.run = self.chars.len(),
            }
            self.attribute = Some(COMMENT);
        }
    }

    impl Syntaxer for BraceSyntaxer {
        fn language(&self) -> ProgrammingLanguage {
            ProgrammingLanguage::Text
        }

        fn set_state(&mut self, state: &SyntaxState) {
            self.state = state.carried_over();
        }

        fn set_line(&mut self, text: &str, _line_number: usize) {
            self.text = text.to_string();
            self.chars = text.chars().collect();
            self.offsets = text.char_indices().map(|(b, _)| b).collect();
            self.offsets.push(text.len());
            self.run = 0;
            self.next();
        }

        fn next(&mut self) {
            self.token_pos = self.run;
            if self.run >= self.chars.len() {
                self.attribute = None;
                return;
            }
            if self.state.mode == LexMode::BlockComment {
                self.next_in_comment();
                return;
            }
            let ch = self.chars[self.run];
            if ch == '/' && self.chars.get(self.run + 1) == Some(&'*') {
                self.run += 2;
                self.state.mode = LexMode::BlockComment;
                self.next_in_comment();
                return;
            }
            self.run += 1;
            self.attribute = Some(match ch {
                '{' => {
                    self.state.brace_level += 1;
                    self.state.block_level += 1;
                    self.state.block_started += 1;
                    SYMBOL
                }
                '}' => {
                    self.state.brace_level = self.state.brace_level.saturating_sub(1);
                    self.state.block_level = self.state.block_level.saturating_sub(1);
                    if self.state.block_started > 0 {
                        self.state.block_started -= 1;
                    } else {
                        self.state.block_ended += 1;
                    }
                    SYMBOL
                }
                _ => TEXT,
            });
        }

        fn eol(&self) -> bool {
            self.attribute.is_none()
        }

        fn token(&self) -> &str {
            &self.text[self.offsets[self.token_pos]..self.offsets[self.run]]
        }

        fn token_pos(&self) -> CharPos {
            CharPos(self.token_pos)
        }

        fn token_attribute(&self) -> TokenAttribute {
            self.attribute.unwrap_or(TEXT)
        }

        fn state(&self) -> SyntaxState {
            self.state.clone()
        }

        fn is_keyword(&self, _word: &str) -> bool {
            false
        }
    }

    /// A broken syntaxer that never advances.
    #[derive(Debug, Default)]
    pub(crate) struct StuckSyntaxer;

    impl Syntaxer for StuckSyntaxer {
        fn language(&self) -> ProgrammingLanguage {
            ProgrammingLanguage::Text
        }
        fn set_state(&mut self, _state: &SyntaxState) {}
        fn set_line(&mut self, _text: &str, _line_number: usize) {}
        fn next(&mut self) {}
        fn eol(&self) -> bool {
            false
        }
        fn token(&self) -> &str {
            ""
        }
        fn token_pos(&self) -> CharPos {
            CharPos::ZERO
        }
        fn token_attribute(&self) -> TokenAttribute {
            TEXT
        }
        fn state(&self) -> SyntaxState {
            SyntaxState::default()
        }
        fn is_keyword(&self, _word: &str) -> bool {
            false
        }
    }
}
