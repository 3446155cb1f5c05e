//! C/C++ tokenizer.
//!
//! Handles comments (including `/* ... */` spanning lines and `//` continued with a
//! backslash), string and character literals with escape sequences, raw strings with custom
//! delimiters, the integer/float literal zoo with suffix validation, and preprocessor
//! directives. `#define` bodies are lexed as code until the macro ends.

use editbuf_core::{
    CharPos, CommentConfig, LexMode, ProgrammingLanguage, SyntaxState, Syntaxer, TokenAttribute,
    TokenType,
};
use std::collections::HashSet;
use std::iter;
use std::sync::{Arc, LazyLock};

/// C/C++ token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CppTokenId {
    Comment,
    Directive,
    Identifier,
    Key,
    /// End of line.
    Null,
    Number,
    Space,
    String,
    StringEscapeSeq,
    Symbol,
    Unknown,
    Char,
    Float,
    Hex,
    HexFloat,
    Octal,
    Binary,
    RawString,
}

pub const COMMENT: TokenAttribute = TokenAttribute::new("Comment", TokenType::Comment);
pub const PREPROCESSOR: TokenAttribute = TokenAttribute::new("Preprocessor", TokenType::Preprocessor);
pub const MACRO_NAME: TokenAttribute = TokenAttribute::new("Macro", TokenType::Preprocessor);
pub const IDENTIFIER: TokenAttribute = TokenAttribute::new("Identifier", TokenType::Identifier);
pub const RESERVED_WORD: TokenAttribute = TokenAttribute::new("Reserved Word", TokenType::Keyword);
pub const CUSTOM_TYPE: TokenAttribute = TokenAttribute::new("Type", TokenType::Keyword);
pub const NUMBER: TokenAttribute = TokenAttribute::new("Number", TokenType::Number);
pub const FLOAT: TokenAttribute = TokenAttribute::new("Float", TokenType::Number);
pub const HEX: TokenAttribute = TokenAttribute::new("Hex", TokenType::Number);
pub const OCTAL: TokenAttribute = TokenAttribute::new("Octal", TokenType::Number);
pub const BINARY: TokenAttribute = TokenAttribute::new("Binary", TokenType::Number);
pub const SPACE: TokenAttribute = TokenAttribute::new("Space", TokenType::Space);
pub const STRING: TokenAttribute = TokenAttribute::new("String", TokenType::String);
pub const RAW_STRING: TokenAttribute = TokenAttribute::new("Raw String", TokenType::String);
pub const ESCAPE_SEQUENCE: TokenAttribute =
    TokenAttribute::new("Escape Sequence", TokenType::StringEscape);
pub const CHARACTER: TokenAttribute = TokenAttribute::new("Character", TokenType::Character);
pub const SYMBOL: TokenAttribute = TokenAttribute::new("Symbol", TokenType::Symbol);
pub const INVALID: TokenAttribute = TokenAttribute::new("Illegal Char", TokenType::Invalid);
pub const NULL: TokenAttribute = TokenAttribute::new("Null", TokenType::Default);

impl CppTokenId {
    /// Default highlighting slot of this kind.
    pub fn attribute(self) -> TokenAttribute {
        match self {
            Self::Comment => COMMENT,
            Self::Directive => PREPROCESSOR,
            Self::Identifier => IDENTIFIER,
            Self::Key => RESERVED_WORD,
            Self::Null => NULL,
            Self::Number => NUMBER,
            Self::Space => SPACE,
            Self::String => STRING,
            Self::StringEscapeSeq => ESCAPE_SEQUENCE,
            Self::Symbol => SYMBOL,
            Self::Unknown => INVALID,
            Self::Char => CHARACTER,
            Self::Float => FLOAT,
            Self::Hex | Self::HexFloat => HEX,
            Self::Octal => OCTAL,
            Self::Binary => BINARY,
            Self::RawString => RAW_STRING,
        }
    }
}

static KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool",
        "break", "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl",
        "concept", "const", "consteval", "constexpr", "constinit", "const_cast", "continue",
        "co_await", "co_return", "co_yield", "decltype", "default", "delete", "do", "double",
        "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false", "final",
        "float", "for", "friend", "goto", "if", "inline", "int", "long", "mutable",
        "namespace", "new", "noexcept", "not", "not_eq", "nullptr", "operator", "or", "or_eq",
        "override", "private", "protected", "public", "register", "reinterpret_cast",
        "requires", "restrict", "return", "short", "signed", "sizeof", "static",
        "static_assert", "static_cast", "struct", "switch", "template", "this",
        "thread_local", "throw", "true", "try", "typedef", "typeid", "typename", "union",
        "unsigned", "using", "virtual", "void", "volatile", "wchar_t", "while", "xor",
        "xor_eq", "_Alignas", "_Alignof", "_Atomic", "_Bool", "_Complex", "_Generic",
        "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local",
    ]
    .into_iter()
    .collect()
});

const INTEGER_SUFFIXES: &[&str] = &["u", "l", "ul", "lu", "ll", "ull", "llu", "z", "uz", "zu"];
const FLOAT_SUFFIXES: &[&str] = &["f", "l", "f16", "f32", "f64", "f128", "bf16"];

/// Multi-char operators, longest first.
const OPERATORS: &[&str] = &[
    "<=>", "<<=", ">>=", "->*", "...", "::", "->", ".*", "++", "--", "<<", ">>", "<=", ">=",
    "==", "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "##",
];

const SINGLE_SYMBOLS: &str = "+-*/%=<>!&|^~?:;,.#\\@";

const RAW_PREFIXES: &[&str] = &["R", "LR", "uR", "UR", "u8R"];
const ENCODING_PREFIXES: &[&str] = &["L", "u", "U", "u8"];

/// Raw string delimiters are at most 16 chars long.
const MAX_RAW_DELIMITER: usize = 16;

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Resumable C/C++ lexer.
#[derive(Debug, Clone)]
pub struct CppSyntaxer {
    state: SyntaxState,
    text: String,
    chars: Vec<char>,
    /// Byte offset of every char, plus the text length.
    offsets: Vec<usize>,
    run: usize,
    token_pos: usize,
    token_id: CppTokenId,
    attribute: TokenAttribute,
    expect_macro_name: bool,
    finished: bool,
    comments: CommentConfig,
    custom_types: HashSet<String>,
}

impl Default for CppSyntaxer {
    fn default() -> Self {
        Self::new()
    }
}

impl CppSyntaxer {
    pub fn new() -> Self {
        Self {
            state: SyntaxState::initial(),
            text: String::new(),
            chars: Vec::new(),
            offsets: vec![0],
            run: 0,
            token_pos: 0,
            token_id: CppTokenId::Null,
            attribute: NULL,
            expect_macro_name: false,
            finished: true,
            comments: ProgrammingLanguage::Cpp.comment_config(),
            custom_types: HashSet::new(),
        }
    }

    /// Kind of the current token.
    pub fn token_id(&self) -> CppTokenId {
        self.token_id
    }

    /// User-defined type names highlighted like keywords.
    pub fn custom_type_keywords(&self) -> &HashSet<String> {
        &self.custom_types
    }

    pub fn set_custom_type_keywords(&mut self, types: HashSet<String>) {
        self.custom_types = types;
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.run + offset).copied()
    }

    fn emit(&mut self, id: CppTokenId) {
        self.token_id = id;
        self.attribute = id.attribute();
    }

    /// Mode to return to after a literal or comment closes.
    fn code_mode(&self) -> LexMode {
        if self.state.in_macro {
            LexMode::MacroBody
        } else {
            LexMode::Plain
        }
    }

    fn starts_with_at(&self, at: usize, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(at + i) == Some(&c))
    }

    fn find_from(&self, from: usize, pattern: &str) -> Option<usize> {
        (from..self.chars.len()).find(|&i| self.starts_with_at(i, pattern))
    }

    fn at_line_comment(&self) -> bool {
        self.comments
            .line
            .is_some_and(|open| self.starts_with_at(self.run, open))
    }

    /// Length of the block comment opener at the cursor, if there is one.
    fn block_comment_opener(&self) -> Option<usize> {
        self.comments
            .block_open()
            .filter(|open| self.starts_with_at(self.run, open))
            .map(|open| open.chars().count())
    }

    fn at_line_start(&self) -> bool {
        self.chars[..self.run].iter().all(|c| c.is_whitespace())
    }

    fn word(&self, start: usize) -> String {
        self.chars[start..self.run].iter().collect()
    }

    fn skip_identifier(&mut self) {
        while self.peek(0).is_some_and(is_ident_char) {
            self.run += 1;
        }
    }

    /// Skip digits accepted by `is_digit`, allowing `'` separators between them.
    fn skip_digits(&mut self, is_digit: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek(0) {
            if is_digit(c) {
                count += 1;
                self.run += 1;
            } else if c == '\'' && count > 0 && self.peek(1).is_some_and(&is_digit) {
                self.run += 1;
            } else {
                break;
            }
        }
        count
    }

    fn finish_line(&mut self) {
        self.finished = true;
        self.expect_macro_name = false;
        let continued = self.chars.last() == Some(&'\\');
        match self.state.mode {
            LexMode::BlockComment | LexMode::DirectiveComment | LexMode::RawString => {}
            _ if continued => {}
            _ => {
                self.state.mode = LexMode::Plain;
                self.state.in_macro = false;
            }
        }
    }

    fn lex_code(&mut self) {
        let ch = self.chars[self.run];
        if ch.is_whitespace() {
            self.lex_space();
            return;
        }
        if std::mem::take(&mut self.expect_macro_name) && is_ident_start(ch) {
            self.skip_identifier();
            self.token_id = CppTokenId::Identifier;
            self.attribute = MACRO_NAME;
            return;
        }
        if self.at_line_comment() {
            self.state.mode = LexMode::LineComment;
            self.run = self.chars.len();
            self.emit(CppTokenId::Comment);
            return;
        }
        if let Some(len) = self.block_comment_opener() {
            self.run += len;
            self.state.mode = LexMode::BlockComment;
            self.lex_block_comment_rest();
            return;
        }
        match ch {
            '#' if self.state.mode == LexMode::Plain && self.at_line_start() => {
                self.lex_directive_start();
            }
            '"' => {
                self.run += 1;
                self.state.mode = LexMode::String;
                self.lex_string_chunk();
            }
            '\'' => self.lex_char(),
            c if c.is_ascii_digit() => self.lex_number(),
            '.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
            c if is_ident_start(c) => self.lex_identifier(),
            '(' | ')' | '[' | ']' | '{' | '}' => self.lex_bracket(ch),
            _ => self.lex_operator(ch),
        }
    }

    fn lex_space(&mut self) {
        while self.peek(0).is_some_and(char::is_whitespace) {
            self.run += 1;
        }
        self.emit(CppTokenId::Space);
    }

    fn lex_identifier(&mut self) {
        let start = self.run;
        self.skip_identifier();
        let word = self.word(start);
        let next = self.peek(0);
        if next == Some('"')
            && RAW_PREFIXES.contains(&word.as_str())
            && self.lex_raw_string_start()
        {
            return;
        }
        if ENCODING_PREFIXES.contains(&word.as_str()) {
            match next {
                Some('"') => {
                    self.run += 1;
                    self.state.mode = LexMode::String;
                    self.lex_string_chunk();
                    return;
                }
                Some('\'') => {
                    self.lex_char();
                    return;
                }
                _ => {}
            }
        }
        if self.custom_types.contains(&word) {
            self.token_id = CppTokenId::Key;
            self.attribute = CUSTOM_TYPE;
        } else if KEYWORDS.contains(word.as_str()) {
            self.emit(CppTokenId::Key);
        } else {
            self.emit(CppTokenId::Identifier);
        }
    }

    fn lex_bracket(&mut self, ch: char) {
        let state = &mut self.state;
        match ch {
            '(' => state.parenthesis_level += 1,
            ')' => state.parenthesis_level = state.parenthesis_level.saturating_sub(1),
            '[' => state.bracket_level += 1,
            ']' => state.bracket_level = state.bracket_level.saturating_sub(1),
            '{' => {
                state.brace_level += 1;
                state.block_level += 1;
                state.block_started += 1;
            }
            _ => {
                state.brace_level = state.brace_level.saturating_sub(1);
                state.block_level = state.block_level.saturating_sub(1);
                if state.block_started > 0 {
                    state.block_started -= 1;
                } else {
                    state.block_ended += 1;
                }
            }
        }
        self.run += 1;
        self.emit(CppTokenId::Symbol);
    }

    fn lex_operator(&mut self, ch: char) {
        if let Some(op) = OPERATORS.iter().find(|op| self.starts_with_at(self.run, op)) {
            self.run += op.len();
            self.emit(CppTokenId::Symbol);
        } else {
            self.run += 1;
            if SINGLE_SYMBOLS.contains(ch) {
                self.emit(CppTokenId::Symbol);
            } else {
                self.emit(CppTokenId::Unknown);
            }
        }
    }

    /// String text up to the closing quote, an escape, or the end of the line.
    fn lex_string_chunk(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                '"' => {
                    self.run += 1;
                    self.state.mode = self.code_mode();
                    break;
                }
                '\\' => break,
                _ => self.run += 1,
            }
        }
        self.emit(CppTokenId::String);
    }

    fn lex_escape(&mut self) {
        if self.run + 1 >= self.chars.len() {
            // Line continuation inside the string.
            self.run += 1;
            self.emit(CppTokenId::String);
            return;
        }
        let count_digits = |this: &Self, from: usize, max: usize, radix: u32| {
            this.chars[from.min(this.chars.len())..]
                .iter()
                .take(max)
                .take_while(|c| c.is_digit(radix))
                .count()
        };
        let len = match self.chars[self.run + 1] {
            'x' => 2 + count_digits(self, self.run + 2, usize::MAX, 16),
            'u' => 2 + count_digits(self, self.run + 2, 4, 16),
            'U' => 2 + count_digits(self, self.run + 2, 8, 16),
            '0'..='7' => 1 + count_digits(self, self.run + 1, 3, 8),
            _ => 2,
        };
        self.run += len;
        self.emit(CppTokenId::StringEscapeSeq);
    }

    fn lex_char(&mut self) {
        // Skip the opening quote (after any encoding prefix).
        self.run += 1;
        while let Some(c) = self.peek(0) {
            self.run += 1;
            match c {
                '\\' => self.run = (self.run + 1).min(self.chars.len()),
                '\'' => break,
                _ => {}
            }
        }
        self.emit(CppTokenId::Char);
    }

    /// `R"delim(`: returns `false` (consuming nothing) when the delimiter is malformed.
    fn lex_raw_string_start(&mut self) -> bool {
        let open = self.run + 1;
        let Some(paren) = (open..self.chars.len())
            .take(MAX_RAW_DELIMITER + 1)
            .find(|&i| self.chars[i] == '(')
        else {
            return false;
        };
        let delimiter: String = self.chars[open..paren].iter().collect();
        if delimiter
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ')' | '\\' | '"'))
        {
            return false;
        }
        self.run = paren + 1;
        self.state.raw_delimiter = Some(Arc::from(delimiter));
        self.state.mode = LexMode::RawString;
        self.lex_raw_string_rest();
        true
    }

    fn lex_raw_string_rest(&mut self) {
        let closing = format!("){}\"", self.state.raw_delimiter.as_deref().unwrap_or(""));
        match self.find_from(self.run, &closing) {
            Some(at) => {
                self.run = at + closing.chars().count();
                self.state.mode = self.code_mode();
                self.state.raw_delimiter = None;
            }
            None => self.run = self.chars.len(),
        }
        self.emit(CppTokenId::RawString);
    }

    fn lex_block_comment_rest(&mut self) {
        let end = self.comments.block_close().and_then(|close| {
            self.find_from(self.run, close)
                .map(|at| at + close.chars().count())
        });
        match end {
            Some(end) => {
                self.run = end;
                self.state.mode = if self.state.mode == LexMode::DirectiveComment {
                    LexMode::Directive
                } else {
                    self.code_mode()
                };
            }
            None => self.run = self.chars.len(),
        }
        self.emit(CppTokenId::Comment);
    }

    fn lex_directive_start(&mut self) {
        self.run += 1;
        while self.peek(0).is_some_and(|c| c == ' ' || c == '\t') {
            self.run += 1;
        }
        let start = self.run;
        self.skip_identifier();
        let is_define = self.word(start) == "define";
        self.emit(CppTokenId::Directive);
        if is_define {
            self.state.mode = LexMode::MacroBody;
            self.state.in_macro = true;
            self.expect_macro_name = true;
        } else {
            self.state.mode = LexMode::Directive;
        }
    }

    /// Remainder of a directive, up to a comment or a quoted name.
    fn lex_directive_body(&mut self) {
        if self.at_line_comment() {
            self.state.mode = LexMode::LineComment;
            self.run = self.chars.len();
            self.emit(CppTokenId::Comment);
            return;
        }
        if let Some(len) = self.block_comment_opener() {
            self.run += len;
            self.state.mode = LexMode::DirectiveComment;
            self.lex_block_comment_rest();
            return;
        }
        if self.peek(0) == Some('"') {
            // Quoted header names may contain comment openers.
            self.run += 1;
            while let Some(c) = self.peek(0) {
                self.run += 1;
                if c == '"' {
                    break;
                }
            }
            self.emit(CppTokenId::String);
            return;
        }
        self.run += 1;
        while self.peek(0).is_some_and(|c| c != '"')
            && !self.at_line_comment()
            && self.block_comment_opener().is_none()
        {
            self.run += 1;
        }
        self.emit(CppTokenId::Directive);
    }

    fn lex_number(&mut self) {
        let first = self.chars[self.run];
        let mut invalid = false;
        let id = match (first, self.peek(1)) {
            ('0', Some('x' | 'X')) => {
                self.run += 2;
                let mut digits = self.skip_digits(|c| c.is_ascii_hexdigit());
                let mut float = false;
                if self.peek(0) == Some('.') {
                    self.run += 1;
                    digits += self.skip_digits(|c| c.is_ascii_hexdigit());
                    float = true;
                }
                if matches!(self.peek(0), Some('p' | 'P')) {
                    float = true;
                    self.run += 1;
                    if matches!(self.peek(0), Some('+' | '-')) {
                        self.run += 1;
                    }
                    invalid |= self.skip_digits(|c| c.is_ascii_digit()) == 0;
                }
                invalid |= digits == 0;
                if float {
                    CppTokenId::HexFloat
                } else {
                    CppTokenId::Hex
                }
            }
            ('0', Some('b' | 'B')) => {
                self.run += 2;
                invalid |= self.skip_digits(|c| c == '0' || c == '1') == 0;
                if self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                    invalid = true;
                    self.skip_digits(|c| c.is_ascii_digit());
                }
                CppTokenId::Binary
            }
            _ => {
                let start = self.run;
                self.skip_digits(|c| c.is_ascii_digit());
                let int_end = self.run;
                let mut float = false;
                if self.peek(0) == Some('.') {
                    float = true;
                    self.run += 1;
                    self.skip_digits(|c| c.is_ascii_digit());
                }
                if matches!(self.peek(0), Some('e' | 'E')) && self.exponent_follows() {
                    float = true;
                    self.run += 1;
                    if matches!(self.peek(0), Some('+' | '-')) {
                        self.run += 1;
                    }
                    self.skip_digits(|c| c.is_ascii_digit());
                }
                if float {
                    CppTokenId::Float
                } else if first == '0' && int_end - start > 1 {
                    invalid |= self.chars[start..int_end]
                        .iter()
                        .any(|c| matches!(c, '8' | '9'));
                    CppTokenId::Octal
                } else {
                    CppTokenId::Number
                }
            }
        };

        let suffix_start = self.run;
        self.skip_identifier();
        let suffix = self.word(suffix_start).to_ascii_lowercase();
        let suffix_ok = suffix.is_empty()
            || match id {
                CppTokenId::Float | CppTokenId::HexFloat => FLOAT_SUFFIXES.contains(&suffix.as_str()),
                _ => INTEGER_SUFFIXES.contains(&suffix.as_str()),
            };
        self.emit(if invalid || !suffix_ok {
            CppTokenId::Unknown
        } else {
            id
        });
    }

    /// Whether the `e`/`E` at the cursor starts an exponent (`e5`, `e+5`, `e-5`).
    fn exponent_follows(&self) -> bool {
        match self.peek(1) {
            Some('+' | '-') => self.peek(2).is_some_and(|c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        }
    }
}

impl Syntaxer for CppSyntaxer {
    fn language(&self) -> ProgrammingLanguage {
        ProgrammingLanguage::Cpp
    }

    fn set_state(&mut self, state: &SyntaxState) {
        self.state = state.clone();
    }

    fn set_line(&mut self, text: &str, _line_number: usize) {
        self.text.clear();
        self.text.push_str(text);
        self.chars = text.chars().collect();
        self.offsets = text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(iter::once(text.len()))
            .collect();
        self.run = 0;
        self.finished = false;
        self.expect_macro_name = false;
        self.state.block_started = 0;
        self.state.block_ended = 0;
        self.next();
    }

    fn next(&mut self) {
        self.token_pos = self.run;
        if self.run >= self.chars.len() {
            if !self.finished {
                self.finish_line();
            }
            self.emit(CppTokenId::Null);
            return;
        }
        match self.state.mode {
            LexMode::BlockComment | LexMode::DirectiveComment => self.lex_block_comment_rest(),
            LexMode::LineComment => {
                self.run = self.chars.len();
                self.emit(CppTokenId::Comment);
            }
            LexMode::String if self.chars[self.run] == '\\' => self.lex_escape(),
            LexMode::String => self.lex_string_chunk(),
            LexMode::RawString => self.lex_raw_string_rest(),
            LexMode::Directive => self.lex_directive_body(),
            LexMode::Plain | LexMode::MacroBody => self.lex_code(),
        }
    }

    fn eol(&self) -> bool {
        self.token_id == CppTokenId::Null
    }

    fn token(&self) -> &str {
        &self.text[self.offsets[self.token_pos]..self.offsets[self.run]]
    }

    fn token_pos(&self) -> CharPos {
        CharPos(self.token_pos)
    }

    fn token_attribute(&self) -> TokenAttribute {
        self.attribute
    }

    fn state(&self) -> SyntaxState {
        self.state.clone()
    }

    fn is_keyword(&self, word: &str) -> bool {
        KEYWORDS.contains(word) || self.custom_types.contains(word)
    }

    fn keywords(&self) -> HashSet<&'static str> {
        KEYWORDS.clone()
    }

    fn comment_config(&self) -> CommentConfig {
        self.comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Lex one line from `state`, returning `(token, id)` pairs and the end state.
    fn lex(state: &SyntaxState, line: &str) -> (Vec<(String, CppTokenId)>, SyntaxState) {
        let mut syntaxer = CppSyntaxer::new();
        syntaxer.set_state(state);
        syntaxer.set_line(line, 0);
        let mut tokens = Vec::new();
        while !syntaxer.eol() {
            tokens.push((syntaxer.token().to_string(), syntaxer.token_id()));
            syntaxer.next();
        }
        (tokens, syntaxer.state())
    }

    fn ids(line: &str) -> Vec<(String, CppTokenId)> {
        lex(&SyntaxState::initial(), line)
            .0
            .into_iter()
            .filter(|(_, id)| *id != CppTokenId::Space)
            .collect()
    }

    fn tok(text: &str, id: CppTokenId) -> (String, CppTokenId) {
        (text.to_string(), id)
    }

    #[test]
    fn test_declaration() {
        use CppTokenId::*;
        assert_eq!(
            ids("int a = 1;"),
            vec![
                tok("int", Key),
                tok("a", Identifier),
                tok("=", Symbol),
                tok("1", Number),
                tok(";", Symbol),
            ]
        );
    }

    #[test]
    fn test_number_kinds() {
        use CppTokenId::*;
        let cases = [
            ("42", Number),
            ("42ull", Number),
            ("1'000'000", Number),
            ("0x1F", Hex),
            ("0xFFuz", Hex),
            ("0x1.8p3", HexFloat),
            ("0x1p", Unknown),
            ("0b1010", Binary),
            ("0b102", Unknown),
            ("017", Octal),
            ("019", Unknown),
            ("3.14", Float),
            ("1e10", Float),
            ("2.5e-3f", Float),
            (".5", Float),
            ("1.0bf16", Float),
            ("1.0q", Unknown),
            ("12abc", Unknown),
            ("0x", Unknown),
        ];
        for (text, expected) in cases {
            assert_eq!(ids(text), vec![tok(text, expected)], "{text}");
        }
    }

    #[test]
    fn test_string_escapes_are_split() {
        use CppTokenId::*;
        assert_eq!(
            ids(r#"s = "a\n\x41b\u00e9";"#),
            vec![
                tok("s", Identifier),
                tok("=", Symbol),
                tok("\"a", String),
                tok("\\n", StringEscapeSeq),
                tok("\\x41b", StringEscapeSeq),
                tok("\\u00e9", StringEscapeSeq),
                tok("\"", String),
                tok(";", Symbol),
            ]
        );
    }

    #[test]
    fn test_string_continuation() {
        let (_, state) = lex(&SyntaxState::initial(), "const char* s = \"abc\\");
        assert_eq!(state.mode, LexMode::String);
        let (tokens, state) = lex(&state, "def\";");
        assert_eq!(tokens[0], tok("def\"", CppTokenId::String));
        assert_eq!(state.mode, LexMode::Plain);

        let (_, state) = lex(&SyntaxState::initial(), "\"unterminated");
        assert_eq!(state.mode, LexMode::Plain);
    }

    #[test]
    fn test_char_literals() {
        use CppTokenId::*;
        assert_eq!(
            ids(r"c = '\'' + L'x';"),
            vec![
                tok("c", Identifier),
                tok("=", Symbol),
                tok(r"'\''", Char),
                tok("+", Symbol),
                tok("L'x'", Char),
                tok(";", Symbol),
            ]
        );
    }

    #[test]
    fn test_raw_string_across_lines() {
        let (tokens, state) = lex(&SyntaxState::initial(), r#"auto s = R"xy(first )" line"#);
        assert_eq!(tokens.last().map(|t| t.1), Some(CppTokenId::RawString));
        assert_eq!(state.mode, LexMode::RawString);
        assert_eq!(state.raw_delimiter.as_deref(), Some("xy"));

        let (tokens, state) = lex(&state, r#"second)xy"; int x;"#);
        assert_eq!(tokens[0], tok(r#"second)xy""#, CppTokenId::RawString));
        assert_eq!(state.mode, LexMode::Plain);
        assert_eq!(state.raw_delimiter, None);
    }

    #[test]
    fn test_comments_carry_over() {
        let (tokens, state) = lex(&SyntaxState::initial(), "x = 1; /* open");
        assert_eq!(tokens.last(), Some(&tok("/* open", CppTokenId::Comment)));
        assert_eq!(state.mode, LexMode::BlockComment);

        let (tokens, state) = lex(&state, "still */ y");
        assert_eq!(tokens[0], tok("still */", CppTokenId::Comment));
        assert_eq!(state.mode, LexMode::Plain);

        let (_, state) = lex(&SyntaxState::initial(), "// line \\");
        assert_eq!(state.mode, LexMode::LineComment);
        let (tokens, state) = lex(&state, "more");
        assert_eq!(tokens, vec![tok("more", CppTokenId::Comment)]);
        assert_eq!(state.mode, LexMode::Plain);
    }

    #[test]
    fn test_brackets_and_blocks() {
        let (_, state) = lex(&SyntaxState::initial(), "void f(int a[3]) {");
        assert_eq!(state.parenthesis_level, 0);
        assert_eq!(state.bracket_level, 0);
        assert_eq!(state.brace_level, 1);
        assert_eq!(state.block_started, 1);

        let (_, state) = lex(&state, "} else {");
        assert_eq!(state.brace_level, 1);
        assert_eq!(state.block_started, 1);
        assert_eq!(state.block_ended, 1);

        let (_, state) = lex(&state, "}}");
        assert_eq!(state.brace_level, 0);
        assert_eq!(state.block_ended, 2);
    }

    #[test]
    fn test_operators_longest_match() {
        use CppTokenId::*;
        assert_eq!(
            ids("a <<= b->*c <=> d::e ... $"),
            vec![
                tok("a", Identifier),
                tok("<<=", Symbol),
                tok("b", Identifier),
                tok("->*", Symbol),
                tok("c", Identifier),
                tok("<=>", Symbol),
                tok("d", Identifier),
                tok("::", Symbol),
                tok("e", Identifier),
                tok("...", Symbol),
                tok("$", Unknown),
            ]
        );
    }

    #[test]
    fn test_include_directive() {
        use CppTokenId::*;
        let (tokens, state) = lex(&SyntaxState::initial(), "#include <vector> // std");
        assert_eq!(
            tokens,
            vec![
                tok("#include", Directive),
                tok(" <vector> ", Directive),
                tok("// std", Comment),
            ]
        );
        assert_eq!(state.mode, LexMode::Plain);

        let (tokens, state) = lex(&SyntaxState::initial(), "  #  if X /* a */ && Y \\");
        assert_eq!(tokens[1], tok("#  if", Directive));
        assert_eq!(tokens[3], tok("/* a */", Comment));
        assert_eq!(state.mode, LexMode::Directive);
        let (tokens, state) = lex(&state, "  || Z");
        assert_eq!(tokens, vec![tok("  || Z", Directive)]);
        assert_eq!(state.mode, LexMode::Plain);
    }

    #[test]
    fn test_comment_delimiters_follow_language() {
        let syntaxer = CppSyntaxer::new();
        assert_eq!(syntaxer.comment_config(), CommentConfig::C_STYLE);
        assert_eq!(ids("a /* b */ c // d").last(), Some(&tok("// d", CppTokenId::Comment)));
    }

    #[test]
    fn test_quoted_include_keeps_comment_openers() {
        use CppTokenId::*;
        let (tokens, state) = lex(&SyntaxState::initial(), r#"#include "a//b/*c.h" // note"#);
        assert_eq!(
            tokens,
            vec![
                tok("#include", Directive),
                tok(" ", Directive),
                tok(r#""a//b/*c.h""#, String),
                tok(" ", Directive),
                tok("// note", Comment),
            ]
        );
        assert_eq!(state.mode, LexMode::Plain);
    }

    #[test]
    fn test_define_body_is_code() {
        let mut syntaxer = CppSyntaxer::new();
        syntaxer.set_line("#define MAX(a, b) \\", 0);
        let mut attributes = Vec::new();
        while !syntaxer.eol() {
            attributes.push((syntaxer.token().to_string(), syntaxer.token_attribute().name));
            syntaxer.next();
        }
        assert_eq!(attributes[0], ("#define".to_string(), "Preprocessor"));
        assert_eq!(attributes[2], ("MAX".to_string(), "Macro"));
        assert_eq!(attributes[3], ("(".to_string(), "Symbol"));
        let state = syntaxer.state();
        assert_eq!(state.mode, LexMode::MacroBody);
        assert!(state.in_macro);

        let (tokens, state) = lex(&state, "  ((a) > (b) ? \"x\\");
        assert!(tokens.iter().any(|t| t.1 == CppTokenId::Symbol));
        assert_eq!(state.mode, LexMode::String);
        assert!(state.in_macro);

        let (tokens, state) = lex(&state, "\" : 0)");
        assert_eq!(tokens[0], tok("\"", CppTokenId::String));
        assert_eq!(tokens[2], tok(":", CppTokenId::Symbol));
        assert_eq!(state.mode, LexMode::Plain);
        assert!(!state.in_macro);
    }

    #[test]
    fn test_hash_in_macro_body_is_symbol() {
        let (tokens, _) = lex(&SyntaxState::initial(), "#define STR(x) #x");
        assert!(tokens.contains(&tok("#", CppTokenId::Symbol)));
    }

    #[test]
    fn test_custom_types() {
        let mut syntaxer = CppSyntaxer::new();
        syntaxer.set_custom_type_keywords(["Widget".to_string()].into_iter().collect());
        syntaxer.set_line("Widget w;", 0);
        assert_eq!(syntaxer.token_id(), CppTokenId::Key);
        assert_eq!(syntaxer.token_attribute(), CUSTOM_TYPE);
        assert!(syntaxer.is_keyword("Widget"));
        assert!(syntaxer.is_keyword("constexpr"));
        assert!(!syntaxer.is_keyword("w"));
    }

    #[test]
    fn test_unicode_identifiers_and_positions() {
        let mut syntaxer = CppSyntaxer::new();
        syntaxer.set_line("int größe = 1;", 0);
        syntaxer.next();
        syntaxer.next();
        assert_eq!(syntaxer.token(), "größe");
        assert_eq!(syntaxer.token_pos(), CharPos(4));
    }

    #[test]
    fn test_empty_line_resolves_continuations() {
        let (_, open) = lex(&SyntaxState::initial(), "#define X \\");
        let (tokens, state) = lex(&open, "");
        assert!(tokens.is_empty());
        assert_eq!(state.mode, LexMode::Plain);

        let (_, open) = lex(&SyntaxState::initial(), "/*");
        let (_, state) = lex(&open, "");
        assert_eq!(state.mode, LexMode::BlockComment);
    }
}
