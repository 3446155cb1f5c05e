//! Plain-text tokenizer: runs of whitespace and runs of everything else.

use editbuf_core::{CharPos, ProgrammingLanguage, SyntaxState, Syntaxer, TokenAttribute, TokenType};

pub const TEXT: TokenAttribute = TokenAttribute::new("Text", TokenType::Default);
pub const SPACE: TokenAttribute = TokenAttribute::new("Space", TokenType::Space);

#[derive(Debug, Clone, Default)]
pub struct TextSyntaxer {
    text: String,
    /// `(byte offset, char)` for every char of the line.
    chars: Vec<(usize, char)>,
    run: usize,
    token_pos: usize,
    state: SyntaxState,
}

impl TextSyntaxer {
    pub fn new() -> Self {
        Self::default()
    }

    fn byte_at(&self, index: usize) -> usize {
        self.chars.get(index).map_or(self.text.len(), |&(byte, _)| byte)
    }
}

impl Syntaxer for TextSyntaxer {
    fn language(&self) -> ProgrammingLanguage {
        ProgrammingLanguage::Text
    }

    fn set_state(&mut self, state: &SyntaxState) {
        self.state = state.carried_over();
    }

    fn set_line(&mut self, text: &str, _line_number: usize) {
        self.text.clear();
        self.text.push_str(text);
        self.chars = text.char_indices().collect();
        self.run = 0;
        self.next();
    }

    fn next(&mut self) {
        self.token_pos = self.run;
        let Some(&(_, first)) = self.chars.get(self.run) else {
            return;
        };
        let space = first.is_whitespace();
        while self
            .chars
            .get(self.run)
            .is_some_and(|&(_, c)| c.is_whitespace() == space)
        {
            self.run += 1;
        }
    }

    fn eol(&self) -> bool {
        self.token_pos >= self.chars.len()
    }

    fn token(&self) -> &str {
        &self.text[self.byte_at(self.token_pos)..self.byte_at(self.run)]
    }

    fn token_pos(&self) -> CharPos {
        CharPos(self.token_pos)
    }

    fn token_attribute(&self) -> TokenAttribute {
        match self.chars.get(self.token_pos) {
            Some(&(_, c)) if c.is_whitespace() => SPACE,
            _ => TEXT,
        }
    }

    fn state(&self) -> SyntaxState {
        self.state.clone()
    }

    fn is_keyword(&self, _word: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use editbuf_core::tokenize_line;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_words_and_spaces() {
        let mut syntaxer = TextSyntaxer::new();
        let (tokens, state) = tokenize_line(&mut syntaxer, None, "héllo  wörld!", 0);
        let parts: Vec<(&str, usize, &str)> = tokens
            .iter()
            .map(|t| (t.text.as_str(), t.pos.get(), t.attribute.name))
            .collect();
        assert_eq!(
            parts,
            vec![("héllo", 0, "Text"), ("  ", 5, "Space"), ("wörld!", 7, "Text")]
        );
        assert_eq!(state, SyntaxState::initial());
    }

    #[test]
    fn test_empty_line() {
        let mut syntaxer = TextSyntaxer::new();
        syntaxer.set_line("", 3);
        assert!(syntaxer.eol());
        assert_eq!(syntaxer.token(), "");
    }
}
