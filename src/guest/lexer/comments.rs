//! Whitespace and comment skipping
//!
//! JavaScript: `// line` and `/* block */`. Ruby: `# line`.

use crate::scripts::Language;

use super::Lexer;
use crate::guest::token::Token;
use crate::guest::token_type::TokenType;

impl Lexer {
    /// Skips whitespace, comments and insignificant newlines. Returns an
    /// `Illegal` token when a block comment runs to the end of the input.
    pub(super) fn skip_ignorable(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some(' ' | '\t' | '\r') => self.read_char(),
                Some('\n') if !self.newline_is_significant() => self.read_char(),
                Some('#') if self.dialect == Language::Ruby => self.skip_line_comment(),
                Some('/') if self.dialect == Language::Js => match self.peek_char() {
                    Some('/') => self.skip_line_comment(),
                    Some('*') => {
                        let (line, column) = (self.line, self.column);
                        if !self.skip_block_comment() {
                            return Some(Token::new(
                                TokenType::Illegal,
                                "/*",
                                line,
                                column,
                            ));
                        }
                    }
                    _ => return None,
                },
                _ => return None,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while self.current_char.is_some() && self.current_char != Some('\n') {
            self.read_char();
        }
    }

    /// Returns false when the comment is unterminated.
    fn skip_block_comment(&mut self) -> bool {
        self.read_char(); // '/'
        self.read_char(); // '*'
        loop {
            match self.current_char {
                None => return false,
                Some('*') if self.peek_char() == Some('/') => {
                    self.read_char();
                    self.read_char();
                    return true;
                }
                Some(_) => self.read_char(),
            }
        }
    }
}
