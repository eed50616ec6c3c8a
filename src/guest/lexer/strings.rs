//! String literals with `\\`, `\"`, `\'`, `\n` and `\t` escapes.

use super::Lexer;
use crate::guest::token::Token;
use crate::guest::token_type::TokenType;

impl Lexer {
    pub(super) fn read_string(&mut self, quote: char, line: usize, column: usize) -> Token {
        self.read_char(); // opening quote
        let mut value = String::new();
        loop {
            match self.current_char {
                None | Some('\n') => {
                    return Token::new(TokenType::UnterminatedString, value, line, column);
                }
                Some(ch) if ch == quote => {
                    self.read_char();
                    return Token::new(TokenType::String, value, line, column);
                }
                Some('\\') => {
                    self.read_char();
                    match self.current_char {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(other) => value.push(other),
                        None => continue,
                    }
                    self.read_char();
                }
                Some(ch) => {
                    value.push(ch);
                    self.read_char();
                }
            }
        }
    }
}
