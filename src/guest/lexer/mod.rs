//! Guest lexer - tokenizes JavaScript and Ruby fragments into one token stream

mod comments;
mod numbers;
mod strings;

use crate::scripts::Language;

use super::token::{Position, Token};
use super::token_type::{TokenType, lookup_ident};

fn is_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    read_position: usize,
    current_char: Option<char>,
    line: usize,
    column: usize,
    dialect: Language,
    /// Open `(` count; Ruby newlines inside parentheses are insignificant.
    paren_depth: usize,
    last_significant: Option<TokenType>,
}

impl Lexer {
    pub fn new(input: &str, dialect: Language) -> Self {
        let mut lexer = Self {
            input: input.chars().collect(),
            position: 0,
            read_position: 0,
            current_char: None,
            line: 1,
            column: 0,
            dialect,
            paren_depth: 0,
            last_significant: None,
        };
        lexer.read_char();
        lexer
    }

    pub fn dialect(&self) -> Language {
        self.dialect
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        if let Some(unterminated) = self.skip_ignorable() {
            return unterminated;
        }

        let line = self.line;
        let col = self.column;

        let token = match self.current_char {
            Some('\n') => Token::new(TokenType::Newline, "\n", line, col),
            Some(':') if self.peek_char() == Some(':') => {
                self.read_char();
                Token::new(TokenType::ColonColon, "::", line, col)
            }
            Some('-') if self.peek_char() == Some('>') => {
                self.read_char();
                Token::new(TokenType::Arrow, "->", line, col)
            }
            Some('=') if self.peek_char() == Some('>') => {
                self.read_char();
                Token::new(TokenType::FatArrow, "=>", line, col)
            }
            Some('=') => Token::new(TokenType::Assign, "=", line, col),
            Some('!') => Token::new(TokenType::Bang, "!", line, col),
            Some('+') => Token::new(TokenType::Plus, "+", line, col),
            Some('-') => Token::new(TokenType::Minus, "-", line, col),
            Some('*') => Token::new(TokenType::Asterisk, "*", line, col),
            Some('/') => Token::new(TokenType::Slash, "/", line, col),
            Some('%') => Token::new(TokenType::Percent, "%", line, col),
            Some('(') => {
                self.paren_depth += 1;
                Token::new(TokenType::LParen, "(", line, col)
            }
            Some(')') => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                Token::new(TokenType::RParen, ")", line, col)
            }
            Some('{') => Token::new(TokenType::LBrace, "{", line, col),
            Some('}') => Token::new(TokenType::RBrace, "}", line, col),
            Some(',') => Token::new(TokenType::Comma, ",", line, col),
            Some(';') => Token::new(TokenType::Semicolon, ";", line, col),
            Some('.') => Token::new(TokenType::Dot, ".", line, col),

            Some(quote @ ('"' | '\'')) => {
                let token = self.read_string(quote, line, col);
                return self.remember(token);
            }

            None => return Token::eof(Position::new(line, col)),

            Some(ch) if is_letter(ch) => {
                let ident = self.read_identifier();
                let token_type = lookup_ident(&ident, self.dialect);
                return self.remember(Token::new(token_type, ident, line, col));
            }

            Some(ch) if ch.is_ascii_digit() => {
                let (literal, token_type) = self.read_number();
                return self.remember(Token::new(token_type, literal, line, col));
            }

            Some(ch) => Token::new(TokenType::Illegal, ch.to_string(), line, col),
        };

        self.read_char();
        self.remember(token)
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.token_type == TokenType::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn remember(&mut self, token: Token) -> Token {
        self.last_significant = Some(token.token_type);
        token
    }

    fn read_char(&mut self) {
        if self.current_char == Some('\n') {
            self.line += 1;
            self.column = 0;
        } else if self.current_char.is_some() {
            self.column += 1;
        }

        self.current_char = self.input.get(self.read_position).copied();
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.read_position).copied()
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while self
            .current_char
            .is_some_and(|c| is_letter(c) || c.is_ascii_digit())
        {
            self.read_char();
        }
        // Ruby predicate names such as `defined?`.
        if self.dialect == Language::Ruby && self.current_char == Some('?') {
            self.read_char();
        }
        self.input[start..self.position].iter().collect()
    }

    /// Whether a newline at the current position terminates a statement.
    fn newline_is_significant(&self) -> bool {
        if self.dialect != Language::Ruby || self.paren_depth > 0 {
            return false;
        }
        match self.last_significant {
            None | Some(TokenType::Newline) => false,
            Some(last) => !last.continues_line(),
        }
    }
}
