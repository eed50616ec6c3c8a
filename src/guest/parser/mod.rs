//! Recursive-descent / Pratt parser shared by the JavaScript and Ruby dialects.

use std::sync::Arc;

use crate::scripts::Language;

use super::{
    ast::Program,
    error::{GuestError, GuestResult},
    lexer::Lexer,
    token::Token,
    token_type::TokenType,
};

mod expression;
mod statement;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    dialect: Language,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let dialect = lexer.dialect();
        let tokens = lexer.tokenize();
        Self {
            tokens,
            position: 0,
            dialect,
        }
    }

    pub fn parse_program(&mut self) -> GuestResult<Program> {
        let mut program = Program::default();

        self.skip_separators();
        while !self.at(TokenType::Eof) {
            let statement = self.parse_statement()?;
            program.statements.push(statement);
            self.expect_statement_end(&[TokenType::Eof])?;
            self.skip_separators();
        }

        Ok(program)
    }

    pub(super) fn current(&self) -> &Token {
        // tokenize() always ends with Eof, so the last token is a safe fallback.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(super) fn peek(&self, offset: usize) -> TokenType {
        self.tokens
            .get(self.position + offset)
            .map_or(TokenType::Eof, |t| t.token_type)
    }

    pub(super) fn at(&self, token_type: TokenType) -> bool {
        self.current().token_type == token_type
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    pub(super) fn expect(&mut self, token_type: TokenType) -> GuestResult<Token> {
        if self.at(token_type) {
            return Ok(self.advance());
        }
        Err(self.unexpected(&format!("`{}`", token_type)))
    }

    pub(super) fn expect_ident(&mut self) -> GuestResult<Arc<str>> {
        if self.at(TokenType::Ident) {
            return Ok(Arc::from(self.advance().literal));
        }
        Err(self.unexpected("an identifier"))
    }

    pub(super) fn unexpected(&self, expected: &str) -> GuestError {
        let token = self.current();
        let found = match token.token_type {
            TokenType::Illegal => format!("illegal character `{}`", token.literal),
            TokenType::UnterminatedString => "unterminated string".to_string(),
            _ => token.to_string(),
        };
        GuestError::syntax(format!("expected {}, got {}", expected, found), token.position)
    }

    pub(super) fn skip_separators(&mut self) {
        while matches!(
            self.current().token_type,
            TokenType::Newline | TokenType::Semicolon
        ) {
            self.advance();
        }
    }

    pub(super) fn skip_newlines(&mut self) {
        while self.at(TokenType::Newline) {
            self.advance();
        }
    }

    /// A statement must be followed by a separator or by the token closing
    /// its enclosing block.
    pub(super) fn expect_statement_end(&mut self, closers: &[TokenType]) -> GuestResult<()> {
        let token_type = self.current().token_type;
        if matches!(token_type, TokenType::Newline | TokenType::Semicolon)
            || closers.contains(&token_type)
        {
            return Ok(());
        }
        Err(self.unexpected("end of statement"))
    }
}
