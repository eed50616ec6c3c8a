use crate::scripts::Language;

use crate::guest::{
    ast::{Block, Statement},
    error::GuestResult,
    precedence::Precedence,
    token_type::TokenType,
};

use super::Parser;

impl Parser {
    pub(super) fn parse_statement(&mut self) -> GuestResult<Statement> {
        let statement = match self.current().token_type {
            TokenType::Const | TokenType::Let => self.parse_declaration()?,
            TokenType::Return => self.parse_return()?,
            TokenType::Ident
                if self.dialect == Language::Ruby && self.peek(1) == TokenType::Assign =>
            {
                self.parse_assignment()?
            }
            _ => Statement::Expression {
                expression: self.parse_expression(Precedence::Lowest)?,
            },
        };

        if self.dialect == Language::Ruby
            && matches!(self.current().token_type, TokenType::If | TokenType::Unless)
        {
            let negated = self.advance().token_type == TokenType::Unless;
            let condition = self.parse_expression(Precedence::Lowest)?;
            return Ok(Statement::Guarded {
                statement: Box::new(statement),
                condition,
                negated,
            });
        }

        Ok(statement)
    }

    // `const NAME = value` / `let NAME = value`
    fn parse_declaration(&mut self) -> GuestResult<Statement> {
        let keyword = self.advance();
        let name = self.expect_ident()?;
        self.expect(TokenType::Assign)?;
        let value = self.parse_expression(Precedence::Lowest)?;
        Ok(Statement::Assign {
            name,
            value,
            position: keyword.position,
        })
    }

    // Ruby `name = value`
    fn parse_assignment(&mut self) -> GuestResult<Statement> {
        let position = self.current().position;
        let name = self.expect_ident()?;
        self.expect(TokenType::Assign)?;
        let value = self.parse_expression(Precedence::Lowest)?;
        Ok(Statement::Assign {
            name,
            value,
            position,
        })
    }

    fn parse_return(&mut self) -> GuestResult<Statement> {
        let keyword = self.advance();
        let value = match self.current().token_type {
            TokenType::Semicolon
            | TokenType::Newline
            | TokenType::RBrace
            | TokenType::End
            | TokenType::Eof => None,
            _ => Some(self.parse_expression(Precedence::Lowest)?),
        };
        Ok(Statement::Return {
            value,
            position: keyword.position,
        })
    }

    /// Parses statements up to (and consuming) `closer`.
    pub(super) fn parse_block(&mut self, closer: TokenType) -> GuestResult<Block> {
        let mut block = Block::default();

        self.skip_separators();
        while !self.at(closer) {
            if self.at(TokenType::Eof) {
                return Err(self.unexpected(&format!("`{}`", closer)));
            }
            let statement = self.parse_statement()?;
            block.statements.push(statement);
            self.expect_statement_end(&[closer])?;
            self.skip_separators();
        }
        self.expect(closer)?;

        Ok(block)
    }
}
