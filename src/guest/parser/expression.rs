use std::sync::Arc;

use crate::guest::{
    ast::{Block, Expression, InfixOp, PrefixOp, Statement},
    error::{GuestError, GuestResult},
    precedence::{Precedence, token_precedence},
    token_type::TokenType,
};
use crate::scripts::Language;

use super::Parser;

impl Parser {
    // Core expression parsing
    pub(super) fn parse_expression(&mut self, precedence: Precedence) -> GuestResult<Expression> {
        let mut left = self.parse_prefix()?;

        while precedence < token_precedence(self.current().token_type) {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> GuestResult<Expression> {
        let token = self.current().clone();
        let position = token.position;
        match token.token_type {
            TokenType::Int => {
                self.advance();
                let value = token.literal.parse::<i64>().map_err(|_| {
                    GuestError::syntax(
                        format!("integer literal `{}` is out of range", token.literal),
                        position,
                    )
                })?;
                Ok(Expression::Integer { value, position })
            }
            TokenType::Float => {
                self.advance();
                let value = token.literal.parse::<f64>().map_err(|_| {
                    GuestError::syntax(
                        format!("invalid number literal `{}`", token.literal),
                        position,
                    )
                })?;
                Ok(Expression::Float { value, position })
            }
            TokenType::String => {
                self.advance();
                Ok(Expression::String {
                    value: Arc::from(token.literal),
                    position,
                })
            }
            TokenType::True | TokenType::False => {
                self.advance();
                Ok(Expression::Boolean {
                    value: token.token_type == TokenType::True,
                    position,
                })
            }
            TokenType::Nil | TokenType::Null | TokenType::Undefined => {
                self.advance();
                Ok(Expression::Nil { position })
            }
            TokenType::Ident => {
                if self.dialect == Language::Js && self.peek(1) == TokenType::FatArrow {
                    return self.parse_js_arrow();
                }
                self.advance();
                Ok(Expression::Identifier {
                    name: Arc::from(token.literal),
                    position,
                })
            }
            TokenType::Minus | TokenType::Plus | TokenType::Bang => {
                self.advance();
                let operator = match token.token_type {
                    TokenType::Minus => PrefixOp::Negate,
                    TokenType::Plus => PrefixOp::Plus,
                    _ => PrefixOp::Not,
                };
                let right = self.parse_expression(Precedence::Prefix)?;
                Ok(Expression::Prefix {
                    operator,
                    right: Box::new(right),
                    position,
                })
            }
            TokenType::LParen => {
                if self.dialect == Language::Js && self.looks_like_arrow_parameters() {
                    return self.parse_js_arrow();
                }
                self.advance();
                let inner = self.parse_expression(Precedence::Lowest)?;
                self.expect(TokenType::RParen)?;
                Ok(inner)
            }
            TokenType::Arrow => self.parse_ruby_lambda(),
            TokenType::Defined => self.parse_defined(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_infix(&mut self, left: Expression) -> GuestResult<Expression> {
        let token = self.advance();
        let position = token.position;
        match token.token_type {
            TokenType::LParen => {
                let arguments = self.parse_arguments()?;
                Ok(Expression::Call {
                    function: Box::new(left),
                    arguments,
                    position,
                })
            }
            TokenType::Dot | TokenType::ColonColon => {
                let member = self.expect_ident()?;
                Ok(Expression::Member {
                    object: Box::new(left),
                    member,
                    position,
                })
            }
            operator_token => {
                let operator = match operator_token {
                    TokenType::Plus => InfixOp::Add,
                    TokenType::Minus => InfixOp::Sub,
                    TokenType::Asterisk => InfixOp::Mul,
                    TokenType::Slash => InfixOp::Div,
                    _ => InfixOp::Rem,
                };
                let precedence = token_precedence(operator_token);
                self.skip_newlines();
                let right = self.parse_expression(precedence)?;
                Ok(Expression::Infix {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                    position,
                })
            }
        }
    }

    // Arguments after an already consumed `(`.
    fn parse_arguments(&mut self) -> GuestResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        if self.at(TokenType::RParen) {
            self.advance();
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression(Precedence::Lowest)?);
            if self.at(TokenType::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenType::RParen)?;
            return Ok(arguments);
        }
    }

    // `(a, b)` or `()`; the opening parenthesis has not been consumed.
    fn parse_parameters(&mut self) -> GuestResult<Vec<Arc<str>>> {
        self.expect(TokenType::LParen)?;
        let mut parameters = Vec::new();
        if self.at(TokenType::RParen) {
            self.advance();
            return Ok(parameters);
        }
        loop {
            let name = self.expect_ident()?;
            if parameters.contains(&name) {
                return Err(GuestError::syntax(
                    format!("duplicated argument name `{}`", name),
                    self.current().position,
                ));
            }
            parameters.push(name);
            if self.at(TokenType::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenType::RParen)?;
            return Ok(parameters);
        }
    }

    /// `(` Ident? (`,` Ident)* `)` `=>` starting at the current token.
    fn looks_like_arrow_parameters(&self) -> bool {
        let mut offset = 1;
        let mut expect_ident = true;
        loop {
            match self.peek(offset) {
                TokenType::RParen => return self.peek(offset + 1) == TokenType::FatArrow,
                TokenType::Ident if expect_ident => expect_ident = false,
                TokenType::Comma if !expect_ident => expect_ident = true,
                _ => return false,
            }
            offset += 1;
        }
    }

    // `(a, b) => { ... }`, `(a) => expr`, `a => expr`
    fn parse_js_arrow(&mut self) -> GuestResult<Expression> {
        let position = self.current().position;
        let parameters = if self.at(TokenType::Ident) {
            vec![self.expect_ident()?]
        } else {
            self.parse_parameters()?
        };
        self.expect(TokenType::FatArrow)?;

        let body = if self.at(TokenType::LBrace) {
            self.advance();
            self.parse_block(TokenType::RBrace)?
        } else {
            let value = self.parse_expression(Precedence::Lowest)?;
            let position = value.position();
            Block {
                statements: vec![Statement::Return {
                    value: Some(value),
                    position,
                }],
            }
        };

        Ok(Expression::Lambda {
            parameters,
            body: Arc::new(body),
            position,
        })
    }

    // `->(a, b) do ... end`, `->(a) { ... }`, `-> do ... end`
    fn parse_ruby_lambda(&mut self) -> GuestResult<Expression> {
        let position = self.advance().position;
        let parameters = if self.at(TokenType::LParen) {
            self.parse_parameters()?
        } else {
            Vec::new()
        };

        let body = match self.current().token_type {
            TokenType::Do => {
                self.advance();
                self.parse_block(TokenType::End)?
            }
            TokenType::LBrace => {
                self.advance();
                self.parse_block(TokenType::RBrace)?
            }
            _ => return Err(self.unexpected("`do` or `{` to open the lambda body")),
        };

        Ok(Expression::Lambda {
            parameters,
            body: Arc::new(body),
            position,
        })
    }

    // `defined?(NAME)` or `defined? NAME`
    fn parse_defined(&mut self) -> GuestResult<Expression> {
        let position = self.advance().position;
        let parenthesized = self.at(TokenType::LParen);
        if parenthesized {
            self.advance();
        }
        let name = self.expect_ident()?;
        if parenthesized {
            self.expect(TokenType::RParen)?;
        }
        Ok(Expression::Defined { name, position })
    }
}
