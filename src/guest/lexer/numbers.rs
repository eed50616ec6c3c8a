//! Number literal lexing
//!
//! Supports decimal integers (`6371`, `1_000`), decimal floats (`3.14`,
//! `2.5e10`, `1.5e-3`). JavaScript has a single number type, so every JS
//! literal is a `Float`; Ruby keeps `Int` for literals without a fraction or
//! exponent.

use crate::scripts::Language;

use super::Lexer;
use crate::guest::token_type::TokenType;

impl Lexer {
    pub(super) fn read_number(&mut self) -> (String, TokenType) {
        let start = self.position;
        self.consume_decimal_run();

        let mut is_float = false;

        if self.current_char == Some('.') && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.read_char();
            self.consume_decimal_run();
        }

        if matches!(self.current_char, Some('e' | 'E')) {
            let after = self.peek_char();
            let signed_digit = matches!(after, Some('+' | '-'))
                && self
                    .input
                    .get(self.read_position + 1)
                    .is_some_and(|c| c.is_ascii_digit());
            if after.is_some_and(|c| c.is_ascii_digit()) || signed_digit {
                is_float = true;
                self.read_char();
                if matches!(self.current_char, Some('+' | '-')) {
                    self.read_char();
                }
                self.consume_decimal_run();
            }
        }

        let literal: String = self.input[start..self.position]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        let token_type = if is_float || self.dialect == Language::Js {
            TokenType::Float
        } else {
            TokenType::Int
        };
        (literal, token_type)
    }

    fn consume_decimal_run(&mut self) {
        while self
            .current_char
            .is_some_and(|c| c.is_ascii_digit() || c == '_')
        {
            self.read_char();
        }
    }
}
