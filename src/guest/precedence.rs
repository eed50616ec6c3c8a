use super::token_type::TokenType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Sum,     // +, -
    Product, // *, /, %
    Prefix,  // -x, !x
    Call,    // fn(x), Math.PI, Math::PI
}

pub fn token_precedence(token_type: TokenType) -> Precedence {
    match token_type {
        TokenType::Plus | TokenType::Minus => Precedence::Sum,
        TokenType::Asterisk | TokenType::Slash | TokenType::Percent => Precedence::Product,
        TokenType::LParen | TokenType::Dot | TokenType::ColonColon => Precedence::Call,
        _ => Precedence::Lowest,
    }
}
