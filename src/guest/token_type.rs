use std::fmt;

use crate::scripts::Language;

macro_rules! define_tokens {
    (
        symbols { $($sym_name:ident => $sym_str:literal),* $(,)? }
        keywords { $($kw_name:ident => $kw_str:literal in [$($lang:ident),+]),* $(,)? }
    ) => {
        #[repr(u16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokenType {
            // Special
            Illegal,
            Eof,
            Newline,

            // Identifiers & Literals
            Ident,
            Int,
            Float,
            String,
            UnterminatedString,

            // Symbols (operators & delimiters)
            $($sym_name,)*

            // Keywords (auto-generated from macro)
            $($kw_name,)*
        }

        impl fmt::Display for TokenType {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    TokenType::Illegal => "ILLEGAL",
                    TokenType::Eof => "EOF",
                    TokenType::Newline => "NEWLINE",
                    TokenType::Ident => "IDENT",
                    TokenType::Int => "INT",
                    TokenType::Float => "FLOAT",
                    TokenType::String => "STRING",
                    TokenType::UnterminatedString => "UNTERMINATED_STRING",
                    $(TokenType::$sym_name => $sym_str,)*
                    $(TokenType::$kw_name => $kw_str,)*
                };
                write!(f, "{}", s)
            }
        }

        /// Called by the lexer to check if an identifier is a keyword of `dialect`.
        pub fn lookup_ident(ident: &str, dialect: Language) -> TokenType {
            match ident {
                $($kw_str if [$(Language::$lang),+].contains(&dialect) => TokenType::$kw_name,)*
                _ => TokenType::Ident,
            }
        }
    };
}

// ════════════════════════════════════════════════════════════════════════════
//  TOKEN DEFINITIONS
// ════════════════════════════════════════════════════════════════════════════

define_tokens! {
    symbols {
        // Operators
        Plus     => "+",
        Minus    => "-",
        Asterisk => "*",
        Slash    => "/",
        Percent  => "%",
        Bang     => "!",
        Assign   => "=",

        // Delimiters
        LParen     => "(",
        RParen     => ")",
        LBrace     => "{",
        RBrace     => "}",
        Comma      => ",",
        Semicolon  => ";",
        Dot        => ".",
        ColonColon => "::",
        Arrow      => "->",
        FatArrow   => "=>",
    }

    keywords {
        Const     => "const" in [Js],
        Let       => "let" in [Js],
        Return    => "return" in [Js, Ruby],
        True      => "true" in [Js, Ruby],
        False     => "false" in [Js, Ruby],
        Null      => "null" in [Js],
        Undefined => "undefined" in [Js],
        Nil       => "nil" in [Ruby],
        Do        => "do" in [Ruby],
        End       => "end" in [Ruby],
        If        => "if" in [Js, Ruby],
        Unless    => "unless" in [Ruby],
        Defined   => "defined?" in [Ruby],
    }
}

impl TokenType {
    /// Tokens that may end a Ruby line without ending the expression on it.
    pub fn continues_line(self) -> bool {
        matches!(
            self,
            TokenType::Plus
                | TokenType::Minus
                | TokenType::Asterisk
                | TokenType::Slash
                | TokenType::Percent
                | TokenType::Assign
                | TokenType::Comma
                | TokenType::Dot
                | TokenType::ColonColon
        )
    }
}
