use std::fmt;

use thiserror::Error;

use super::token::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestErrorKind {
    SyntaxError,
    NameError,
    TypeError,
    ArgumentError,
    ZeroDivisionError,
    DomainError,
    StackOverflow,
    /// A value was used after the context that produced it was closed.
    ContextClosed,
}

impl fmt::Display for GuestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GuestErrorKind::SyntaxError => "SyntaxError",
            GuestErrorKind::NameError => "NameError",
            GuestErrorKind::TypeError => "TypeError",
            GuestErrorKind::ArgumentError => "ArgumentError",
            GuestErrorKind::ZeroDivisionError => "ZeroDivisionError",
            GuestErrorKind::DomainError => "Math::DomainError",
            GuestErrorKind::StackOverflow => "SystemStackError",
            GuestErrorKind::ContextClosed => "ContextClosed",
        };
        write!(f, "{}", s)
    }
}

/// Error raised by the guest runtime while parsing or executing a fragment.
///
/// The rendered form is the runtime's extended diagnostic, e.g.
/// `SyntaxError: expected `)`, got end of input (eval):3:1`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}{}", render_position(.position))]
pub struct GuestError {
    pub kind: GuestErrorKind,
    pub message: String,
    pub position: Option<Position>,
}

fn render_position(position: &Option<Position>) -> String {
    match position {
        Some(position) => format!(" (eval):{}", position),
        None => String::new(),
    }
}

impl GuestError {
    pub fn new(kind: GuestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        if self.position.is_none() {
            self.position = Some(position);
        }
        self
    }

    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        Self::new(GuestErrorKind::SyntaxError, message).at(position)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(GuestErrorKind::TypeError, message)
    }

    pub fn context_closed() -> Self {
        Self::new(
            GuestErrorKind::ContextClosed,
            "the guest context owning this value has been closed",
        )
    }
}

pub type GuestResult<T> = Result<T, GuestError>;
