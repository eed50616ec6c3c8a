//! In-process guest runtime for the `js` and `ruby` dialects.
//!
//! Source text goes through [`lexer::Lexer`] and [`parser::Parser`] into an
//! AST that [`context::GuestContext::eval`] walks.

pub mod ast;
pub mod context;
pub mod error;
mod interp;
pub mod lexer;
pub mod math;
pub mod parser;
pub mod precedence;
pub mod token;
pub mod token_type;
pub mod value;

pub use context::{ContextBuilder, ContextConfig, GuestContext};
pub use error::{GuestError, GuestErrorKind, GuestResult};
pub use value::GuestValue;
