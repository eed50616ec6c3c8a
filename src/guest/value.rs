use std::{fmt, sync::Arc};

use crate::scripts::Language;

use super::{
    ast::Block,
    context::ContextState,
    error::{GuestError, GuestResult},
    interp,
    math::Module,
};

pub type BuiltinFn = fn(Language, &[GuestValue]) -> GuestResult<GuestValue>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A guest closure: parameters, body and the context it was evaluated in.
pub struct GuestFunction {
    pub language: Language,
    pub parameters: Vec<Arc<str>>,
    pub body: Arc<Block>,
    /// Locals visible where the lambda was created.
    pub captured: Vec<(Arc<str>, GuestValue)>,
    pub(crate) context: Arc<ContextState>,
}

impl fmt::Debug for GuestFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GuestFunction({}, arity {})",
            self.language,
            self.parameters.len()
        )
    }
}

/// Runtime value produced by the guest runtime.
///
/// Heap-backed variants are `Arc`-shared so a value can be handed to the
/// callable cache and executed from several threads.
#[derive(Debug, Clone)]
pub enum GuestValue {
    /// `nil` (Ruby), `null`/`undefined` (JS).
    Nil,
    Boolean(bool),
    /// Ruby integer; JS never produces one.
    Integer(i64),
    Float(f64),
    String(Arc<str>),
    Function(Arc<GuestFunction>),
    /// A host function bound to the dialect whose module produced it.
    Builtin {
        builtin: Builtin,
        language: Language,
    },
    Module(Module),
}

impl PartialEq for GuestValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GuestValue::Nil, GuestValue::Nil) => true,
            (GuestValue::Boolean(a), GuestValue::Boolean(b)) => a == b,
            (GuestValue::Integer(a), GuestValue::Integer(b)) => a == b,
            (GuestValue::Float(a), GuestValue::Float(b)) => a == b,
            (GuestValue::String(a), GuestValue::String(b)) => a == b,
            (GuestValue::Function(a), GuestValue::Function(b)) => Arc::ptr_eq(a, b),
            (
                GuestValue::Builtin {
                    builtin: a,
                    language: x,
                },
                GuestValue::Builtin {
                    builtin: b,
                    language: y,
                },
            ) => a == b && x == y,
            (GuestValue::Module(a), GuestValue::Module(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for GuestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestValue::Nil => write!(f, "nil"),
            GuestValue::Boolean(v) => write!(f, "{}", v),
            GuestValue::Integer(v) => write!(f, "{}", v),
            GuestValue::Float(v) => write!(f, "{}", v),
            GuestValue::String(v) => write!(f, "\"{}\"", v),
            GuestValue::Function(function) => {
                write!(f, "<{} function/{}>", function.language, function.parameters.len())
            }
            GuestValue::Builtin { builtin, .. } => write!(f, "<builtin {}>", builtin.name),
            GuestValue::Module(module) => write!(f, "{}", module.name()),
        }
    }
}

impl From<f64> for GuestValue {
    fn from(value: f64) -> Self {
        GuestValue::Float(value)
    }
}

impl GuestValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            GuestValue::Nil => "nil",
            GuestValue::Boolean(_) => "Boolean",
            GuestValue::Integer(_) => "Integer",
            GuestValue::Float(_) => "Float",
            GuestValue::String(_) => "String",
            GuestValue::Function(_) => "Function",
            GuestValue::Builtin { .. } => "Builtin",
            GuestValue::Module(_) => "Module",
        }
    }

    /// Capability probe: can this value be executed with arguments?
    pub fn can_execute(&self) -> bool {
        matches!(self, GuestValue::Function(_) | GuestValue::Builtin { .. })
    }

    /// Executes the value with `args`. Functions fail once their context is
    /// closed.
    pub fn execute(&self, args: &[GuestValue]) -> GuestResult<GuestValue> {
        interp::call_value(self, args)
    }

    /// Unboxes a numeric value into a host double.
    pub fn as_double(&self) -> GuestResult<f64> {
        match self {
            GuestValue::Float(v) => Ok(*v),
            GuestValue::Integer(v) => {
                let converted = *v as f64;
                if converted as i64 == *v {
                    Ok(converted)
                } else {
                    Err(GuestError::type_error(format!(
                        "integer {} cannot be represented as a double without loss",
                        v
                    )))
                }
            }
            other => Err(GuestError::type_error(format!(
                "cannot convert {} to a double",
                other.type_name()
            ))),
        }
    }

    /// Ruby: only `nil` and `false` are falsy. JS: also `0`, `NaN` and `""`.
    pub fn is_truthy(&self, language: Language) -> bool {
        match self {
            GuestValue::Nil | GuestValue::Boolean(false) => false,
            GuestValue::Integer(0) => language == Language::Ruby,
            GuestValue::Float(v) => language == Language::Ruby || (*v != 0.0 && !v.is_nan()),
            GuestValue::String(s) => language == Language::Ruby || !s.is_empty(),
            _ => true,
        }
    }
}
