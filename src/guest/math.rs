//! The `Math` module available to both dialects.
//!
//! JavaScript reaches it as `Math.acos(x)`, Ruby as `Math::acos(x)` or
//! `Math.acos(x)`. Ruby raises `Math::DomainError` where JavaScript returns
//! `NaN`.

use std::f64::consts;

use crate::scripts::Language;

use super::{
    error::{GuestError, GuestErrorKind, GuestResult},
    value::{Builtin, GuestValue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Math,
}

impl Module {
    pub fn name(self) -> &'static str {
        match self {
            Module::Math => "Math",
        }
    }

    pub fn member(self, language: Language, name: &str) -> GuestResult<GuestValue> {
        match name {
            "PI" => return Ok(GuestValue::Float(consts::PI)),
            "E" => return Ok(GuestValue::Float(consts::E)),
            _ => {}
        }
        let table = match language {
            Language::Js => JS_FUNCTIONS,
            Language::Ruby => RUBY_FUNCTIONS,
        };
        table
            .iter()
            .find(|builtin| builtin.name == name)
            .map(|builtin| GuestValue::Builtin {
                builtin: *builtin,
                language,
            })
            .ok_or_else(|| match language {
                Language::Js => {
                    GuestError::type_error(format!("Math.{} is not a function", name))
                }
                Language::Ruby => GuestError::new(
                    GuestErrorKind::NameError,
                    format!("undefined method `{}' for Math:Module", name),
                ),
            })
    }
}

macro_rules! builtin {
    ($name:literal, $func:ident) => {
        Builtin {
            name: $name,
            func: $func,
        }
    };
}

const SHARED: [Builtin; 11] = [
    builtin!("sin", math_sin),
    builtin!("cos", math_cos),
    builtin!("tan", math_tan),
    builtin!("asin", math_asin),
    builtin!("acos", math_acos),
    builtin!("atan", math_atan),
    builtin!("atan2", math_atan2),
    builtin!("sqrt", math_sqrt),
    builtin!("exp", math_exp),
    builtin!("log", math_log),
    builtin!("hypot", math_hypot),
];

const RUBY_FUNCTIONS: &[Builtin] = &SHARED;

const JS_FUNCTIONS: &[Builtin] = &[
    SHARED[0],
    SHARED[1],
    SHARED[2],
    SHARED[3],
    SHARED[4],
    SHARED[5],
    SHARED[6],
    SHARED[7],
    SHARED[8],
    SHARED[9],
    SHARED[10],
    builtin!("abs", math_abs),
    builtin!("floor", math_floor),
    builtin!("ceil", math_ceil),
    builtin!("round", math_round),
    builtin!("pow", math_pow),
    builtin!("min", math_min),
    builtin!("max", math_max),
];

/// JS coerces anything to a number (`undefined` becomes NaN); Ruby only
/// accepts numerics.
fn number(language: Language, value: &GuestValue, function: &str) -> GuestResult<f64> {
    match value {
        GuestValue::Float(v) => Ok(*v),
        GuestValue::Integer(v) => Ok(*v as f64),
        GuestValue::Boolean(b) if language == Language::Js => Ok(if *b { 1.0 } else { 0.0 }),
        _ if language == Language::Js => Ok(f64::NAN),
        other => Err(GuestError::type_error(format!(
            "can't convert {} into Float for Math.{}",
            other.type_name(),
            function
        ))),
    }
}

fn check_arity(
    language: Language,
    args: &[GuestValue],
    expected: usize,
    function: &str,
) -> GuestResult<()> {
    // JS ignores extra arguments and treats missing ones as undefined.
    if language == Language::Ruby && args.len() != expected {
        return Err(GuestError::new(
            GuestErrorKind::ArgumentError,
            format!(
                "wrong number of arguments (given {}, expected {}) for Math.{}",
                args.len(),
                expected,
                function
            ),
        ));
    }
    Ok(())
}

fn unary(
    language: Language,
    args: &[GuestValue],
    function: &str,
    op: fn(f64) -> f64,
) -> GuestResult<GuestValue> {
    check_arity(language, args, 1, function)?;
    let x = match args.first() {
        Some(value) => number(language, value, function)?,
        None => f64::NAN,
    };
    Ok(GuestValue::Float(op(x)))
}

fn binary(
    language: Language,
    args: &[GuestValue],
    function: &str,
    op: fn(f64, f64) -> f64,
) -> GuestResult<GuestValue> {
    check_arity(language, args, 2, function)?;
    let mut operands = [f64::NAN; 2];
    for (slot, value) in operands.iter_mut().zip(args) {
        *slot = number(language, value, function)?;
    }
    Ok(GuestValue::Float(op(operands[0], operands[1])))
}

/// Ruby rejects arguments outside the function's domain.
fn domain_checked(
    language: Language,
    args: &[GuestValue],
    function: &str,
    op: fn(f64) -> f64,
    in_domain: fn(f64) -> bool,
) -> GuestResult<GuestValue> {
    let result = unary(language, args, function, op)?;
    if language == Language::Ruby {
        let x = number(language, &args[0], function)?;
        if !in_domain(x) {
            return Err(GuestError::new(
                GuestErrorKind::DomainError,
                format!("Numerical argument is out of domain - \"{}\"", function),
            ));
        }
    }
    Ok(result)
}

fn math_sin(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "sin", f64::sin)
}

fn math_cos(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "cos", f64::cos)
}

fn math_tan(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "tan", f64::tan)
}

fn math_asin(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    domain_checked(language, args, "asin", f64::asin, |x| {
        (-1.0..=1.0).contains(&x)
    })
}

fn math_acos(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    domain_checked(language, args, "acos", f64::acos, |x| {
        (-1.0..=1.0).contains(&x)
    })
}

fn math_atan(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "atan", f64::atan)
}

fn math_atan2(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    binary(language, args, "atan2", f64::atan2)
}

fn math_sqrt(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    domain_checked(language, args, "sqrt", f64::sqrt, |x| x >= 0.0)
}

fn math_exp(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "exp", f64::exp)
}

fn math_log(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    domain_checked(language, args, "log", f64::ln, |x| x >= 0.0)
}

fn math_hypot(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    binary(language, args, "hypot", f64::hypot)
}

fn math_abs(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "abs", f64::abs)
}

fn math_floor(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "floor", f64::floor)
}

fn math_ceil(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "ceil", f64::ceil)
}

// JS rounds half-way cases towards +Infinity.
fn math_round(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    unary(language, args, "round", |x| (x + 0.5).floor())
}

fn math_pow(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    binary(language, args, "pow", f64::powf)
}

fn math_min(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    fold(language, args, "min", f64::INFINITY, f64::min)
}

fn math_max(language: Language, args: &[GuestValue]) -> GuestResult<GuestValue> {
    fold(language, args, "max", f64::NEG_INFINITY, f64::max)
}

fn fold(
    language: Language,
    args: &[GuestValue],
    function: &str,
    init: f64,
    op: fn(f64, f64) -> f64,
) -> GuestResult<GuestValue> {
    let mut acc = init;
    for value in args {
        let x = number(language, value, function)?;
        if x.is_nan() {
            return Ok(GuestValue::Float(f64::NAN));
        }
        acc = op(acc, x);
    }
    Ok(GuestValue::Float(acc))
}
