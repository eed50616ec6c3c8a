//! Tree-walking evaluator shared by both dialects.
//!
//! Locals live in a flat vector searched from the end, so inner declarations
//! shadow outer ones and a lambda captures its environment by cloning the
//! vector. Ruby top-level constants go to the owning context instead.

use std::sync::Arc;

use crate::scripts::Language;

use super::{
    ast::{Expression, InfixOp, PrefixOp, Program, Statement},
    context::ContextState,
    error::{GuestError, GuestErrorKind, GuestResult},
    math::Module,
    token::Position,
    value::{GuestFunction, GuestValue},
};

const MAX_CALL_DEPTH: usize = 200;

enum Flow {
    Next(GuestValue),
    Return(GuestValue),
}

struct Scope<'a> {
    language: Language,
    context: &'a Arc<ContextState>,
    locals: Vec<(Arc<str>, GuestValue)>,
    /// First local declared by the running body; earlier entries are captured.
    declared_from: usize,
    depth: usize,
    top_level: bool,
}

pub(crate) fn eval_program(
    context: &Arc<ContextState>,
    language: Language,
    program: &Program,
) -> GuestResult<GuestValue> {
    let mut scope = Scope {
        language,
        context,
        locals: Vec::new(),
        declared_from: 0,
        depth: 0,
        top_level: true,
    };
    scope.run(&program.statements, true)
}

/// Executes a callable handed out to the host.
pub(crate) fn call_value(callable: &GuestValue, args: &[GuestValue]) -> GuestResult<GuestValue> {
    invoke(callable, args, 0)
}

fn invoke(callable: &GuestValue, args: &[GuestValue], depth: usize) -> GuestResult<GuestValue> {
    match callable {
        GuestValue::Function(function) => call_function(function, args, depth),
        GuestValue::Builtin { builtin, language } => (builtin.func)(*language, args),
        other => Err(GuestError::type_error(format!(
            "{} is not executable",
            other.type_name()
        ))),
    }
}

fn call_function(
    function: &Arc<GuestFunction>,
    args: &[GuestValue],
    depth: usize,
) -> GuestResult<GuestValue> {
    if !function.context.is_open() {
        return Err(GuestError::context_closed());
    }
    if depth >= MAX_CALL_DEPTH {
        return Err(GuestError::new(
            GuestErrorKind::StackOverflow,
            "stack level too deep",
        ));
    }
    let arity = function.parameters.len();
    if function.language == Language::Ruby && args.len() != arity {
        return Err(GuestError::new(
            GuestErrorKind::ArgumentError,
            format!(
                "wrong number of arguments (given {}, expected {})",
                args.len(),
                arity
            ),
        ));
    }

    let mut locals = Vec::with_capacity(function.captured.len() + arity);
    locals.extend(function.captured.iter().cloned());
    let declared_from = locals.len();
    for (index, parameter) in function.parameters.iter().enumerate() {
        let argument = args.get(index).cloned().unwrap_or(GuestValue::Nil);
        locals.push((parameter.clone(), argument));
    }

    let mut scope = Scope {
        language: function.language,
        context: &function.context,
        locals,
        declared_from,
        depth: depth + 1,
        top_level: false,
    };
    let implicit_result = function.language == Language::Ruby;
    scope.run(&function.body.statements, implicit_result)
}

impl Scope<'_> {
    fn run(&mut self, statements: &[Statement], implicit_result: bool) -> GuestResult<GuestValue> {
        let mut last = GuestValue::Nil;
        for statement in statements {
            match self.statement(statement)? {
                Flow::Next(value) => last = value,
                Flow::Return(value) => return Ok(value),
            }
        }
        Ok(if implicit_result { last } else { GuestValue::Nil })
    }

    fn statement(&mut self, statement: &Statement) -> GuestResult<Flow> {
        match statement {
            Statement::Assign {
                name,
                value,
                position,
            } => {
                let value = self.expression(value)?;
                match self.language {
                    Language::Js => {
                        self.declare(name, value, *position)?;
                        Ok(Flow::Next(GuestValue::Nil))
                    }
                    Language::Ruby => {
                        self.assign(name, value.clone(), *position)?;
                        Ok(Flow::Next(value))
                    }
                }
            }
            Statement::Return { value, position } => {
                if self.top_level && self.language == Language::Js {
                    return Err(GuestError::syntax("Illegal return statement", *position));
                }
                let value = match value {
                    Some(expression) => self.expression(expression)?,
                    None => GuestValue::Nil,
                };
                Ok(Flow::Return(value))
            }
            Statement::Expression { expression } => Ok(Flow::Next(self.expression(expression)?)),
            Statement::Guarded {
                statement,
                condition,
                negated,
            } => {
                let holds = self.expression(condition)?.is_truthy(self.language);
                if holds != *negated {
                    self.statement(statement)
                } else {
                    Ok(Flow::Next(GuestValue::Nil))
                }
            }
        }
    }

    fn local(&self, name: &Arc<str>) -> Option<usize> {
        self.locals
            .iter()
            .rposition(|(local, _)| Arc::ptr_eq(local, name) || **local == **name)
    }

    /// JS `const`/`let`: redeclaring within the same body is an error.
    fn declare(&mut self, name: &Arc<str>, value: GuestValue, position: Position) -> GuestResult<()> {
        if let Some(index) = self.local(name) {
            if index >= self.declared_from {
                return Err(GuestError::syntax(
                    format!("Identifier '{}' has already been declared", name),
                    position,
                ));
            }
        }
        self.locals.push((name.clone(), value));
        Ok(())
    }

    fn assign(&mut self, name: &Arc<str>, value: GuestValue, position: Position) -> GuestResult<()> {
        if is_constant_name(name) {
            if !self.top_level {
                return Err(GuestError::syntax("dynamic constant assignment", position));
            }
            self.context.define_constant(name.clone(), value);
            return Ok(());
        }
        match self.local(name) {
            Some(index) => self.locals[index].1 = value,
            None => self.locals.push((name.clone(), value)),
        }
        Ok(())
    }

    fn resolve(&self, name: &Arc<str>) -> GuestResult<GuestValue> {
        if let Some(index) = self.local(name) {
            return Ok(self.locals[index].1.clone());
        }
        if let Some(value) = self.context.constant(name) {
            return Ok(value);
        }
        if **name == *Module::Math.name() {
            return Ok(GuestValue::Module(Module::Math));
        }
        let message = match self.language {
            Language::Js => format!("{} is not defined", name),
            Language::Ruby if is_constant_name(name) => format!("uninitialized constant {}", name),
            Language::Ruby => format!(
                "undefined local variable or method `{}' for main:Object",
                name
            ),
        };
        Err(GuestError::new(GuestErrorKind::NameError, message))
    }

    fn defined(&self, name: &Arc<str>) -> GuestValue {
        if self.local(name).is_some() {
            GuestValue::String(Arc::from("local-variable"))
        } else if self.context.constant(name).is_some() || **name == *Module::Math.name() {
            GuestValue::String(Arc::from("constant"))
        } else {
            GuestValue::Nil
        }
    }

    fn expression(&mut self, expression: &Expression) -> GuestResult<GuestValue> {
        match expression {
            Expression::Integer { value, .. } => Ok(GuestValue::Integer(*value)),
            Expression::Float { value, .. } => Ok(GuestValue::Float(*value)),
            Expression::String { value, .. } => Ok(GuestValue::String(value.clone())),
            Expression::Boolean { value, .. } => Ok(GuestValue::Boolean(*value)),
            Expression::Nil { .. } => Ok(GuestValue::Nil),
            Expression::Identifier { name, position } => {
                self.resolve(name).map_err(|err| err.at(*position))
            }
            Expression::Prefix {
                operator,
                right,
                position,
            } => {
                let right = self.expression(right)?;
                prefix(self.language, *operator, right).map_err(|err| err.at(*position))
            }
            Expression::Infix {
                left,
                operator,
                right,
                position,
            } => {
                let left = self.expression(left)?;
                let right = self.expression(right)?;
                let result = match self.language {
                    Language::Js => Ok(js_arithmetic(*operator, &left, &right)),
                    Language::Ruby => ruby_arithmetic(*operator, &left, &right),
                };
                result.map_err(|err| err.at(*position))
            }
            Expression::Member {
                object,
                member,
                position,
            } => {
                let object = self.expression(object)?;
                self.member(object, member).map_err(|err| err.at(*position))
            }
            Expression::Call {
                function,
                arguments,
                position,
            } => {
                let callee = self.expression(function)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.expression(argument)?);
                }
                self.call(&callee, &args).map_err(|err| err.at(*position))
            }
            Expression::Lambda {
                parameters, body, ..
            } => Ok(GuestValue::Function(Arc::new(GuestFunction {
                language: self.language,
                parameters: parameters.clone(),
                body: Arc::clone(body),
                captured: self.locals.clone(),
                context: Arc::clone(self.context),
            }))),
            Expression::Defined { name, .. } => Ok(self.defined(name)),
        }
    }

    fn member(&self, object: GuestValue, name: &str) -> GuestResult<GuestValue> {
        match object {
            GuestValue::Module(module) => module.member(self.language, name),
            // `f.call(...)` and `f.(...)` both parse as a member call.
            GuestValue::Function(function) if self.language == Language::Ruby && name == "call" => {
                Ok(GuestValue::Function(function))
            }
            GuestValue::Nil if self.language == Language::Js => Err(GuestError::type_error(
                format!("Cannot read properties of undefined (reading '{}')", name),
            )),
            _ if self.language == Language::Js => Ok(GuestValue::Nil),
            other => Err(GuestError::new(
                GuestErrorKind::NameError,
                format!("undefined method `{}' for {}", name, other.type_name()),
            )),
        }
    }

    fn call(&self, callee: &GuestValue, args: &[GuestValue]) -> GuestResult<GuestValue> {
        if !callee.can_execute() {
            return Err(match self.language {
                Language::Js => {
                    GuestError::type_error(format!("{} is not a function", js_string(callee)))
                }
                Language::Ruby => GuestError::new(
                    GuestErrorKind::NameError,
                    format!("undefined method `call' for {}", callee.type_name()),
                ),
            });
        }
        invoke(callee, args, self.depth)
    }
}

fn is_constant_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
}

fn prefix(language: Language, operator: PrefixOp, value: GuestValue) -> GuestResult<GuestValue> {
    let negate = operator == PrefixOp::Negate;
    match (operator, value) {
        (PrefixOp::Not, value) => Ok(GuestValue::Boolean(!value.is_truthy(language))),
        (_, GuestValue::Integer(v)) if negate => Ok(v
            .checked_neg()
            .map_or_else(|| GuestValue::Float(-(v as f64)), GuestValue::Integer)),
        (_, GuestValue::Float(v)) if negate => Ok(GuestValue::Float(-v)),
        (_, value @ (GuestValue::Integer(_) | GuestValue::Float(_))) => Ok(value),
        (_, value) if language == Language::Js => {
            let number = js_number(&value);
            Ok(GuestValue::Float(if negate { -number } else { number }))
        }
        (_, value) => Err(GuestError::new(
            GuestErrorKind::NameError,
            format!(
                "undefined method `{}@' for {}",
                if negate { "-" } else { "+" },
                value.type_name()
            ),
        )),
    }
}

fn js_arithmetic(operator: InfixOp, left: &GuestValue, right: &GuestValue) -> GuestValue {
    let concatenates = matches!(left, GuestValue::String(_)) || matches!(right, GuestValue::String(_));
    if operator == InfixOp::Add && concatenates {
        let joined = format!("{}{}", js_string(left), js_string(right));
        return GuestValue::String(Arc::from(joined));
    }
    let (a, b) = (js_number(left), js_number(right));
    GuestValue::Float(match operator {
        InfixOp::Add => a + b,
        InfixOp::Sub => a - b,
        InfixOp::Mul => a * b,
        InfixOp::Div => a / b,
        InfixOp::Rem => a % b,
    })
}

fn js_number(value: &GuestValue) -> f64 {
    match value {
        GuestValue::Float(v) => *v,
        GuestValue::Integer(v) => *v as f64,
        GuestValue::Boolean(b) => f64::from(u8::from(*b)),
        GuestValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        _ => f64::NAN,
    }
}

fn js_string(value: &GuestValue) -> String {
    match value {
        GuestValue::Nil => "undefined".to_string(),
        GuestValue::Float(v) if v.is_nan() => "NaN".to_string(),
        GuestValue::Float(v) if v.is_infinite() => {
            let sign = if *v > 0.0 { "" } else { "-" };
            format!("{}Infinity", sign)
        }
        GuestValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e21 => format!("{}", *v as i64),
        GuestValue::String(s) => s.to_string(),
        GuestValue::Function(_) | GuestValue::Builtin { .. } => "function".to_string(),
        GuestValue::Module(module) => format!("[object {}]", module.name()),
        other => other.to_string(),
    }
}

fn ruby_arithmetic(
    operator: InfixOp,
    left: &GuestValue,
    right: &GuestValue,
) -> GuestResult<GuestValue> {
    use GuestValue::{Float, Integer};

    match (left, right) {
        (Integer(a), Integer(b)) => integer_op(operator, *a, *b),
        (Integer(_) | Float(_), Integer(_) | Float(_)) => {
            let a = left.as_double()?;
            let b = right.as_double()?;
            Ok(Float(float_op(operator, a, b)))
        }
        (GuestValue::String(a), GuestValue::String(b)) if operator == InfixOp::Add => {
            Ok(GuestValue::String(Arc::from(format!("{}{}", a, b))))
        }
        (Integer(_) | Float(_), other) => Err(GuestError::type_error(format!(
            "{} can't be coerced into {}",
            other.type_name(),
            left.type_name()
        ))),
        (GuestValue::String(_), other) if operator == InfixOp::Add => Err(GuestError::type_error(
            format!("no implicit conversion of {} into String", other.type_name()),
        )),
        (other, _) => Err(GuestError::new(
            GuestErrorKind::NameError,
            format!("undefined method `{}' for {}", operator, other.type_name()),
        )),
    }
}

fn integer_op(operator: InfixOp, a: i64, b: i64) -> GuestResult<GuestValue> {
    let result = match operator {
        InfixOp::Add => a.checked_add(b),
        InfixOp::Sub => a.checked_sub(b),
        InfixOp::Mul => a.checked_mul(b),
        InfixOp::Div | InfixOp::Rem if b == 0 => {
            return Err(GuestError::new(
                GuestErrorKind::ZeroDivisionError,
                "divided by 0",
            ));
        }
        InfixOp::Div => floor_div(a, b),
        InfixOp::Rem => floor_mod(a, b),
    };
    // Overflow leaves the fixnum range; continue in floating point.
    Ok(result.map_or_else(
        || GuestValue::Float(float_op(operator, a as f64, b as f64)),
        GuestValue::Integer,
    ))
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    let remainder = a.checked_rem(b)?;
    Some(if remainder != 0 && (remainder < 0) != (b < 0) {
        quotient - 1
    } else {
        quotient
    })
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let remainder = a.checked_rem(b)?;
    Some(if remainder != 0 && (remainder < 0) != (b < 0) {
        remainder + b
    } else {
        remainder
    })
}

/// Ruby float arithmetic: the modulo takes the sign of the divisor.
fn float_op(operator: InfixOp, a: f64, b: f64) -> f64 {
    match operator {
        InfixOp::Add => a + b,
        InfixOp::Sub => a - b,
        InfixOp::Mul => a * b,
        InfixOp::Div => a / b,
        InfixOp::Rem => {
            let remainder = a % b;
            if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
                remainder + b
            } else {
                remainder
            }
        }
    }
}

#[cfg(test)]
#[path = "interp_test.rs"]
mod interp_test;
