use crate::geo::haversine_distance;
use crate::guest::{ContextBuilder, GuestContext, GuestErrorKind, GuestValue};
use crate::scripts::{JS_HAVERSINE_DISTANCE, Language, RUBY_HAVERSINE_DISTANCE};

fn context() -> GuestContext {
    ContextBuilder::new()
        .allow_experimental_options(true)
        .option("ruby.no-home-provided", "true")
        .build()
        .unwrap()
}

fn eval(language: Language, source: &str) -> GuestValue {
    context()
        .eval(language, source)
        .unwrap_or_else(|err| panic!("eval failed: {}", err))
}

fn eval_err(language: Language, source: &str) -> crate::guest::GuestError {
    match context().eval(language, source) {
        Ok(value) => panic!("expected an error, got {}", value),
        Err(err) => err,
    }
}

fn coordinates() -> Vec<GuestValue> {
    [51.507222, -0.1275, 40.7127, -74.0059]
        .into_iter()
        .map(GuestValue::Float)
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    let relative = ((actual - expected) / expected).abs();
    assert!(relative < 1e-9, "{} is not close to {}", actual, expected);
}

#[test]
fn js_fragment_computes_the_host_distance() {
    let ctx = context();
    let function = ctx.eval(Language::Js, JS_HAVERSINE_DISTANCE).unwrap();
    assert!(function.can_execute());
    let result = ctx.execute(&function, &coordinates()).unwrap();
    let expected = haversine_distance(51.507222, -0.1275, 40.7127, -74.0059);
    assert_close(result.as_double().unwrap(), expected);
}

#[test]
fn ruby_fragment_computes_the_host_distance() {
    let ctx = context();
    let function = ctx.eval(Language::Ruby, RUBY_HAVERSINE_DISTANCE).unwrap();
    let result = ctx.execute(&function, &coordinates()).unwrap();
    let expected = haversine_distance(51.507222, -0.1275, 40.7127, -74.0059);
    assert_close(result.as_double().unwrap(), expected);
}

#[test]
fn ruby_fragment_can_be_evaluated_twice_in_one_context() {
    let ctx = context();
    let first = ctx.eval(Language::Ruby, RUBY_HAVERSINE_DISTANCE).unwrap();
    let second = ctx.eval(Language::Ruby, RUBY_HAVERSINE_DISTANCE).unwrap();
    assert_ne!(first, second);
    let a = ctx.execute(&first, &coordinates()).unwrap();
    let b = ctx.execute(&second, &coordinates()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn ruby_integer_arithmetic_floors() {
    assert_eq!(eval(Language::Ruby, "7 / 2"), GuestValue::Integer(3));
    assert_eq!(eval(Language::Ruby, "-7 / 2"), GuestValue::Integer(-4));
    assert_eq!(eval(Language::Ruby, "-7 % 3"), GuestValue::Integer(2));
    assert_eq!(eval(Language::Ruby, "7 % -3"), GuestValue::Integer(-2));
    assert_eq!(eval(Language::Ruby, "7 / 2.0"), GuestValue::Float(3.5));
}

#[test]
fn ruby_integer_division_by_zero_raises() {
    let err = eval_err(Language::Ruby, "1 / 0");
    assert_eq!(err.kind, GuestErrorKind::ZeroDivisionError);
    insta::assert_snapshot!(err.to_string(), @"ZeroDivisionError: divided by 0 (eval):1:3");
}

#[test]
fn ruby_integer_overflow_promotes_to_float() {
    let value = eval(Language::Ruby, "9223372036854775807 + 1");
    assert_eq!(value, GuestValue::Float(9223372036854775808.0));
}

#[test]
fn js_numbers_are_floats() {
    assert_eq!(eval(Language::Js, "7 / 2"), GuestValue::Float(3.5));
    assert_eq!(eval(Language::Js, "1 / 0"), GuestValue::Float(f64::INFINITY));
    assert_eq!(eval(Language::Js, "-7 % 3"), GuestValue::Float(-1.0));
}

#[test]
fn js_string_concatenation() {
    assert_eq!(
        eval(Language::Js, "'a' + 1"),
        GuestValue::String("a1".into())
    );
}

#[test]
fn js_missing_arguments_yield_nan() {
    let ctx = context();
    let function = ctx.eval(Language::Js, "(a, b) => a + b").unwrap();
    let result = ctx.execute(&function, &[GuestValue::Float(1.0)]).unwrap();
    assert!(result.as_double().unwrap().is_nan());
}

#[test]
fn ruby_lambda_arity_is_strict() {
    let ctx = context();
    let function = ctx.eval(Language::Ruby, "->(a, b) { a + b }").unwrap();
    let err = ctx
        .execute(&function, &[GuestValue::Float(1.0)])
        .unwrap_err();
    assert_eq!(err.kind, GuestErrorKind::ArgumentError);
    insta::assert_snapshot!(err.to_string(), @"ArgumentError: wrong number of arguments (given 1, expected 2)");
}

#[test]
fn ruby_math_domain_error() {
    let err = eval_err(Language::Ruby, "Math::acos(2)");
    assert_eq!(err.kind, GuestErrorKind::DomainError);
    insta::assert_snapshot!(err.to_string(), @r#"Math::DomainError: Numerical argument is out of domain - "acos" (eval):1:11"#);
}

#[test]
fn js_math_out_of_domain_is_nan() {
    let value = eval(Language::Js, "Math.acos(2)");
    assert!(value.as_double().unwrap().is_nan());
}

#[test]
fn unknown_identifier_is_a_name_error() {
    let err = eval_err(Language::Js, "nope");
    assert_eq!(err.kind, GuestErrorKind::NameError);
    insta::assert_snapshot!(err.to_string(), @"NameError: nope is not defined (eval):1:1");

    let err = eval_err(Language::Ruby, "nope");
    insta::assert_snapshot!(err.to_string(), @"NameError: undefined local variable or method `nope' for main:Object (eval):1:1");
}

#[test]
fn defined_reports_constants_and_locals() {
    assert_eq!(eval(Language::Ruby, "defined?(FOO)"), GuestValue::Nil);
    assert_eq!(
        eval(Language::Ruby, "FOO = 1\ndefined?(FOO)"),
        GuestValue::String("constant".into())
    );
    assert_eq!(
        eval(Language::Ruby, "foo = 1\ndefined?(foo)"),
        GuestValue::String("local-variable".into())
    );
}

#[test]
fn ruby_constants_persist_across_evaluations() {
    let ctx = context();
    ctx.eval(Language::Ruby, "LIMIT = 10").unwrap();
    assert_eq!(
        ctx.eval(Language::Ruby, "LIMIT * 2").unwrap(),
        GuestValue::Integer(20)
    );
    // Guarded redefinition is skipped.
    assert_eq!(
        ctx.eval(Language::Ruby, "LIMIT = 11 unless defined?(LIMIT)")
            .unwrap(),
        GuestValue::Nil
    );
    assert_eq!(
        ctx.eval(Language::Ruby, "LIMIT").unwrap(),
        GuestValue::Integer(10)
    );
}

#[test]
fn constant_assignment_inside_a_lambda_is_rejected() {
    let ctx = context();
    let function = ctx.eval(Language::Ruby, "->() { X = 1 }").unwrap();
    let err = ctx.execute(&function, &[]).unwrap_err();
    assert_eq!(err.kind, GuestErrorKind::SyntaxError);
    assert_eq!(err.message, "dynamic constant assignment");
}

#[test]
fn js_redeclaration_is_rejected() {
    let ctx = context();
    let function = ctx
        .eval(Language::Js, "(a) => { const b = 1; const b = 2; return b; }")
        .unwrap();
    let err = ctx.execute(&function, &[GuestValue::Nil]).unwrap_err();
    assert_eq!(err.message, "Identifier 'b' has already been declared");
}

#[test]
fn js_top_level_return_is_rejected() {
    let err = eval_err(Language::Js, "return 1");
    assert_eq!(err.kind, GuestErrorKind::SyntaxError);
}

#[test]
fn lambdas_capture_enclosing_locals() {
    let ctx = context();
    let function = ctx
        .eval(Language::Ruby, "base = 40\n->(x) { base + x }")
        .unwrap();
    let result = ctx.execute(&function, &[GuestValue::Integer(2)]).unwrap();
    assert_eq!(result, GuestValue::Integer(42));
}

#[test]
fn ruby_call_through_member() {
    assert_eq!(
        eval(Language::Ruby, "f = ->(x) { x * 2 }\nf.call(21)"),
        GuestValue::Integer(42)
    );
}

#[test]
fn runaway_recursion_overflows() {
    let ctx = context();
    let function = ctx
        .eval(Language::Ruby, "->(f) { f.call(f) }")
        .unwrap();
    let err = ctx.execute(&function, &[function.clone()]).unwrap_err();
    assert_eq!(err.kind, GuestErrorKind::StackOverflow);
}

#[test]
fn closed_context_rejects_execution() {
    let ctx = context();
    let function = ctx.eval(Language::Js, JS_HAVERSINE_DISTANCE).unwrap();
    ctx.close();
    let err = ctx.execute(&function, &coordinates()).unwrap_err();
    assert_eq!(err.kind, GuestErrorKind::ContextClosed);
}

#[test]
fn non_function_values_are_not_executable() {
    let ctx = context();
    let value = ctx.eval(Language::Js, "42").unwrap();
    assert!(!value.can_execute());
    assert!(ctx.execute(&value, &[]).is_err());
}
