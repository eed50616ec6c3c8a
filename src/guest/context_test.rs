use std::path::PathBuf;

use crate::error::SetupError;
use crate::guest::{ContextBuilder, ContextConfig, GuestErrorKind, GuestValue};
use crate::scripts::Language;

#[test]
fn fixed_configuration_builds() {
    let ctx = ContextBuilder::from_config(&ContextConfig::default())
        .build()
        .unwrap();
    assert!(ctx.is_open());
    assert!(ctx.config().allow_experimental_features);
    assert_eq!(ctx.config().guest_home_override, None);
    assert_eq!(
        ctx.eval(Language::Ruby, "1 + 1").unwrap(),
        GuestValue::Integer(2)
    );
}

#[test]
fn no_home_option_requires_experimental_features() {
    let err = ContextBuilder::new()
        .option("ruby.no-home-provided", "true")
        .build()
        .unwrap_err();
    assert!(matches!(err, SetupError::ExperimentalOptionDisabled(_)));
    insta::assert_snapshot!(err.to_string(), @"option 'ruby.no-home-provided' is experimental and experimental options are not allowed");
}

#[test]
fn unknown_options_are_rejected() {
    let err = ContextBuilder::new()
        .option("ruby.jit", "true")
        .build()
        .unwrap_err();
    assert!(matches!(err, SetupError::UnknownContextOption(ref key) if key == "ruby.jit"));
}

#[test]
fn boolean_options_reject_other_values() {
    let err = ContextBuilder::new()
        .allow_experimental_options(true)
        .option("ruby.no-home-provided", "yes")
        .build()
        .unwrap_err();
    assert!(matches!(err, SetupError::InvalidContextOption { .. }));
}

#[test]
fn home_override_enables_ruby() {
    let config = ContextConfig {
        allow_experimental_features: false,
        guest_home_override: Some(PathBuf::from("/opt/ruby")),
    };
    let ctx = ContextBuilder::from_config(&config).build().unwrap();
    assert_eq!(
        ctx.config().guest_home_override.as_deref(),
        Some(std::path::Path::new("/opt/ruby"))
    );
    assert!(ctx.eval(Language::Ruby, "2 * 3").is_ok());
}

#[test]
fn ruby_without_home_fails_to_evaluate() {
    let ctx = ContextBuilder::new().build().unwrap();
    let err = ctx.eval(Language::Ruby, "1").unwrap_err();
    assert_eq!(err.kind, GuestErrorKind::NameError);
    // JavaScript does not need a home.
    assert!(ctx.eval(Language::Js, "1").is_ok());
}

#[test]
fn evaluations_are_counted() {
    let ctx = ContextBuilder::from_config(&ContextConfig::default())
        .build()
        .unwrap();
    ctx.eval(Language::Js, "1").unwrap();
    ctx.eval(Language::Js, "2").unwrap();
    assert_eq!(ctx.evaluations(), 2);
}

#[test]
fn closed_context_refuses_evaluation() {
    let ctx = ContextBuilder::from_config(&ContextConfig::default())
        .build()
        .unwrap();
    let shared = ctx.clone();
    ctx.close();
    assert!(!shared.is_open());
    let err = shared.eval(Language::Js, "1").unwrap_err();
    assert_eq!(err.kind, GuestErrorKind::ContextClosed);
}

#[test]
fn contexts_get_distinct_ids() {
    let a = ContextBuilder::new().build().unwrap();
    let b = ContextBuilder::new().build().unwrap();
    assert_ne!(a.id(), b.id());
}

#[test]
fn config_deserializes_with_defaults() {
    let config: ContextConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, ContextConfig::default());
    let config: ContextConfig =
        serde_json::from_str(r#"{"guest_home_override": "/opt/ruby"}"#).unwrap();
    assert!(config.allow_experimental_features);
    assert_eq!(config.guest_home_override, Some(PathBuf::from("/opt/ruby")));
}
