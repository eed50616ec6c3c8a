use rayon::prelude::*;

use crate::cache::{
    CacheKey, CachePolicy, CallableCache, NoCache, SynchronizedCache, UnsynchronizedCache,
};
use crate::error::InvocationError;
use crate::guest::{ContextBuilder, ContextConfig, GuestContext, GuestValue};
use crate::scripts::{Language, fragment_for};

fn context() -> GuestContext {
    ContextBuilder::from_config(&ContextConfig::default())
        .build()
        .unwrap()
}

fn caches() -> Vec<Box<dyn CallableCache>> {
    vec![
        Box::new(NoCache::new()),
        Box::new(UnsynchronizedCache::new()),
        Box::new(SynchronizedCache::new()),
    ]
}

#[test]
fn key_is_stable_and_language_scoped() {
    let js = CacheKey::new(Language::Js, "x");
    assert_eq!(js, CacheKey::new(Language::Js, "x"));
    assert_ne!(js, CacheKey::new(Language::Ruby, "x"));
    assert_ne!(js, CacheKey::new(Language::Js, "y"));
    assert_eq!(js.to_string().len(), 64);
}

#[test]
fn key_separates_language_from_source() {
    let a = CacheKey::new(Language::Js, "rubyx");
    let b = CacheKey::new(Language::Ruby, "x");
    assert_ne!(a, b);
}

#[test]
fn memoizing_caches_evaluate_once() {
    let ctx = context();
    for cache in caches() {
        let fragment = fragment_for(Language::Ruby);
        let first = cache.resolve(&ctx, Language::Ruby, fragment.source).unwrap();
        let second = cache.resolve(&ctx, Language::Ruby, fragment.source).unwrap();
        match cache.policy() {
            CachePolicy::None => {
                assert_eq!(cache.evaluations(), 2);
                assert!(cache.is_empty());
                assert_ne!(first.value(), second.value());
            }
            _ => {
                assert_eq!(cache.evaluations(), 1);
                assert_eq!(cache.len(), 1);
                assert_eq!(first.value(), second.value());
            }
        }
        assert_eq!(first.key(), second.key());
    }
}

#[test]
fn distinct_sources_never_share_an_entry() {
    let ctx = context();
    for cache in caches() {
        let a = cache.resolve(&ctx, Language::Js, "(x) => x").unwrap();
        let b = cache.resolve(&ctx, Language::Js, "(y) => y").unwrap();
        assert_ne!(a.key(), b.key());
        assert_ne!(a.value(), b.value());
        assert_eq!(cache.evaluations(), 2);
    }
}

#[test]
fn entries_are_scoped_to_their_context() {
    let cache = SynchronizedCache::new();
    let first = context();
    let second = context();
    let a = cache.resolve(&first, Language::Js, "(x) => x").unwrap();
    let b = cache.resolve(&second, Language::Js, "(x) => x").unwrap();
    assert_ne!(a.value(), b.value());
    assert_eq!(cache.len(), 2);
}

#[test]
fn non_executable_results_are_rejected_and_not_cached() {
    let ctx = context();
    for cache in caches() {
        let err = cache.resolve(&ctx, Language::Js, "6371").unwrap_err();
        assert!(matches!(
            err,
            InvocationError::NotExecutable {
                language: Language::Js
            }
        ));
        assert!(cache.is_empty());
    }
    insta::assert_snapshot!(
        InvocationError::NotExecutable { language: Language::Ruby }.to_string(),
        @"The code block for 'ruby' is not executable. Did you return a function?"
    );
}

#[test]
fn evaluation_errors_surface_the_guest_diagnostic() {
    let ctx = context();
    let err = SynchronizedCache::new()
        .resolve(&ctx, Language::Js, "(a) => {")
        .unwrap_err();
    let InvocationError::Evaluation(guest) = err else {
        panic!("expected an evaluation error, got {:?}", err);
    };
    assert!(guest.to_string().starts_with("SyntaxError: "), "{}", guest);
}

#[test]
fn closed_context_is_a_lifecycle_error() {
    let ctx = context();
    ctx.close();
    let err = NoCache::new()
        .resolve(&ctx, Language::Js, "(x) => x")
        .unwrap_err();
    assert!(matches!(err, InvocationError::Lifecycle(_)));
}

#[test]
fn synchronized_first_access_evaluates_exactly_once() {
    let ctx = context();
    let cache = SynchronizedCache::new();
    let source = fragment_for(Language::Js).source;
    let values: Vec<GuestValue> = (0..32)
        .into_par_iter()
        .map(|_| cache.resolve(&ctx, Language::Js, source).unwrap().into_value())
        .collect();
    assert_eq!(cache.evaluations(), 1);
    assert!(values.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn unsynchronized_first_access_stays_correct() {
    let ctx = context();
    let cache = UnsynchronizedCache::new();
    let source = fragment_for(Language::Ruby).source;
    let args: Vec<GuestValue> = [51.507222, -0.1275, 40.7127, -74.0059]
        .into_iter()
        .map(GuestValue::Float)
        .collect();
    let results: Vec<f64> = (0..32)
        .into_par_iter()
        .map(|_| {
            let callable = cache.resolve(&ctx, Language::Ruby, source).unwrap();
            ctx.execute(callable.value(), &args)
                .unwrap()
                .as_double()
                .unwrap()
        })
        .collect();
    assert!(cache.evaluations() >= 1);
    assert_eq!(cache.len(), 1);
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}
