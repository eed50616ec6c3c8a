//! Entry points exported by the isolate.
//!
//! Guest entry points receive the language tag and source as C strings and
//! convert them on every call, the way a C caller would hand them over.

use std::ffi::CStr;

use crate::cache::CachePolicy;
use crate::error::InvocationError;
use crate::geo::haversine_distance;
use crate::guest::{GuestError, GuestErrorKind, GuestValue};
use crate::scripts::Language;

use super::isolate::IsolateThread;

pub const DISTANCE: &str = "distance";
pub const DISTANCE_RUBY: &str = "distance_ruby";
pub const DISTANCE_POLYGLOT_NO_CACHE: &str = "distance_polyglot_no_cache";
pub const DISTANCE_POLYGLOT_THREAD_UNSAFE_PARSE_CACHE: &str =
    "distance_polyglot_thread_unsafe_parse_cache";
pub const DISTANCE_POLYGLOT_THREAD_SAFE_PARSE_CACHE: &str =
    "distance_polyglot_thread_safe_parse_cache";

pub type DistanceFn = fn(&IsolateThread, f64, f64, f64, f64) -> Result<f64, InvocationError>;

pub type PolyglotDistanceFn =
    fn(&IsolateThread, &CStr, &CStr, f64, f64, f64, f64) -> Result<f64, InvocationError>;

#[derive(Clone, Copy)]
pub enum EntryPoint {
    Distance(DistanceFn),
    PolyglotDistance(PolyglotDistanceFn),
}

impl std::fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryPoint::Distance(_) => write!(f, "EntryPoint::Distance"),
            EntryPoint::PolyglotDistance(_) => write!(f, "EntryPoint::PolyglotDistance"),
        }
    }
}

/// Symbol exported for a guest cache policy.
pub fn symbol_for(policy: CachePolicy) -> &'static str {
    match policy {
        CachePolicy::None => DISTANCE_POLYGLOT_NO_CACHE,
        CachePolicy::Unsynchronized => DISTANCE_POLYGLOT_THREAD_UNSAFE_PARSE_CACHE,
        CachePolicy::Synchronized => DISTANCE_POLYGLOT_THREAD_SAFE_PARSE_CACHE,
    }
}

pub(crate) fn lookup(symbol: &str) -> Option<EntryPoint> {
    match symbol {
        DISTANCE => Some(EntryPoint::Distance(distance)),
        DISTANCE_RUBY => Some(EntryPoint::Distance(distance_ruby)),
        DISTANCE_POLYGLOT_NO_CACHE => Some(EntryPoint::PolyglotDistance(distance_polyglot_no_cache)),
        DISTANCE_POLYGLOT_THREAD_UNSAFE_PARSE_CACHE => Some(EntryPoint::PolyglotDistance(
            distance_polyglot_thread_unsafe_parse_cache,
        )),
        DISTANCE_POLYGLOT_THREAD_SAFE_PARSE_CACHE => Some(EntryPoint::PolyglotDistance(
            distance_polyglot_thread_safe_parse_cache,
        )),
        _ => None,
    }
}

pub fn distance(
    thread: &IsolateThread,
    a_lat: f64,
    a_long: f64,
    b_lat: f64,
    b_long: f64,
) -> Result<f64, InvocationError> {
    thread.check()?;
    Ok(haversine_distance(a_lat, a_long, b_lat, b_long))
}

/// Calls the Ruby function the isolate evaluated at creation; no source is
/// parsed per call.
pub fn distance_ruby(
    thread: &IsolateThread,
    a_lat: f64,
    a_long: f64,
    b_lat: f64,
    b_long: f64,
) -> Result<f64, InvocationError> {
    let context = thread.context()?;
    let args = [a_lat, a_long, b_lat, b_long].map(GuestValue::Float);
    let result = context.execute(thread.ruby_distance()?, &args)?;
    Ok(result.as_double()?)
}

pub fn distance_polyglot_no_cache(
    thread: &IsolateThread,
    language: &CStr,
    code: &CStr,
    a_lat: f64,
    a_long: f64,
    b_lat: f64,
    b_long: f64,
) -> Result<f64, InvocationError> {
    polyglot_distance(
        thread,
        CachePolicy::None,
        language,
        code,
        [a_lat, a_long, b_lat, b_long],
    )
}

pub fn distance_polyglot_thread_unsafe_parse_cache(
    thread: &IsolateThread,
    language: &CStr,
    code: &CStr,
    a_lat: f64,
    a_long: f64,
    b_lat: f64,
    b_long: f64,
) -> Result<f64, InvocationError> {
    polyglot_distance(
        thread,
        CachePolicy::Unsynchronized,
        language,
        code,
        [a_lat, a_long, b_lat, b_long],
    )
}

pub fn distance_polyglot_thread_safe_parse_cache(
    thread: &IsolateThread,
    language: &CStr,
    code: &CStr,
    a_lat: f64,
    a_long: f64,
    b_lat: f64,
    b_long: f64,
) -> Result<f64, InvocationError> {
    polyglot_distance(
        thread,
        CachePolicy::Synchronized,
        language,
        code,
        [a_lat, a_long, b_lat, b_long],
    )
}

fn polyglot_distance(
    thread: &IsolateThread,
    policy: CachePolicy,
    language: &CStr,
    code: &CStr,
    coordinates: [f64; 4],
) -> Result<f64, InvocationError> {
    let context = thread.context()?;
    let tag = c_string(language, "language")?;
    let source = c_string(code, "code")?;
    let language = Language::from_tag(tag).map_err(|err| {
        InvocationError::Evaluation(GuestError::new(
            GuestErrorKind::ArgumentError,
            err.to_string(),
        ))
    })?;

    let callable = thread.cache(policy)?.resolve(context, language, source)?;
    let args = coordinates.map(GuestValue::Float);
    let result = context.execute(callable.value(), &args)?;
    Ok(result.as_double()?)
}

fn c_string<'a>(value: &'a CStr, what: &str) -> Result<&'a str, InvocationError> {
    value.to_str().map_err(|err| {
        InvocationError::Evaluation(GuestError::new(
            GuestErrorKind::ArgumentError,
            format!("{} is not valid UTF-8: {}", what, err),
        ))
    })
}
