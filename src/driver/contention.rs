//! Concurrent first access to an isolate's callable cache.
//!
//! `callers` threads resolve the same fragment against a fresh isolate at
//! once. Under the synchronized policy exactly one evaluation happens; the
//! unsynchronized policy may evaluate once per racing caller.

use std::ffi::CString;

use log::info;
use rayon::prelude::*;
use thiserror::Error;

use crate::backend::Coordinates;
use crate::cache::CachePolicy;
use crate::error::{InvocationError, SetupError};
use crate::guest::{GuestError, GuestErrorKind};
use crate::runtime::{
    Runtimes,
    entry_points::{self, EntryPoint},
};
use crate::scripts::{Language, fragment_for};

#[derive(Debug, Error)]
pub enum ContentionError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentionReport {
    pub policy: CachePolicy,
    pub language: Language,
    pub callers: usize,
    /// Guest evaluations the cache performed.
    pub evaluations: usize,
    pub cached_entries: usize,
    pub results: Vec<f64>,
}

pub fn probe(
    policy: CachePolicy,
    language: Language,
    callers: usize,
    coordinates: Coordinates,
) -> Result<ContentionReport, ContentionError> {
    let mut runtimes = Runtimes::new();
    let thread = runtimes.create_isolate()?;
    let EntryPoint::PolyglotDistance(distance) = thread.lookup(entry_points::symbol_for(policy))?
    else {
        return Err(SetupError::EntryPointNotFound(entry_points::symbol_for(policy).to_string()).into());
    };

    let fragment = fragment_for(language);
    let (tag, code) = match (CString::new(language.id()), CString::new(fragment.source)) {
        (Ok(tag), Ok(code)) => (tag, code),
        (Err(err), _) | (_, Err(err)) => {
            return Err(InvocationError::Evaluation(GuestError::new(
                GuestErrorKind::ArgumentError,
                err.to_string(),
            ))
            .into());
        }
    };
    let [a_lat, a_long, b_lat, b_long] = coordinates.to_array();
    let results = (0..callers)
        .into_par_iter()
        .map(|_| distance(&thread, &tag, &code, a_lat, a_long, b_lat, b_long))
        .collect::<Result<Vec<f64>, InvocationError>>()?;

    let cache = thread.cache(policy).map_err(InvocationError::from)?;
    let report = ContentionReport {
        policy,
        language,
        callers,
        evaluations: cache.evaluations(),
        cached_entries: cache.len(),
        results,
    };
    info!(
        "{} with {} callers: {} evaluations",
        policy, callers, report.evaluations
    );
    runtimes.destroy_isolate();
    Ok(report)
}

#[cfg(test)]
#[path = "contention_test.rs"]
mod contention_test;
