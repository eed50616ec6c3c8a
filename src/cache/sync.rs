use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use log::debug;

use crate::error::InvocationError;
use crate::guest::{GuestContext, GuestValue};
use crate::scripts::Language;

use super::{CacheKey, CachePolicy, CachedCallable, CallableCache, EntryKey, evaluate_callable};

/// Lazily memoizes callables with the whole check-and-insert under one lock.
///
/// The lock is taken on every resolve, hits included, and released before
/// the caller executes the callable.
#[derive(Debug, Default)]
pub struct SynchronizedCache {
    entries: Mutex<HashMap<EntryKey, GuestValue>>,
    evaluations: AtomicUsize,
}

impl SynchronizedCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CallableCache for SynchronizedCache {
    fn policy(&self) -> CachePolicy {
        CachePolicy::Synchronized
    }

    fn resolve(
        &self,
        context: &GuestContext,
        language: Language,
        source: &str,
    ) -> Result<CachedCallable, InvocationError> {
        let key = CacheKey::new(language, source);
        let entry_key = (context.id(), key);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = entries.get(&entry_key) {
            return Ok(CachedCallable {
                key,
                value: value.clone(),
            });
        }

        debug!("synchronized cache miss for {} source {}", language, key);
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        // A failed evaluation leaves the key absent, so the next resolve retries.
        let value = evaluate_callable(context, language, source)?;
        entries.insert(entry_key, value.clone());
        Ok(CachedCallable { key, value })
    }

    fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
