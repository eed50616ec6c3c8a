use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use log::debug;

use crate::error::InvocationError;
use crate::guest::{GuestContext, GuestValue};
use crate::scripts::Language;

use super::{CacheKey, CachePolicy, CachedCallable, CallableCache, EntryKey, evaluate_callable};

/// Lazily memoizes callables without serializing first access.
///
/// Each map access takes the lock on its own, so concurrent first resolves of
/// one key may all miss, all evaluate, and the last insert wins. Callers get
/// the value they evaluated themselves.
#[derive(Debug, Default)]
pub struct UnsynchronizedCache {
    entries: RwLock<HashMap<EntryKey, GuestValue>>,
    evaluations: AtomicUsize,
}

impl UnsynchronizedCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, key: &EntryKey) -> Option<GuestValue> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }
}

impl CallableCache for UnsynchronizedCache {
    fn policy(&self) -> CachePolicy {
        CachePolicy::Unsynchronized
    }

    fn resolve(
        &self,
        context: &GuestContext,
        language: Language,
        source: &str,
    ) -> Result<CachedCallable, InvocationError> {
        let key = CacheKey::new(language, source);
        let entry_key = (context.id(), key);
        if let Some(value) = self.lookup(&entry_key) {
            return Ok(CachedCallable { key, value });
        }

        debug!("unsynchronized cache miss for {} source {}", language, key);
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let value = evaluate_callable(context, language, source)?;
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(entry_key, value.clone());
        Ok(CachedCallable { key, value })
    }

    fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
