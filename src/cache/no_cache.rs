use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::InvocationError;
use crate::guest::GuestContext;
use crate::scripts::Language;

use super::{CacheKey, CachePolicy, CachedCallable, CallableCache, evaluate_callable};

/// Evaluates the source on every resolve.
#[derive(Debug, Default)]
pub struct NoCache {
    evaluations: AtomicUsize,
}

impl NoCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CallableCache for NoCache {
    fn policy(&self) -> CachePolicy {
        CachePolicy::None
    }

    fn resolve(
        &self,
        context: &GuestContext,
        language: Language,
        source: &str,
    ) -> Result<CachedCallable, InvocationError> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let value = evaluate_callable(context, language, source)?;
        Ok(CachedCallable {
            key: CacheKey::new(language, source),
            value,
        })
    }

    fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    fn len(&self) -> usize {
        0
    }
}
