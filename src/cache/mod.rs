//! Content-addressed store of evaluated guest callables.
//!
//! Three policies share the [`CallableCache`] trait: [`NoCache`] evaluates on
//! every resolve, [`UnsynchronizedCache`] memoizes without making the
//! check-evaluate-insert sequence atomic, and [`SynchronizedCache`] runs that
//! sequence under one mutex so each key is evaluated exactly once.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::InvocationError;
use crate::guest::{GuestContext, GuestValue};
use crate::scripts::Language;

mod no_cache;
mod sync;
mod unsync;

pub use no_cache::NoCache;
pub use sync::SynchronizedCache;
pub use unsync::UnsynchronizedCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePolicy {
    None,
    Unsynchronized,
    Synchronized,
}

impl CachePolicy {
    pub const ALL: [CachePolicy; 3] = [
        CachePolicy::None,
        CachePolicy::Unsynchronized,
        CachePolicy::Synchronized,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CachePolicy::None => "no-cache",
            CachePolicy::Unsynchronized => "thread-unsafe-parse-cache",
            CachePolicy::Synchronized => "thread-safe-parse-cache",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// sha256 over the language id, a NUL separator and the source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new(language: Language, source: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(language.id().as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        let result = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self)
    }
}

/// An executable guest value together with the key it was resolved under.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCallable {
    key: CacheKey,
    value: GuestValue,
}

impl CachedCallable {
    pub fn key(&self) -> CacheKey {
        self.key
    }

    pub fn value(&self) -> &GuestValue {
        &self.value
    }

    pub fn into_value(self) -> GuestValue {
        self.value
    }
}

pub trait CallableCache: Send + Sync {
    fn policy(&self) -> CachePolicy;

    /// Returns the callable for `(language, source)` evaluated in `context`.
    fn resolve(
        &self,
        context: &GuestContext,
        language: Language,
        source: &str,
    ) -> Result<CachedCallable, InvocationError>;

    /// Guest evaluations performed so far.
    fn evaluations(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entries belong to the context that produced them.
type EntryKey = (u64, CacheKey);

/// Evaluates `source` and checks that the result can be executed.
pub(crate) fn evaluate_callable(
    context: &GuestContext,
    language: Language,
    source: &str,
) -> Result<GuestValue, InvocationError> {
    let value = context.eval(language, source)?;
    if !value.can_execute() {
        return Err(InvocationError::NotExecutable { language });
    }
    Ok(value)
}

#[cfg(test)]
mod cache_test;
