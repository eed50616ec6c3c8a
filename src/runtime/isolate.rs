//! Process-local isolated runtime hosting the native entry points.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use log::debug;

use crate::cache::{CachePolicy, CallableCache, NoCache, SynchronizedCache, UnsynchronizedCache};
use crate::error::{LifecycleError, SetupError};
use crate::guest::{ContextBuilder, ContextConfig, GuestContext, GuestValue};
use crate::scripts::{Language, fragment_for};

use super::entry_points::{self, EntryPoint};

static NEXT_ISOLATE_ID: AtomicU64 = AtomicU64::new(1);

struct IsolateShared {
    id: u64,
    alive: AtomicBool,
    context: GuestContext,
    /// The Ruby fragment, evaluated when the isolate is created.
    ruby_distance: GuestValue,
    no_cache: NoCache,
    unsynchronized: UnsynchronizedCache,
    synchronized: SynchronizedCache,
}

/// Owning handle of an isolate. Threads derived from it stop working once it
/// is torn down.
pub struct Isolate {
    shared: Arc<IsolateShared>,
}

impl Isolate {
    pub(crate) fn create(config: &ContextConfig) -> Result<Self, SetupError> {
        let context = ContextBuilder::from_config(config).build()?;
        let ruby_distance = precompile(&context, Language::Ruby)?;
        let shared = IsolateShared {
            id: NEXT_ISOLATE_ID.fetch_add(1, Ordering::Relaxed),
            alive: AtomicBool::new(true),
            context,
            ruby_distance,
            no_cache: NoCache::new(),
            unsynchronized: UnsynchronizedCache::new(),
            synchronized: SynchronizedCache::new(),
        };
        debug!(
            "isolate {} created with guest context {}",
            shared.id,
            shared.context.id()
        );
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn thread(&self) -> IsolateThread {
        IsolateThread {
            shared: Arc::clone(&self.shared),
        }
    }

    pub(crate) fn tear_down(self) {
        self.shared.alive.store(false, Ordering::Release);
        self.shared.context.close();
        debug!("isolate {} torn down", self.shared.id);
    }
}

fn precompile(context: &GuestContext, language: Language) -> Result<GuestValue, SetupError> {
    let fragment = fragment_for(language);
    let value = context
        .eval(fragment.language, fragment.source)
        .map_err(|err| SetupError::ContextConstruction(err.to_string()))?;
    if value.can_execute() {
        Ok(value)
    } else {
        Err(SetupError::ContextConstruction(format!(
            "the {} fragment did not evaluate to a function",
            language
        )))
    }
}

/// A thread attached to an isolate; the first argument of every entry point.
#[derive(Clone)]
pub struct IsolateThread {
    shared: Arc<IsolateShared>,
}

impl std::fmt::Debug for IsolateThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IsolateThread(isolate {})", self.shared.id)
    }
}

impl IsolateThread {
    pub fn isolate_id(&self) -> u64 {
        self.shared.id
    }

    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<(), LifecycleError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(LifecycleError::IsolateTornDown)
        }
    }

    pub fn context(&self) -> Result<&GuestContext, LifecycleError> {
        self.check()?;
        Ok(&self.shared.context)
    }

    /// The callable behind `distance_ruby`.
    pub fn ruby_distance(&self) -> Result<&GuestValue, LifecycleError> {
        self.check()?;
        Ok(&self.shared.ruby_distance)
    }

    pub fn cache(&self, policy: CachePolicy) -> Result<&dyn CallableCache, LifecycleError> {
        self.check()?;
        Ok(match policy {
            CachePolicy::None => &self.shared.no_cache,
            CachePolicy::Unsynchronized => &self.shared.unsynchronized,
            CachePolicy::Synchronized => &self.shared.synchronized,
        })
    }

    /// Resolves an exported entry point by symbol name.
    pub fn lookup(&self, symbol: &str) -> Result<EntryPoint, SetupError> {
        self.check()?;
        entry_points::lookup(symbol).ok_or_else(|| SetupError::EntryPointNotFound(symbol.to_string()))
    }
}
