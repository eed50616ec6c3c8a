use std::ffi::CString;

use log::debug;

use crate::error::{InvocationError, LifecycleError, SetupError};
use crate::guest::{GuestError, GuestErrorKind};
use crate::runtime::{
    Runtimes,
    entry_points::{self, EntryPoint},
    isolate::IsolateThread,
};
use crate::scripts::fragment_for;

use super::{BackendKind, BenchmarkCase, InvocationBackend, Library};

/// Calls the isolate's exported entry points.
#[derive(Debug, Default)]
pub struct NativeEntryBackend {
    thread: Option<IsolateThread>,
    entry: Option<EntryPoint>,
    language: Option<CString>,
    code: Option<CString>,
}

impl NativeEntryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn c_string(value: &str) -> Result<CString, InvocationError> {
    CString::new(value).map_err(|err| {
        InvocationError::Evaluation(GuestError::new(
            GuestErrorKind::ArgumentError,
            err.to_string(),
        ))
    })
}

impl InvocationBackend for NativeEntryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::NativeEntry
    }

    fn set_up(&mut self, runtimes: &mut Runtimes, case: &BenchmarkCase) -> Result<(), SetupError> {
        let thread = runtimes.ensure_isolate()?;
        let symbol = match (case.policy, case.library) {
            (Some(policy), _) => entry_points::symbol_for(policy),
            (None, Library::Host) => entry_points::DISTANCE,
            (None, Library::PrecompiledRuby) => entry_points::DISTANCE_RUBY,
        };
        self.entry = Some(thread.lookup(symbol)?);
        debug!("native entry backend bound to '{}'", symbol);
        self.thread = Some(thread);
        Ok(())
    }

    fn prepare(&mut self, case: &BenchmarkCase) -> Result<(), InvocationError> {
        let fragment = fragment_for(case.language);
        self.language = Some(c_string(fragment.language.id())?);
        self.code = Some(c_string(fragment.source)?);
        Ok(())
    }

    fn invoke(&mut self, case: &BenchmarkCase) -> Result<f64, InvocationError> {
        let thread = self
            .thread
            .as_ref()
            .ok_or(LifecycleError::NotInitialized("isolate"))?;
        let [a_lat, a_long, b_lat, b_long] = case.coordinates.to_array();
        match self.entry {
            Some(EntryPoint::Distance(distance)) => distance(thread, a_lat, a_long, b_lat, b_long),
            Some(EntryPoint::PolyglotDistance(distance)) => {
                let (Some(language), Some(code)) = (&self.language, &self.code) else {
                    return Err(LifecycleError::NotInitialized("guest source").into());
                };
                distance(thread, language, code, a_lat, a_long, b_lat, b_long)
            }
            None => Err(LifecycleError::NotInitialized("entry point").into()),
        }
    }

    fn tear_down(&mut self) {
        self.thread = None;
        self.entry = None;
        self.language = None;
        self.code = None;
    }
}
