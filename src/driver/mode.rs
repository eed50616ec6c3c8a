//! Integer execution modes accepted on the command line.

use std::fmt;

use crate::backend::{BackendKind, BenchmarkCase, Coordinates, Library};
use crate::cache::CachePolicy;
use crate::error::UsageError;
use crate::scripts::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecMode {
    /// 0: isolate `distance`.
    NativeDistance,
    /// 1: isolate `distance_polyglot_no_cache`.
    NativeNoCache,
    /// 2: isolate `distance_polyglot_thread_unsafe_parse_cache`.
    NativeUnsynchronizedCache,
    /// 3: isolate `distance_polyglot_thread_safe_parse_cache`.
    NativeSynchronizedCache,
    /// 4: `bench/NativeLibrary.distance(DDDD)D` through the VM.
    VmDirect,
    /// 5: guest evaluation and execution through the VM.
    VmGuest,
    /// 6: isolate `distance_ruby`, calling the Ruby function evaluated when
    /// the isolate was created.
    NativeRubyDistance,
    /// 7: `bench/NativeLibraryRuby.distance(DDDD)D` through the VM.
    VmDirectRuby,
}

impl ExecMode {
    pub const ALL: [ExecMode; 8] = [
        ExecMode::NativeDistance,
        ExecMode::NativeNoCache,
        ExecMode::NativeUnsynchronizedCache,
        ExecMode::NativeSynchronizedCache,
        ExecMode::VmDirect,
        ExecMode::VmGuest,
        ExecMode::NativeRubyDistance,
        ExecMode::VmDirectRuby,
    ];

    pub fn code(self) -> u8 {
        match self {
            ExecMode::NativeDistance => 0,
            ExecMode::NativeNoCache => 1,
            ExecMode::NativeUnsynchronizedCache => 2,
            ExecMode::NativeSynchronizedCache => 3,
            ExecMode::VmDirect => 4,
            ExecMode::VmGuest => 5,
            ExecMode::NativeRubyDistance => 6,
            ExecMode::VmDirectRuby => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }

    pub fn parse(text: &str) -> Result<Self, UsageError> {
        text.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| UsageError::UnknownMode(text.to_string()))
    }

    pub fn backend(self) -> BackendKind {
        match self {
            ExecMode::NativeDistance
            | ExecMode::NativeNoCache
            | ExecMode::NativeUnsynchronizedCache
            | ExecMode::NativeSynchronizedCache
            | ExecMode::NativeRubyDistance => BackendKind::NativeEntry,
            ExecMode::VmDirect | ExecMode::VmDirectRuby => BackendKind::VmDirect,
            ExecMode::VmGuest => BackendKind::VmGuest,
        }
    }

    /// Cache policy of the native guest entry points; `None` for every mode
    /// that does not go through an isolate cache.
    pub fn policy(self) -> Option<CachePolicy> {
        match self {
            ExecMode::NativeNoCache => Some(CachePolicy::None),
            ExecMode::NativeUnsynchronizedCache => Some(CachePolicy::Unsynchronized),
            ExecMode::NativeSynchronizedCache => Some(CachePolicy::Synchronized),
            _ => None,
        }
    }

    pub fn library(self) -> Library {
        match self {
            ExecMode::NativeRubyDistance | ExecMode::VmDirectRuby => Library::PrecompiledRuby,
            _ => Library::Host,
        }
    }

    pub fn case(self, language: Language, coordinates: Coordinates) -> BenchmarkCase {
        BenchmarkCase {
            backend: self.backend(),
            policy: self.policy(),
            library: self.library(),
            language,
            coordinates,
        }
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
#[path = "mode_test.rs"]
mod mode_test;
