//! The three ways a benchmark case reaches the haversine function.

use std::fmt;

use crate::cache::CachePolicy;
use crate::error::{InvocationError, SetupError};
use crate::runtime::Runtimes;
use crate::scripts::Language;

mod native_entry;
mod vm_direct;
mod vm_guest;

pub use native_entry::NativeEntryBackend;
pub use vm_direct::VmDirectBackend;
pub use vm_guest::VmGuestBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Isolate entry points called with C strings.
    NativeEntry,
    /// A static host method called through the VM control interface.
    VmDirect,
    /// Guest evaluation and execution through the VM control interface.
    VmGuest,
}

impl BackendKind {
    pub fn uses_vm(self) -> bool {
        matches!(self, BackendKind::VmDirect | BackendKind::VmGuest)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendKind::NativeEntry => "native-entry",
            BackendKind::VmDirect => "vm-direct",
            BackendKind::VmGuest => "vm-guest",
        };
        write!(f, "{}", s)
    }
}

/// Function a direct case calls: the host-native one, or the Ruby fragment
/// evaluated once by the runtime. Cases with a cache policy ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Library {
    #[default]
    Host,
    PrecompiledRuby,
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Library::Host => "host",
            Library::PrecompiledRuby => "precompiled-ruby",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub a_lat: f64,
    pub a_long: f64,
    pub b_lat: f64,
    pub b_long: f64,
}

impl Coordinates {
    pub fn new(a_lat: f64, a_long: f64, b_lat: f64, b_long: f64) -> Self {
        Self {
            a_lat,
            a_long,
            b_lat,
            b_long,
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.a_lat, self.a_long, self.b_lat, self.b_long]
    }
}

/// One measured configuration. `policy` is `None` for the direct
/// native-entry cases; the VM backends ignore it. `library` only matters to
/// direct cases, which also ignore `language`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkCase {
    pub backend: BackendKind,
    pub policy: Option<CachePolicy>,
    pub library: Library,
    pub language: Language,
    pub coordinates: Coordinates,
}

impl BenchmarkCase {
    /// Whether the case calls a library function instead of evaluating a
    /// guest fragment itself.
    pub fn is_direct(&self) -> bool {
        match self.backend {
            BackendKind::NativeEntry => self.policy.is_none(),
            BackendKind::VmDirect => true,
            BackendKind::VmGuest => false,
        }
    }
}

impl fmt::Display for BenchmarkCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.backend)?;
        if let Some(policy) = self.policy {
            write!(f, "/{}", policy)?;
        }
        if self.is_direct() && self.library == Library::PrecompiledRuby {
            write!(f, "/{}", self.library)
        } else {
            write!(f, "/{}", self.language)
        }
    }
}

/// A way of invoking the haversine function for a case.
///
/// `set_up` establishes lifecycle objects and resolves symbols, `prepare`
/// does per-case work that is excluded from timing, and `invoke` is the
/// measured call.
pub trait InvocationBackend {
    fn kind(&self) -> BackendKind;

    fn set_up(&mut self, runtimes: &mut Runtimes, case: &BenchmarkCase) -> Result<(), SetupError>;

    fn prepare(&mut self, case: &BenchmarkCase) -> Result<(), InvocationError>;

    fn invoke(&mut self, case: &BenchmarkCase) -> Result<f64, InvocationError>;

    /// Releases what `set_up` and `prepare` acquired from the runtimes.
    fn tear_down(&mut self);

    /// Releases what the backend keeps across cases. Called after
    /// `tear_down` when the runtimes are about to be destroyed.
    fn release(&mut self) {}
}
