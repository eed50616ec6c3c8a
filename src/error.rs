//! Error taxonomy for the harness.
//!
//! - [`SetupError`]: a runtime, VM or guest context could not be established.
//!   Fatal to the process.
//! - [`InvocationError`]: one invocation failed. Fatal to the current case.
//! - [`LifecycleError`]: a handle was used after its owner was destroyed.
//! - [`UsageError`]: bad command-line input, reported before any lifecycle
//!   object exists.

use thiserror::Error;

use crate::guest::error::{GuestError, GuestErrorKind};
use crate::scripts::Language;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("an isolate is already active; tear it down before creating another")]
    IsolateAlreadyActive,
    #[error("a VM is already active; destroy it before creating another")]
    VmAlreadyActive,
    #[error("unrecognized VM option '{0}'")]
    UnrecognizedVmOption(String),
    #[error("class not found: {0}")]
    ClassNotFound(String),
    #[error("method not found: {class}.{name}{descriptor}")]
    MethodNotFound {
        class: String,
        name: String,
        descriptor: String,
    },
    #[error("native entry point '{0}' is not exported by the isolate")]
    EntryPointNotFound(String),
    #[error("unknown context option '{0}'")]
    UnknownContextOption(String),
    #[error("invalid value '{value}' for context option '{key}'")]
    InvalidContextOption { key: String, value: String },
    #[error("option '{0}' is experimental and experimental options are not allowed")]
    ExperimentalOptionDisabled(String),
    #[error("guest context construction failed: {0}")]
    ContextConstruction(String),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("the isolate has been torn down")]
    IsolateTornDown,
    #[error("the VM has been destroyed")]
    VmDestroyed,
    #[error("stale object reference (deleted or owned by another VM)")]
    StaleObject,
    #[error("the guest context has been closed")]
    ContextClosed,
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),
}

#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    /// Parse failure or a guest exception; carries the runtime's diagnostic.
    #[error("{0}")]
    Evaluation(GuestError),
    #[error("The code block for '{language}' is not executable. Did you return a function?")]
    NotExecutable { language: Language },
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// A control-interface call received an object of the wrong kind.
    #[error("VM call failed: {0}")]
    VmCall(String),
}

impl From<GuestError> for InvocationError {
    fn from(err: GuestError) -> Self {
        match err.kind {
            GuestErrorKind::ContextClosed => {
                InvocationError::Lifecycle(LifecycleError::ContextClosed)
            }
            _ => InvocationError::Evaluation(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Haversine distance code is not provided for '{0}'")]
    UnsupportedLanguage(String),
    #[error("unexpected mode '{0}' (expected 0-7)")]
    UnknownMode(String),
    #[error("{0}")]
    Arguments(String),
    #[error("invalid config '{path}': {message}")]
    Config { path: String, message: String },
}
