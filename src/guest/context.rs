//! Guest execution contexts and the builder that configures them.
//!
//! A context owns every value evaluated through it, including Ruby top-level
//! constants, which persist across evaluations. That persistence is why the
//! Ruby fragment guards its constant with `unless defined?(EARTH_RADIUS)`.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use log::{debug, warn};
use serde::Deserialize;

use crate::error::SetupError;
use crate::scripts::Language;

use super::{
    error::{GuestError, GuestErrorKind, GuestResult},
    interp,
    lexer::Lexer,
    parser::Parser,
    value::GuestValue,
};

pub const OPTION_NO_HOME_PROVIDED: &str = "ruby.no-home-provided";
pub const OPTION_HOME: &str = "ruby.home";

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// The fixed set of recognized context settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub allow_experimental_features: bool,
    pub guest_home_override: Option<PathBuf>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            allow_experimental_features: true,
            guest_home_override: None,
        }
    }
}

impl ContextConfig {
    /// The builder options this configuration stands for.
    pub fn options(&self) -> Vec<(&'static str, String)> {
        match &self.guest_home_override {
            Some(home) => vec![(OPTION_HOME, home.to_string_lossy().into_owned())],
            None => vec![(OPTION_NO_HOME_PROVIDED, "true".to_string())],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    allow_experimental: bool,
    options: Vec<(String, String)>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preset for a [`ContextConfig`]: without a home override the
    /// Ruby dialect runs in no-home mode, which is experimental.
    pub fn from_config(config: &ContextConfig) -> Self {
        config.options().into_iter().fold(
            Self::new().allow_experimental_options(config.allow_experimental_features),
            |builder, (key, value)| builder.option(key, value),
        )
    }

    pub fn allow_experimental_options(mut self, allow: bool) -> Self {
        self.allow_experimental = allow;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<GuestContext, SetupError> {
        let mut config = ContextConfig {
            allow_experimental_features: self.allow_experimental,
            guest_home_override: None,
        };
        let mut ruby_no_home = false;

        for (key, value) in self.options {
            match key.as_str() {
                OPTION_NO_HOME_PROVIDED => {
                    if !self.allow_experimental {
                        return Err(SetupError::ExperimentalOptionDisabled(key));
                    }
                    ruby_no_home = match value.as_str() {
                        "true" => true,
                        "false" => false,
                        _ => return Err(SetupError::InvalidContextOption { key, value }),
                    };
                }
                OPTION_HOME => {
                    if value.is_empty() {
                        return Err(SetupError::InvalidContextOption { key, value });
                    }
                    config.guest_home_override = Some(PathBuf::from(value));
                }
                _ => return Err(SetupError::UnknownContextOption(key)),
            }
        }

        let state = ContextState {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            config,
            ruby_no_home,
            open: AtomicBool::new(true),
            constants: RwLock::new(HashMap::new()),
            evaluations: AtomicUsize::new(0),
        };
        debug!("guest context {} built ({:?})", state.id, state.config);
        Ok(GuestContext {
            state: Arc::new(state),
        })
    }
}

/// Shared state of one context; guest functions keep it alive and check
/// `open` before running.
#[derive(Debug)]
pub(crate) struct ContextState {
    id: u64,
    config: ContextConfig,
    ruby_no_home: bool,
    open: AtomicBool,
    constants: RwLock<HashMap<Arc<str>, GuestValue>>,
    evaluations: AtomicUsize,
}

impl ContextState {
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn constant(&self, name: &str) -> Option<GuestValue> {
        // Inserts are single map operations, so a poisoned map is still whole.
        let constants = self.constants.read().unwrap_or_else(|e| e.into_inner());
        constants.get(name).cloned()
    }

    pub(crate) fn define_constant(&self, name: Arc<str>, value: GuestValue) {
        let mut constants = self.constants.write().unwrap_or_else(|e| e.into_inner());
        if constants.contains_key(&name) {
            warn!("(eval): warning: already initialized constant {}", name);
        }
        constants.insert(name, value);
    }
}

/// A guest-language execution context. Cloning shares the same context.
#[derive(Debug, Clone)]
pub struct GuestContext {
    state: Arc<ContextState>,
}

impl GuestContext {
    pub fn id(&self) -> u64 {
        self.state.id
    }

    pub fn config(&self) -> &ContextConfig {
        &self.state.config
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Number of `eval` calls made against this context.
    pub fn evaluations(&self) -> usize {
        self.state.evaluations.load(Ordering::Relaxed)
    }

    /// Parses and evaluates `source`, returning the completion value of its
    /// last statement.
    pub fn eval(&self, language: Language, source: &str) -> GuestResult<GuestValue> {
        if !self.is_open() {
            return Err(GuestError::context_closed());
        }
        self.state.evaluations.fetch_add(1, Ordering::Relaxed);

        if language == Language::Ruby
            && !self.state.ruby_no_home
            && self.state.config.guest_home_override.is_none()
        {
            return Err(GuestError::new(
                GuestErrorKind::NameError,
                format!(
                    "could not find the ruby home; set `{}` or enable `{}`",
                    OPTION_HOME, OPTION_NO_HOME_PROVIDED
                ),
            ));
        }

        let mut parser = Parser::new(Lexer::new(source, language));
        let program = parser.parse_program()?;
        interp::eval_program(&self.state, language, &program)
    }

    /// Executes a callable value with the given arguments.
    pub fn execute(&self, callable: &GuestValue, args: &[GuestValue]) -> GuestResult<GuestValue> {
        callable.execute(args)
    }

    /// Closes the context. Values it produced can no longer be executed.
    pub fn close(&self) {
        if self.state.open.swap(false, Ordering::AcqRel) {
            debug!("guest context {} closed", self.state.id);
        }
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;
